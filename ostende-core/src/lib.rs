//! Ostende Core - Playback orchestration for torrent-backed streaming
//!
//! Turns a primary locator plus fallbacks into a watchable stream: resolves
//! candidates, drives one transfer engine instance at a time, fails over
//! between candidates and republishes progress to the player.

pub mod config;
pub mod engine;
pub mod render;
pub mod session;
pub mod source;
pub mod tracing_setup;

// Re-export main types for convenient access
pub use config::OstendeConfig;
pub use engine::{EngineFactory, EngineLifecycleManager, EngineSlot, TransferEngine};
pub use render::{PlayableFile, RenderTarget};
pub use session::{
    PlaybackError, PlaybackHandle, Player, SessionError, SessionSnapshot, SessionState,
};
pub use source::{PlaybackRequest, SourceError, SourceResolver};

/// Errors that can bubble up from any Ostende subsystem.
#[derive(Debug, thiserror::Error)]
pub enum OstendeError {
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error("Playback error: {0}")]
    Playback(#[from] PlaybackError),

    #[error("Session error: {0}")]
    Session(SessionError),
}

impl From<SessionError> for OstendeError {
    fn from(error: SessionError) -> Self {
        match error {
            SessionError::Source(source) => OstendeError::Source(source),
            other => OstendeError::Session(other),
        }
    }
}

impl OstendeError {
    /// Returns a user-friendly error message suitable for display.
    pub fn user_message(&self) -> String {
        match self {
            OstendeError::Source(e) => match e {
                SourceError::InvalidLocator { locator, .. } => {
                    format!("Invalid torrent link: {locator}")
                }
                SourceError::NoCandidates { .. } => "No playable source available".to_string(),
            },
            OstendeError::Playback(e) => match e {
                PlaybackError::NoPlayableFile { .. } => {
                    "No compatible video file found in torrent".to_string()
                }
                PlaybackError::Connection { .. } => "Could not reach any peers".to_string(),
                _ => "Playback error occurred".to_string(),
            },
            OstendeError::Session(SessionError::SessionClosed) => {
                "Player has been closed".to_string()
            }
            OstendeError::Session(_) => "Player error occurred".to_string(),
        }
    }

    /// Checks if this error is due to user input validation.
    pub fn is_user_error(&self) -> bool {
        matches!(self, OstendeError::Source(_))
    }
}

pub type Result<T> = std::result::Result<T, OstendeError>;

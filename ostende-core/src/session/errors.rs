//! Error types for playback attempts and session handles.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::state::SessionState;
use crate::engine::{EngineFault, FaultKind};
use crate::source::{SourceDescriptor, SourceError};

/// Why a single attempt on one candidate failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlaybackError {
    #[error("Engine could not be created: {reason}")]
    EngineInstantiation { reason: String },

    #[error("Connection failed: {reason}")]
    Connection { reason: String },

    #[error("No compatible video file found in torrent ({file_count} file(s) inspected)")]
    NoPlayableFile { file_count: usize },

    #[error("Render failed: {reason}")]
    Render { reason: String },

    #[error("Engine error: {reason}")]
    EngineFatal { reason: String },
}

impl PlaybackError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PlaybackError::EngineInstantiation { .. } => ErrorKind::EngineInstantiation,
            PlaybackError::Connection { .. } => ErrorKind::Connection,
            PlaybackError::NoPlayableFile { .. } => ErrorKind::NoPlayableFile,
            PlaybackError::Render { .. } => ErrorKind::Render,
            PlaybackError::EngineFatal { .. } => ErrorKind::EngineFatal,
        }
    }
}

impl From<EngineFault> for PlaybackError {
    fn from(fault: EngineFault) -> Self {
        match fault.kind {
            FaultKind::Connection => PlaybackError::Connection {
                reason: fault.message,
            },
            FaultKind::Fatal => PlaybackError::EngineFatal {
                reason: fault.message,
            },
        }
    }
}

/// Flat taxonomy of attempt failures used in records and events.
///
/// Locators rejected during resolution never reach a session; they are
/// reported as `SourceError` instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    EngineInstantiation,
    Connection,
    NoPlayableFile,
    Render,
    EngineFatal,
}

/// A failure attributed to the candidate that produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorRecord {
    pub kind: ErrorKind,
    pub message: String,
    pub candidate_index: usize,
    pub locator: String,
    pub occurred_at: DateTime<Utc>,
}

impl ErrorRecord {
    pub fn new(
        error: &PlaybackError,
        candidate_index: usize,
        candidate: &SourceDescriptor,
    ) -> Self {
        Self {
            kind: error.kind(),
            message: error.to_string(),
            candidate_index,
            locator: candidate.raw_locator().to_string(),
            occurred_at: Utc::now(),
        }
    }

    /// User-facing summary of the failure.
    pub fn summary(&self, candidates_tried: usize, candidate_count: usize) -> String {
        format!(
            "Error loading torrent ({}): {} ({} of {} source(s) tried)",
            self.locator, self.message, candidates_tried, candidate_count
        )
    }
}

/// Errors returned by `PlaybackHandle` operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Playback session is closed")]
    SessionClosed,

    #[error("Cannot {action} while {from:?}")]
    InvalidTransition {
        from: SessionState,
        action: &'static str,
    },

    #[error("Source error: {0}")]
    Source(#[from] SourceError),
}

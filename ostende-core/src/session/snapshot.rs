//! Published views of a session: the latest snapshot and the event stream.

use serde::Serialize;
use uuid::Uuid;

use super::errors::ErrorRecord;
use super::state::{PlaybackSession, SessionState};

/// Point-in-time view of a session, published after every change.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub state: SessionState,
    pub current_index: usize,
    pub candidate_count: usize,
    pub candidates_tried: usize,
    pub retry_count: u32,
    pub progress: f64,
    pub current_locator: String,
    pub current_label: String,
    pub last_error: Option<ErrorRecord>,
    pub closed_by_user: bool,
    pub engine_alive: bool,
}

impl SessionSnapshot {
    pub(crate) fn capture(session: &PlaybackSession, engine_alive: bool) -> Self {
        let candidate = session.current_candidate();
        Self {
            session_id: session.id(),
            state: session.state(),
            current_index: session.current_index(),
            candidate_count: session.candidates().len(),
            candidates_tried: session.candidates_tried(),
            retry_count: session.retry_count(),
            progress: session.progress().clamp(0.0, 100.0),
            current_locator: candidate.raw_locator().to_string(),
            current_label: candidate.label().to_string(),
            last_error: session.last_error().cloned(),
            closed_by_user: session.closed_by_user(),
            engine_alive,
        }
    }

    /// "Attempt k of N", shown once the first candidate has been left behind.
    pub fn attempt_label(&self) -> Option<String> {
        (self.retry_count > 0).then(|| {
            format!(
                "Attempt {} of {}",
                self.current_index + 1,
                self.candidate_count
            )
        })
    }

    pub fn progress_label(&self) -> String {
        format!("Loading: {:.1}%", self.progress)
    }

    /// Text for the player overlay.
    pub fn status_message(&self) -> String {
        match self.state {
            SessionState::Idle => "Waiting to start".to_string(),
            SessionState::Connecting => match self.attempt_label() {
                Some(attempt) => format!("{} ({attempt})", self.progress_label()),
                None => self.progress_label(),
            },
            SessionState::Ready => format!("Opening {}", self.current_label),
            SessionState::Playing => format!("Playing {}", self.current_label),
            SessionState::Terminated if self.closed_by_user => "Playback closed".to_string(),
            SessionState::Failed | SessionState::Terminated => match &self.last_error {
                Some(error) => error.summary(self.candidates_tried, self.candidate_count),
                None => "Playback closed".to_string(),
            },
        }
    }
}

/// Notifications broadcast to every event subscriber, in order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    StateChanged {
        from: SessionState,
        to: SessionState,
    },
    /// Republished download progress of the live attempt, in percent
    Progress { percent: f64 },
    Warning { message: String },
    /// An attempt failed and the next candidate is being tried
    Failover {
        failed_index: usize,
        next_index: usize,
        error: ErrorRecord,
    },
    /// Every candidate failed
    GaveUp { summary: String, error: ErrorRecord },
    /// The selected file is attached to the render target
    Rendered { file_name: String },
}

//! Playback session state machine

use serde::Serialize;
use uuid::Uuid;

use super::errors::{ErrorRecord, SessionError};
use crate::source::{CandidateList, SourceDescriptor};

/// Lifecycle state of a playback session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionState {
    /// Created, no attempt started yet
    Idle,
    /// Engine attempt running, waiting for metadata
    Connecting,
    /// Playable file found and handed to the render target
    Ready,
    /// Render target produced output
    Playing,
    /// Current attempt failed, failover pending
    Failed,
    /// Closed by the user or out of candidates
    Terminated,
}

impl SessionState {
    /// States with a live engine attempt.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            SessionState::Connecting | SessionState::Ready | SessionState::Playing
        )
    }

    /// Whether download progress is meaningful.
    pub fn accepts_progress(self) -> bool {
        self.is_active()
    }
}

/// One "user wants to watch X" request.
///
/// Owns the candidate list and every counter the user sees. The engine
/// instance is owned by the lifecycle manager next to it, never by this
/// struct.
#[derive(Debug, Clone)]
pub struct PlaybackSession {
    id: Uuid,
    candidates: CandidateList,
    current_index: usize,
    state: SessionState,
    retry_count: u32,
    progress: f64,
    last_error: Option<ErrorRecord>,
    candidates_tried: usize,
    closed_by_user: bool,
}

impl PlaybackSession {
    pub fn new(candidates: CandidateList) -> Self {
        Self {
            id: Uuid::new_v4(),
            candidates,
            current_index: 0,
            state: SessionState::Idle,
            retry_count: 0,
            progress: 0.0,
            last_error: None,
            candidates_tried: 0,
            closed_by_user: false,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn candidates(&self) -> &CandidateList {
        &self.candidates
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_candidate(&self) -> &SourceDescriptor {
        &self.candidates[self.current_index]
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    /// Percentage in `0.0..=100.0` for the current attempt.
    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn last_error(&self) -> Option<&ErrorRecord> {
        self.last_error.as_ref()
    }

    /// Distinct candidates attempted since the list was last restarted.
    pub fn candidates_tried(&self) -> usize {
        self.candidates_tried
    }

    /// Whether the session ended through `close` rather than by running out
    /// of candidates.
    pub fn closed_by_user(&self) -> bool {
        self.closed_by_user
    }

    pub fn has_next_candidate(&self) -> bool {
        self.current_index + 1 < self.candidates.len()
    }

    /// `Idle` → `Connecting` on candidate 0.
    ///
    /// # Errors
    /// - `SessionError::InvalidTransition` - The session already started
    pub fn start(&mut self) -> Result<(), SessionError> {
        if self.state != SessionState::Idle {
            return Err(self.invalid("start"));
        }
        self.current_index = 0;
        self.candidates_tried = 0;
        self.enter_connecting();
        Ok(())
    }

    /// `Connecting` → `Ready` once a playable file was found.
    ///
    /// # Errors
    /// - `SessionError::InvalidTransition` - Not connecting
    pub fn mark_ready(&mut self) -> Result<(), SessionError> {
        if self.state != SessionState::Connecting {
            return Err(self.invalid("mark ready"));
        }
        self.state = SessionState::Ready;
        Ok(())
    }

    /// `Ready` → `Playing` on the render target's first output.
    ///
    /// # Errors
    /// - `SessionError::InvalidTransition` - Not ready
    pub fn mark_playing(&mut self) -> Result<(), SessionError> {
        if self.state != SessionState::Ready {
            return Err(self.invalid("mark playing"));
        }
        self.state = SessionState::Playing;
        Ok(())
    }

    /// Records `record` as the last error and enters `Failed`.
    pub fn fail(&mut self, record: ErrorRecord) {
        self.last_error = Some(record);
        self.state = SessionState::Failed;
    }

    /// `Failed` → `Connecting` on the next candidate.
    ///
    /// Returns the new index, or `None` when there is no next candidate or
    /// the session is not failed.
    pub fn advance(&mut self) -> Option<usize> {
        if self.state != SessionState::Failed || !self.has_next_candidate() {
            return None;
        }
        self.current_index += 1;
        self.retry_count += 1;
        self.enter_connecting();
        Some(self.current_index)
    }

    /// `Failed` → `Terminated`, keeping `last_error` for display.
    pub fn give_up(&mut self) {
        self.state = SessionState::Terminated;
    }

    /// Any state → `Terminated`.
    pub fn close(&mut self) {
        self.state = SessionState::Terminated;
        self.closed_by_user = true;
    }

    /// Explicit user retry, → `Connecting`.
    ///
    /// Restarts from candidate 0 when the last candidate was the current one,
    /// otherwise retries the same candidate.
    ///
    /// # Errors
    /// - `SessionError::InvalidTransition` - The session never started
    pub fn retry(&mut self) -> Result<(), SessionError> {
        if self.state == SessionState::Idle {
            return Err(self.invalid("retry"));
        }
        if self.current_index == self.candidates.last_index() {
            self.current_index = 0;
            self.candidates_tried = 0;
        } else {
            self.candidates_tried = self.candidates_tried.saturating_sub(1);
        }
        self.retry_count += 1;
        self.enter_connecting();
        Ok(())
    }

    /// Raises progress to `percent`, never lowering it within an attempt.
    ///
    /// Returns the progress now in effect, `None` when progress is not
    /// meaningful in the current state.
    pub fn raise_progress(&mut self, percent: f64) -> Option<f64> {
        if !self.state.accepts_progress() {
            return None;
        }
        if percent > self.progress {
            self.progress = percent.min(100.0);
        }
        Some(self.progress)
    }

    fn enter_connecting(&mut self) {
        self.state = SessionState::Connecting;
        self.closed_by_user = false;
        self.progress = 0.0;
        self.candidates_tried += 1;
    }

    fn invalid(&self, action: &'static str) -> SessionError {
        SessionError::InvalidTransition {
            from: self.state,
            action,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::PlaybackError;
    use crate::source::SourceResolver;

    fn session(count: usize) -> PlaybackSession {
        let locators: Vec<String> = (0..count)
            .map(|i| format!("magnet:?xt=urn:btih:{i:040x}"))
            .collect();
        let resolution = SourceResolver::default()
            .resolve(&locators[0], &locators[1..])
            .unwrap();
        PlaybackSession::new(resolution.candidates)
    }

    fn record(session: &PlaybackSession) -> ErrorRecord {
        ErrorRecord::new(
            &PlaybackError::Connection {
                reason: "no peers".to_string(),
            },
            session.current_index(),
            session.current_candidate(),
        )
    }

    #[test]
    fn test_happy_path_transitions() {
        let mut session = session(1);
        assert_eq!(session.state(), SessionState::Idle);

        session.start().unwrap();
        assert_eq!(session.state(), SessionState::Connecting);
        session.mark_ready().unwrap();
        session.mark_playing().unwrap();

        assert_eq!(session.state(), SessionState::Playing);
        assert_eq!(session.retry_count(), 0);
    }

    #[test]
    fn test_invalid_transitions_rejected() {
        let mut session = session(1);

        assert!(matches!(
            session.mark_ready(),
            Err(SessionError::InvalidTransition {
                from: SessionState::Idle,
                ..
            })
        ));
        assert!(session.retry().is_err());

        session.start().unwrap();
        assert!(session.start().is_err());
        assert!(session.mark_playing().is_err());
    }

    #[test]
    fn test_failover_advances_until_last_candidate() {
        let mut session = session(3);
        session.start().unwrap();

        for expected in 1..3 {
            let error = record(&session);
            session.fail(error);
            assert_eq!(session.advance(), Some(expected));
            assert_eq!(session.state(), SessionState::Connecting);
        }

        let error = record(&session);
        session.fail(error);
        assert_eq!(session.advance(), None);
        session.give_up();

        assert_eq!(session.state(), SessionState::Terminated);
        assert_eq!(session.retry_count(), 2);
        assert_eq!(session.candidates_tried(), 3);
        assert_eq!(session.last_error().map(|e| e.candidate_index), Some(2));
    }

    #[test]
    fn test_advance_requires_failed_state() {
        let mut session = session(2);
        session.start().unwrap();
        assert_eq!(session.advance(), None);
        assert_eq!(session.current_index(), 0);
    }

    #[test]
    fn test_retry_after_exhaustion_restarts_from_first_candidate() {
        let mut session = session(2);
        session.start().unwrap();
        let error = record(&session);
        session.fail(error);
        session.advance();
        let error = record(&session);
        session.fail(error);
        session.give_up();

        session.retry().unwrap();

        assert_eq!(session.current_index(), 0);
        assert_eq!(session.state(), SessionState::Connecting);
        assert_eq!(session.retry_count(), 2);
        assert_eq!(session.progress(), 0.0);
    }

    #[test]
    fn test_close_is_recorded_until_next_attempt() {
        let mut session = session(1);
        session.start().unwrap();
        let error = record(&session);
        session.fail(error);
        session.give_up();
        assert!(!session.closed_by_user());

        session.close();
        assert!(session.closed_by_user());

        session.retry().unwrap();
        assert!(!session.closed_by_user());
    }

    #[test]
    fn test_retry_before_last_candidate_keeps_index() {
        let mut session = session(3);
        session.start().unwrap();
        session.close();

        session.retry().unwrap();

        assert_eq!(session.current_index(), 0);
        assert_eq!(session.retry_count(), 1);

        let error = record(&session);
        session.fail(error);
        session.advance();
        session.close();
        session.retry().unwrap();
        assert_eq!(session.current_index(), 1);
    }

    #[test]
    fn test_progress_is_monotonic_and_reset_per_attempt() {
        let mut session = session(2);
        assert_eq!(session.raise_progress(10.0), None);

        session.start().unwrap();
        assert_eq!(session.raise_progress(10.0), Some(10.0));
        assert_eq!(session.raise_progress(5.0), Some(10.0));
        assert_eq!(session.raise_progress(150.0), Some(100.0));

        let error = record(&session);
        session.fail(error);
        assert_eq!(session.raise_progress(50.0), None);
        session.advance();
        assert_eq!(session.progress(), 0.0);
    }
}

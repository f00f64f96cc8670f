//! Failover policy: strictly sequential, each candidate tried once per pass.

use super::errors::{ErrorRecord, PlaybackError};
use super::state::PlaybackSession;

/// What to do after an attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailoverDecision {
    Advance { next_index: usize },
    GiveUp,
}

/// Decides between the next candidate and giving up.
///
/// Stateless: everything it needs lives on the session.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailoverController;

impl FailoverController {
    pub fn new() -> Self {
        Self
    }

    /// Attributes `error` to the current candidate and fails the session.
    ///
    /// The caller must already have torn the attempt down.
    pub fn on_attempt_failed(
        &self,
        session: &mut PlaybackSession,
        error: &PlaybackError,
    ) -> FailoverDecision {
        let failed_index = session.current_index();
        let record = ErrorRecord::new(error, failed_index, session.current_candidate());
        tracing::warn!(
            "Candidate {} of {} failed: {}",
            failed_index + 1,
            session.candidates().len(),
            error
        );
        session.fail(record);

        if session.has_next_candidate() {
            FailoverDecision::Advance {
                next_index: failed_index + 1,
            }
        } else {
            FailoverDecision::GiveUp
        }
    }

    /// Moves the session according to `decision`.
    pub fn apply(&self, session: &mut PlaybackSession, decision: FailoverDecision) {
        match decision {
            FailoverDecision::Advance { .. } => {
                if let Some(index) = session.advance() {
                    tracing::info!(
                        "Trying alternative source {} of {}: {}",
                        index + 1,
                        session.candidates().len(),
                        session.current_candidate().label()
                    );
                }
            }
            FailoverDecision::GiveUp => {
                tracing::error!(
                    "All {} source(s) failed, giving up",
                    session.candidates().len()
                );
                session.give_up();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionState;
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

    #[test]
    fn test_advances_then_gives_up() {
        let controller = FailoverController::new();
        let mut session = session(2);
        session.start().unwrap();
        let error = PlaybackError::Connection {
            reason: "no peers".to_string(),
        };

        let decision = controller.on_attempt_failed(&mut session, &error);
        assert_eq!(decision, FailoverDecision::Advance { next_index: 1 });
        assert_eq!(session.state(), SessionState::Failed);

        controller.apply(&mut session, decision);
        assert_eq!(session.state(), SessionState::Connecting);
        assert_eq!(session.current_index(), 1);
        assert_eq!(session.retry_count(), 1);

        let decision = controller.on_attempt_failed(&mut session, &error);
        assert_eq!(decision, FailoverDecision::GiveUp);
        controller.apply(&mut session, decision);

        assert_eq!(session.state(), SessionState::Terminated);
        assert_eq!(session.retry_count(), 1);
    }

    #[test]
    fn test_error_attributed_to_failing_candidate() {
        let controller = FailoverController::new();
        let mut session = session(3);
        session.start().unwrap();

        let decision = controller.on_attempt_failed(
            &mut session,
            &PlaybackError::NoPlayableFile { file_count: 2 },
        );
        controller.apply(&mut session, decision);

        let record = session.last_error().unwrap();
        assert_eq!(record.candidate_index, 0);
        assert_eq!(record.kind, crate::session::ErrorKind::NoPlayableFile);
        assert_eq!(record.locator, session.candidates()[0].raw_locator());
    }

    #[test]
    fn test_single_candidate_gives_up_immediately() {
        let controller = FailoverController::new();
        let mut session = session(1);
        session.start().unwrap();

        let decision = controller.on_attempt_failed(
            &mut session,
            &PlaybackError::EngineFatal {
                reason: "boom".to_string(),
            },
        );

        assert_eq!(decision, FailoverDecision::GiveUp);
        assert_eq!(session.retry_count(), 0);
    }
}

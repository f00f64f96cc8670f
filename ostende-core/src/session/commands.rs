//! Command definitions for the playback session actor.

use tokio::sync::oneshot;

use super::errors::SessionError;
use super::snapshot::SessionSnapshot;

/// Commands a `PlaybackHandle` sends to its session actor.
pub enum SessionCommand {
    /// Tear the live attempt down and terminate the session.
    Close {
        responder: oneshot::Sender<SessionSnapshot>,
    },
    /// Start again from the current or first candidate.
    Retry {
        responder: oneshot::Sender<Result<SessionSnapshot, SessionError>>,
    },
    /// Current snapshot, read on the actor.
    Snapshot {
        responder: oneshot::Sender<SessionSnapshot>,
    },
    /// Close and stop the actor.
    Shutdown { responder: oneshot::Sender<()> },
}

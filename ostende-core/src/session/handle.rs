//! Handle for communicating with a playback session actor.

use tokio::sync::{broadcast, mpsc, oneshot, watch};

use super::commands::SessionCommand;
use super::errors::SessionError;
use super::snapshot::{SessionEvent, SessionSnapshot};

/// Cloneable front of one playback session.
///
/// Every operation runs on the session actor in arrival order. Dropping the
/// last handle tears the session down: the live engine instance is destroyed
/// and the actor stops.
#[derive(Clone)]
pub struct PlaybackHandle {
    sender: mpsc::Sender<SessionCommand>,
    state: watch::Receiver<SessionSnapshot>,
    events: broadcast::Sender<SessionEvent>,
}

impl PlaybackHandle {
    pub(crate) fn new(
        sender: mpsc::Sender<SessionCommand>,
        state: watch::Receiver<SessionSnapshot>,
        events: broadcast::Sender<SessionEvent>,
    ) -> Self {
        Self {
            sender,
            state,
            events,
        }
    }

    /// Closes the player: unsubscribes, destroys the engine instance and
    /// enters `Terminated`. Closing twice is harmless.
    ///
    /// # Errors
    /// - `SessionError::SessionClosed` - The actor has stopped
    pub async fn close(&self) -> Result<SessionSnapshot, SessionError> {
        let (responder, rx) = oneshot::channel();
        self.send(SessionCommand::Close { responder }).await?;
        rx.await.map_err(|_| SessionError::SessionClosed)
    }

    /// Explicit user retry after a failure or close.
    ///
    /// Resolves once the session is connecting again; the new attempt starts
    /// right after.
    ///
    /// # Errors
    /// - `SessionError::SessionClosed` - The actor has stopped
    /// - `SessionError::InvalidTransition` - The session never started
    pub async fn retry(&self) -> Result<SessionSnapshot, SessionError> {
        let (responder, rx) = oneshot::channel();
        self.send(SessionCommand::Retry { responder }).await?;
        rx.await.map_err(|_| SessionError::SessionClosed)?
    }

    /// Snapshot taken on the actor, after every earlier command was handled.
    ///
    /// # Errors
    /// - `SessionError::SessionClosed` - The actor has stopped
    pub async fn snapshot(&self) -> Result<SessionSnapshot, SessionError> {
        let (responder, rx) = oneshot::channel();
        self.send(SessionCommand::Snapshot { responder }).await?;
        rx.await.map_err(|_| SessionError::SessionClosed)
    }

    /// Last published snapshot, without a round trip.
    pub fn current_snapshot(&self) -> SessionSnapshot {
        self.state.borrow().clone()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<SessionSnapshot> {
        self.state.clone()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Waits until a published snapshot satisfies `predicate`.
    ///
    /// # Errors
    /// - `SessionError::SessionClosed` - The actor stopped first
    pub async fn wait_for<F>(&self, mut predicate: F) -> Result<SessionSnapshot, SessionError>
    where
        F: FnMut(&SessionSnapshot) -> bool,
    {
        let mut state = self.state.clone();
        let snapshot = state
            .wait_for(|snapshot| predicate(snapshot))
            .await
            .map_err(|_| SessionError::SessionClosed)?;
        Ok(snapshot.clone())
    }

    /// Closes the session and stops the actor.
    ///
    /// # Errors
    /// - `SessionError::SessionClosed` - The actor had already stopped
    pub async fn shutdown(&self) -> Result<(), SessionError> {
        let (responder, rx) = oneshot::channel();
        self.send(SessionCommand::Shutdown { responder }).await?;
        rx.await.map_err(|_| SessionError::SessionClosed)
    }

    pub fn is_running(&self) -> bool {
        !self.sender.is_closed()
    }

    async fn send(&self, command: SessionCommand) -> Result<(), SessionError> {
        self.sender
            .send(command)
            .await
            .map_err(|_| SessionError::SessionClosed)
    }
}

impl std::fmt::Debug for PlaybackHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackHandle")
            .field("running", &self.is_running())
            .field("state", &self.state.borrow().state)
            .finish()
    }
}

//! Player: the owner of every session's engine slot.

use std::sync::Arc;

use parking_lot::Mutex;

use super::actor::spawn_session;
use super::errors::SessionError;
use super::handle::PlaybackHandle;
use crate::config::OstendeConfig;
use crate::engine::{EngineFactory, EngineSlot};
use crate::render::RenderTarget;
use crate::source::{CandidateList, PlaybackRequest, SourceError, SourceResolver};

/// Starts playback sessions that share one engine slot.
///
/// However many sessions are open, at most one of them holds a live engine
/// instance. A session whose attempt needs an engine while another session
/// still holds one stays `Connecting` until that instance is destroyed.
///
/// The player keeps a handle to the most recently started session for
/// `switch_to`, so that session outlives its callers' handles until it is
/// closed, switched away from, or the player is dropped.
///
/// # Examples
/// ```rust,no_run
/// # use std::sync::Arc;
/// # use ostende_core::engine::EngineFactory;
/// # use ostende_core::render::RenderTarget;
/// # async fn example(factory: Arc<dyn EngineFactory>, target: Box<dyn RenderTarget>) {
/// use ostende_core::config::OstendeConfig;
/// use ostende_core::session::Player;
/// use ostende_core::source::PlaybackRequest;
///
/// let player = Player::new(OstendeConfig::default(), factory);
/// let request =
///     PlaybackRequest::new("magnet:?xt=urn:btih:0123456789abcdef0123456789abcdef01234567");
/// let (handle, _rejected) = player.switch_to(&request, target).await.unwrap();
/// let playing = handle.wait_for(|s| s.state.is_active()).await;
/// # }
/// ```
#[derive(Clone)]
pub struct Player {
    config: OstendeConfig,
    factory: Arc<dyn EngineFactory>,
    slot: EngineSlot,
    current: Arc<Mutex<Option<PlaybackHandle>>>,
}

impl Player {
    pub fn new(config: OstendeConfig, factory: Arc<dyn EngineFactory>) -> Self {
        Self {
            config,
            factory,
            slot: EngineSlot::new(),
            current: Arc::new(Mutex::new(None)),
        }
    }

    pub fn config(&self) -> &OstendeConfig {
        &self.config
    }

    /// Whether some session currently holds a live engine instance.
    pub fn engine_in_use(&self) -> bool {
        !self.slot.is_free()
    }

    /// Spawns a session for an already resolved candidate list.
    ///
    /// The session starts on candidate 0 as soon as its actor runs. Subscribe
    /// to events before the first await to observe the initial transitions.
    pub fn spawn_session(
        &self,
        candidates: CandidateList,
        target: Box<dyn RenderTarget>,
    ) -> PlaybackHandle {
        let handle = spawn_session(
            &self.config,
            candidates,
            Arc::clone(&self.factory),
            self.slot.clone(),
            target,
        );
        *self.current.lock() = Some(handle.clone());
        handle
    }

    /// Resolves `request` and spawns a session for the surviving candidates.
    ///
    /// Sessions already running are left alone. Returns the handle along
    /// with the locators that were dropped as invalid.
    ///
    /// # Errors
    /// - `SessionError::Source` - No locator in the request was usable
    pub fn start_playback(
        &self,
        request: &PlaybackRequest,
        target: Box<dyn RenderTarget>,
    ) -> Result<(PlaybackHandle, Vec<SourceError>), SessionError> {
        let resolution = SourceResolver::new(self.config.sources.clone()).resolve_request(request)?;
        tracing::info!(
            "Starting playback with {} candidate(s)",
            resolution.candidates.len()
        );
        let handle = self.spawn_session(resolution.candidates, target);
        Ok((handle, resolution.rejected))
    }

    /// Closes the most recently started session, then starts `request`.
    ///
    /// An unusable request leaves the current session playing.
    ///
    /// # Errors
    /// - `SessionError::Source` - No locator in the request was usable
    pub async fn switch_to(
        &self,
        request: &PlaybackRequest,
        target: Box<dyn RenderTarget>,
    ) -> Result<(PlaybackHandle, Vec<SourceError>), SessionError> {
        let resolution = SourceResolver::new(self.config.sources.clone()).resolve_request(request)?;

        let previous = self.current.lock().take();
        if let Some(previous) = previous {
            match previous.close().await {
                Ok(snapshot) => {
                    tracing::info!("Closed session {} to switch source", snapshot.session_id)
                }
                Err(e) => tracing::debug!("Previous session already gone: {}", e),
            }
        }

        tracing::info!(
            "Switching playback to {} candidate(s)",
            resolution.candidates.len()
        );
        let handle = self.spawn_session(resolution.candidates, target);
        Ok((handle, resolution.rejected))
    }
}

impl std::fmt::Debug for Player {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Player")
            .field("engine_in_use", &self.engine_in_use())
            .field("has_session", &self.current.lock().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_mocks::{MockEngineFactory, MockRenderTarget};
    use crate::session::SessionState;

    const HASH_A: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
    const HASH_B: &str = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";

    fn request(hash: &str) -> PlaybackRequest {
        PlaybackRequest::new(format!("magnet:?xt=urn:btih:{hash}"))
    }

    fn player(factory: &MockEngineFactory) -> Player {
        Player::new(OstendeConfig::for_testing(), Arc::new(factory.clone()))
    }

    #[tokio::test]
    async fn test_no_valid_locator_refused() {
        let result = player(&MockEngineFactory::new()).start_playback(
            &PlaybackRequest::new("not a locator").with_fallbacks(["   "]),
            Box::new(MockRenderTarget::new()),
        );

        assert!(matches!(
            result,
            Err(SessionError::Source(SourceError::NoCandidates { rejected: 2 }))
        ));
    }

    #[tokio::test]
    async fn test_switch_closes_previous_session_first() {
        let factory = MockEngineFactory::new();
        let player = player(&factory);

        let (first, _) = player
            .switch_to(&request(HASH_A), Box::new(MockRenderTarget::new()))
            .await
            .unwrap();
        first
            .wait_for(|s| s.state == SessionState::Playing)
            .await
            .unwrap();
        assert!(player.engine_in_use());

        let (second, _) = player
            .switch_to(&request(HASH_B), Box::new(MockRenderTarget::new()))
            .await
            .unwrap();
        second
            .wait_for(|s| s.state == SessionState::Playing)
            .await
            .unwrap();

        let closed = first.current_snapshot();
        assert_eq!(closed.state, SessionState::Terminated);
        assert!(closed.closed_by_user);
        assert_eq!(factory.created_count(), 2);
        assert_eq!(factory.destroy_count(), 1);
        assert_eq!(factory.overlap_violations(), 0);
    }

    #[tokio::test]
    async fn test_unusable_switch_keeps_current_session() {
        let factory = MockEngineFactory::new();
        let player = player(&factory);

        let (current, _) = player
            .start_playback(&request(HASH_A), Box::new(MockRenderTarget::new()))
            .unwrap();
        current
            .wait_for(|s| s.state == SessionState::Playing)
            .await
            .unwrap();

        let result = player
            .switch_to(&PlaybackRequest::new(""), Box::new(MockRenderTarget::new()))
            .await;

        assert!(matches!(result, Err(SessionError::Source(_))));
        assert_eq!(current.current_snapshot().state, SessionState::Playing);
        assert_eq!(factory.destroy_count(), 0);
    }
}

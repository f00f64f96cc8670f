//! Engine lifecycle: one transfer engine instance per attempt, never two.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use super::events::{Subscription, next_attempt_event};
use super::media::find_playable_file;
use super::{AddOptions, AttemptEvent, ContentFile, EngineFactory, TransferEngine};
use crate::config::EngineConfig;
use crate::render::RenderTarget;
use crate::session::PlaybackError;
use crate::source::SourceDescriptor;

/// The right to hold a live engine instance, shared by every session of one
/// player.
///
/// A single permit backs the slot. A lifecycle manager takes it before
/// creating an instance and gives it back only once that instance's
/// `destroy` resolved, so sessions sharing a slot never overlap.
#[derive(Debug, Clone)]
pub struct EngineSlot {
    permits: Arc<Semaphore>,
}

impl EngineSlot {
    pub fn new() -> Self {
        Self {
            permits: Arc::new(Semaphore::new(1)),
        }
    }

    /// Whether no manager holds a live instance right now.
    pub fn is_free(&self) -> bool {
        self.permits.available_permits() > 0
    }

    async fn acquire(&self) -> Result<OwnedSemaphorePermit, PlaybackError> {
        Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| PlaybackError::EngineInstantiation {
                reason: "engine slot closed".to_string(),
            })
    }
}

impl Default for EngineSlot {
    fn default() -> Self {
        Self::new()
    }
}

/// Exclusive owner of the session's transfer engine instance.
///
/// Creation of a new instance always waits for the previous instance's
/// `destroy` to resolve, including an instance held by another manager on
/// the same `EngineSlot`. The previous subscription is dropped before
/// `destroy` is even requested, so late events from a dying instance never
/// reach the session.
///
/// `start_attempt` may be abandoned at any await point. An instance created
/// before that stays owned here and the next `stop_attempt` destroys it.
pub struct EngineLifecycleManager {
    factory: Arc<dyn EngineFactory>,
    slot: EngineSlot,
    config: EngineConfig,
    trackers: Vec<String>,
    playable_extensions: Vec<String>,
    engine: Option<Box<dyn TransferEngine>>,
    permit: Option<OwnedSemaphorePermit>,
    subscription: Option<Subscription>,
    attempts_started: u64,
}

impl EngineLifecycleManager {
    pub fn new(
        factory: Arc<dyn EngineFactory>,
        slot: EngineSlot,
        config: EngineConfig,
        trackers: Vec<String>,
        playable_extensions: Vec<String>,
    ) -> Self {
        Self {
            factory,
            slot,
            config,
            trackers,
            playable_extensions,
            engine: None,
            permit: None,
            subscription: None,
            attempts_started: 0,
        }
    }

    /// Tears down any live instance, waits for the engine slot, then creates
    /// and feeds a new instance.
    ///
    /// On error the freshly created instance stays owned so the caller's
    /// `stop_attempt` destroys it.
    ///
    /// # Errors
    /// - `PlaybackError::EngineInstantiation` - The factory refused to create an instance
    /// - `PlaybackError::Connection` - The engine refused the locator
    /// - `PlaybackError::EngineFatal` - The engine failed while adding
    pub async fn start_attempt(
        &mut self,
        descriptor: &SourceDescriptor,
    ) -> Result<(), PlaybackError> {
        self.stop_attempt().await;

        self.attempts_started += 1;
        let attempt = self.attempts_started;
        tracing::info!(
            "Attempt {} starting for {} source {}",
            attempt,
            descriptor.kind(),
            descriptor.label()
        );

        if !self.slot.is_free() {
            tracing::info!("Waiting for another session to release its engine instance");
        }
        let permit = self.slot.acquire().await?;

        let engine = self.factory.create(&self.config).await.map_err(|fault| {
            PlaybackError::EngineInstantiation {
                reason: fault.message,
            }
        })?;
        self.permit = Some(permit);
        let engine = self.engine.insert(engine);
        tracing::debug!(
            "Engine instance created: {} relay server(s), max {} peers, {} strategy",
            self.config.relay_servers.len(),
            self.config.max_peer_connections,
            self.config.piece_strategy
        );

        let (subscription, sink) = Subscription::open();
        self.subscription = Some(subscription);

        let options = AddOptions {
            announce: self.trackers.clone(),
            max_peer_connections: self.config.max_peer_connections,
            strategy: self.config.piece_strategy,
        };

        tracing::debug!("Adding locator: {}", descriptor.enhanced_locator());
        engine
            .add(descriptor.enhanced_locator(), options, sink)
            .await
            .map_err(PlaybackError::from)
    }

    /// Unsubscribes and destroys the live instance, if any.
    ///
    /// Idempotent. Returns true when an instance was actually destroyed.
    pub async fn stop_attempt(&mut self) -> bool {
        // Unsubscribe first: nothing the dying instance emits is delivered.
        self.subscription = None;

        let Some(engine) = self.engine.as_mut() else {
            return false;
        };

        tracing::debug!("Destroying engine instance of attempt {}", self.attempts_started);
        if let Err(fault) = engine.destroy().await {
            tracing::warn!("Error destroying engine instance: {}", fault);
        }
        // Released only after destroy resolved.
        self.engine = None;
        self.permit = None;
        tracing::debug!("Engine instance destroyed");
        true
    }

    /// Picks the file to play from a `Ready` listing.
    ///
    /// # Errors
    /// - `PlaybackError::NoPlayableFile` - No file has an allowed extension
    pub fn select_playable(&self, files: &[ContentFile]) -> Result<ContentFile, PlaybackError> {
        match find_playable_file(files, &self.playable_extensions) {
            Some(file) => {
                tracing::info!("Selected playable file {} ({} bytes)", file.name, file.length);
                Ok(file.clone())
            }
            None => {
                tracing::warn!("No playable file among {} file(s)", files.len());
                Err(PlaybackError::NoPlayableFile {
                    file_count: files.len(),
                })
            }
        }
    }

    /// Opens `file` on the live instance and attaches it to `target`.
    ///
    /// Completion arrives later as an `AttemptEvent::RenderFinished`.
    ///
    /// # Errors
    /// - `PlaybackError::Render` - No live instance or the file cannot be opened
    pub fn render_into(
        &mut self,
        file: &ContentFile,
        target: &mut dyn RenderTarget,
    ) -> Result<(), PlaybackError> {
        let (Some(engine), Some(subscription)) = (self.engine.as_mut(), self.subscription.as_ref())
        else {
            return Err(PlaybackError::Render {
                reason: "no live engine instance".to_string(),
            });
        };

        let playable = engine.open_file(file).map_err(|fault| PlaybackError::Render {
            reason: fault.message,
        })?;

        tracing::debug!("Rendering {} as {}", file.name, playable.format().mime_type());
        target.attach(playable, subscription.render_signals());
        Ok(())
    }

    /// Next event of the live attempt; pending while there is none.
    pub async fn next_event(&mut self) -> AttemptEvent {
        next_attempt_event(self.subscription.as_mut()).await
    }

    pub fn is_engine_alive(&self) -> bool {
        self.engine.is_some()
    }

    pub fn attempts_started(&self) -> u64 {
        self.attempts_started
    }
}

impl std::fmt::Debug for EngineLifecycleManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineLifecycleManager")
            .field("config", &self.config)
            .field("engine_alive", &self.engine.is_some())
            .field("subscribed", &self.subscription.is_some())
            .field("attempts_started", &self.attempts_started)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::config::OstendeConfig;
    use crate::engine::test_mocks::{
        LifecycleEntry, MockEngineFactory, MockOutcome, MockRenderTarget,
    };
    use crate::engine::{EngineEvent, FaultKind};
    use crate::source::SourceResolver;

    fn manager(factory: &MockEngineFactory) -> EngineLifecycleManager {
        manager_on(factory, &EngineSlot::new())
    }

    fn manager_on(factory: &MockEngineFactory, slot: &EngineSlot) -> EngineLifecycleManager {
        let config = OstendeConfig::for_testing();
        EngineLifecycleManager::new(
            Arc::new(factory.clone()),
            slot.clone(),
            config.engine,
            config.sources.trackers,
            config.playback.playable_extensions,
        )
    }

    fn descriptor(locator: &str) -> SourceDescriptor {
        SourceResolver::default().describe(locator).unwrap()
    }

    #[tokio::test]
    async fn test_start_attempt_configures_engine() {
        let factory = MockEngineFactory::new();
        let mut manager = manager(&factory);

        manager
            .start_attempt(&descriptor("magnet:?xt=urn:btih:aaaa"))
            .await
            .unwrap();

        assert!(manager.is_engine_alive());
        let config = factory.last_config().unwrap();
        assert_eq!(config.max_peer_connections, 4);
        assert_eq!(config.relay_servers, vec!["stun:stun.test:3478"]);

        let options = factory.last_add_options().unwrap();
        assert_eq!(options.announce, vec!["wss://tracker.test/announce"]);
        assert_eq!(options.strategy, crate::config::PieceStrategy::Rarest);
    }

    #[tokio::test]
    async fn test_new_instance_created_only_after_destroy_confirmed() {
        let factory = MockEngineFactory::new().with_destroy_delay(Duration::from_millis(20));
        let mut manager = manager(&factory);

        manager
            .start_attempt(&descriptor("magnet:?xt=urn:btih:aaaa"))
            .await
            .unwrap();
        manager
            .start_attempt(&descriptor("magnet:?xt=urn:btih:bbbb"))
            .await
            .unwrap();

        assert_eq!(factory.overlap_violations(), 0);
        let log = factory.lifecycle_log();
        assert_eq!(
            log,
            vec![
                LifecycleEntry::Created { engine: 1 },
                LifecycleEntry::Added { engine: 1 },
                LifecycleEntry::DestroyRequested { engine: 1 },
                LifecycleEntry::DestroyConfirmed { engine: 1 },
                LifecycleEntry::Created { engine: 2 },
                LifecycleEntry::Added { engine: 2 },
            ]
        );
    }

    #[tokio::test]
    async fn test_shared_slot_waits_for_other_manager_destroy() {
        let factory = MockEngineFactory::new().with_destroy_delay(Duration::from_millis(20));
        let slot = EngineSlot::new();
        let mut first = manager_on(&factory, &slot);
        let mut second = manager_on(&factory, &slot);

        first
            .start_attempt(&descriptor("magnet:?xt=urn:btih:aaaa"))
            .await
            .unwrap();
        assert!(!slot.is_free());

        let waiting = tokio::spawn(async move {
            let result = second
                .start_attempt(&descriptor("magnet:?xt=urn:btih:bbbb"))
                .await;
            (second, result)
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(factory.created_count(), 1);
        assert!(!waiting.is_finished());

        first.stop_attempt().await;
        let (second, result) = tokio::time::timeout(Duration::from_secs(5), waiting)
            .await
            .unwrap()
            .unwrap();

        result.unwrap();
        assert!(second.is_engine_alive());
        assert_eq!(factory.created_count(), 2);
        assert_eq!(factory.overlap_violations(), 0);
    }

    #[tokio::test]
    async fn test_abandoned_attempt_frees_slot() {
        let factory = MockEngineFactory::new().with_create_delay(Duration::from_secs(30));
        let slot = EngineSlot::new();
        let mut manager = manager_on(&factory, &slot);

        let abandoned = tokio::time::timeout(
            Duration::from_millis(20),
            manager.start_attempt(&descriptor("magnet:?xt=urn:btih:aaaa")),
        )
        .await;

        assert!(abandoned.is_err());
        assert!(!manager.is_engine_alive());
        assert!(slot.is_free());
        assert_eq!(factory.alive(), 0);
        assert!(!manager.stop_attempt().await);
    }

    #[tokio::test]
    async fn test_stop_attempt_is_idempotent() {
        let factory = MockEngineFactory::new();
        let mut manager = manager(&factory);

        manager
            .start_attempt(&descriptor("magnet:?xt=urn:btih:aaaa"))
            .await
            .unwrap();

        assert!(manager.stop_attempt().await);
        assert!(!manager.stop_attempt().await);
        assert!(!manager.stop_attempt().await);
        assert!(manager.slot.is_free());
        assert_eq!(factory.destroy_count(), 1);
        assert!(!manager.is_engine_alive());
    }

    #[tokio::test]
    async fn test_events_stop_after_unsubscribe() {
        let factory = MockEngineFactory::new().with_default_outcome(MockOutcome::Silent);
        let mut manager = manager(&factory);

        manager
            .start_attempt(&descriptor("magnet:?xt=urn:btih:aaaa"))
            .await
            .unwrap();
        let sink = factory.last_sink().unwrap();
        assert!(sink.download(0.1));
        assert_eq!(
            manager.next_event().await,
            AttemptEvent::Engine(EngineEvent::Download { progress: 0.1 })
        );

        manager.stop_attempt().await;
        assert!(!sink.download(0.2));
        assert!(!sink.is_subscribed());
    }

    #[tokio::test]
    async fn test_instantiation_failure_leaves_no_engine() {
        let factory = MockEngineFactory::new();
        factory.fail_next_create("out of memory");
        let mut manager = manager(&factory);

        let result = manager
            .start_attempt(&descriptor("magnet:?xt=urn:btih:aaaa"))
            .await;

        assert!(matches!(
            result,
            Err(PlaybackError::EngineInstantiation { .. })
        ));
        assert!(!manager.is_engine_alive());
        assert!(!manager.stop_attempt().await);
    }

    #[tokio::test]
    async fn test_add_failure_keeps_engine_for_teardown() {
        let factory = MockEngineFactory::new().with_default_outcome(MockOutcome::AddFailure(
            FaultKind::Connection,
            "bad locator".into(),
        ));
        let mut manager = manager(&factory);

        let result = manager
            .start_attempt(&descriptor("magnet:?xt=urn:btih:aaaa"))
            .await;

        assert!(matches!(result, Err(PlaybackError::Connection { .. })));
        assert!(manager.is_engine_alive());
        assert!(manager.stop_attempt().await);
        assert_eq!(factory.destroy_count(), 1);
    }

    #[tokio::test]
    async fn test_select_and_render_playable_file() {
        let factory = MockEngineFactory::new().with_default_outcome(MockOutcome::Silent);
        let mut manager = manager(&factory);
        let target = MockRenderTarget::new();
        let mut attached = target.clone();

        manager
            .start_attempt(&descriptor("magnet:?xt=urn:btih:aaaa"))
            .await
            .unwrap();

        let files = vec![
            ContentFile {
                index: 0,
                name: "poster.jpg".to_string(),
                length: 10,
            },
            ContentFile {
                index: 1,
                name: "movie.mkv".to_string(),
                length: 4096,
            },
        ];
        let file = manager.select_playable(&files).unwrap();
        assert_eq!(file.name, "movie.mkv");

        manager.render_into(&file, &mut attached).unwrap();
        assert_eq!(target.attached().as_deref(), Some("movie.mkv"));
        assert_eq!(
            manager.next_event().await,
            AttemptEvent::RenderFinished(Ok(()))
        );
        assert_eq!(manager.next_event().await, AttemptEvent::FirstOutput);

        assert!(matches!(
            manager.select_playable(&files[..1]),
            Err(PlaybackError::NoPlayableFile { file_count: 1 })
        ));
    }

    #[tokio::test]
    async fn test_render_without_engine_fails() {
        let factory = MockEngineFactory::new();
        let mut manager = manager(&factory);
        let mut target = MockRenderTarget::new();
        let file = ContentFile {
            index: 0,
            name: "movie.mp4".to_string(),
            length: 1,
        };

        assert!(matches!(
            manager.render_into(&file, &mut target),
            Err(PlaybackError::Render { .. })
        ));
    }
}

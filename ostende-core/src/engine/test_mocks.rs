//! Mock implementations for testing playback orchestration.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{
    AddOptions, ContentFile, EngineEventSink, EngineFactory, EngineFault, FaultKind,
    TransferEngine,
};
use crate::config::EngineConfig;
use crate::engine::RenderSignals;
use crate::render::{PlayableFile, RenderTarget};

/// What a mock engine does once content is added.
#[derive(Debug, Clone, PartialEq)]
pub enum MockOutcome {
    /// Emits the progress fractions, then `Ready` with these files
    Play {
        files: Vec<ContentFile>,
        progress: Vec<f64>,
    },
    /// `add` succeeds, then an error event of the given kind is emitted
    FailAfterAdd(FaultKind, String),
    /// `add` itself returns an error
    AddFailure(FaultKind, String),
    /// `add` succeeds and nothing is emitted; tests drive the sink
    Silent,
    /// `add` never resolves
    HangOnAdd,
}

impl MockOutcome {
    /// Plays a single `movie.mp4` after a little progress.
    pub fn playable() -> Self {
        MockOutcome::Play {
            files: vec![ContentFile {
                index: 0,
                name: "movie.mp4".to_string(),
                length: 700 * 1024 * 1024,
            }],
            progress: vec![0.05, 0.1],
        }
    }

    /// `Ready` with no file the session can play.
    pub fn no_playable_file() -> Self {
        MockOutcome::Play {
            files: vec![ContentFile {
                index: 0,
                name: "readme.txt".to_string(),
                length: 512,
            }],
            progress: Vec::new(),
        }
    }

    pub fn connection_failure(message: &str) -> Self {
        MockOutcome::FailAfterAdd(FaultKind::Connection, message.to_string())
    }
}

/// Instrumented lifecycle step of a mock engine instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEntry {
    Created { engine: u64 },
    Added { engine: u64 },
    DestroyRequested { engine: u64 },
    DestroyConfirmed { engine: u64 },
}

#[derive(Debug, Default)]
struct MockState {
    scripts: Mutex<HashMap<String, MockOutcome>>,
    log: Mutex<Vec<LifecycleEntry>>,
    sinks: Mutex<Vec<EngineEventSink>>,
    added_locators: Mutex<Vec<String>>,
    last_config: Mutex<Option<EngineConfig>>,
    last_options: Mutex<Option<AddOptions>>,
    create_failures: Mutex<Vec<String>>,
    next_engine: AtomicU64,
    alive: AtomicUsize,
    overlap_violations: AtomicUsize,
}

/// Scripted engine factory with an instrumented create/destroy log.
///
/// Outcomes are chosen per locator: the first script whose key is contained
/// in the added locator wins, otherwise the default outcome applies.
#[derive(Debug, Clone)]
pub struct MockEngineFactory {
    state: Arc<MockState>,
    default_outcome: MockOutcome,
    create_delay: Duration,
    destroy_delay: Duration,
}

impl MockEngineFactory {
    /// Creates a factory whose engines play `movie.mp4`.
    pub fn new() -> Self {
        Self {
            state: Arc::new(MockState::default()),
            default_outcome: MockOutcome::playable(),
            create_delay: Duration::ZERO,
            destroy_delay: Duration::ZERO,
        }
    }

    pub fn with_default_outcome(mut self, outcome: MockOutcome) -> Self {
        self.default_outcome = outcome;
        self
    }

    /// Makes every `create` take `delay` before the instance exists.
    pub fn with_create_delay(mut self, delay: Duration) -> Self {
        self.create_delay = delay;
        self
    }

    /// Makes every `destroy` take `delay` before confirming.
    pub fn with_destroy_delay(mut self, delay: Duration) -> Self {
        self.destroy_delay = delay;
        self
    }

    /// Scripts the outcome for locators containing `key`.
    pub fn script(&self, key: &str, outcome: MockOutcome) {
        self.state.scripts.lock().insert(key.to_string(), outcome);
    }

    /// The next `create` call fails with `message`.
    pub fn fail_next_create(&self, message: &str) {
        self.state.create_failures.lock().push(message.to_string());
    }

    pub fn lifecycle_log(&self) -> Vec<LifecycleEntry> {
        self.state.log.lock().clone()
    }

    pub fn created_count(&self) -> usize {
        self.count(|entry| matches!(entry, LifecycleEntry::Created { .. }))
    }

    /// Number of confirmed teardowns.
    pub fn destroy_count(&self) -> usize {
        self.count(|entry| matches!(entry, LifecycleEntry::DestroyConfirmed { .. }))
    }

    pub fn destroy_requests(&self) -> usize {
        self.count(|entry| matches!(entry, LifecycleEntry::DestroyRequested { .. }))
    }

    /// Instances currently alive (created and not yet confirmed destroyed).
    pub fn alive(&self) -> usize {
        self.state.alive.load(Ordering::SeqCst)
    }

    /// Creations that happened while another instance was still alive.
    pub fn overlap_violations(&self) -> usize {
        self.state.overlap_violations.load(Ordering::SeqCst)
    }

    /// Sink of the most recently added content, for late event injection.
    pub fn last_sink(&self) -> Option<EngineEventSink> {
        self.state.sinks.lock().last().cloned()
    }

    pub fn sinks(&self) -> Vec<EngineEventSink> {
        self.state.sinks.lock().clone()
    }

    pub fn added_locators(&self) -> Vec<String> {
        self.state.added_locators.lock().clone()
    }

    pub fn last_config(&self) -> Option<EngineConfig> {
        self.state.last_config.lock().clone()
    }

    pub fn last_add_options(&self) -> Option<AddOptions> {
        self.state.last_options.lock().clone()
    }

    fn count(&self, predicate: impl Fn(&LifecycleEntry) -> bool) -> usize {
        self.state.log.lock().iter().filter(|entry| predicate(entry)).count()
    }

    fn outcome_for(&self, locator: &str) -> MockOutcome {
        self.state
            .scripts
            .lock()
            .iter()
            .find(|(key, _)| locator.contains(key.as_str()))
            .map(|(_, outcome)| outcome.clone())
            .unwrap_or_else(|| self.default_outcome.clone())
    }
}

impl Default for MockEngineFactory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EngineFactory for MockEngineFactory {
    async fn create(&self, config: &EngineConfig) -> Result<Box<dyn TransferEngine>, EngineFault> {
        if !self.create_delay.is_zero() {
            tokio::time::sleep(self.create_delay).await;
        }

        if let Some(message) = self.state.create_failures.lock().pop() {
            return Err(EngineFault::fatal(message));
        }

        if self.state.alive.fetch_add(1, Ordering::SeqCst) > 0 {
            self.state.overlap_violations.fetch_add(1, Ordering::SeqCst);
        }

        let id = self.state.next_engine.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.log.lock().push(LifecycleEntry::Created { engine: id });
        *self.state.last_config.lock() = Some(config.clone());

        Ok(Box::new(MockEngine {
            id,
            factory: self.clone(),
            files: Vec::new(),
        }))
    }
}

/// Transfer engine instance produced by `MockEngineFactory`.
#[derive(Debug)]
pub struct MockEngine {
    id: u64,
    factory: MockEngineFactory,
    files: Vec<ContentFile>,
}

#[async_trait]
impl TransferEngine for MockEngine {
    async fn add(
        &mut self,
        locator: &str,
        options: AddOptions,
        events: EngineEventSink,
    ) -> Result<(), EngineFault> {
        let state = &self.factory.state;
        state.log.lock().push(LifecycleEntry::Added { engine: self.id });
        state.added_locators.lock().push(locator.to_string());
        *state.last_options.lock() = Some(options);
        state.sinks.lock().push(events.clone());

        match self.factory.outcome_for(locator) {
            MockOutcome::Play { files, progress } => {
                for fraction in progress {
                    events.download(fraction);
                }
                self.files = files.clone();
                events.ready(files);
                Ok(())
            }
            MockOutcome::FailAfterAdd(kind, message) => {
                events.error(EngineFault { kind, message });
                Ok(())
            }
            MockOutcome::AddFailure(kind, message) => Err(EngineFault { kind, message }),
            MockOutcome::Silent => Ok(()),
            MockOutcome::HangOnAdd => std::future::pending().await,
        }
    }

    fn open_file(&mut self, file: &ContentFile) -> Result<PlayableFile, EngineFault> {
        if !self.files.is_empty() && !self.files.contains(file) {
            return Err(EngineFault::fatal(format!("unknown file {}", file.name)));
        }
        Ok(PlayableFile::new(file.clone(), Box::new(tokio::io::empty())))
    }

    async fn destroy(&mut self) -> Result<(), EngineFault> {
        let state = &self.factory.state;
        state
            .log
            .lock()
            .push(LifecycleEntry::DestroyRequested { engine: self.id });

        if !self.factory.destroy_delay.is_zero() {
            tokio::time::sleep(self.factory.destroy_delay).await;
        }

        state.alive.fetch_sub(1, Ordering::SeqCst);
        state
            .log
            .lock()
            .push(LifecycleEntry::DestroyConfirmed { engine: self.id });
        Ok(())
    }
}

/// How a mock render target answers `attach`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderBehaviour {
    /// Render completes and first output follows immediately
    Play,
    /// Render completes but no output is ever produced
    Stall,
    /// Render fails with the message
    Fail(String),
}

#[derive(Debug, Default)]
struct RenderLog {
    attached: Option<String>,
    attach_count: usize,
    detach_count: usize,
    failing_files: Vec<(String, String)>,
    signals: Option<RenderSignals>,
}

/// Render target that records what was attached to it.
#[derive(Debug, Clone)]
pub struct MockRenderTarget {
    log: Arc<Mutex<RenderLog>>,
    behaviour: RenderBehaviour,
}

impl MockRenderTarget {
    pub fn new() -> Self {
        Self::with_behaviour(RenderBehaviour::Play)
    }

    pub fn with_behaviour(behaviour: RenderBehaviour) -> Self {
        Self {
            log: Arc::new(Mutex::new(RenderLog::default())),
            behaviour,
        }
    }

    /// Rendering a file with this exact name fails with `message`.
    pub fn fail_for(&self, file_name: &str, message: &str) {
        self.log
            .lock()
            .failing_files
            .push((file_name.to_string(), message.to_string()));
    }

    /// Name of the currently attached file.
    pub fn attached(&self) -> Option<String> {
        self.log.lock().attached.clone()
    }

    pub fn attach_count(&self) -> usize {
        self.log.lock().attach_count
    }

    pub fn detach_count(&self) -> usize {
        self.log.lock().detach_count
    }

    /// Signals of the last attach, to emit output later.
    pub fn last_signals(&self) -> Option<RenderSignals> {
        self.log.lock().signals.clone()
    }
}

impl Default for MockRenderTarget {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderTarget for MockRenderTarget {
    fn attach(&mut self, file: PlayableFile, signals: RenderSignals) {
        let mut log = self.log.lock();
        log.attached = Some(file.name().to_string());
        log.attach_count += 1;
        log.signals = Some(signals.clone());

        let scripted_failure = log
            .failing_files
            .iter()
            .find(|(name, _)| name == file.name())
            .map(|(_, message)| message.clone());
        drop(log);

        if let Some(message) = scripted_failure {
            signals.render_failed(message);
            return;
        }

        match &self.behaviour {
            RenderBehaviour::Play => {
                signals.rendered();
                signals.first_output();
            }
            RenderBehaviour::Stall => {
                signals.rendered();
            }
            RenderBehaviour::Fail(message) => {
                signals.render_failed(message.clone());
            }
        }
    }

    fn detach(&mut self) {
        let mut log = self.log.lock();
        if log.attached.take().is_some() {
            log.detach_count += 1;
        }
        log.signals = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{AttemptEvent, EngineEvent, Subscription};

    #[tokio::test]
    async fn test_mock_factory_scripts_by_locator() {
        let factory = MockEngineFactory::new();
        factory.script("bad", MockOutcome::connection_failure("no peers"));

        let mut engine = factory.create(&EngineConfig::default()).await.unwrap();
        let (mut subscription, sink) = Subscription::open();
        let options = AddOptions {
            announce: Vec::new(),
            max_peer_connections: 1,
            strategy: crate::config::PieceStrategy::Rarest,
        };
        engine
            .add("magnet:?xt=urn:btih:bad", options, sink)
            .await
            .unwrap();

        assert_eq!(
            subscription.recv().await,
            Some(AttemptEvent::Engine(EngineEvent::Error(
                EngineFault::connection("no peers")
            )))
        );
        engine.destroy().await.unwrap();
        assert_eq!(factory.alive(), 0);
    }

    #[tokio::test]
    async fn test_overlapping_instances_are_counted() {
        let factory = MockEngineFactory::new();

        let mut first = factory.create(&EngineConfig::default()).await.unwrap();
        let mut second = factory.create(&EngineConfig::default()).await.unwrap();

        assert_eq!(factory.overlap_violations(), 1);
        first.destroy().await.unwrap();
        second.destroy().await.unwrap();
        assert_eq!(factory.destroy_count(), 2);
    }

    #[test]
    fn test_render_target_detach_counts_only_attached_files() {
        let mut target = MockRenderTarget::new();
        target.detach();
        assert_eq!(target.detach_count(), 0);

        let (subscription, _sink) = Subscription::open();
        let file = ContentFile {
            index: 0,
            name: "movie.webm".to_string(),
            length: 1,
        };
        target.attach(
            PlayableFile::new(file, Box::new(tokio::io::empty())),
            subscription.render_signals(),
        );
        assert_eq!(target.attached().as_deref(), Some("movie.webm"));

        target.detach();
        assert_eq!(target.detach_count(), 1);
        assert!(target.attached().is_none());
    }
}

//! Transfer engine seam and its lifecycle management
//!
//! The peer-to-peer engine itself is an external collaborator. This module
//! defines the boundary it must implement and the manager that guarantees at
//! most one live instance per `EngineSlot`.

pub mod events;
pub mod lifecycle;
pub mod media;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_mocks;

use async_trait::async_trait;
use serde::Serialize;

pub use events::{AttemptEvent, EngineEvent, EngineEventSink, RenderSignals, Subscription};
pub use lifecycle::{EngineLifecycleManager, EngineSlot};
pub use media::{ContainerFormat, find_playable_file, is_playable};

use crate::config::{EngineConfig, PieceStrategy};
use crate::render::PlayableFile;

/// A file contained in retrieved content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentFile {
    /// Position in the engine's file listing
    pub index: usize,
    pub name: String,
    /// Size in bytes
    pub length: u64,
}

/// Options sent with `TransferEngine::add`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddOptions {
    /// Tracker announce URIs
    pub announce: Vec<String>,
    pub max_peer_connections: usize,
    pub strategy: PieceStrategy,
}

/// How bad an engine-reported failure is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FaultKind {
    /// No peers or metadata reachable for the content
    Connection,
    /// Instance-level failure
    Fatal,
}

/// Failure reported by a transfer engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind:?} fault: {message}")]
pub struct EngineFault {
    pub kind: FaultKind,
    pub message: String,
}

impl EngineFault {
    pub fn connection(message: impl Into<String>) -> Self {
        Self {
            kind: FaultKind::Connection,
            message: message.into(),
        }
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            kind: FaultKind::Fatal,
            message: message.into(),
        }
    }
}

/// One live transfer engine instance.
///
/// Implementations report content and instance events through the sink
/// given to `add` and must stop emitting once `destroy` resolves.
#[async_trait]
pub trait TransferEngine: Send {
    /// Adds content by locator and starts retrieving it.
    ///
    /// # Errors
    /// - `EngineFault` - The locator was refused or could not be fetched
    async fn add(
        &mut self,
        locator: &str,
        options: AddOptions,
        events: EngineEventSink,
    ) -> Result<(), EngineFault>;

    /// Opens a readable stream over a file listed by a `Ready` event.
    ///
    /// # Errors
    /// - `EngineFault` - The file index is unknown to the engine
    fn open_file(&mut self, file: &ContentFile) -> Result<PlayableFile, EngineFault>;

    /// Destroys the instance, resolving once teardown is complete.
    ///
    /// # Errors
    /// - `EngineFault` - Teardown reported a problem; the instance is gone regardless
    async fn destroy(&mut self) -> Result<(), EngineFault>;
}

/// Creates transfer engine instances.
#[async_trait]
pub trait EngineFactory: Send + Sync {
    /// # Errors
    /// - `EngineFault` - The engine could not be instantiated
    async fn create(&self, config: &EngineConfig) -> Result<Box<dyn TransferEngine>, EngineFault>;
}

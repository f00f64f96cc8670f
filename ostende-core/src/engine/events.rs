//! Event plumbing between a transfer engine instance and its session.
//!
//! Each attempt gets one unbounded channel. The engine writes through an
//! `EngineEventSink`, the render target through `RenderSignals`, and the
//! session reads the `Subscription`. Dropping the subscription unsubscribes
//! every producer at once: later sends fail and are discarded.

use tokio::sync::mpsc;

use super::{ContentFile, EngineFault};

/// Events a transfer engine emits for the content it was asked to add.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// Metadata is known and the contained files can be enumerated
    Ready { files: Vec<ContentFile> },
    /// Download progress as a fraction in `0.0..=1.0`
    Download { progress: f64 },
    /// Non-fatal condition, reported but never acted on
    Warning { message: String },
    /// Fatal to the current attempt
    Error(EngineFault),
}

/// Everything that can reach a session during one attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptEvent {
    Engine(EngineEvent),
    /// Render target finished attaching the file
    RenderFinished(Result<(), String>),
    /// Render target produced its first frame or first bytes
    FirstOutput,
}

/// Write side handed to the engine on `add`.
#[derive(Debug, Clone)]
pub struct EngineEventSink {
    sender: mpsc::UnboundedSender<AttemptEvent>,
}

impl EngineEventSink {
    /// Returns false once the session has unsubscribed.
    pub fn ready(&self, files: Vec<ContentFile>) -> bool {
        self.emit(EngineEvent::Ready { files })
    }

    pub fn download(&self, progress: f64) -> bool {
        self.emit(EngineEvent::Download { progress })
    }

    pub fn warning(&self, message: impl Into<String>) -> bool {
        self.emit(EngineEvent::Warning {
            message: message.into(),
        })
    }

    pub fn error(&self, fault: EngineFault) -> bool {
        self.emit(EngineEvent::Error(fault))
    }

    /// Whether the session still listens to this attempt.
    pub fn is_subscribed(&self) -> bool {
        !self.sender.is_closed()
    }

    fn emit(&self, event: EngineEvent) -> bool {
        self.sender.send(AttemptEvent::Engine(event)).is_ok()
    }
}

/// Write side handed to the render target on `attach`.
#[derive(Debug, Clone)]
pub struct RenderSignals {
    sender: mpsc::UnboundedSender<AttemptEvent>,
}

impl RenderSignals {
    /// Render completed successfully.
    pub fn rendered(&self) -> bool {
        self.sender.send(AttemptEvent::RenderFinished(Ok(()))).is_ok()
    }

    pub fn render_failed(&self, reason: impl Into<String>) -> bool {
        self.sender
            .send(AttemptEvent::RenderFinished(Err(reason.into())))
            .is_ok()
    }

    /// First output produced; moves the session to `Playing`.
    pub fn first_output(&self) -> bool {
        self.sender.send(AttemptEvent::FirstOutput).is_ok()
    }

    pub fn is_subscribed(&self) -> bool {
        !self.sender.is_closed()
    }
}

/// Read side owned by the engine lifecycle manager for one attempt.
#[derive(Debug)]
pub struct Subscription {
    receiver: mpsc::UnboundedReceiver<AttemptEvent>,
    // Kept so render signals can be minted after `add`.
    sender: mpsc::UnboundedSender<AttemptEvent>,
}

impl Subscription {
    /// Opens a fresh subscription and the engine sink that feeds it.
    pub fn open() -> (Self, EngineEventSink) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let sink = EngineEventSink {
            sender: sender.clone(),
        };
        (Self { receiver, sender }, sink)
    }

    pub fn render_signals(&self) -> RenderSignals {
        RenderSignals {
            sender: self.sender.clone(),
        }
    }

    /// Next event in emission order.
    pub async fn recv(&mut self) -> Option<AttemptEvent> {
        self.receiver.recv().await
    }
}

/// Waits for the next event of the live attempt, forever when there is none.
pub(crate) async fn next_attempt_event(subscription: Option<&mut Subscription>) -> AttemptEvent {
    match subscription {
        Some(subscription) => match subscription.recv().await {
            Some(event) => event,
            None => std::future::pending().await,
        },
        None => std::future::pending().await,
    }
}

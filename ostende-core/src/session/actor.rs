//! Actor running one playback session.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, watch};

use super::commands::SessionCommand;
use super::errors::{PlaybackError, SessionError};
use super::failover::{FailoverController, FailoverDecision};
use super::handle::PlaybackHandle;
use super::progress::ProgressMonitor;
use super::snapshot::{SessionEvent, SessionSnapshot};
use super::state::{PlaybackSession, SessionState};
use crate::config::OstendeConfig;
use crate::engine::{
    AttemptEvent, ContentFile, EngineEvent, EngineFactory, EngineLifecycleManager, EngineSlot,
};
use crate::render::RenderTarget;
use crate::source::CandidateList;

/// Spawns the session actor for an already resolved candidate list.
///
/// The session starts on candidate 0 as soon as the actor runs. Its engine
/// instances are created under `slot`.
pub(crate) fn spawn_session(
    config: &OstendeConfig,
    candidates: CandidateList,
    factory: Arc<dyn EngineFactory>,
    slot: EngineSlot,
    target: Box<dyn RenderTarget>,
) -> PlaybackHandle {
    let (sender, receiver) = mpsc::channel(config.playback.command_capacity.max(1));
    let (events, _) = broadcast::channel(config.playback.event_capacity.max(1));

    let session = PlaybackSession::new(candidates);
    let (state_sender, state_receiver) = watch::channel(SessionSnapshot::capture(&session, false));

    let lifecycle = EngineLifecycleManager::new(
        factory,
        slot,
        config.engine.clone(),
        config.sources.trackers.clone(),
        config.playback.playable_extensions.clone(),
    );

    let actor = SessionActor {
        session,
        lifecycle,
        target,
        commands: receiver,
        progress: ProgressMonitor::new(events.clone()),
        failover: FailoverController::new(),
        state: state_sender,
        events: events.clone(),
        rendering: None,
        attempt_pending: false,
    };

    tokio::spawn(actor.run());

    PlaybackHandle::new(sender, state_receiver, events)
}

enum Wakeup {
    Command(Option<SessionCommand>),
    Attempt(AttemptEvent),
}

enum AttemptStep {
    Command(Option<SessionCommand>),
    Finished(Result<(), PlaybackError>),
}

enum AttemptRun {
    /// An attempt is underway or the candidates ran out
    Settled,
    /// A command arrived before the attempt got underway
    Interrupted(Option<SessionCommand>),
}

struct SessionActor {
    session: PlaybackSession,
    lifecycle: EngineLifecycleManager,
    target: Box<dyn RenderTarget>,
    commands: mpsc::Receiver<SessionCommand>,
    progress: ProgressMonitor,
    failover: FailoverController,
    state: watch::Sender<SessionSnapshot>,
    events: broadcast::Sender<SessionEvent>,
    // File attached to the render target by the live attempt.
    rendering: Option<ContentFile>,
    // Session is connecting and its attempt has not been started yet.
    attempt_pending: bool,
}

impl SessionActor {
    async fn run(mut self) {
        tracing::debug!("Playback session {} actor started", self.session.id());

        let from = self.session.state();
        if let Err(e) = self.session.start() {
            tracing::error!("Session could not start: {}", e);
            return;
        }
        self.publish(from);
        self.attempt_pending = true;

        loop {
            if self.attempt_pending {
                self.attempt_pending = false;
                if let AttemptRun::Interrupted(command) = self.run_attempts().await
                    && !self.on_command(command).await
                {
                    break;
                }
                continue;
            }

            let wakeup = tokio::select! {
                biased;
                command = self.commands.recv() => Wakeup::Command(command),
                event = self.lifecycle.next_event() => Wakeup::Attempt(event),
            };

            match wakeup {
                Wakeup::Command(command) => {
                    if !self.on_command(command).await {
                        break;
                    }
                }
                Wakeup::Attempt(event) => self.handle_attempt_event(event).await,
            }
        }

        tracing::debug!("Playback session {} actor stopped", self.session.id());
    }

    /// Returns false when the actor must stop.
    async fn on_command(&mut self, command: Option<SessionCommand>) -> bool {
        match command {
            Some(command) => self.handle_command(command).await,
            None => {
                tracing::debug!("All playback handles dropped");
                self.close().await;
                false
            }
        }
    }

    /// Returns false when the actor must stop.
    async fn handle_command(&mut self, command: SessionCommand) -> bool {
        match command {
            SessionCommand::Close { responder } => {
                self.close().await;
                let _ = responder.send(self.snapshot());
            }

            SessionCommand::Retry { responder } => {
                let result = self.retry().await;
                let _ = responder.send(result);
            }

            SessionCommand::Snapshot { responder } => {
                let _ = responder.send(self.snapshot());
            }

            SessionCommand::Shutdown { responder } => {
                tracing::debug!("Playback session actor shutting down");
                self.close().await;
                let _ = responder.send(());
                return false;
            }
        }

        true
    }

    async fn handle_attempt_event(&mut self, event: AttemptEvent) {
        match event {
            AttemptEvent::Engine(EngineEvent::Ready { files }) => self.on_ready(files).await,

            AttemptEvent::Engine(EngineEvent::Download { progress }) => {
                if self.progress.on_download(&mut self.session, progress).is_some() {
                    self.publish_snapshot();
                }
            }

            AttemptEvent::Engine(EngineEvent::Warning { message }) => {
                tracing::warn!("Engine warning: {}", message);
                let _ = self.events.send(SessionEvent::Warning { message });
            }

            AttemptEvent::Engine(EngineEvent::Error(fault)) => {
                tracing::error!("Engine error: {}", fault);
                self.fail_and_continue(fault.into()).await;
            }

            AttemptEvent::RenderFinished(Ok(())) => {
                if let Some(file) = &self.rendering {
                    tracing::info!("Rendered {}", file.name);
                    let _ = self.events.send(SessionEvent::Rendered {
                        file_name: file.name.clone(),
                    });
                }
            }

            AttemptEvent::RenderFinished(Err(reason)) => {
                self.fail_and_continue(PlaybackError::Render { reason }).await;
            }

            AttemptEvent::FirstOutput => {
                let from = self.session.state();
                match self.session.mark_playing() {
                    Ok(()) => self.publish(from),
                    Err(e) => tracing::debug!("Ignoring first output: {}", e),
                }
            }
        }
    }

    async fn on_ready(&mut self, files: Vec<ContentFile>) {
        if self.session.state() != SessionState::Connecting {
            tracing::debug!("Ignoring repeated ready event");
            return;
        }
        tracing::info!("Torrent ready with {} file(s)", files.len());

        let file = match self.lifecycle.select_playable(&files) {
            Ok(file) => file,
            Err(error) => return self.fail_and_continue(error).await,
        };

        let from = self.session.state();
        if let Err(e) = self.session.mark_ready() {
            tracing::debug!("Ready transition refused: {}", e);
            return;
        }
        self.publish(from);

        match self.lifecycle.render_into(&file, self.target.as_mut()) {
            Ok(()) => self.rendering = Some(file),
            Err(error) => self.fail_and_continue(error).await,
        }
    }

    /// Starts attempts until one is underway or the candidates run out.
    ///
    /// Commands keep being served while an engine is created or fed.
    /// Snapshot requests are answered from the last published snapshot; any
    /// other command abandons the attempt and is handed back to the caller,
    /// whose teardown destroys whatever instance the attempt created.
    async fn run_attempts(&mut self) -> AttemptRun {
        while self.session.state() == SessionState::Connecting {
            let candidate = self.session.current_candidate().clone();

            let result = {
                let attempt = self.lifecycle.start_attempt(&candidate);
                tokio::pin!(attempt);

                loop {
                    let step = tokio::select! {
                        biased;
                        command = self.commands.recv() => AttemptStep::Command(command),
                        result = &mut attempt => AttemptStep::Finished(result),
                    };

                    match step {
                        AttemptStep::Finished(result) => break result,
                        AttemptStep::Command(Some(SessionCommand::Snapshot { responder })) => {
                            let _ = responder.send(self.state.borrow().clone());
                        }
                        AttemptStep::Command(command) => {
                            tracing::info!("Abandoning attempt on {}", candidate.label());
                            return AttemptRun::Interrupted(command);
                        }
                    }
                }
            };

            match result {
                Ok(()) => {
                    self.publish_snapshot();
                    return AttemptRun::Settled;
                }
                Err(error) => {
                    if !self.fail_attempt(error).await {
                        return AttemptRun::Settled;
                    }
                }
            }
        }
        AttemptRun::Settled
    }

    async fn fail_and_continue(&mut self, error: PlaybackError) {
        if self.fail_attempt(error).await {
            self.attempt_pending = true;
        }
    }

    /// Tears the attempt down and lets the failover controller decide.
    ///
    /// Returns true when the session moved on to another candidate.
    async fn fail_attempt(&mut self, error: PlaybackError) -> bool {
        self.teardown().await;

        let from = self.session.state();
        let failed_index = self.session.current_index();
        let decision = self.failover.on_attempt_failed(&mut self.session, &error);
        self.publish(from);

        let record = self.session.last_error().cloned();
        self.failover.apply(&mut self.session, decision);

        if let Some(error) = record {
            let event = match decision {
                FailoverDecision::Advance { next_index } => SessionEvent::Failover {
                    failed_index,
                    next_index,
                    error,
                },
                FailoverDecision::GiveUp => SessionEvent::GaveUp {
                    summary: error.summary(
                        self.session.candidates_tried(),
                        self.session.candidates().len(),
                    ),
                    error,
                },
            };
            let _ = self.events.send(event);
        }
        self.publish(SessionState::Failed);

        matches!(decision, FailoverDecision::Advance { .. })
    }

    async fn close(&mut self) {
        self.teardown().await;
        let from = self.session.state();
        self.session.close();
        self.publish(from);
    }

    async fn retry(&mut self) -> Result<SessionSnapshot, SessionError> {
        if self.session.state() == SessionState::Idle {
            return Err(SessionError::InvalidTransition {
                from: SessionState::Idle,
                action: "retry",
            });
        }

        self.teardown().await;
        let from = self.session.state();
        self.session.retry()?;
        tracing::info!(
            "Retrying from source {} of {}",
            self.session.current_index() + 1,
            self.session.candidates().len()
        );
        self.publish(from);
        self.attempt_pending = true;
        Ok(self.snapshot())
    }

    /// Detaches the render target, then unsubscribes and destroys the engine.
    async fn teardown(&mut self) {
        if let Some(file) = self.rendering.take() {
            tracing::debug!("Detaching {} from render target", file.name);
            self.target.detach();
        }
        if self.lifecycle.stop_attempt().await {
            self.publish_snapshot();
        }
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot::capture(&self.session, self.lifecycle.is_engine_alive())
    }

    fn publish(&self, from: SessionState) {
        let to = self.session.state();
        if from != to {
            tracing::info!("Session {}: {:?} -> {:?}", self.session.id(), from, to);
            let _ = self.events.send(SessionEvent::StateChanged { from, to });
        }
        self.publish_snapshot();
    }

    fn publish_snapshot(&self) {
        self.state.send_replace(self.snapshot());
    }
}

//! The poll loop.
//!
//! One tokio task owns the [`DecisionEngine`] and runs every cycle strictly in
//! sequence: snapshot, select, resolve, decide, apply, emit. Nothing else
//! touches the engine; the presentation layer talks to it through a
//! [`MonitorHandle`], which queues [`ControlCommand`]s and hands out event
//! subscriptions. Because manual applies are executed by the same task
//! between cycles, clock writes can never overlap or arrive out of order.

use std::sync::Arc;
use std::time::Duration;

use rateconf::{CommandsConfig, PollConfig, SelectionPolicy};
use thiserror::Error;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::engine::{ClockRequest, CommandOutcome, Decision, DecisionEngine};
use crate::events::{ControlCommand, EngineEvent};
use crate::select;
use crate::sources::{
    ClockApplier, NodeProbe, PwCliProbe, PwDump, PwMetadata, SnapshotSource, SourceError,
};

const COMMAND_QUEUE: usize = 32;
const EVENT_QUEUE: usize = 64;

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("monitor has stopped")]
    Stopped,
}

/// The external operations one cycle depends on.
#[derive(Clone)]
pub struct Collaborators {
    pub snapshots: Arc<dyn SnapshotSource>,
    pub probe: Arc<dyn NodeProbe>,
    pub clock: Arc<dyn ClockApplier>,
}

impl Collaborators {
    /// `pw-dump`, `pw-cli` and `pw-metadata` as configured.
    pub fn pipewire(commands: &CommandsConfig) -> Self {
        Self {
            snapshots: Arc::new(PwDump::from_config(commands)),
            probe: Arc::new(PwCliProbe::from_config(commands)),
            clock: Arc::new(PwMetadata::from_config(commands)),
        }
    }
}

/// Presentation-side handle to a running monitor.
#[derive(Clone)]
pub struct MonitorHandle {
    commands: mpsc::Sender<ControlCommand>,
    events: broadcast::Sender<EngineEvent>,
    cancel: CancellationToken,
}

impl MonitorHandle {
    /// Queue a command. It is handled between cycles, or right away if the
    /// loop is sleeping.
    pub async fn send(&self, command: ControlCommand) -> Result<(), MonitorError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| MonitorError::Stopped)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    /// Ask the loop to stop. In-flight collaborator calls finish first.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

#[derive(Debug, Clone, Copy)]
struct Timing {
    active: Duration,
    manual: Duration,
    backoff: Duration,
}

pub struct Monitor {
    engine: DecisionEngine,
    sources: Collaborators,
    selection: SelectionPolicy,
    timing: Timing,
    commands: mpsc::Receiver<ControlCommand>,
    commands_open: bool,
    events: broadcast::Sender<EngineEvent>,
    cancel: CancellationToken,
}

impl Monitor {
    pub fn new(poll: &PollConfig, sources: Collaborators) -> (Self, MonitorHandle) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_QUEUE);
        let (event_tx, _) = broadcast::channel(EVENT_QUEUE);
        let cancel = CancellationToken::new();

        let monitor = Self {
            engine: DecisionEngine::new(poll.idle_threshold),
            sources,
            selection: poll.selection,
            timing: Timing {
                active: poll.active_interval(),
                manual: poll.manual_interval(),
                backoff: poll.error_backoff(),
            },
            commands: command_rx,
            commands_open: true,
            events: event_tx.clone(),
            cancel: cancel.clone(),
        };
        let handle = MonitorHandle {
            commands: command_tx,
            events: event_tx,
            cancel,
        };
        (monitor, handle)
    }

    pub fn engine(&self) -> &DecisionEngine {
        &self.engine
    }

    /// Run the loop on its own task until the handle cancels it.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    pub async fn run(mut self) {
        info!(
            selection = %self.selection,
            "monitoring every {:?} ({})",
            self.timing.active,
            self.engine.mode()
        );

        loop {
            if self.cancel.is_cancelled() {
                break;
            }

            while let Ok(command) = self.commands.try_recv() {
                self.handle_command(command).await;
            }

            let pause = if self.engine.is_evaluating() {
                match self.run_cycle().await {
                    Ok(_) => self.timing.active,
                    Err(e) => {
                        warn!("poll cycle failed: {}", e);
                        self.timing.backoff
                    }
                }
            } else {
                self.timing.manual
            };

            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(pause) => {}
                command = self.commands.recv(), if self.commands_open => match command {
                    Some(command) => self.handle_command(command).await,
                    None => {
                        debug!("all handles dropped, control channel closed");
                        self.commands_open = false;
                    }
                },
            }
        }

        info!("monitor stopped");
    }

    /// One poll cycle. Errors only for a snapshot that could not be taken;
    /// everything downstream degrades to unknown values instead.
    pub async fn run_cycle(&mut self) -> Result<Decision, SourceError> {
        if !self.engine.is_evaluating() {
            return Ok(Decision::Hold);
        }

        let snapshot = self.sources.snapshots.snapshot().await?;
        let stream =
            select::find_active_stream(&snapshot, self.selection, self.sources.probe.as_ref()).await;
        let decision = self.engine.decide(stream);

        match &decision {
            Decision::Hold => {}
            Decision::Active {
                stream,
                rate,
                apply,
            } => {
                let applied = match apply {
                    Some(request) => {
                        info!(
                            "locked to {}: {} Hz (quantum {})",
                            stream.display_name, request.rate, request.quantum
                        );
                        self.apply(*request).await
                    }
                    None => false,
                };
                self.emit(EngineEvent::StreamActive {
                    rate: *rate,
                    app_name: stream.display_name.clone(),
                    format: stream.format.clone(),
                    latency_ms: stream.latency_ms,
                    quantum: stream.quantum,
                    applied,
                });
            }
            Decision::Scanning { idle_cycles } => {
                debug!(idle_cycles, "no active output stream");
            }
            Decision::Idle { clear_quantum } => {
                if *clear_quantum {
                    if let Err(e) = self.sources.clock.set_forced_quantum(0).await {
                        warn!("failed to release forced quantum: {}", e);
                    }
                }
                self.emit(EngineEvent::Idle);
            }
        }

        Ok(decision)
    }

    /// Handle one control command now. The loop calls this between cycles;
    /// manual rates are written before it returns.
    pub async fn handle_command(&mut self, command: ControlCommand) {
        match self.engine.handle(command) {
            CommandOutcome::Ignored => {}
            CommandOutcome::Changed { mode, apply } => {
                self.emit(EngineEvent::ModeChanged { mode });
                if let Some(request) = apply {
                    if self.apply(request).await {
                        self.emit(EngineEvent::ManualRateApplied { rate: request.rate });
                    }
                }
            }
        }
    }

    /// Write rate then quantum. Returns whether the rate write succeeded;
    /// only then is it recorded, so a failed write is retried next cycle.
    async fn apply(&mut self, request: ClockRequest) -> bool {
        if let Err(e) = self.sources.clock.set_forced_rate(request.rate).await {
            warn!(rate = request.rate, "failed to force clock rate: {}", e);
            return false;
        }
        self.engine.record_applied(request.rate);

        if let Err(e) = self.sources.clock.set_forced_quantum(request.quantum).await {
            warn!(quantum = request.quantum, "failed to force quantum: {}", e);
        }
        true
    }

    fn emit(&self, event: EngineEvent) {
        // No subscribers is fine; presentation may not be attached yet
        let _ = self.events.send(event);
    }
}

//! Decision engine: mode state machine, apply-or-skip decisions and idle
//! hysteresis.
//!
//! The engine is pure state. It never talks to PipeWire itself; the monitor
//! loop feeds it one resolved stream (or nothing) per cycle, carries out the
//! [`ClockRequest`] it hands back, and reports successful applies with
//! [`DecisionEngine::record_applied`].

use tracing::{debug, info};

use crate::events::ControlCommand;
use crate::{Mode, ResolvedStreamInfo};

/// Consecutive empty cycles before the engine declares idle.
pub const DEFAULT_IDLE_THRESHOLD: u32 = 3;

pub const MIN_QUANTUM: u32 = 32;
pub const MAX_QUANTUM: u32 = 8192;

/// Keep `quantum` only if the hardware could run it: a power of two within
/// `[MIN_QUANTUM, MAX_QUANTUM]`. Anything else becomes 0 (server default).
pub fn sanitize_quantum(quantum: u32) -> u32 {
    if quantum.is_power_of_two() && (MIN_QUANTUM..=MAX_QUANTUM).contains(&quantum) {
        quantum
    } else {
        0
    }
}

/// Clock settings to push to the server. The quantum is already sanitized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockRequest {
    pub rate: u32,
    pub quantum: u32,
}

impl ClockRequest {
    pub fn new(rate: u32, quantum: u32) -> Self {
        Self {
            rate,
            quantum: sanitize_quantum(quantum),
        }
    }
}

/// What one poll cycle should do.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Manual override holds the clock; nothing was evaluated.
    Hold,
    /// A stream is playing. `apply` is set when the clock has to change.
    Active {
        stream: ResolvedStreamInfo,
        rate: u32,
        apply: Option<ClockRequest>,
    },
    /// Nothing playing yet, still inside the hysteresis window or already idle.
    Scanning { idle_cycles: u32 },
    /// Just crossed into idle. `clear_quantum` asks for the forced quantum to
    /// be released.
    Idle { clear_quantum: bool },
}

/// Result of a control command.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    /// Rejected because strict mode owns the clock.
    Ignored,
    Changed {
        mode: Mode,
        /// Manual rates are applied right away instead of on the next poll.
        apply: Option<ClockRequest>,
    },
}

/// Process-lifetime engine state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineState {
    /// Last explicit auto/manual choice; restored when strict is switched off.
    pub auto_selected: bool,
    pub strict: bool,
    pub last_applied_rate: Option<u32>,
    pub idle_cycles: u32,
}

impl Default for EngineState {
    fn default() -> Self {
        Self {
            auto_selected: true,
            strict: false,
            last_applied_rate: None,
            idle_cycles: 0,
        }
    }
}

impl EngineState {
    pub fn mode(&self) -> Mode {
        if self.strict {
            Mode::Strict
        } else if self.auto_selected {
            Mode::Auto
        } else {
            Mode::ManualOverride
        }
    }
}

#[derive(Debug, Clone)]
pub struct DecisionEngine {
    state: EngineState,
    idle_threshold: u32,
}

impl Default for DecisionEngine {
    fn default() -> Self {
        Self::new(DEFAULT_IDLE_THRESHOLD)
    }
}

impl DecisionEngine {
    pub fn new(idle_threshold: u32) -> Self {
        Self {
            state: EngineState::default(),
            idle_threshold: idle_threshold.max(1),
        }
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn mode(&self) -> Mode {
        self.state.mode()
    }

    /// Whether cycles should query the server at all (auto or strict).
    pub fn is_evaluating(&self) -> bool {
        self.state.strict || self.state.auto_selected
    }

    pub fn is_idle(&self) -> bool {
        self.state.idle_cycles >= self.idle_threshold
    }

    /// Note that the server accepted `rate`.
    pub fn record_applied(&mut self, rate: u32) {
        self.state.last_applied_rate = Some(rate);
    }

    pub fn handle(&mut self, command: ControlCommand) -> CommandOutcome {
        match command {
            ControlCommand::SetAutoMode(on) => {
                if self.state.strict {
                    debug!("auto toggle ignored while strict mode is on");
                    return CommandOutcome::Ignored;
                }
                self.state.auto_selected = on;
                info!("auto mode {}", if on { "on" } else { "off" });
                CommandOutcome::Changed {
                    mode: self.mode(),
                    apply: None,
                }
            }
            ControlCommand::ApplyManualRate(rate) => {
                if self.state.strict || rate == 0 {
                    debug!(rate, "manual rate ignored");
                    return CommandOutcome::Ignored;
                }
                self.state.auto_selected = false;
                info!(rate, "manual override");
                CommandOutcome::Changed {
                    mode: Mode::ManualOverride,
                    apply: Some(ClockRequest::new(rate, 0)),
                }
            }
            ControlCommand::SetStrictMode(on) => {
                self.state.strict = on;
                // Forget what we applied so the next poll re-evaluates from scratch
                self.state.last_applied_rate = None;
                info!(
                    "strict mode {}, now {}",
                    if on { "on" } else { "off" },
                    self.mode()
                );
                CommandOutcome::Changed {
                    mode: self.mode(),
                    apply: None,
                }
            }
        }
    }

    /// Decide one poll cycle given the resolved stream, if any.
    pub fn decide(&mut self, stream: Option<ResolvedStreamInfo>) -> Decision {
        if !self.is_evaluating() {
            return Decision::Hold;
        }

        let Some((stream, rate)) = stream.and_then(|s| s.valid_rate().map(|r| (s, r))) else {
            return self.empty_cycle();
        };

        self.state.idle_cycles = 0;
        let changed = self.state.last_applied_rate != Some(rate);
        let apply = if changed || self.state.strict {
            let quantum = if self.state.strict { stream.quantum } else { 0 };
            Some(ClockRequest::new(rate, quantum))
        } else {
            None
        };

        Decision::Active {
            stream,
            rate,
            apply,
        }
    }

    fn empty_cycle(&mut self) -> Decision {
        self.state.idle_cycles = self.state.idle_cycles.saturating_add(1);

        if self.is_idle() && self.state.last_applied_rate.is_some() {
            self.state.last_applied_rate = None;
            info!("idle confirmed after {} empty cycles", self.state.idle_cycles);
            return Decision::Idle {
                clear_quantum: self.state.strict,
            };
        }

        Decision::Scanning {
            idle_cycles: self.state.idle_cycles,
        }
    }
}

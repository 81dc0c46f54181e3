//! Messages crossing between the monitor task and the presentation layer.

use serde::{Deserialize, Serialize};

use crate::{AudioFormat, Mode};

/// Presentation to engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", content = "value", rename_all = "snake_case")]
pub enum ControlCommand {
    SetAutoMode(bool),
    SetStrictMode(bool),
    ApplyManualRate(u32),
}

/// Engine to presentation. Carries raw values; labels are the subscriber's job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    /// Emitted every cycle a stream resolves, whether or not the clock changed.
    StreamActive {
        rate: u32,
        app_name: String,
        format: AudioFormat,
        latency_ms: Option<f64>,
        quantum: u32,
        /// True when this cycle wrote the clock.
        applied: bool,
    },
    /// Emitted once when the graph has been quiet for the idle threshold.
    Idle,
    ModeChanged { mode: Mode },
    /// A manual rate was written to the server.
    ManualRateApplied { rate: u32 },
}

//! ratesync: keep PipeWire's clock in step with whatever is playing.
//!
//! Each poll cycle takes a graph snapshot, picks the first running playback
//! stream, works out its real sample rate, format and latency, and forces the
//! server's clock rate (and in strict mode its quantum) to match. After a few
//! quiet cycles the engine reports idle and forgets the applied rate.
//!
//! The pieces, leaves first:
//!
//! - [`graph`]: snapshot model decoded from `pw-dump`
//! - [`probe`]: scraping of `pw-cli enum-params` output
//! - [`resolve`]: tiered rate/format/latency resolution
//! - [`select`]: stream selection
//! - [`engine`]: modes, apply decisions, idle hysteresis
//! - [`monitor`]: the poll loop and its control/event channels
//! - [`sources`]: collaborator traits and their PipeWire implementations

pub mod engine;
pub mod events;
pub mod graph;
pub mod monitor;
pub mod probe;
pub mod resolve;
pub mod select;
pub mod sources;
pub mod types;

pub use engine::{ClockRequest, CommandOutcome, Decision, DecisionEngine, EngineState};
pub use events::{ControlCommand, EngineEvent};
pub use graph::{GraphSnapshot, Node, NodeState, SnapshotError};
pub use monitor::{Collaborators, Monitor, MonitorError, MonitorHandle};
pub use sources::{ClockApplier, NodeProbe, SnapshotSource, SourceError};
pub use types::*;

/// Rates offered as one-click manual overrides.
pub const MANUAL_RATE_PRESETS: [u32; 6] = [44100, 48000, 88200, 96000, 176400, 192000];

//! Poll loop tuning.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// How the selector treats a running output stream whose rate cannot be
/// resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionPolicy {
    /// Stop at the first running output stream; an unresolvable rate makes
    /// the whole cycle count as empty.
    #[default]
    FirstCandidate,
    /// Keep scanning past unresolvable streams for one with a valid rate.
    FirstResolved,
}

impl SelectionPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FirstCandidate => "first-candidate",
            Self::FirstResolved => "first-resolved",
        }
    }
}

impl fmt::Display for SelectionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SelectionPolicy {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "first-candidate" => Ok(Self::FirstCandidate),
            "first-resolved" => Ok(Self::FirstResolved),
            _ => Err(format!("Unknown selection policy: {}", s)),
        }
    }
}

/// Cadence and hysteresis of the monitor loop.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PollConfig {
    /// Cycle period while auto or strict mode is evaluating streams.
    /// Default: 1500
    #[serde(default = "PollConfig::default_active_interval_ms")]
    pub active_interval_ms: u64,

    /// Tick while manual override holds the clock; no server queries are made.
    /// Default: 1000
    #[serde(default = "PollConfig::default_manual_interval_ms")]
    pub manual_interval_ms: u64,

    /// Sleep after a cycle failed before trying again.
    /// Default: 5000
    #[serde(default = "PollConfig::default_error_backoff_ms")]
    pub error_backoff_ms: u64,

    /// Consecutive empty cycles before the engine declares idle.
    /// Default: 3
    #[serde(default = "PollConfig::default_idle_threshold")]
    pub idle_threshold: u32,

    #[serde(default)]
    pub selection: SelectionPolicy,
}

impl PollConfig {
    fn default_active_interval_ms() -> u64 {
        1500
    }

    fn default_manual_interval_ms() -> u64 {
        1000
    }

    fn default_error_backoff_ms() -> u64 {
        5000
    }

    fn default_idle_threshold() -> u32 {
        3
    }

    pub fn active_interval(&self) -> Duration {
        Duration::from_millis(self.active_interval_ms)
    }

    pub fn manual_interval(&self) -> Duration {
        Duration::from_millis(self.manual_interval_ms)
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_millis(self.error_backoff_ms)
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            active_interval_ms: Self::default_active_interval_ms(),
            manual_interval_ms: Self::default_manual_interval_ms(),
            error_backoff_ms: Self::default_error_backoff_ms(),
            idle_threshold: Self::default_idle_threshold(),
            selection: SelectionPolicy::default(),
        }
    }
}

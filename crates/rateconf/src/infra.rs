//! Infrastructure configuration - fixed for the lifetime of the process.

use serde::{Deserialize, Serialize};

/// External PipeWire tools the collaborators shell out to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommandsConfig {
    /// Graph snapshot tool (JSON dump of every object).
    /// Default: pw-dump
    #[serde(default = "CommandsConfig::default_pw_dump")]
    pub pw_dump: String,

    /// Deep per-node query tool (`enum-params <id> Format`).
    /// Default: pw-cli
    #[serde(default = "CommandsConfig::default_pw_cli")]
    pub pw_cli: String,

    /// Metadata tool used to force clock rate and quantum.
    /// Default: pw-metadata
    #[serde(default = "CommandsConfig::default_pw_metadata")]
    pub pw_metadata: String,

    /// Metadata object holding the `clock.force-*` keys.
    /// Default: settings
    #[serde(default = "CommandsConfig::default_metadata_name")]
    pub metadata_name: String,
}

impl CommandsConfig {
    fn default_pw_dump() -> String {
        "pw-dump".to_string()
    }

    fn default_pw_cli() -> String {
        "pw-cli".to_string()
    }

    fn default_pw_metadata() -> String {
        "pw-metadata".to_string()
    }

    fn default_metadata_name() -> String {
        "settings".to_string()
    }
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            pw_dump: Self::default_pw_dump(),
            pw_cli: Self::default_pw_cli(),
            pw_metadata: Self::default_pw_metadata(),
            metadata_name: Self::default_metadata_name(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TelemetryConfig {
    /// Log filter directive (trace, debug, info, warn, error, or an EnvFilter string).
    /// Default: info
    #[serde(default = "TelemetryConfig::default_log_level")]
    pub log_level: String,
}

impl TelemetryConfig {
    fn default_log_level() -> String {
        "info".to_string()
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: Self::default_log_level(),
        }
    }
}

//! Configuration loading for ratesync.
//!
//! The engine itself needs no configuration to run: every value here has a
//! compiled default that matches the stock PipeWire tools and the polling
//! cadence the daemon was tuned for. Files and environment variables only
//! override those defaults.
//!
//! # Configuration Layout
//!
//! - **Poll** (`PollConfig`): loop cadence, error backoff, idle hysteresis and
//!   the stream selection policy.
//! - **Commands** (`CommandsConfig`): which executables stand in for the
//!   snapshot, deep-query and clock-apply collaborators.
//! - **Telemetry** (`TelemetryConfig`): log filter.
//!
//! # Usage
//!
//! ```rust,no_run
//! use rateconf::RateConfig;
//!
//! let config = RateConfig::load().expect("Failed to load config");
//! println!("poll every {:?}", config.poll.active_interval());
//! println!("snapshot via {}", config.commands.pw_dump);
//! ```
//!
//! # Config File Locations
//!
//! Files are loaded in order (later wins):
//! 1. `/etc/ratesync/config.toml` (system)
//! 2. `~/.config/ratesync/config.toml` (user)
//! 3. `./ratesync.toml` (local override, replaced by `--config` when given)
//! 4. Environment variables (`RATESYNC_*`)
//!
//! # Example Config
//!
//! ```toml
//! [poll]
//! active_interval_ms = 1500
//! manual_interval_ms = 1000
//! error_backoff_ms = 5000
//! idle_threshold = 3
//! selection = "first-candidate"
//!
//! [commands]
//! pw_dump = "pw-dump"
//! pw_cli = "pw-cli"
//! pw_metadata = "pw-metadata"
//!
//! [telemetry]
//! log_level = "info"
//! ```

pub mod infra;
pub mod loader;
pub mod poll;

pub use infra::{CommandsConfig, TelemetryConfig};
pub use loader::{discover_config_files_with_override, ConfigSources};
pub use poll::{PollConfig, SelectionPolicy};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

/// Complete ratesync configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct RateConfig {
    #[serde(default)]
    pub poll: PollConfig,

    #[serde(default)]
    pub commands: CommandsConfig,

    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl RateConfig {
    /// Load configuration from all sources.
    ///
    /// Load order (later wins):
    /// 1. Compiled defaults
    /// 2. `/etc/ratesync/config.toml`
    /// 3. `~/.config/ratesync/config.toml`
    /// 4. `./ratesync.toml`
    /// 5. Environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(None)?;
        Ok(config)
    }

    /// Load configuration with an explicit file in place of `./ratesync.toml`.
    pub fn load_from(config_path: Option<&std::path::Path>) -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(config_path)?;
        Ok(config)
    }

    /// Load configuration from optional path and return information about sources.
    pub fn load_with_sources_from(
        config_path: Option<&std::path::Path>,
    ) -> Result<(Self, ConfigSources), ConfigError> {
        let mut sources = ConfigSources::default();
        let mut config = RateConfig::default();

        for path in loader::discover_config_files_with_override(config_path) {
            loader::load_from_file(&path, &mut config)?;
            sources.files.push(path);
        }

        loader::apply_env_overrides(&mut config, &mut sources);

        Ok((config, sources))
    }

    /// Serialize config to TOML string.
    pub fn to_toml(&self) -> String {
        let mut output = String::new();

        output.push_str("# ratesync configuration\n\n");

        output.push_str("[poll]\n");
        output.push_str(&format!(
            "active_interval_ms = {}\n",
            self.poll.active_interval_ms
        ));
        output.push_str(&format!(
            "manual_interval_ms = {}\n",
            self.poll.manual_interval_ms
        ));
        output.push_str(&format!(
            "error_backoff_ms = {}\n",
            self.poll.error_backoff_ms
        ));
        output.push_str(&format!("idle_threshold = {}\n", self.poll.idle_threshold));
        output.push_str(&format!("selection = {}\n", quoted(self.poll.selection.as_str())));

        output.push_str("\n[commands]\n");
        output.push_str(&format!("pw_dump = {}\n", quoted(&self.commands.pw_dump)));
        output.push_str(&format!("pw_cli = {}\n", quoted(&self.commands.pw_cli)));
        output.push_str(&format!(
            "pw_metadata = {}\n",
            quoted(&self.commands.pw_metadata)
        ));
        output.push_str(&format!(
            "metadata_name = {}\n",
            quoted(&self.commands.metadata_name)
        ));

        output.push_str("\n[telemetry]\n");
        output.push_str(&format!(
            "log_level = {}\n",
            quoted(&self.telemetry.log_level)
        ));

        output
    }
}

/// A TOML string literal, escaped as needed.
fn quoted(value: &str) -> String {
    toml::Value::String(value.to_string()).to_string()
}

//! Config file discovery, loading, and environment variable overlay.

use crate::{ConfigError, RateConfig, SelectionPolicy};
use std::env;
use std::path::{Path, PathBuf};

/// Information about where config values came from.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    /// Config files that were loaded (in order)
    pub files: Vec<PathBuf>,
    /// Environment variables that overrode config values
    pub env_overrides: Vec<String>,
}

/// Discover config files in standard locations.
///
/// Returns paths in load order (system, user, local).
/// Only returns files that exist.
pub fn discover_config_files() -> Vec<PathBuf> {
    discover_config_files_with_override(None)
}

/// Discover config files, optionally with a CLI override path.
///
/// If `cli_path` is provided and exists, it replaces the local override.
pub fn discover_config_files_with_override(cli_path: Option<&Path>) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let system = PathBuf::from("/etc/ratesync/config.toml");
    if system.exists() {
        files.push(system);
    }

    // XDG_CONFIG_HOME or ~/.config
    if let Some(config_dir) = directories::BaseDirs::new().map(|d| d.config_dir().to_path_buf()) {
        let user = config_dir.join("ratesync/config.toml");
        if user.exists() {
            files.push(user);
        }
    }

    if let Some(path) = cli_path {
        if path.exists() {
            files.push(path.to_path_buf());
            return files;
        }
    }

    let local = PathBuf::from("ratesync.toml");
    if local.exists() {
        files.push(local);
    }

    files
}

/// Load a TOML file on top of `config`. Keys absent from the file keep
/// whatever value earlier layers gave them.
pub fn load_from_file(path: &Path, config: &mut RateConfig) -> Result<(), ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    overlay_toml(&contents, path, config)
}

fn overlay_toml(contents: &str, path: &Path, config: &mut RateConfig) -> Result<(), ConfigError> {
    let parse_err = |message: String| ConfigError::Parse {
        path: path.to_path_buf(),
        message,
    };

    let table: toml::Table = contents
        .parse()
        .map_err(|e: toml::de::Error| parse_err(e.to_string()))?;

    if let Some(poll) = table.get("poll").and_then(|v| v.as_table()) {
        if let Some(v) = poll.get("active_interval_ms").and_then(|v| v.as_integer()) {
            config.poll.active_interval_ms = non_negative(v, "active_interval_ms").map_err(parse_err)?;
        }
        if let Some(v) = poll.get("manual_interval_ms").and_then(|v| v.as_integer()) {
            config.poll.manual_interval_ms = non_negative(v, "manual_interval_ms").map_err(parse_err)?;
        }
        if let Some(v) = poll.get("error_backoff_ms").and_then(|v| v.as_integer()) {
            config.poll.error_backoff_ms = non_negative(v, "error_backoff_ms").map_err(parse_err)?;
        }
        if let Some(v) = poll.get("idle_threshold").and_then(|v| v.as_integer()) {
            config.poll.idle_threshold = u32::try_from(v)
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| parse_err(format!("idle_threshold must be a positive integer, got {}", v)))?;
        }
        if let Some(v) = poll.get("selection").and_then(|v| v.as_str()) {
            config.poll.selection = v.parse::<SelectionPolicy>().map_err(parse_err)?;
        }
    }

    if let Some(commands) = table.get("commands").and_then(|v| v.as_table()) {
        if let Some(v) = commands.get("pw_dump").and_then(|v| v.as_str()) {
            config.commands.pw_dump = v.to_string();
        }
        if let Some(v) = commands.get("pw_cli").and_then(|v| v.as_str()) {
            config.commands.pw_cli = v.to_string();
        }
        if let Some(v) = commands.get("pw_metadata").and_then(|v| v.as_str()) {
            config.commands.pw_metadata = v.to_string();
        }
        if let Some(v) = commands.get("metadata_name").and_then(|v| v.as_str()) {
            config.commands.metadata_name = v.to_string();
        }
    }

    if let Some(telemetry) = table.get("telemetry").and_then(|v| v.as_table()) {
        if let Some(v) = telemetry.get("log_level").and_then(|v| v.as_str()) {
            config.telemetry.log_level = v.to_string();
        }
    }

    Ok(())
}

fn non_negative(v: i64, key: &str) -> Result<u64, String> {
    u64::try_from(v).map_err(|_| format!("{} must not be negative, got {}", key, v))
}

/// Apply environment variable overrides to config.
pub fn apply_env_overrides(config: &mut RateConfig, sources: &mut ConfigSources) {
    apply_overrides_from(config, sources, |key| env::var(key).ok());
}

/// Apply overrides from an arbitrary variable lookup.
///
/// Values that fail to parse are ignored and not recorded as overrides.
pub fn apply_overrides_from<F>(config: &mut RateConfig, sources: &mut ConfigSources, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let mut record = |key: &str| sources.env_overrides.push(key.to_string());

    if let Some(ms) = lookup("RATESYNC_ACTIVE_INTERVAL_MS").and_then(|v| v.parse().ok()) {
        config.poll.active_interval_ms = ms;
        record("RATESYNC_ACTIVE_INTERVAL_MS");
    }
    if let Some(ms) = lookup("RATESYNC_MANUAL_INTERVAL_MS").and_then(|v| v.parse().ok()) {
        config.poll.manual_interval_ms = ms;
        record("RATESYNC_MANUAL_INTERVAL_MS");
    }
    if let Some(ms) = lookup("RATESYNC_ERROR_BACKOFF_MS").and_then(|v| v.parse().ok()) {
        config.poll.error_backoff_ms = ms;
        record("RATESYNC_ERROR_BACKOFF_MS");
    }
    if let Some(n) = lookup("RATESYNC_IDLE_THRESHOLD")
        .and_then(|v| v.parse::<u32>().ok())
        .filter(|n| *n > 0)
    {
        config.poll.idle_threshold = n;
        record("RATESYNC_IDLE_THRESHOLD");
    }
    if let Some(policy) = lookup("RATESYNC_SELECTION").and_then(|v| v.parse().ok()) {
        config.poll.selection = policy;
        record("RATESYNC_SELECTION");
    }

    if let Some(v) = lookup("RATESYNC_PW_DUMP") {
        config.commands.pw_dump = v;
        record("RATESYNC_PW_DUMP");
    }
    if let Some(v) = lookup("RATESYNC_PW_CLI") {
        config.commands.pw_cli = v;
        record("RATESYNC_PW_CLI");
    }
    if let Some(v) = lookup("RATESYNC_PW_METADATA") {
        config.commands.pw_metadata = v;
        record("RATESYNC_PW_METADATA");
    }

    if let Some(v) = lookup("RATESYNC_LOG_LEVEL") {
        config.telemetry.log_level = v;
        record("RATESYNC_LOG_LEVEL");
    }
    // RUST_LOG wins over our own variable, matching EnvFilter conventions
    if let Some(v) = lookup("RUST_LOG") {
        config.telemetry.log_level = v;
        record("RUST_LOG");
    }
}

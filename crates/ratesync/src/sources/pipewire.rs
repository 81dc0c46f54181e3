use async_trait::async_trait;
use rateconf::CommandsConfig;
use tokio::process::Command;
use tracing::{debug, trace};

use super::{ClockApplier, NodeProbe, SnapshotSource, SourceError};
use crate::graph::GraphSnapshot;

pub const FORCE_RATE_KEY: &str = "clock.force-rate";
pub const FORCE_QUANTUM_KEY: &str = "clock.force-quantum";

/// Run a tool to completion and return its stdout.
async fn run(program: &str, args: &[&str]) -> Result<String, SourceError> {
    trace!(program, ?args, "running");
    let output = Command::new(program)
        .args(args)
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|source| SourceError::Spawn {
            command: program.to_string(),
            source,
        })?;

    if !output.status.success() {
        return Err(SourceError::Failed {
            command: program.to_string(),
            // None means killed by a signal
            status: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Graph snapshots via `pw-dump`.
#[derive(Debug, Clone)]
pub struct PwDump {
    program: String,
}

impl PwDump {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn from_config(commands: &CommandsConfig) -> Self {
        Self::new(commands.pw_dump.clone())
    }
}

impl Default for PwDump {
    fn default() -> Self {
        Self::from_config(&CommandsConfig::default())
    }
}

#[async_trait]
impl SnapshotSource for PwDump {
    async fn snapshot(&self) -> Result<GraphSnapshot, SourceError> {
        let text = run(&self.program, &[]).await?;
        let snapshot = GraphSnapshot::from_dump(&text)?;
        trace!(objects = snapshot.nodes.len(), "snapshot taken");
        Ok(snapshot)
    }
}

/// Negotiated format of one node via `pw-cli enum-params <id> Format`.
#[derive(Debug, Clone)]
pub struct PwCliProbe {
    program: String,
}

impl PwCliProbe {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn from_config(commands: &CommandsConfig) -> Self {
        Self::new(commands.pw_cli.clone())
    }
}

impl Default for PwCliProbe {
    fn default() -> Self {
        Self::from_config(&CommandsConfig::default())
    }
}

#[async_trait]
impl NodeProbe for PwCliProbe {
    async fn format_params(&self, node_id: u32) -> Result<String, SourceError> {
        let id = node_id.to_string();
        let output = run(&self.program, &["enum-params", &id, "Format"]).await?;
        Ok(output.trim().to_string())
    }
}

/// Forced clock settings via `pw-metadata -n settings 0 clock.force-*`.
#[derive(Debug, Clone)]
pub struct PwMetadata {
    program: String,
    metadata_name: String,
}

impl PwMetadata {
    pub fn new(program: impl Into<String>, metadata_name: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            metadata_name: metadata_name.into(),
        }
    }

    pub fn from_config(commands: &CommandsConfig) -> Self {
        Self::new(commands.pw_metadata.clone(), commands.metadata_name.clone())
    }

    async fn set(&self, key: &str, value: u32) -> Result<(), SourceError> {
        let value = value.to_string();
        run(&self.program, &["-n", &self.metadata_name, "0", key, &value]).await?;
        debug!("{} = {}", key, value);
        Ok(())
    }
}

impl Default for PwMetadata {
    fn default() -> Self {
        Self::from_config(&CommandsConfig::default())
    }
}

#[async_trait]
impl ClockApplier for PwMetadata {
    async fn set_forced_rate(&self, rate: u32) -> Result<(), SourceError> {
        self.set(FORCE_RATE_KEY, rate).await
    }

    async fn set_forced_quantum(&self, quantum: u32) -> Result<(), SourceError> {
        self.set(FORCE_QUANTUM_KEY, quantum).await
    }
}

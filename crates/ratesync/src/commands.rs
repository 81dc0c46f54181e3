//! CLI command implementations

use std::time::Duration;

use anyhow::{bail, Context, Result};
use rateconf::{ConfigSources, RateConfig};
use ratesync::graph::keys;
use ratesync::sources::{PwDump, PwMetadata};
use ratesync::{
    ClockApplier, Collaborators, ControlCommand, GraphSnapshot, Monitor, NodeState, SnapshotSource,
};
use serde_json::Value;
use tracing::{info, warn};

use crate::console;

/// How `ratesync run` starts up.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    pub strict: bool,
    pub manual: Option<u32>,
    pub no_auto: bool,
    pub console: bool,
}

impl RunOptions {
    /// Commands that put a fresh engine into the requested mode.
    fn initial_commands(&self) -> Vec<ControlCommand> {
        if self.strict {
            return vec![ControlCommand::SetStrictMode(true)];
        }
        match self.manual {
            Some(rate) => vec![ControlCommand::ApplyManualRate(rate)],
            None if self.no_auto => vec![ControlCommand::SetAutoMode(false)],
            None => Vec::new(),
        }
    }
}

/// Run the monitor until Ctrl+C or `quit`.
pub async fn run(config: &RateConfig, options: RunOptions) -> Result<()> {
    if options.manual == Some(0) {
        bail!("manual rate must be greater than zero");
    }
    if let Some(rate) = options.manual {
        console::warn_if_unusual(rate);
    }

    let (monitor, handle) = Monitor::new(&config.poll, Collaborators::pipewire(&config.commands));

    // Subscribe before the loop starts so the first events are not missed
    let events = handle.subscribe();
    for command in options.initial_commands() {
        handle
            .send(command)
            .await
            .context("Monitor stopped before it started")?;
    }

    let monitor_task = monitor.spawn();
    let printer = tokio::spawn(console::print_events(events));
    if options.console {
        println!("{}", console::HELP);
        let lines = console::spawn_stdin_reader();
        tokio::spawn(console::forward_commands(lines, handle.clone()));
    }

    let token = handle.cancellation_token();
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.context("Failed to listen for Ctrl+C")?;
            info!("interrupted, shutting down");
        }
        _ = token.cancelled() => {}
    }

    handle.shutdown();
    monitor_task.await.context("Monitor task panicked")?;
    // The loop owned the only event sender besides the handle
    drop(handle);
    printer.abort();

    Ok(())
}

/// List running nodes with their nominal rate.
pub async fn scan(config: &RateConfig, once: bool, interval_secs: u64) -> Result<()> {
    let dump = PwDump::from_config(&config.commands);
    let interval = Duration::from_secs(interval_secs.max(1));

    loop {
        let snapshot = dump
            .snapshot()
            .await
            .with_context(|| format!("Failed to read the graph with {}", config.commands.pw_dump))?;

        let lines = running_nodes(&snapshot);
        if lines.is_empty() {
            println!("No 'running' nodes found. Is something playing?");
        } else {
            println!("--- {} running node(s) ---", lines.len());
            for line in lines {
                println!("{}", line);
            }
        }

        if once {
            return Ok(());
        }

        tokio::select! {
            _ = tokio::signal::ctrl_c() => return Ok(()),
            _ = tokio::time::sleep(interval) => {}
        }
    }
}

/// One line per running graph node: name, class, rate, id.
fn running_nodes(snapshot: &GraphSnapshot) -> Vec<String> {
    snapshot
        .nodes
        .iter()
        .filter(|node| node.is_graph_node() && node.state == NodeState::Running)
        .map(|node| {
            let rate = match node.prop(keys::AUDIO_RATE) {
                Some(Value::Number(n)) => n.to_string(),
                Some(Value::String(s)) => s.clone(),
                _ => "No Rate".to_string(),
            };
            format!(
                "{:<32} {:<24} {:>8}  id {}",
                node.display_name(),
                node.media_class().unwrap_or("-"),
                rate,
                node.id
            )
        })
        .collect()
}

/// Force a rate once and give the quantum back to the server.
pub async fn set(config: &RateConfig, rate: u32) -> Result<()> {
    if rate == 0 {
        bail!("rate must be greater than zero");
    }
    console::warn_if_unusual(rate);

    let metadata = PwMetadata::from_config(&config.commands);
    metadata
        .set_forced_rate(rate)
        .await
        .with_context(|| format!("Failed to force clock rate {}", rate))?;
    if let Err(e) = metadata.set_forced_quantum(0).await {
        warn!("rate set, but the quantum could not be reset: {}", e);
    }

    println!("clock forced to {} Hz", rate);
    Ok(())
}

/// Print the effective configuration and where it came from.
pub fn show_config(config: &RateConfig, sources: &ConfigSources) {
    if sources.files.is_empty() {
        println!("# No config files found, using defaults");
    } else {
        println!("# Loaded from:");
        for file in &sources.files {
            println!("#   {}", file.display());
        }
    }
    if !sources.env_overrides.is_empty() {
        println!("# Environment overrides:");
        for var in &sources.env_overrides {
            println!("#   {}", var);
        }
    }
    println!();
    print!("{}", config.to_toml());
}

//! ratesync - follow the playing stream's sample rate with the PipeWire clock
//!
//! Subcommands:
//! - `ratesync run` - Run the monitor with a console front end
//! - `ratesync scan` - List running nodes (diagnostics)
//! - `ratesync set <rate>` - Force a clock rate once and exit
//! - `ratesync config` - Show the effective configuration

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rateconf::RateConfig;

mod commands;
mod console;
mod telemetry;

#[derive(Parser)]
#[command(name = "ratesync")]
#[command(about = "Keep the PipeWire clock rate in step with the active playback stream")]
#[command(version)]
struct Cli {
    /// Config file to use instead of ./ratesync.toml
    #[arg(short, long, global = true, env = "RATESYNC_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch the graph and switch the clock rate automatically
    Run {
        /// Start in strict bit-perfect mode (rate and quantum follow the stream)
        #[arg(long)]
        strict: bool,

        /// Start pinned to this rate instead of following streams
        #[arg(long, value_name = "HZ", conflicts_with = "strict")]
        manual: Option<u32>,

        /// Start with automatic switching off
        #[arg(long, conflicts_with = "strict")]
        no_auto: bool,

        /// Do not read commands from stdin
        #[arg(long)]
        no_console: bool,
    },

    /// Print every running node, like a one-line pw-top
    Scan {
        /// Print one listing and exit
        #[arg(long)]
        once: bool,

        /// Seconds between listings
        #[arg(short, long, default_value = "3")]
        interval: u64,
    },

    /// Force the clock rate once (quantum back to auto) and exit
    Set {
        /// Sample rate in Hz
        rate: u32,
    },

    /// Show the effective configuration and where it came from
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (config, sources) = RateConfig::load_with_sources_from(cli.config.as_deref())
        .context("Failed to load configuration")?;
    telemetry::init(&config.telemetry.log_level);

    match cli.command {
        Commands::Run {
            strict,
            manual,
            no_auto,
            no_console,
        } => {
            let options = commands::RunOptions {
                strict,
                manual,
                no_auto,
                console: !no_console,
            };
            commands::run(&config, options).await?;
        }
        Commands::Scan { once, interval } => {
            commands::scan(&config, once, interval).await?;
        }
        Commands::Set { rate } => {
            commands::set(&config, rate).await?;
        }
        Commands::Config => {
            commands::show_config(&config, &sources);
        }
    }

    Ok(())
}

//! Minimal terminal front end: prints engine events and turns stdin lines
//! into control commands.

use std::io::{self, BufRead};
use std::thread;

use ratesync::{AudioFormat, ControlCommand, EngineEvent, MonitorHandle};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::mpsc;
use tracing::{debug, warn};

pub const HELP: &str = "\
commands:
  auto on|off     toggle automatic switching
  strict on|off   toggle strict bit-perfect mode
  rate <hz>       pin the clock to a rate (manual override)
  help            show this list
  quit            stop ratesync";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleCommand {
    Control(ControlCommand),
    Help,
    Quit,
}

pub fn parse_command(line: &str) -> Result<ConsoleCommand, String> {
    let mut words = line.split_whitespace();
    let verb = words.next().ok_or_else(|| "empty command".to_string())?;
    let arg = words.next();

    let toggle = |arg: Option<&str>| match arg {
        Some("on") | Some("true") | Some("1") => Ok(true),
        Some("off") | Some("false") | Some("0") => Ok(false),
        Some(other) => Err(format!("expected on or off, got {:?}", other)),
        None => Err(format!("{} needs on or off", verb)),
    };

    match verb {
        "auto" => Ok(ConsoleCommand::Control(ControlCommand::SetAutoMode(toggle(arg)?))),
        "strict" => Ok(ConsoleCommand::Control(ControlCommand::SetStrictMode(toggle(arg)?))),
        "rate" => {
            let rate = arg
                .ok_or_else(|| "rate needs a value in Hz".to_string())?
                .parse::<u32>()
                .ok()
                .filter(|r| *r > 0)
                .ok_or_else(|| format!("not a sample rate: {:?}", arg.unwrap_or_default()))?;
            Ok(ConsoleCommand::Control(ControlCommand::ApplyManualRate(rate)))
        }
        "help" | "?" => Ok(ConsoleCommand::Help),
        "quit" | "exit" | "q" => Ok(ConsoleCommand::Quit),
        other => Err(format!("unknown command {:?} (try help)", other)),
    }
}

/// Read stdin on its own thread and hand lines over a channel.
///
/// Blocking stdin reads cannot be cancelled, so the thread is detached and
/// never joined; it dies with the process.
pub fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(16);
    let spawned = thread::Builder::new()
        .name("ratesync-stdin".to_string())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                match line {
                    Ok(line) => {
                        if tx.blocking_send(line).is_err() {
                            return;
                        }
                    }
                    Err(e) => {
                        warn!("failed to read stdin: {}", e);
                        return;
                    }
                }
            }
            debug!("stdin closed, console input stopped");
        });
    if let Err(e) = spawned {
        warn!("console input unavailable: {}", e);
    }
    rx
}

/// Forward console lines to the monitor until `quit`, end of input, or the
/// monitor is cancelled.
pub async fn forward_commands(mut lines: mpsc::Receiver<String>, handle: MonitorHandle) {
    let cancel = handle.cancellation_token();

    loop {
        let line = tokio::select! {
            _ = cancel.cancelled() => return,
            line = lines.recv() => match line {
                Some(line) => line,
                None => return,
            },
        };
        if line.trim().is_empty() {
            continue;
        }

        match parse_command(&line) {
            Ok(ConsoleCommand::Control(command)) => {
                if let Some(rate) = manual_rate(&command) {
                    warn_if_unusual(rate);
                }
                if handle.send(command).await.is_err() {
                    return;
                }
            }
            Ok(ConsoleCommand::Help) => println!("{}", HELP),
            Ok(ConsoleCommand::Quit) => {
                handle.shutdown();
                return;
            }
            Err(message) => println!("{}", message),
        }
    }
}

fn manual_rate(command: &ControlCommand) -> Option<u32> {
    match command {
        ControlCommand::ApplyManualRate(rate) => Some(*rate),
        _ => None,
    }
}

pub fn warn_if_unusual(rate: u32) {
    if !ratesync::MANUAL_RATE_PRESETS.contains(&rate) {
        warn!(rate, "not a common rate; the device may refuse it");
    }
}

/// Print events until the monitor goes away. Repeated identical stream
/// reports are collapsed so the console only shows changes.
pub async fn print_events(mut events: broadcast::Receiver<EngineEvent>) {
    let mut last_line = String::new();
    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(skipped)) => {
                debug!(skipped, "console fell behind");
                continue;
            }
            Err(RecvError::Closed) => return,
        };

        let line = render_event(&event);
        if line != last_line {
            println!("{}", line);
            last_line = line;
        }
    }
}

pub fn render_event(event: &EngineEvent) -> String {
    match event {
        EngineEvent::StreamActive {
            rate,
            app_name,
            format,
            latency_ms,
            ..
        } => format!(
            "{} Hz  {}  {}  {}",
            rate,
            app_name,
            describe_format(format),
            latency_ms
                .map(|ms| format!("{:.1} ms", ms))
                .unwrap_or_else(|| "-- ms".to_string())
        ),
        EngineEvent::Idle => "Idle, scanning...".to_string(),
        EngineEvent::ModeChanged { mode } => format!("mode: {}", mode),
        EngineEvent::ManualRateApplied { rate } => format!("{} Hz (manual)", rate),
    }
}

pub fn describe_format(format: &AudioFormat) -> &str {
    match format {
        AudioFormat::F32LE => "32-bit Float",
        AudioFormat::S32LE => "32-bit Int",
        AudioFormat::S24LE => "24-bit",
        AudioFormat::S16LE => "16-bit",
        AudioFormat::S24_32LE => "24/32-bit",
        other => other.as_str(),
    }
}

//! Logging setup for the ratesync binary.

use tracing_subscriber::EnvFilter;

/// Install a fmt subscriber filtered by `log_level`, writing to stderr so the
/// console's stdout stays readable.
///
/// `log_level` is any EnvFilter directive string; `RUST_LOG` has already been
/// folded into it by the config loader. An unparseable directive falls back
/// to `info` rather than refusing to start.
pub fn init(log_level: &str) {
    let filter = EnvFilter::try_new(log_level).unwrap_or_else(|e| {
        eprintln!("invalid log filter {:?} ({}), using info", log_level, e);
        EnvFilter::new("info")
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

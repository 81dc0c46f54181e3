//! Property resolution for a selected stream node.
//!
//! Rate resolution is a fixed pipeline; each tier runs only while the rate is
//! still unknown:
//!
//! 1. `audio.rate` as a number (or digit string)
//! 2. `node.rate` as `num/den` (the denominator is the rate) or a digit string
//! 3. the deep query, which is also issued when the format is unknown
//!
//! Latency and quantum come from `node.latency` independently of the rate.

use serde_json::Value;
use tracing::{debug, warn};

use crate::graph::{keys, Node};
use crate::probe::{self, ProbeReport};
use crate::sources::NodeProbe;
use crate::{AudioFormat, Resolved, ResolvedStreamInfo};

/// Tiers 1 and 2 plus latency, without touching the server.
pub fn resolve_direct(node: &Node) -> ResolvedStreamInfo {
    let rate = direct_rate(node.prop(keys::AUDIO_RATE)).or(fraction_rate(node.prop(keys::NODE_RATE)));
    let format = node
        .prop_str(keys::AUDIO_FORMAT)
        .map(AudioFormat::from_tag)
        .unwrap_or_default();
    let latency = node.prop(keys::NODE_LATENCY).and_then(parse_latency);

    ResolvedStreamInfo {
        node_id: node.id,
        rate,
        format,
        latency_ms: latency.map(|l| l.millis),
        quantum: latency.map(|l| l.samples).unwrap_or(0),
        display_name: node.display_name(),
    }
}

/// Fold a deep-query report into a partially resolved stream.
///
/// The probed rate only fills a rate that is still unknown. A known probed
/// format replaces whatever `audio.format` said, since the negotiated format
/// is what the server is actually running.
pub fn merge_probe(info: &mut ResolvedStreamInfo, report: ProbeReport) {
    if info.valid_rate().is_none() {
        info.rate = report
            .rate
            .filter(|r| *r > 0)
            .map(Resolved::Probe)
            .unwrap_or(Resolved::Unknown);
    }
    if !report.format.is_unknown() {
        info.format = report.format;
    }
}

/// Run the full pipeline, querying `probe` only when direct fields fall short.
///
/// A failed query is logged and leaves the affected fields unknown.
pub async fn resolve(node: &Node, probe: &dyn NodeProbe) -> ResolvedStreamInfo {
    let mut info = resolve_direct(node);
    if !info.needs_probe() {
        return info;
    }

    debug!(node = node.id, "direct properties incomplete, probing format params");
    match probe.format_params(node.id).await {
        Ok(output) => merge_probe(&mut info, probe::parse_format_params(&output)),
        Err(e) => warn!(node = node.id, "format probe failed: {}", e),
    }
    info
}

/// Tier 1: a non-zero number, or a string of digits.
fn direct_rate(value: Option<&Value>) -> Resolved<u32> {
    let rate = match value {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => parse_digits(s),
        _ => None,
    };
    positive(rate).map(Resolved::Direct).unwrap_or_default()
}

/// Tier 2: `"1/48000"` resolves to the denominator, `"48000"` to itself.
fn fraction_rate(value: Option<&Value>) -> Resolved<u32> {
    let Some(Value::String(raw)) = value else {
        return Resolved::Unknown;
    };
    let rate = match raw.split_once('/') {
        Some((_, den)) => parse_digits(den),
        None => parse_digits(raw),
    };
    positive(rate).map(Resolved::Fraction).unwrap_or_default()
}

/// Parse a rate written as a fraction property, e.g. `node.rate`.
pub fn parse_fraction_rate(raw: &str) -> Option<u32> {
    fraction_rate(Some(&Value::String(raw.to_string()))).get()
}

fn parse_digits(s: &str) -> Option<u64> {
    let s = s.trim();
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

fn positive(rate: Option<u64>) -> Option<u32> {
    rate.filter(|r| *r > 0).and_then(|r| u32::try_from(r).ok())
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Latency {
    pub samples: u32,
    /// Rounded to one decimal place.
    pub millis: f64,
}

/// `"samples/frequency"` into milliseconds and a quantum.
pub fn parse_latency(value: &Value) -> Option<Latency> {
    let raw = match value {
        Value::String(s) => s.as_str(),
        _ => return None,
    };
    let (samples, freq) = raw.split_once('/')?;
    let samples: f64 = samples.trim().parse().ok()?;
    let freq: f64 = freq.trim().parse().ok()?;
    if !samples.is_finite() || samples < 0.0 || !freq.is_finite() || freq <= 0.0 {
        return None;
    }

    let millis = (samples / freq * 1000.0 * 10.0).round() / 10.0;
    Some(Latency {
        samples: samples as u32,
        millis,
    })
}

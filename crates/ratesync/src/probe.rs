//! Text scraping of `pw-cli enum-params <id> Format` output.
//!
//! The output is a human-oriented pod dump, not a stable format. We only rely
//! on three markers and treat anything else as noise:
//!
//! - a `rate` key followed (possibly lines later) by `Int <n>`
//! - `AudioFormat:<TAG>` inside an enum name such as `Spa:Enum:AudioFormat:F32LE`
//! - a bare parenthesised format code such as `(S16LE)`
//!
//! When PipeWire changes how it prints pods, the fixtures in the tests below
//! are the place to add the new shape.

use regex::Regex;
use std::sync::OnceLock;

use crate::AudioFormat;

/// Fields recovered from a deep query. Either may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeReport {
    pub rate: Option<u32>,
    pub format: AudioFormat,
}

fn rate_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?is)rate.*?Int\s+(\d+)").expect("static regex"))
}

fn format_marker_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"AudioFormat:([A-Za-z0-9_]+)").expect("static regex"))
}

fn format_code_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\((F32LE|S16LE|S24LE|S32LE|S24_32LE)\)").expect("static regex")
    })
}

/// Extract rate and format from a deep-query blob.
pub fn parse_format_params(output: &str) -> ProbeReport {
    ProbeReport {
        rate: scrape_rate(output),
        format: scrape_format(output),
    }
}

/// First integer after a case-insensitive `rate ... Int`.
pub fn scrape_rate(output: &str) -> Option<u32> {
    rate_pattern()
        .captures(output)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Format after `AudioFormat:`, else the first parenthesised known code.
pub fn scrape_format(output: &str) -> AudioFormat {
    if let Some(tag) = format_marker_pattern().captures(output).and_then(|c| c.get(1)) {
        return AudioFormat::from_tag(tag.as_str());
    }
    format_code_pattern()
        .captures(output)
        .and_then(|c| c.get(1))
        .map(|m| AudioFormat::from_tag(m.as_str()))
        .unwrap_or_default()
}

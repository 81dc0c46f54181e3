use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Sample formats PipeWire reports for raw audio streams.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AudioFormat {
    F32LE,
    S16LE,
    S24LE,
    S32LE,
    S24_32LE,
    /// A tag PipeWire reported that we have no special handling for.
    Other(String),
    #[default]
    Unknown,
}

impl AudioFormat {
    /// Codes recognised when scraping parenthesised names out of `pw-cli` output.
    pub const KNOWN_CODES: [&'static str; 5] = ["F32LE", "S16LE", "S24LE", "S32LE", "S24_32LE"];

    /// Map a raw tag onto a format. Empty and `Unknown` tags stay unknown.
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim() {
            "F32LE" => Self::F32LE,
            "S16LE" => Self::S16LE,
            "S24LE" => Self::S24LE,
            "S32LE" => Self::S32LE,
            "S24_32LE" => Self::S24_32LE,
            "" | "Unknown" | "unknown" => Self::Unknown,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::F32LE => "F32LE",
            Self::S16LE => "S16LE",
            Self::S24LE => "S24LE",
            Self::S32LE => "S32LE",
            Self::S24_32LE => "S24_32LE",
            Self::Other(tag) => tag,
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A value together with the resolution tier that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Resolved<T> {
    /// Read straight from a numeric node property.
    Direct(T),
    /// Parsed out of a fraction-style string property.
    Fraction(T),
    /// Scraped from the deep per-node query.
    Probe(T),
    #[default]
    Unknown,
}

impl<T: Copy> Resolved<T> {
    pub fn get(&self) -> Option<T> {
        match *self {
            Self::Direct(v) | Self::Fraction(v) | Self::Probe(v) => Some(v),
            Self::Unknown => None,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    /// Keep `self` when known, otherwise take `other`.
    pub fn or(self, other: Self) -> Self {
        if self.is_unknown() {
            other
        } else {
            self
        }
    }
}

/// Normalised view of the selected stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedStreamInfo {
    pub node_id: u32,
    pub rate: Resolved<u32>,
    pub format: AudioFormat,
    pub latency_ms: Option<f64>,
    /// Frames per cycle the stream asked for; 0 lets the server decide.
    pub quantum: u32,
    pub display_name: String,
}

impl ResolvedStreamInfo {
    /// The rate, if it is a usable positive value.
    pub fn valid_rate(&self) -> Option<u32> {
        self.rate.get().filter(|r| *r > 0)
    }

    /// Whether the deep query has anything left to fill in.
    pub fn needs_probe(&self) -> bool {
        self.valid_rate().is_none() || self.format.is_unknown()
    }
}

/// Operating mode of the decision engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Auto,
    ManualOverride,
    Strict,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::ManualOverride => "manual_override",
            Self::Strict => "strict",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(Self::Auto),
            "manual_override" | "manual" => Ok(Self::ManualOverride),
            "strict" => Ok(Self::Strict),
            _ => Err(format!("Unknown mode: {}", s)),
        }
    }
}

//! Graph snapshot model, decoded from `pw-dump` JSON.
//!
//! A snapshot is read once per poll cycle and thrown away afterwards. Decoding
//! is forgiving at the element level: entries that are not objects, or that
//! lack an id or type, are skipped rather than failing the whole snapshot.
//! Only a document that is not a JSON array at all is an error.

use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

/// Object type PipeWire uses for graph nodes.
pub const NODE_TYPE: &str = "PipeWire:Interface:Node";

/// Media class marker for application playback streams.
pub const OUTPUT_STREAM_CLASS: &str = "Stream/Output/Audio";

pub mod keys {
    pub const MEDIA_CLASS: &str = "media.class";
    pub const NODE_NAME: &str = "node.name";
    pub const APPLICATION_NAME: &str = "application.name";
    pub const AUDIO_RATE: &str = "audio.rate";
    pub const AUDIO_FORMAT: &str = "audio.format";
    pub const NODE_RATE: &str = "node.rate";
    pub const NODE_LATENCY: &str = "node.latency";
}

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("snapshot is not a JSON array")]
    NotAnArray,
}

/// Lifecycle state reported in a node's info block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeState {
    Running,
    Idle,
    Suspended,
    Creating,
    Error,
    Other(String),
    Missing,
}

impl NodeState {
    fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Self::Missing;
        };
        match raw.to_ascii_lowercase().as_str() {
            "running" => Self::Running,
            "idle" => Self::Idle,
            "suspended" => Self::Suspended,
            "creating" => Self::Creating,
            "error" => Self::Error,
            other => Self::Other(other.to_string()),
        }
    }
}

/// One PipeWire object from the dump.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: u32,
    pub object_type: String,
    pub state: NodeState,
    pub props: Map<String, Value>,
}

impl Node {
    pub fn is_graph_node(&self) -> bool {
        self.object_type == NODE_TYPE
    }

    pub fn media_class(&self) -> Option<&str> {
        self.prop_str(keys::MEDIA_CLASS)
    }

    pub fn prop(&self, key: &str) -> Option<&Value> {
        self.props.get(key)
    }

    pub fn prop_str(&self, key: &str) -> Option<&str> {
        self.props.get(key).and_then(Value::as_str)
    }

    /// Best-effort label: application name, then node name.
    pub fn display_name(&self) -> String {
        self.prop_str(keys::APPLICATION_NAME)
            .or_else(|| self.prop_str(keys::NODE_NAME))
            .unwrap_or("Unknown")
            .to_string()
    }
}

/// Ordered nodes from one atomic graph read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphSnapshot {
    pub nodes: Vec<Node>,
}

impl GraphSnapshot {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Decode `pw-dump` output. Blank output is an empty graph.
    pub fn from_dump(text: &str) -> Result<Self, SnapshotError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }

        let value: Value = serde_json::from_str(text)?;
        let Value::Array(entries) = value else {
            return Err(SnapshotError::NotAnArray);
        };

        let total = entries.len();
        let nodes: Vec<Node> = entries.into_iter().filter_map(decode_entry).collect();
        if nodes.len() != total {
            debug!("skipped {} malformed dump entries", total - nodes.len());
        }

        Ok(Self { nodes })
    }
}

#[derive(Deserialize)]
struct RawObject {
    id: u32,
    #[serde(rename = "type")]
    object_type: String,
    #[serde(default)]
    info: Option<RawInfo>,
}

#[derive(Deserialize, Default)]
struct RawInfo {
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    props: Option<Map<String, Value>>,
}

fn decode_entry(entry: Value) -> Option<Node> {
    let raw: RawObject = serde_json::from_value(entry).ok()?;
    let info = raw.info.unwrap_or_default();

    Some(Node {
        id: raw.id,
        object_type: raw.object_type,
        state: NodeState::parse(info.state.as_deref()),
        props: info.props.unwrap_or_default(),
    })
}

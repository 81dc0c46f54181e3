//! Collaborators the engine drives: graph snapshots, deep node queries and
//! clock writes. The engine only sees these traits; [`pipewire`] implements
//! them on top of the stock PipeWire command line tools.

pub mod pipewire;

use async_trait::async_trait;
use thiserror::Error;

use crate::graph::{GraphSnapshot, SnapshotError};

pub use pipewire::{PwCliProbe, PwDump, PwMetadata};

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to run {command}: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    #[error("{command} exited with status {status}: {stderr}")]
    Failed {
        command: String,
        status: i32,
        stderr: String,
    },

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

/// One atomic read of the audio graph.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn snapshot(&self) -> Result<GraphSnapshot, SourceError>;
}

/// Deep per-node query returning the node's negotiated format as free text.
#[async_trait]
pub trait NodeProbe: Send + Sync {
    async fn format_params(&self, node_id: u32) -> Result<String, SourceError>;
}

/// Writes the server's forced clock settings. Both calls are idempotent.
#[async_trait]
pub trait ClockApplier: Send + Sync {
    async fn set_forced_rate(&self, rate: u32) -> Result<(), SourceError>;

    /// `0` hands the quantum back to the server.
    async fn set_forced_quantum(&self, quantum: u32) -> Result<(), SourceError>;
}

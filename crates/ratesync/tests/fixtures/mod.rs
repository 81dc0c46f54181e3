#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ratesync::{
    ClockApplier, Collaborators, GraphSnapshot, NodeProbe, SnapshotSource, SourceError,
};

/// `pw-dump` with a sink and a 96 kHz Strawberry stream whose rate and format
/// are both in the props.
pub const DUMP_STRAWBERRY_96K: &str = r#"[
    {
        "id": 0,
        "type": "PipeWire:Interface:Core",
        "info": { "name": "pipewire-0" }
    },
    {
        "id": 40,
        "type": "PipeWire:Interface:Node",
        "info": {
            "state": "running",
            "props": {
                "node.name": "alsa_output.usb-Topping_D10s",
                "media.class": "Audio/Sink",
                "audio.rate": 48000
            }
        }
    },
    {
        "id": 58,
        "type": "PipeWire:Interface:Node",
        "info": {
            "state": "running",
            "props": {
                "application.name": "Strawberry",
                "node.name": "strawberry",
                "media.class": "Stream/Output/Audio",
                "audio.rate": 96000,
                "audio.format": "S24LE",
                "node.latency": "512/48000"
            }
        }
    }
]"#;

/// A Firefox stream that only advertises `node.rate`, with no format.
pub const DUMP_FIREFOX_FRACTION: &str = r#"[
    {
        "id": 71,
        "type": "PipeWire:Interface:Node",
        "info": {
            "state": "running",
            "props": {
                "application.name": "Firefox",
                "media.class": "Stream/Output/Audio",
                "node.rate": "1/44100",
                "node.latency": "1024/44100"
            }
        }
    }
]"#;

/// A paused stream only: nothing is actually playing.
pub const DUMP_PAUSED: &str = r#"[
    {
        "id": 58,
        "type": "PipeWire:Interface:Node",
        "info": {
            "state": "idle",
            "props": {
                "application.name": "Strawberry",
                "media.class": "Stream/Output/Audio",
                "audio.rate": 96000
            }
        }
    }
]"#;

/// `pw-cli enum-params 71 Format` for the Firefox stream.
pub const FIREFOX_FORMAT_PARAMS: &str = r#"  Object: size 200, type Spa:Pod:Object:Param:Format (262147), id Spa:Enum:ParamId:Format (4)
    Prop: key Spa:Pod:Object:Param:Format:mediaType (1), flags 00000000
      Id 1        (Spa:Enum:MediaType:audio)
    Prop: key Spa:Pod:Object:Param:Format:mediaSubtype (2), flags 00000000
      Id 1        (Spa:Enum:MediaSubtype:raw)
    Prop: key Spa:Pod:Object:Param:Format:Audio:format (65537), flags 00000000
      Id 283      (Spa:Enum:AudioFormat:F32LE)
    Prop: key Spa:Pod:Object:Param:Format:Audio:rate (65539), flags 00000000
      Int 44100
    Prop: key Spa:Pod:Object:Param:Format:Audio:channels (65540), flags 00000000
      Int 2
"#;

pub fn snapshot(dump: &str) -> GraphSnapshot {
    GraphSnapshot::from_dump(dump).expect("fixture dump should decode")
}

/// Hands out queued snapshots in order, then empty graphs forever.
#[derive(Default)]
pub struct ScriptedSnapshots {
    queue: Mutex<VecDeque<Result<GraphSnapshot, String>>>,
}

impl ScriptedSnapshots {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, dump: &str) {
        self.queue.lock().unwrap().push_back(Ok(snapshot(dump)));
    }

    pub fn push_empty(&self) {
        self.queue.lock().unwrap().push_back(Ok(GraphSnapshot::default()));
    }

    pub fn push_failure(&self, stderr: &str) {
        self.queue.lock().unwrap().push_back(Err(stderr.to_string()));
    }

    /// Snapshots not yet taken.
    pub fn remaining(&self) -> usize {
        self.queue.lock().unwrap().len()
    }
}

#[async_trait]
impl SnapshotSource for ScriptedSnapshots {
    async fn snapshot(&self) -> Result<GraphSnapshot, SourceError> {
        match self.queue.lock().unwrap().pop_front() {
            Some(Ok(snapshot)) => Ok(snapshot),
            Some(Err(stderr)) => Err(SourceError::Failed {
                command: "pw-dump".to_string(),
                status: 1,
                stderr,
            }),
            None => Ok(GraphSnapshot::default()),
        }
    }
}

/// Deep query answers keyed by node id; anything else is empty output.
#[derive(Default)]
pub struct CannedProbe {
    answers: HashMap<u32, String>,
    pub queried: Mutex<Vec<u32>>,
}

impl CannedProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, node_id: u32, output: &str) -> Self {
        self.answers.insert(node_id, output.to_string());
        self
    }
}

#[async_trait]
impl NodeProbe for CannedProbe {
    async fn format_params(&self, node_id: u32) -> Result<String, SourceError> {
        self.queried.lock().unwrap().push(node_id);
        Ok(self.answers.get(&node_id).cloned().unwrap_or_default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockCall {
    Rate(u32),
    Quantum(u32),
}

/// Records every clock write. Rate writes can be made to fail.
#[derive(Default)]
pub struct RecordingClock {
    pub calls: Mutex<Vec<ClockCall>>,
    fail_rate: Mutex<bool>,
}

impl RecordingClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_rate_writes(&self, fail: bool) {
        *self.fail_rate.lock().unwrap() = fail;
    }

    pub fn calls(&self) -> Vec<ClockCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn rate_writes(&self) -> Vec<u32> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ClockCall::Rate(rate) => Some(rate),
                ClockCall::Quantum(_) => None,
            })
            .collect()
    }
}

#[async_trait]
impl ClockApplier for RecordingClock {
    async fn set_forced_rate(&self, rate: u32) -> Result<(), SourceError> {
        if *self.fail_rate.lock().unwrap() {
            return Err(SourceError::Failed {
                command: "pw-metadata".to_string(),
                status: 1,
                stderr: "no such metadata".to_string(),
            });
        }
        self.calls.lock().unwrap().push(ClockCall::Rate(rate));
        Ok(())
    }

    async fn set_forced_quantum(&self, quantum: u32) -> Result<(), SourceError> {
        self.calls.lock().unwrap().push(ClockCall::Quantum(quantum));
        Ok(())
    }
}

/// Fakes wired together, with handles kept for assertions.
pub struct TestFixture {
    pub snapshots: Arc<ScriptedSnapshots>,
    pub probe: Arc<CannedProbe>,
    pub clock: Arc<RecordingClock>,
}

impl TestFixture {
    pub fn new() -> Self {
        Self::with_probe(CannedProbe::new().with(71, FIREFOX_FORMAT_PARAMS))
    }

    pub fn with_probe(probe: CannedProbe) -> Self {
        Self {
            snapshots: Arc::new(ScriptedSnapshots::new()),
            probe: Arc::new(probe),
            clock: Arc::new(RecordingClock::new()),
        }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            snapshots: self.snapshots.clone(),
            probe: self.probe.clone(),
            clock: self.clock.clone(),
        }
    }
}

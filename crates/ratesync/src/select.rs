//! Picks the one stream the clock should follow.
//!
//! Selection is first match in snapshot order. When several applications play
//! at once, whichever PipeWire lists first wins.

use rateconf::SelectionPolicy;
use tracing::debug;

use crate::graph::{GraphSnapshot, Node, NodeState, OUTPUT_STREAM_CLASS};
use crate::resolve;
use crate::sources::NodeProbe;
use crate::ResolvedStreamInfo;

/// A running graph node whose media class marks it as audio playback.
pub fn is_candidate(node: &Node) -> bool {
    node.is_graph_node()
        && node.state == NodeState::Running
        && node
            .media_class()
            .is_some_and(|class| class.contains(OUTPUT_STREAM_CLASS))
}

/// All candidates, in snapshot order.
pub fn candidates(snapshot: &GraphSnapshot) -> impl Iterator<Item = &Node> {
    snapshot.nodes.iter().filter(|n| is_candidate(n))
}

/// First candidate in snapshot order, if any.
pub fn first_candidate(snapshot: &GraphSnapshot) -> Option<&Node> {
    candidates(snapshot).next()
}

/// Select and resolve the active stream.
///
/// Returns `None` when nothing usable is playing, which is the idle signal.
/// With [`SelectionPolicy::FirstCandidate`] only the first candidate is
/// resolved; if its rate stays unknown the cycle counts as empty even when a
/// later stream would have resolved. [`SelectionPolicy::FirstResolved`]
/// keeps going until a stream yields a valid rate.
pub async fn find_active_stream(
    snapshot: &GraphSnapshot,
    policy: SelectionPolicy,
    probe: &dyn NodeProbe,
) -> Option<ResolvedStreamInfo> {
    for node in candidates(snapshot) {
        let info = resolve::resolve(node, probe).await;
        if info.valid_rate().is_some() {
            return Some(info);
        }

        debug!(node = node.id, name = %info.display_name, "running stream has no usable rate");
        if policy == SelectionPolicy::FirstCandidate {
            return None;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NODE_TYPE;
    use crate::sources::SourceError;
    use crate::{AudioFormat, Resolved};
    use async_trait::async_trait;
    use serde_json::{json, Map, Value};

    struct NoProbe;

    #[async_trait]
    impl NodeProbe for NoProbe {
        async fn format_params(&self, _node_id: u32) -> Result<String, SourceError> {
            Ok(String::new())
        }
    }

    fn node(id: u32, object_type: &str, state: NodeState, props: Value) -> Node {
        let props: Map<String, Value> = serde_json::from_value(props).unwrap();
        Node {
            id,
            object_type: object_type.to_string(),
            state,
            props,
        }
    }

    fn stream(id: u32, props: Value) -> Node {
        let mut n = node(id, NODE_TYPE, NodeState::Running, props);
        n.props
            .insert("media.class".to_string(), Value::from("Stream/Output/Audio"));
        n
    }

    #[test]
    fn test_candidate_filter() {
        let sink = node(
            40,
            NODE_TYPE,
            NodeState::Running,
            json!({ "media.class": "Audio/Sink" }),
        );
        let capture = node(
            41,
            NODE_TYPE,
            NodeState::Running,
            json!({ "media.class": "Stream/Input/Audio" }),
        );
        let paused = node(
            42,
            NODE_TYPE,
            NodeState::Idle,
            json!({ "media.class": "Stream/Output/Audio" }),
        );
        let port = node(
            43,
            "PipeWire:Interface:Port",
            NodeState::Running,
            json!({ "media.class": "Stream/Output/Audio" }),
        );
        let unclassified = node(44, NODE_TYPE, NodeState::Running, json!({}));

        for n in [&sink, &capture, &paused, &port, &unclassified] {
            assert!(!is_candidate(n), "node {} should not be a candidate", n.id);
        }
        assert!(is_candidate(&stream(45, json!({}))));
    }

    #[test]
    fn test_first_candidate_follows_snapshot_order() {
        let snapshot = GraphSnapshot::new(vec![
            node(1, NODE_TYPE, NodeState::Suspended, json!({ "media.class": "Stream/Output/Audio" })),
            stream(9, json!({ "audio.rate": 44100 })),
            stream(3, json!({ "audio.rate": 192000 })),
        ]);
        assert_eq!(first_candidate(&snapshot).map(|n| n.id), Some(9));
        assert_eq!(candidates(&snapshot).count(), 2);
    }

    #[tokio::test]
    async fn test_empty_snapshot_is_idle() {
        let snapshot = GraphSnapshot::default();
        let found = find_active_stream(&snapshot, SelectionPolicy::FirstCandidate, &NoProbe).await;
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_first_match_not_best_match() {
        let snapshot = GraphSnapshot::new(vec![
            stream(9, json!({ "audio.rate": 44100, "audio.format": "S16LE" })),
            stream(3, json!({ "audio.rate": 192000, "audio.format": "S32LE" })),
        ]);
        let found = find_active_stream(&snapshot, SelectionPolicy::FirstCandidate, &NoProbe)
            .await
            .unwrap();
        assert_eq!(found.node_id, 9);
        assert_eq!(found.rate, Resolved::Direct(44100));
        assert_eq!(found.format, AudioFormat::S16LE);
    }

    // The two policies disagree only when the first running stream cannot be
    // resolved; this pins both behaviours.
    #[tokio::test]
    async fn test_unresolvable_first_stream_by_policy() {
        let snapshot = GraphSnapshot::new(vec![
            stream(9, json!({ "node.rate": "garbage" })),
            stream(3, json!({ "audio.rate": 48000 })),
        ]);

        let strict_order =
            find_active_stream(&snapshot, SelectionPolicy::FirstCandidate, &NoProbe).await;
        assert!(strict_order.is_none());

        let keep_scanning =
            find_active_stream(&snapshot, SelectionPolicy::FirstResolved, &NoProbe).await;
        assert_eq!(keep_scanning.map(|s| s.node_id), Some(3));
    }
}

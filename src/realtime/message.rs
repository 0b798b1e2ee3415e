/// Wire frame schema
///
/// Every frame is a JSON text object with a `type` discriminator. Control
/// frames (keepalive, subscribe management) carry no topic id and never reach
/// topic handlers; update frames carry `topic_id` plus an open-ended update
/// kind, an optional `action: "replace"` tag, an optional ordering key `ts`
/// and an optional `msg_id` used only for wire-level dedup.
use serde::Serialize;
use serde_json::Value;

use crate::errors::{SyncError, SyncResult};

// ============================================================================
// CLIENT FRAMES (client -> server)
// ============================================================================

/// Frames this layer produces
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    /// Register interest in a topic
    Subscribe { topic_id: String },

    /// Drop interest in a topic
    Unsubscribe { topic_id: String },

    /// Liveness probe
    Ping,

    /// Immediate reply to a server probe
    Pong,
}

impl ClientFrame {
    /// Serialize to JSON text
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

// ============================================================================
// SERVER FRAMES (server -> client)
// ============================================================================

/// Append vs full-replace semantics for an update frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateAction {
    Append,
    Replace,
}

/// A topic-scoped application update
#[derive(Debug, Clone)]
pub struct UpdateFrame {
    /// Topic this update belongs to
    pub topic_id: String,

    /// Update kind (the frame's `type` value, open-ended)
    pub kind: String,

    /// Append (default) or full replace
    pub action: UpdateAction,

    /// Ordering key in unix milliseconds, if the frame carries one
    pub ts: Option<i64>,

    /// Payload: a single item or an array of items
    pub data: Value,
}

/// Classified inbound frame
#[derive(Debug, Clone)]
pub enum ServerFrame {
    /// Server liveness probe; answered immediately with a pong
    Ping,

    /// Acknowledgment of our probe
    Pong,

    /// Topic-state invalidation: client-side incremental state for the topic
    /// is no longer trustworthy and must be re-fetched
    Truncate { topic_id: String },

    /// Topic-scoped application update
    Update(UpdateFrame),

    /// Connection-scoped control frame this layer does not act on
    Control { kind: String },
}

/// Inbound frame with its optional wire-level message id
#[derive(Debug, Clone)]
pub struct ParsedFrame {
    pub msg_id: Option<String>,
    pub frame: ServerFrame,
}

/// Parse and classify an inbound text frame
///
/// A frame without a `topic_id` is connection-scoped; one with a `topic_id`
/// and a non-control `type` is an application update of that kind.
pub fn parse_frame(text: &str) -> SyncResult<ParsedFrame> {
    let value: Value = serde_json::from_str(text)?;

    let kind = value
        .get("type")
        .and_then(|v| v.as_str())
        .ok_or_else(|| SyncError::MalformedFrame("missing 'type' discriminator".to_string()))?
        .to_string();

    let msg_id = value
        .get("msg_id")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());

    let topic_id = value
        .get("topic_id")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());

    let frame = match (kind.as_str(), topic_id) {
        ("ping", _) | ("heartbeat", _) => ServerFrame::Ping,
        ("pong", _) | ("heartbeat_ack", _) => ServerFrame::Pong,
        ("truncate", Some(topic_id)) => ServerFrame::Truncate { topic_id },
        ("truncate", None) => {
            return Err(SyncError::MalformedFrame(
                "truncate frame without topic_id".to_string(),
            ));
        }
        (_, Some(topic_id)) => {
            let action = match value.get("action").and_then(|v| v.as_str()) {
                Some("replace") => UpdateAction::Replace,
                _ => UpdateAction::Append,
            };
            let ts = value.get("ts").and_then(|v| v.as_i64());
            let data = value.get("data").cloned().unwrap_or(Value::Null);
            ServerFrame::Update(UpdateFrame {
                topic_id,
                kind,
                action,
                ts,
                data,
            })
        }
        (_, None) => ServerFrame::Control { kind },
    };

    Ok(ParsedFrame { msg_id, frame })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_frame_serialization() {
        let frame = ClientFrame::Subscribe {
            topic_id: "m1".to_string(),
        };
        let json = frame.to_json().unwrap();
        assert!(json.contains("\"type\":\"subscribe\""));
        assert!(json.contains("\"topic_id\":\"m1\""));

        assert_eq!(ClientFrame::Ping.to_json().unwrap(), "{\"type\":\"ping\"}");
    }

    #[test]
    fn test_parse_keepalive_frames() {
        let parsed = parse_frame("{\"type\":\"ping\"}").unwrap();
        assert!(matches!(parsed.frame, ServerFrame::Ping));
        assert!(parsed.msg_id.is_none());

        let parsed = parse_frame("{\"type\":\"heartbeat_ack\"}").unwrap();
        assert!(matches!(parsed.frame, ServerFrame::Pong));
    }

    #[test]
    fn test_parse_update_frame() {
        let text = r#"{
            "type": "activity",
            "topic_id": "m1",
            "msg_id": "abc",
            "action": "replace",
            "ts": 1700000000000,
            "data": [{"id": "e1"}]
        }"#;

        let parsed = parse_frame(text).unwrap();
        assert_eq!(parsed.msg_id.as_deref(), Some("abc"));
        match parsed.frame {
            ServerFrame::Update(update) => {
                assert_eq!(update.topic_id, "m1");
                assert_eq!(update.kind, "activity");
                assert_eq!(update.action, UpdateAction::Replace);
                assert_eq!(update.ts, Some(1_700_000_000_000));
                assert!(update.data.is_array());
            }
            other => panic!("expected update frame, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_defaults_to_append() {
        let parsed = parse_frame(r#"{"type":"activity","topic_id":"m1"}"#).unwrap();
        match parsed.frame {
            ServerFrame::Update(update) => assert_eq!(update.action, UpdateAction::Append),
            other => panic!("expected update frame, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_rejects_missing_type() {
        let err = parse_frame(r#"{"topic_id":"m1"}"#).unwrap_err();
        assert!(err.to_string().contains("type"));
    }

    #[test]
    fn test_topicless_unknown_is_control() {
        let parsed = parse_frame(r#"{"type":"server_notice"}"#).unwrap();
        assert!(matches!(
            parsed.frame,
            ServerFrame::Control { ref kind } if kind == "server_notice"
        ));
    }
}

/// WebSocket message schema
///
/// Events flow server → client inside a fixed envelope; a small set of
/// control messages flows client → server and is answered directly by the
/// session's read pump without touching the broadcast path.
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

// ============================================================================
// EVENT KINDS
// ============================================================================

/// Category tag for events pushed through the hub
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Monitor,
    Alert,
    Notification,
    Log,
}

impl EventKind {
    /// Wire code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            EventKind::Monitor => "monitor",
            EventKind::Alert => "alert",
            EventKind::Notification => "notification",
            EventKind::Log => "log",
        }
    }

    /// Parse from wire code
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "monitor" => Some(EventKind::Monitor),
            "alert" => Some(EventKind::Alert),
            "notification" => Some(EventKind::Notification),
            "log" => Some(EventKind::Log),
            _ => None,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ============================================================================
// EVENT ENVELOPE
// ============================================================================

/// A scoped event, immutable once constructed
///
/// `scope_id` 0 means unscoped: the event reaches every session. The hub
/// serializes an event once per broadcast and shares the text across all
/// targeted sessions.
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    /// Category tag ("monitor", "alert", ...)
    #[serde(rename = "type")]
    pub kind: EventKind,

    /// Target scope, 0 = broadcast
    pub scope_id: u64,

    /// Optional target/caller identity
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    /// Opaque structured payload
    pub data: serde_json::Value,

    /// Unix milliseconds, stamped at construction
    pub timestamp: i64,
}

impl Event {
    /// Create an event stamped with the current time
    pub fn new(kind: EventKind, scope_id: u64, data: serde_json::Value) -> Self {
        Self {
            kind,
            scope_id,
            user_id: None,
            data,
            timestamp: Utc::now().timestamp_millis(),
        }
    }

    /// Serialize to the shared wire text used for the whole fan-out
    pub fn to_wire(&self) -> Result<Arc<str>, serde_json::Error> {
        serde_json::to_string(self).map(Arc::from)
    }
}

// ============================================================================
// PAYLOAD STRUCTS
// ============================================================================

/// Process-level monitoring sample published on a fixed interval
#[derive(Debug, Clone, Serialize)]
pub struct MonitorSample {
    pub requests: u64,
    pub denied: u64,
    pub deny_rate: f64,
    pub active_sessions: usize,
    pub events_dispatched: u64,
    pub uptime_seconds: u64,
}

/// Alert payload pushed to dashboards
#[derive(Debug, Clone, Serialize)]
pub struct AlertEvent {
    /// Severity: critical, warning, info
    pub level: String,
    pub title: String,
    pub message: String,
    pub source: String,
    /// Unix milliseconds
    pub created_at: i64,
}

// ============================================================================
// CONTROL MESSAGES
// ============================================================================

/// Client → server control messages
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Keepalive probe, answered with `pong`
    Ping,

    /// Subscription request; acknowledged, no persisted state change
    Subscribe {
        #[serde(default)]
        channel: Option<String>,
    },
}

/// Server → client control replies (sent by the read pump, not the hub)
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlReply {
    Pong,
    Subscribed {
        #[serde(skip_serializing_if = "Option::is_none")]
        channel: Option<String>,
    },
}

impl ControlReply {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_code_roundtrip() {
        for kind in &[
            EventKind::Monitor,
            EventKind::Alert,
            EventKind::Notification,
            EventKind::Log,
        ] {
            assert_eq!(EventKind::from_code(kind.code()), Some(*kind));
        }
        assert_eq!(EventKind::from_code("bogus"), None);
    }

    #[test]
    fn test_event_wire_shape() {
        let event = Event::new(
            EventKind::Alert,
            7,
            serde_json::json!({"title": "cpu high"}),
        );
        let wire = event.to_wire().unwrap();

        let parsed: serde_json::Value = serde_json::from_str(&wire).unwrap();
        assert_eq!(parsed["type"], "alert");
        assert_eq!(parsed["scope_id"], 7);
        assert_eq!(parsed["data"]["title"], "cpu high");
        assert!(parsed["timestamp"].as_i64().unwrap() > 0);
        // user_id is omitted when unset, not serialized as null
        assert!(parsed.get("user_id").is_none());
    }

    #[test]
    fn test_client_message_parsing() {
        let ping: ClientMessage = serde_json::from_str(r#"{"type":"ping"}"#).unwrap();
        assert!(matches!(ping, ClientMessage::Ping));

        let sub: ClientMessage =
            serde_json::from_str(r#"{"type":"subscribe","channel":"alerts"}"#).unwrap();
        match sub {
            ClientMessage::Subscribe { channel } => assert_eq!(channel.as_deref(), Some("alerts")),
            _ => panic!("expected subscribe"),
        }

        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"resync"}"#).is_err());
    }

    #[test]
    fn test_control_reply_serialization() {
        let json = ControlReply::Pong.to_json().unwrap();
        assert_eq!(json, r#"{"type":"pong"}"#);
    }
}

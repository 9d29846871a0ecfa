// WebSocket session and hub configuration

use serde::Deserialize;
use std::time::Duration;

/// WebSocket hub/session configuration
///
/// The queue capacity bounds per-session memory; a session whose queue
/// fills is disconnected rather than buffered further (see the hub's
/// backpressure policy).
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct WebsocketConfig {
    /// Outbound message queue capacity per session
    pub send_queue_capacity: usize,

    /// Hub inbound command channel capacity
    pub hub_channel_capacity: usize,

    /// Server-side ping interval in seconds
    pub keepalive_interval_secs: u64,

    /// Seconds without any inbound frame before a session is considered dead
    pub read_deadline_secs: u64,

    /// Maximum seconds a single outbound write may take before the
    /// session is dropped
    pub write_deadline_secs: u64,

    /// Maximum inbound message size in bytes
    pub max_message_bytes: usize,
}

impl Default for WebsocketConfig {
    fn default() -> Self {
        Self {
            send_queue_capacity: 256,
            hub_channel_capacity: 256,
            keepalive_interval_secs: 30,
            read_deadline_secs: 60,
            write_deadline_secs: 10,
            max_message_bytes: 512 * 1024,
        }
    }
}

impl WebsocketConfig {
    pub fn keepalive_interval(&self) -> Duration {
        Duration::from_secs(self.keepalive_interval_secs.max(1))
    }

    pub fn read_deadline(&self) -> Duration {
        Duration::from_secs(self.read_deadline_secs.max(1))
    }

    pub fn write_deadline(&self) -> Duration {
        Duration::from_secs(self.write_deadline_secs.max(1))
    }
}

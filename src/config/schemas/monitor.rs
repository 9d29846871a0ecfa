// Monitor sampler configuration

use serde::Deserialize;
use std::time::Duration;

/// Monitor sampler configuration
///
/// The sampler periodically publishes a process-level sample (request and
/// denial counters, active sessions, uptime) through the hub as `monitor`
/// events for connected dashboards.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct MonitorConfig {
    /// Whether the sampler task runs at all
    pub enabled: bool,

    /// Seconds between samples
    pub interval_secs: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 10,
        }
    }
}

impl MonitorConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }
}

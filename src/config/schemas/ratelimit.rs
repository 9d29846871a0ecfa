// Rate limiter configuration
//
// Two independent algorithms are configured here: the token bucket used
// for smooth per-caller throttling of the whole API, and the fixed window
// used for hard caps on sensitive endpoints.

use serde::Deserialize;
use std::time::Duration;

/// Rate limiting configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct RateLimitConfig {
    /// Token bucket capacity (burst ceiling) per caller key
    pub bucket_capacity: f64,

    /// Tokens refilled per second (sustained request rate)
    pub bucket_refill_per_sec: f64,

    /// Fixed-window request limit for strict endpoints
    pub window_limit: u32,

    /// Fixed-window duration in seconds
    pub window_secs: u64,

    /// How often the registry sweeps for idle buckets, in seconds
    pub sweep_interval_secs: u64,

    /// Seconds of inactivity after which a bucket is evicted
    pub idle_threshold_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            bucket_capacity: 200.0,
            bucket_refill_per_sec: 100.0,
            window_limit: 30,
            window_secs: 60,
            sweep_interval_secs: 600,
            idle_threshold_secs: 3600,
        }
    }
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs.max(1))
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }

    pub fn idle_threshold(&self) -> Duration {
        Duration::from_secs(self.idle_threshold_secs.max(1))
    }
}

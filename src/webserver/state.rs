/// Shared application state for the webserver
///
/// Everything route handlers and middleware need, built once in main and
/// passed down explicitly; there is no process-wide singleton. The hub
/// handle and dispatcher are cheap clones over the same command channel.
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::{
    config::Config,
    ratelimit::{FixedWindowCounter, LimiterRegistry},
    webserver::ws::{EventDispatcher, HubHandle},
};

/// Shared application state passed to all route handlers
#[derive(Clone)]
pub struct AppState {
    /// Full application configuration
    pub config: Arc<Config>,

    /// Handle into the hub's command channel
    pub hub: HubHandle,

    /// Publish façade used by handlers and producers
    pub dispatcher: EventDispatcher,

    /// Per-caller token buckets behind the global gate
    pub ip_limiters: Arc<LimiterRegistry>,

    /// Fixed-window counters behind the strict per-route gate
    pub windows: Arc<FixedWindowCounter>,

    /// Request/denial counters fed to the monitor sampler
    pub http_stats: Arc<HttpStats>,

    /// Server startup time
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    /// Create application state around a running hub
    pub fn new(config: Arc<Config>, hub: HubHandle) -> Self {
        let ip_limiters = LimiterRegistry::new(
            config.ratelimit.bucket_capacity,
            config.ratelimit.bucket_refill_per_sec,
        );
        Self {
            dispatcher: EventDispatcher::new(hub.clone()),
            hub,
            ip_limiters,
            windows: Arc::new(FixedWindowCounter::new()),
            http_stats: Arc::new(HttpStats::default()),
            startup_time: Utc::now(),
            config,
        }
    }

    /// Server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        (Utc::now() - self.startup_time).num_seconds().max(0) as u64
    }
}

/// Cheap request counters shared between middleware and the sampler
#[derive(Debug, Default)]
pub struct HttpStats {
    requests: AtomicU64,
    denied: AtomicU64,
}

impl HttpStats {
    pub fn inc_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_denied(&self) {
        self.denied.fetch_add(1, Ordering::Relaxed);
    }

    /// (requests, denied)
    pub fn snapshot(&self) -> (u64, u64) {
        (
            self.requests.load(Ordering::Relaxed),
            self.denied.load(Ordering::Relaxed),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::webserver::ws::Hub;

    #[test]
    fn test_http_stats_counters() {
        let stats = HttpStats::default();
        stats.inc_request();
        stats.inc_request();
        stats.inc_denied();
        assert_eq!(stats.snapshot(), (2, 1));
    }

    #[tokio::test]
    async fn test_state_wires_config_into_limiters() {
        let mut config = Config::default();
        config.ratelimit.bucket_capacity = 2.0;
        config.ratelimit.bucket_refill_per_sec = 0.001;

        let (_hub, handle) = Hub::new(8);
        let state = AppState::new(Arc::new(config), handle);

        let bucket = state.ip_limiters.limiter_for("1.2.3.4");
        assert!(bucket.allow());
        assert!(bucket.allow());
        assert!(!bucket.allow());
    }
}

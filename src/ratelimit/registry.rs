/// Keyed limiter registry
///
/// Owns the dynamic key → TokenBucket map behind the global rate-limit
/// gate. Buckets are created lazily on first sight of a key and evicted by
/// a periodic sweep once idle, so memory stays bounded even though the key
/// space (client IPs) is unbounded in principle.
///
/// Locking: the registry map has its own mutex, distinct from each
/// bucket's internal mutex. `limiter_for` holds the map lock only for the
/// lookup-or-insert and returns a clone of the Arc, so `allow()` runs with
/// no registry-wide lock held. The sweep is a second, separate critical
/// section over the map.
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use super::token_bucket::TokenBucket;
use crate::{
    arguments::is_debug_ratelimit_enabled,
    logger::{self, LogTag},
};

pub struct LimiterRegistry {
    buckets: Mutex<HashMap<String, Arc<TokenBucket>>>,

    /// Capacity for newly created buckets
    capacity: f64,

    /// Refill rate for newly created buckets
    refill_rate: f64,
}

impl LimiterRegistry {
    /// Create an empty registry with the given per-bucket parameters
    pub fn new(capacity: f64, refill_rate: f64) -> Arc<Self> {
        Arc::new(Self {
            buckets: Mutex::new(HashMap::new()),
            capacity,
            refill_rate,
        })
    }

    /// Get the bucket for `key`, creating it if absent
    ///
    /// Creation is atomic under the map lock, so concurrent callers racing
    /// on a new key always end up sharing one bucket instance.
    pub fn limiter_for(&self, key: &str) -> Arc<TokenBucket> {
        let mut buckets = self.buckets.lock();
        buckets
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(TokenBucket::new(self.capacity, self.refill_rate)))
            .clone()
    }

    /// Remove every bucket idle for longer than `idle_threshold`
    ///
    /// Returns the number of evicted entries.
    pub fn sweep(&self, idle_threshold: Duration) -> usize {
        let mut buckets = self.buckets.lock();
        let before = buckets.len();
        buckets.retain(|_, bucket| bucket.idle_for() < idle_threshold);
        before - buckets.len()
    }

    /// Number of live buckets
    pub fn len(&self) -> usize {
        self.buckets.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Spawn the periodic eviction sweep
    ///
    /// Runs on a fixed interval independent of request traffic for the
    /// lifetime of the process.
    pub fn start_sweeper(
        self: &Arc<Self>,
        interval: Duration,
        idle_threshold: Duration,
    ) -> tokio::task::JoinHandle<()> {
        let registry = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // interval() fires immediately; consume the first tick so the
            // first sweep happens one full interval after startup
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = registry.sweep(idle_threshold);
                if removed > 0 && is_debug_ratelimit_enabled() {
                    logger::debug(
                        LogTag::RateLimit,
                        &format!(
                            "Sweep evicted {} idle limiter(s), {} remaining",
                            removed,
                            registry.len()
                        ),
                    );
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_same_key_returns_same_bucket() {
        let registry = LimiterRegistry::new(10.0, 1.0);

        let a = registry.limiter_for("192.168.1.1");
        let b = registry.limiter_for("192.168.1.1");
        assert!(Arc::ptr_eq(&a, &b));

        let other = registry.limiter_for("192.168.1.2");
        assert!(!Arc::ptr_eq(&a, &other));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_bucket_state_survives_relookup() {
        let registry = LimiterRegistry::new(2.0, 0.001);

        assert!(registry.limiter_for("k").allow());
        assert!(registry.limiter_for("k").allow());
        assert!(!registry.limiter_for("k").allow());
    }

    #[test]
    fn test_concurrent_creation_yields_one_instance() {
        let registry = LimiterRegistry::new(10.0, 1.0);

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || registry.limiter_for("racy-key"))
            })
            .collect();

        let buckets: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(registry.len(), 1);
        for bucket in &buckets[1..] {
            assert!(Arc::ptr_eq(&buckets[0], bucket));
        }
    }

    #[test]
    fn test_sweep_evicts_only_idle_entries() {
        let registry = LimiterRegistry::new(10.0, 1.0);

        registry.limiter_for("stale");
        sleep(Duration::from_millis(60));
        registry.limiter_for("fresh").allow();

        let removed = registry.sweep(Duration::from_millis(50));
        assert_eq!(removed, 1);
        assert_eq!(registry.len(), 1);

        // The surviving key is the recently used one
        let fresh = registry.limiter_for("fresh");
        assert_eq!(registry.len(), 1);
        assert!(fresh.idle_for() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_sweeper_task_runs_on_interval() {
        let registry = LimiterRegistry::new(10.0, 1.0);
        registry.limiter_for("idle");

        let handle = registry.start_sweeper(
            Duration::from_millis(30),
            Duration::from_millis(10),
        );

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(registry.is_empty());
        handle.abort();
    }
}

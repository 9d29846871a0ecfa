/// Token bucket rate limiter
///
/// Accumulates tokens continuously up to a capacity and consumes one per
/// allowed action. Refill is lazy: tokens are accounted on access, there
/// is no background timer. A bucket that is never queried simply does not
/// refill, which is fine: nobody is asking it for permission either.
use parking_lot::Mutex;
use std::time::{Duration, Instant};

/// Per-key continuous rate limiter
#[derive(Debug)]
pub struct TokenBucket {
    /// Maximum tokens (burst ceiling)
    capacity: f64,

    /// Tokens added per second
    refill_rate: f64,

    /// Mutable bookkeeping, single short-held mutex
    state: Mutex<BucketState>,
}

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    /// Create a bucket that starts full
    pub fn new(capacity: f64, refill_rate: f64) -> Self {
        let capacity = capacity.max(1.0);
        Self {
            capacity,
            // A zero rate would make retry hints meaningless; clamp to a
            // floor instead of dividing by zero later.
            refill_rate: refill_rate.max(0.001),
            state: Mutex::new(BucketState {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
        }
    }

    /// Check whether one action is allowed right now
    ///
    /// Refills based on elapsed time, then consumes a token if available.
    /// Never blocks beyond the internal mutex.
    pub fn allow(&self) -> bool {
        let mut state = self.state.lock();

        let now = Instant::now();
        let elapsed = now.duration_since(state.last_refill).as_secs_f64();
        state.tokens = (state.tokens + elapsed * self.refill_rate).min(self.capacity);
        state.last_refill = now;

        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Time until the next token becomes available
    ///
    /// Used for the Retry-After hint on denials; zero when a token is
    /// already available.
    pub fn retry_after(&self) -> Duration {
        let state = self.state.lock();
        if state.tokens >= 1.0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64((1.0 - state.tokens) / self.refill_rate)
    }

    /// Whole tokens currently available, including pending lazy refill
    ///
    /// Read-only view for informational rate-limit headers; does not
    /// advance the refill timestamp.
    pub fn remaining(&self) -> u64 {
        let state = self.state.lock();
        let refilled = state.tokens + state.last_refill.elapsed().as_secs_f64() * self.refill_rate;
        refilled.min(self.capacity).floor() as u64
    }

    /// Burst ceiling this bucket was created with
    pub fn capacity(&self) -> u64 {
        self.capacity as u64
    }

    /// How long ago this bucket was last consulted
    ///
    /// `allow()` updates the refill timestamp on every call, so this is
    /// also the idle time used by the registry's eviction sweep.
    pub fn idle_for(&self) -> Duration {
        self.state.lock().last_refill.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_full_bucket_allows_exactly_capacity() {
        let bucket = TokenBucket::new(5.0, 1.0);

        for i in 0..5 {
            assert!(bucket.allow(), "call {} should be allowed", i + 1);
        }
        assert!(!bucket.allow(), "6th immediate call must be denied");
    }

    #[test]
    fn test_denial_reports_retry_hint() {
        let bucket = TokenBucket::new(1.0, 1.0);
        assert!(bucket.allow());
        assert!(!bucket.allow());

        let hint = bucket.retry_after();
        assert!(hint > Duration::ZERO);
        assert!(hint <= Duration::from_secs(1));
    }

    #[test]
    fn test_lazy_refill_grants_elapsed_tokens() {
        // 2 tokens/sec: after ~1.1s exactly 2 more calls pass
        let bucket = TokenBucket::new(10.0, 2.0);
        for _ in 0..10 {
            assert!(bucket.allow());
        }
        assert!(!bucket.allow());

        sleep(Duration::from_millis(1100));
        assert!(bucket.allow());
        assert!(bucket.allow());
        assert!(!bucket.allow());
    }

    #[test]
    fn test_refill_caps_at_capacity() {
        let bucket = TokenBucket::new(2.0, 100.0);
        assert!(bucket.allow());
        assert!(bucket.allow());

        // Plenty of time for far more than 2 tokens; the cap must hold
        sleep(Duration::from_millis(200));
        assert!(bucket.allow());
        assert!(bucket.allow());
        assert!(!bucket.allow());
    }

    #[test]
    fn test_burst_then_sustained_throttle_scenario() {
        // capacity 5, 1 token/sec: a dashboard burst then steady traffic
        let bucket = TokenBucket::new(5.0, 1.0);

        for _ in 0..5 {
            assert!(bucket.allow());
        }
        let denied_at = std::time::Instant::now();
        assert!(!bucket.allow());

        // Retry hint points at the next token, roughly one second out
        let hint = bucket.retry_after();
        assert!(hint > Duration::from_millis(500));
        assert!(hint <= Duration::from_secs(1));

        // Two seconds later exactly two tokens have refilled
        sleep(Duration::from_secs(2).saturating_sub(denied_at.elapsed()));
        sleep(Duration::from_millis(50));
        assert!(bucket.allow());
        assert!(bucket.allow());
        assert!(!bucket.allow());
    }

    #[test]
    fn test_concurrent_allow_never_oversells() {
        use std::sync::atomic::{AtomicU32, Ordering};
        use std::sync::Arc;

        let bucket = Arc::new(TokenBucket::new(50.0, 0.001));
        let allowed = Arc::new(AtomicU32::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let bucket = Arc::clone(&bucket);
                let allowed = Arc::clone(&allowed);
                std::thread::spawn(move || {
                    for _ in 0..20 {
                        if bucket.allow() {
                            allowed.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        // 160 attempts against 50 tokens with negligible refill
        assert_eq!(allowed.load(Ordering::Relaxed), 50);
    }
}

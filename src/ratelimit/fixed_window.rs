/// Fixed-window counter rate limiter
///
/// Counts actions per key within a fixed period; the first action at or
/// after the window boundary starts a fresh window with count = 1. Unlike
/// the token-bucket registry there is no eviction sweep: windows are short
/// (seconds to minutes) and stale entries are overwritten on next access,
/// so memory stays proportional to the distinct keys seen within roughly
/// one window.
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Outcome of a fixed-window check, with everything the HTTP layer needs
/// for rate-limit headers
#[derive(Debug, Clone, Copy)]
pub struct WindowDecision {
    pub allowed: bool,

    /// Configured limit, echoed for X-RateLimit-Limit
    pub limit: u32,

    /// Requests left in the current window
    pub remaining: u32,

    /// Time until the current window resets
    pub reset_after: Duration,

    /// How long a denied caller should wait before retrying
    pub retry_after: Duration,
}

#[derive(Debug)]
struct WindowEntry {
    count: u32,
    reset_at: Instant,
}

/// Per-key discrete rate limiter
#[derive(Debug, Default)]
pub struct FixedWindowCounter {
    entries: Mutex<HashMap<String, WindowEntry>>,
}

impl FixedWindowCounter {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Check whether an action for `key` is allowed under `limit` per `window`
    ///
    /// All reads and mutations of a key's entry happen under one lock;
    /// the critical section is pure bookkeeping.
    pub fn allow(&self, key: &str, limit: u32, window: Duration) -> WindowDecision {
        let mut entries = self.entries.lock();
        let now = Instant::now();

        match entries.get_mut(key) {
            // Live window: count against the existing entry
            Some(e) if now < e.reset_at => {
                let reset_after = e.reset_at.duration_since(now);
                if e.count < limit {
                    e.count += 1;
                    WindowDecision {
                        allowed: true,
                        limit,
                        remaining: limit - e.count,
                        reset_after,
                        retry_after: Duration::ZERO,
                    }
                } else {
                    WindowDecision {
                        allowed: false,
                        limit,
                        remaining: 0,
                        reset_after,
                        retry_after: reset_after,
                    }
                }
            }
            // No entry, or the window elapsed: start a fresh one at count = 1
            _ => {
                entries.insert(
                    key.to_string(),
                    WindowEntry {
                        count: 1,
                        reset_at: now + window,
                    },
                );
                WindowDecision {
                    allowed: true,
                    limit,
                    remaining: limit.saturating_sub(1),
                    reset_after: window,
                    retry_after: Duration::ZERO,
                }
            }
        }
    }

    /// Number of tracked keys (diagnostics)
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    const WINDOW: Duration = Duration::from_secs(60);

    #[test]
    fn test_limit_enforced_within_window() {
        let counter = FixedWindowCounter::new();

        for i in 0..3 {
            let decision = counter.allow("10.0.0.1:/login", 3, WINDOW);
            assert!(decision.allowed, "call {} should pass", i + 1);
            assert_eq!(decision.remaining, 2 - i);
        }

        let denied = counter.allow("10.0.0.1:/login", 3, WINDOW);
        assert!(!denied.allowed);
        assert_eq!(denied.remaining, 0);
        assert!(denied.retry_after > Duration::ZERO);
        assert!(denied.retry_after <= WINDOW);
    }

    #[test]
    fn test_keys_are_independent() {
        let counter = FixedWindowCounter::new();

        assert!(counter.allow("a", 1, WINDOW).allowed);
        assert!(!counter.allow("a", 1, WINDOW).allowed);
        assert!(counter.allow("b", 1, WINDOW).allowed);
    }

    #[test]
    fn test_window_elapse_resets_count_to_one() {
        let counter = FixedWindowCounter::new();
        let window = Duration::from_millis(50);

        assert!(counter.allow("k", 2, window).allowed);
        assert!(counter.allow("k", 2, window).allowed);
        assert!(!counter.allow("k", 2, window).allowed);

        sleep(Duration::from_millis(70));

        // Fresh window: count restarts at 1, not at the old total
        let decision = counter.allow("k", 2, window);
        assert!(decision.allowed);
        assert_eq!(decision.remaining, 1);
    }

    #[test]
    fn test_stale_entry_overwritten_in_place() {
        let counter = FixedWindowCounter::new();
        let window = Duration::from_millis(20);

        counter.allow("k", 5, window);
        sleep(Duration::from_millis(30));
        counter.allow("k", 5, window);

        // Re-access replaced the entry rather than growing the map
        assert_eq!(counter.len(), 1);
    }
}

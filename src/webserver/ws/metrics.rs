/// Hub metrics collection
///
/// Aggregate counters for monitoring and the status endpoint. All fields
/// are atomics so the hub loop and HTTP handlers never contend on a lock.
use serde::Serialize;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

/// Hub-level metrics
#[derive(Debug, Default)]
pub struct HubMetrics {
    /// Sessions registered (lifetime)
    sessions_opened: AtomicU64,

    /// Currently registered sessions
    active_sessions: AtomicUsize,

    /// Events accepted into the hub loop
    events_dispatched: AtomicU64,

    /// Events dropped at the hub inbound channel (publish backpressure)
    events_dropped: AtomicU64,

    /// Messages enqueued onto session queues
    messages_sent: AtomicU64,

    /// Messages that found a session queue full
    messages_dropped: AtomicU64,

    /// Sessions disconnected for not keeping up
    slow_disconnects: AtomicU64,
}

impl HubMetrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn session_opened(&self) {
        self.sessions_opened.fetch_add(1, Ordering::Relaxed);
        self.active_sessions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn session_closed(&self) {
        self.active_sessions.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn event_dispatched(&self) {
        self.events_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn event_dropped(&self) {
        self.events_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn message_sent(&self) {
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn message_dropped(&self) {
        self.messages_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn slow_disconnect(&self) {
        self.slow_disconnects.fetch_add(1, Ordering::Relaxed);
    }

    pub fn active_sessions(&self) -> usize {
        self.active_sessions.load(Ordering::Relaxed)
    }

    /// Get snapshot for the status endpoint
    pub fn snapshot(&self) -> HubMetricsSnapshot {
        HubMetricsSnapshot {
            sessions_opened: self.sessions_opened.load(Ordering::Relaxed),
            active_sessions: self.active_sessions.load(Ordering::Relaxed),
            events_dispatched: self.events_dispatched.load(Ordering::Relaxed),
            events_dropped: self.events_dropped.load(Ordering::Relaxed),
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            messages_dropped: self.messages_dropped.load(Ordering::Relaxed),
            slow_disconnects: self.slow_disconnects.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot (serializable)
#[derive(Debug, Clone, Serialize)]
pub struct HubMetricsSnapshot {
    pub sessions_opened: u64,
    pub active_sessions: usize,
    pub events_dispatched: u64,
    pub events_dropped: u64,
    pub messages_sent: u64,
    pub messages_dropped: u64,
    pub slow_disconnects: u64,
}

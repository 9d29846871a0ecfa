/// Central fan-out hub
///
/// A single event loop owns the session index and the per-scope index.
/// Registration, unregistration and broadcast all arrive as commands on
/// one inbound channel and are processed one at a time, so hub state never
/// needs a lock and register/unregister for a given session can never be
/// reordered.
///
/// The loop never touches per-session I/O: fan-out is a non-blocking
/// enqueue onto each session's bounded queue. A full queue marks the
/// session as too slow and it is dropped on the spot: backpressure is
/// resolved by disconnecting the consumer, never by blocking the loop.
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::message::Event;
use super::metrics::{HubMetrics, HubMetricsSnapshot};
use crate::{
    arguments::is_debug_hub_enabled,
    logger::{self, LogTag},
};

// ============================================================================
// TYPES
// ============================================================================

/// Unique id per WebSocket session
pub type SessionId = Uuid;

/// Registration record for one session, owned by the hub loop
///
/// `sender` is the producer side of the session's bounded outbound queue;
/// dropping it (on unregistration) closes the queue, which is what tells
/// the session's write pump to finish up.
#[derive(Debug)]
pub struct SessionHandle {
    pub id: SessionId,
    pub scope_id: u64,
    pub user_id: Option<String>,
    pub sender: mpsc::Sender<Arc<str>>,
}

/// Commands accepted by the hub loop
#[derive(Debug)]
enum HubCommand {
    Register(SessionHandle),
    Unregister(SessionId),
    Publish(Event),
    Shutdown,
}

/// Errors surfaced to hub clients
#[derive(Debug, Error)]
pub enum HubError {
    /// The inbound channel is saturated (publish backpressure)
    #[error("hub inbound channel is full")]
    Backlogged,

    /// The hub loop is no longer running
    #[error("hub is not running")]
    Closed,
}

// ============================================================================
// HUB
// ============================================================================

/// The hub state machine; consumed by `run()`
pub struct Hub {
    rx: mpsc::Receiver<HubCommand>,
    sessions: HashMap<SessionId, SessionHandle>,
    scopes: HashMap<u64, HashSet<SessionId>>,
    metrics: Arc<HubMetrics>,
}

/// Cloneable handle used by sessions and the dispatcher
#[derive(Debug, Clone)]
pub struct HubHandle {
    tx: mpsc::Sender<HubCommand>,
    metrics: Arc<HubMetrics>,
}

impl Hub {
    /// Create a hub and its handle
    ///
    /// `channel_capacity` bounds the inbound command channel; publishers
    /// that outrun the loop get `HubError::Backlogged` instead of blocking.
    pub fn new(channel_capacity: usize) -> (Hub, HubHandle) {
        let (tx, rx) = mpsc::channel(channel_capacity.max(1));
        let metrics = HubMetrics::new();
        let hub = Hub {
            rx,
            sessions: HashMap::new(),
            scopes: HashMap::new(),
            metrics: Arc::clone(&metrics),
        };
        let handle = HubHandle { tx, metrics };
        (hub, handle)
    }

    /// Run the event loop until shutdown
    ///
    /// Blocks only on the inbound channel, never on session I/O.
    pub async fn run(mut self) {
        while let Some(command) = self.rx.recv().await {
            match command {
                HubCommand::Register(handle) => self.register(handle),
                HubCommand::Unregister(id) => self.unregister(id),
                HubCommand::Publish(event) => self.broadcast(event),
                HubCommand::Shutdown => break,
            }
        }

        // Drop every sender so all write pumps see a closed queue and
        // say goodbye to their clients.
        let remaining = self.sessions.len();
        self.scopes.clear();
        for _ in self.sessions.drain() {
            self.metrics.session_closed();
        }
        if remaining > 0 {
            logger::info(
                LogTag::Hub,
                &format!("Hub stopped, {} session(s) closed", remaining),
            );
        }
    }

    fn register(&mut self, handle: SessionHandle) {
        self.scopes
            .entry(handle.scope_id)
            .or_default()
            .insert(handle.id);
        self.metrics.session_opened();

        if is_debug_hub_enabled() {
            logger::debug(
                LogTag::Hub,
                &format!(
                    "Session registered: {} (scope_id={}, active={})",
                    handle.id,
                    handle.scope_id,
                    self.sessions.len() + 1
                ),
            );
        }

        self.sessions.insert(handle.id, handle);
    }

    fn unregister(&mut self, id: SessionId) {
        // Removal drops the queue sender, closing the queue exactly once;
        // a second unregister for the same id is a no-op.
        if let Some(handle) = self.sessions.remove(&id) {
            if let Some(scope_sessions) = self.scopes.get_mut(&handle.scope_id) {
                scope_sessions.remove(&id);
                if scope_sessions.is_empty() {
                    self.scopes.remove(&handle.scope_id);
                }
            }
            self.metrics.session_closed();

            if is_debug_hub_enabled() {
                logger::debug(
                    LogTag::Hub,
                    &format!(
                        "Session unregistered: {} (active={})",
                        id,
                        self.sessions.len()
                    ),
                );
            }
        }
    }

    /// Fan an event out to every matching session
    ///
    /// Scope 0 reaches all sessions; any other scope reaches only the
    /// sessions registered under it. The serialized text is shared across
    /// the whole fan-out.
    fn broadcast(&mut self, event: Event) {
        self.metrics.event_dispatched();

        let wire = match event.to_wire() {
            Ok(wire) => wire,
            Err(e) => {
                logger::error(
                    LogTag::Hub,
                    &format!("Failed to serialize {} event: {}", event.kind, e),
                );
                return;
            }
        };

        let targets: Vec<SessionId> = if event.scope_id > 0 {
            self.scopes
                .get(&event.scope_id)
                .map(|ids| ids.iter().copied().collect())
                .unwrap_or_default()
        } else {
            self.sessions.keys().copied().collect()
        };

        let mut dead: Vec<SessionId> = Vec::new();
        for id in targets {
            let Some(handle) = self.sessions.get(&id) else {
                continue;
            };
            match handle.sender.try_send(Arc::clone(&wire)) {
                Ok(()) => self.metrics.message_sent(),
                Err(mpsc::error::TrySendError::Full(_)) => {
                    // Slow consumer: drop it rather than stall the loop
                    self.metrics.message_dropped();
                    self.metrics.slow_disconnect();
                    logger::warning(
                        LogTag::Hub,
                        &format!("Session {} too slow (queue full), disconnecting", id),
                    );
                    dead.push(id);
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    // Session already tore itself down
                    self.metrics.message_dropped();
                    dead.push(id);
                }
            }
        }

        for id in dead {
            self.unregister(id);
        }
    }
}

// ============================================================================
// HANDLE
// ============================================================================

impl HubHandle {
    /// Submit a session for registration
    pub async fn register(&self, handle: SessionHandle) -> Result<(), HubError> {
        self.tx
            .send(HubCommand::Register(handle))
            .await
            .map_err(|_| HubError::Closed)
    }

    /// Submit an unregistration; safe to call more than once per session
    pub async fn unregister(&self, id: SessionId) -> Result<(), HubError> {
        self.tx
            .send(HubCommand::Unregister(id))
            .await
            .map_err(|_| HubError::Closed)
    }

    /// Hand an event to the loop without blocking
    ///
    /// Returns `Backlogged` when the inbound channel is full; callers own
    /// the decision of what to do with the rejected event.
    pub fn try_publish(&self, event: Event) -> Result<(), HubError> {
        self.tx
            .try_send(HubCommand::Publish(event))
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => {
                    self.metrics.event_dropped();
                    HubError::Backlogged
                }
                mpsc::error::TrySendError::Closed(_) => HubError::Closed,
            })
    }

    /// Ask the loop to stop and close every session
    pub async fn shutdown(&self) {
        let _ = self.tx.send(HubCommand::Shutdown).await;
    }

    /// Currently registered session count
    pub fn active_sessions(&self) -> usize {
        self.metrics.active_sessions()
    }

    /// Counter snapshot for the status endpoint
    pub fn metrics_snapshot(&self) -> HubMetricsSnapshot {
        self.metrics.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::webserver::ws::message::EventKind;
    use std::time::Duration;
    use tokio::time::timeout;

    const RECV_WAIT: Duration = Duration::from_secs(1);

    fn session(scope_id: u64, capacity: usize) -> (SessionHandle, mpsc::Receiver<Arc<str>>) {
        let (tx, rx) = mpsc::channel(capacity);
        let handle = SessionHandle {
            id: Uuid::new_v4(),
            scope_id,
            user_id: None,
            sender: tx,
        };
        (handle, rx)
    }

    async fn recv_event(rx: &mut mpsc::Receiver<Arc<str>>) -> serde_json::Value {
        let wire = timeout(RECV_WAIT, rx.recv())
            .await
            .expect("timed out waiting for event")
            .expect("queue closed unexpectedly");
        serde_json::from_str(&wire).unwrap()
    }

    #[tokio::test]
    async fn test_scoped_delivery() {
        let (hub, handle) = Hub::new(32);
        let hub_task = tokio::spawn(hub.run());

        let (scope5_a, mut rx5_a) = session(5, 8);
        let (scope5_b, mut rx5_b) = session(5, 8);
        let (scope7, mut rx7) = session(7, 8);
        let (unscoped, mut rx0) = session(0, 8);

        handle.register(scope5_a).await.unwrap();
        handle.register(scope5_b).await.unwrap();
        handle.register(scope7).await.unwrap();
        handle.register(unscoped).await.unwrap();

        // Scoped event: only scope-5 sessions see it
        handle
            .try_publish(Event::new(
                EventKind::Alert,
                5,
                serde_json::json!({"msg": "scoped"}),
            ))
            .unwrap();

        let got_a = recv_event(&mut rx5_a).await;
        let got_b = recv_event(&mut rx5_b).await;
        assert_eq!(got_a["scope_id"], 5);
        assert_eq!(got_b["data"]["msg"], "scoped");

        // Broadcast: everyone sees it, including scope 7 and scope 0
        handle
            .try_publish(Event::new(
                EventKind::Notification,
                0,
                serde_json::json!({"msg": "all"}),
            ))
            .unwrap();

        assert_eq!(recv_event(&mut rx5_a).await["data"]["msg"], "all");
        assert_eq!(recv_event(&mut rx5_b).await["data"]["msg"], "all");
        assert_eq!(recv_event(&mut rx7).await["data"]["msg"], "all");
        assert_eq!(recv_event(&mut rx0).await["data"]["msg"], "all");

        // The scoped event never reached scope 7: its only message was
        // the broadcast, and nothing else is buffered
        assert!(rx7.try_recv().is_err());

        handle.shutdown().await;
        hub_task.await.unwrap();
    }

    #[tokio::test]
    async fn test_slow_session_dropped_without_blocking_others() {
        let (hub, handle) = Hub::new(32);
        let hub_task = tokio::spawn(hub.run());

        // Slow session: queue of 1, consumer never reads
        let (slow, mut slow_rx) = session(0, 1);
        let slow_id = slow.id;
        let (healthy, mut healthy_rx) = session(0, 8);

        handle.register(slow).await.unwrap();
        handle.register(healthy).await.unwrap();

        // First event fills the slow queue; second overflows it
        for i in 0..2 {
            handle
                .try_publish(Event::new(
                    EventKind::Monitor,
                    0,
                    serde_json::json!({"seq": i}),
                ))
                .unwrap();
        }

        // Healthy session saw both events in order
        assert_eq!(recv_event(&mut healthy_rx).await["data"]["seq"], 0);
        assert_eq!(recv_event(&mut healthy_rx).await["data"]["seq"], 1);

        // Slow session got the first event, then its queue was closed
        let first = timeout(RECV_WAIT, slow_rx.recv()).await.unwrap().unwrap();
        assert!(first.contains("\"seq\":0"));
        assert!(timeout(RECV_WAIT, slow_rx.recv()).await.unwrap().is_none());

        let snapshot = handle.metrics_snapshot();
        assert_eq!(snapshot.slow_disconnects, 1);
        assert_eq!(snapshot.active_sessions, 1);

        // Unregistering the dropped session again is harmless
        handle.unregister(slow_id).await.unwrap();

        handle.shutdown().await;
        hub_task.await.unwrap();
    }

    #[tokio::test]
    async fn test_unregister_stops_delivery() {
        let (hub, handle) = Hub::new(32);
        let hub_task = tokio::spawn(hub.run());

        let (s, mut rx) = session(3, 8);
        let id = s.id;
        handle.register(s).await.unwrap();
        handle.unregister(id).await.unwrap();

        handle
            .try_publish(Event::new(EventKind::Alert, 3, serde_json::json!({})))
            .unwrap();

        // Queue was closed on unregistration, no event delivered
        assert!(timeout(RECV_WAIT, rx.recv()).await.unwrap().is_none());
        assert_eq!(handle.active_sessions(), 0);

        handle.shutdown().await;
        hub_task.await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_closes_all_sessions() {
        let (hub, handle) = Hub::new(32);
        let hub_task = tokio::spawn(hub.run());

        let (a, mut rx_a) = session(0, 8);
        let (b, mut rx_b) = session(2, 8);
        handle.register(a).await.unwrap();
        handle.register(b).await.unwrap();

        handle.shutdown().await;
        hub_task.await.unwrap();

        assert!(rx_a.recv().await.is_none());
        assert!(rx_b.recv().await.is_none());
        assert_eq!(handle.active_sessions(), 0);
    }

    #[tokio::test]
    async fn test_publish_backpressure_is_reported() {
        // Capacity 1 and no loop running: the second publish must fail
        // fast instead of blocking the caller
        let (_hub, handle) = Hub::new(1);

        handle
            .try_publish(Event::new(EventKind::Log, 0, serde_json::json!({})))
            .unwrap();
        let err = handle
            .try_publish(Event::new(EventKind::Log, 0, serde_json::json!({})))
            .unwrap_err();
        assert!(matches!(err, HubError::Backlogged));
        assert_eq!(handle.metrics_snapshot().events_dropped, 1);
    }
}

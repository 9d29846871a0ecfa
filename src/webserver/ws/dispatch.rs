/// Publish façade over the hub
///
/// Route handlers and background tasks push events through this instead of
/// holding hub internals. Publication is best-effort by design: the event
/// is handed to the hub loop with a non-blocking send, and if the loop's
/// inbound channel is saturated the event is dropped and counted; the
/// caller is never blocked. Callers that need delivery confirmation do
/// not exist in this system; dashboards resynchronize on reconnect.
use serde::Serialize;
use serde_json::json;

use super::hub::{HubError, HubHandle};
use super::message::{AlertEvent, Event, EventKind, MonitorSample};
use crate::logger::{self, LogTag};

#[derive(Debug, Clone)]
pub struct EventDispatcher {
    hub: HubHandle,
}

impl EventDispatcher {
    pub fn new(hub: HubHandle) -> Self {
        Self { hub }
    }

    /// Publish an event to a scope (0 = every session)
    ///
    /// Stamps the current time, builds the envelope and hands it to the
    /// hub loop. Bounded-time: a saturated hub drops the event.
    pub fn publish(&self, kind: EventKind, scope_id: u64, data: serde_json::Value) {
        let event = Event::new(kind, scope_id, data);
        match self.hub.try_publish(event) {
            Ok(()) => {}
            Err(HubError::Backlogged) => {
                logger::warning(
                    LogTag::Hub,
                    &format!(
                        "Hub backlogged, dropped {} event for scope {}",
                        kind, scope_id
                    ),
                );
            }
            Err(HubError::Closed) => {
                logger::debug(
                    LogTag::Hub,
                    &format!("Hub stopped, discarded {} event", kind),
                );
            }
        }
    }

    /// Publish a typed payload, serializing it first
    fn publish_payload<T: Serialize>(&self, kind: EventKind, scope_id: u64, payload: &T) {
        match serde_json::to_value(payload) {
            Ok(data) => self.publish(kind, scope_id, data),
            Err(e) => {
                logger::error(
                    LogTag::Hub,
                    &format!("Failed to serialize {} payload: {}", kind, e),
                );
            }
        }
    }

    /// Push a monitoring sample
    pub fn monitor(&self, scope_id: u64, sample: &MonitorSample) {
        self.publish_payload(EventKind::Monitor, scope_id, sample);
    }

    /// Push an alert
    pub fn alert(&self, scope_id: u64, alert: &AlertEvent) {
        self.publish_payload(EventKind::Alert, scope_id, alert);
    }

    /// Push a simple title/message notification
    pub fn notify(&self, scope_id: u64, title: &str, message: &str) {
        self.publish(
            EventKind::Notification,
            scope_id,
            json!({ "title": title, "message": message }),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::webserver::ws::hub::Hub;
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokio::time::timeout;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_notify_reaches_scoped_session() {
        let (hub, handle) = Hub::new(8);
        let hub_task = tokio::spawn(hub.run());
        let dispatcher = EventDispatcher::new(handle.clone());

        let (tx, mut rx) = mpsc::channel(4);
        handle
            .register(crate::webserver::ws::hub::SessionHandle {
                id: Uuid::new_v4(),
                scope_id: 12,
                user_id: Some("ops".to_string()),
                sender: tx,
            })
            .await
            .unwrap();

        dispatcher.notify(12, "Deploy finished", "v2.4.1 is live");

        let wire = timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&wire).unwrap();
        assert_eq!(parsed["type"], "notification");
        assert_eq!(parsed["scope_id"], 12);
        assert_eq!(parsed["data"]["title"], "Deploy finished");

        handle.shutdown().await;
        hub_task.await.unwrap();
    }

    #[tokio::test]
    async fn test_alert_payload_is_typed() {
        let (hub, handle) = Hub::new(8);
        let hub_task = tokio::spawn(hub.run());
        let dispatcher = EventDispatcher::new(handle.clone());

        let (tx, mut rx) = mpsc::channel(4);
        handle
            .register(crate::webserver::ws::hub::SessionHandle {
                id: Uuid::new_v4(),
                scope_id: 0,
                user_id: None,
                sender: tx,
            })
            .await
            .unwrap();

        dispatcher.alert(
            0,
            &crate::webserver::ws::message::AlertEvent {
                level: "critical".to_string(),
                title: "CPU high".to_string(),
                message: "cpu above 95% for 5m".to_string(),
                source: "monitor".to_string(),
                created_at: 1_700_000_000_000,
            },
        );

        let wire = timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&wire).unwrap();
        assert_eq!(parsed["type"], "alert");
        assert_eq!(parsed["data"]["level"], "critical");
        assert_eq!(parsed["data"]["source"], "monitor");

        handle.shutdown().await;
        hub_task.await.unwrap();
    }

    #[tokio::test]
    async fn test_publish_on_saturated_hub_never_blocks() {
        // No loop draining the channel: every slot fills, then publishes
        // must return immediately instead of waiting
        let (_hub, handle) = Hub::new(2);
        let dispatcher = EventDispatcher::new(handle.clone());

        for _ in 0..10 {
            dispatcher.publish(EventKind::Log, 0, json!({}));
        }

        assert_eq!(handle.metrics_snapshot().events_dropped, 8);
    }
}

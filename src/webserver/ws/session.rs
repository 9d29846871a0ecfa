/// WebSocket session lifecycle
///
/// Each accepted connection runs exactly two pumps: the read pump (this
/// task) consumes inbound frames and answers control messages, the write
/// pump (spawned) drains the session's bounded outbound queue onto the
/// socket and sends keepalive pings. The pumps talk to each other only
/// through the queue and to the hub only through its command channel.
///
/// Any failure (read error, write error, blown write deadline, idle
/// timeout, queue overflow) is fatal to this session alone. The client
/// must reconnect; events published while disconnected are not recovered.
use axum::extract::ws::{Message, WebSocket};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;
use uuid::Uuid;

use super::hub::{HubHandle, SessionHandle, SessionId};
use super::message::{ClientMessage, ControlReply};
use crate::{
    arguments::is_debug_webserver_enabled,
    config::WebsocketConfig,
    logger::{self, LogTag},
};

/// Identity attached to a session at upgrade time
///
/// Both values arrive as plain query parameters and are treated as opaque;
/// the transport cannot carry custom headers during the handshake.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub scope_id: u64,
    pub user_id: Option<String>,
}

/// Drive one connection until either pump stops, then unregister
pub async fn run_session(
    socket: WebSocket,
    hub: HubHandle,
    ctx: SessionContext,
    config: WebsocketConfig,
) {
    let session_id = Uuid::new_v4();
    let (queue_tx, queue_rx) = mpsc::channel::<Arc<str>>(config.send_queue_capacity.max(1));

    let registration = SessionHandle {
        id: session_id,
        scope_id: ctx.scope_id,
        user_id: ctx.user_id.clone(),
        sender: queue_tx.clone(),
    };
    if hub.register(registration).await.is_err() {
        logger::warning(
            LogTag::Webserver,
            &format!("Session {} rejected: hub is not running", session_id),
        );
        return;
    }

    let (ws_tx, ws_rx) = socket.split();
    let write_deadline = config.write_deadline();

    let mut write_task = tokio::spawn(write_pump(ws_tx, queue_rx, session_id, config.clone()));
    let mut read_task = tokio::spawn(read_pump(ws_rx, queue_tx, session_id, config));

    // The first pump to stop ends the session
    let writer_finished = tokio::select! {
        _ = &mut write_task => true,
        _ = &mut read_task => false,
    };

    // Hub removal drops its queue sender; together with the read pump's
    // clone (gone when that task ends) this closes the queue exactly once.
    let _ = hub.unregister(session_id).await;

    if writer_finished {
        read_task.abort();
        let _ = read_task.await;
    } else {
        // Give the writer a moment to drain and send a close frame, then
        // stop caring; the socket may already be dead
        let _ = timeout(write_deadline, &mut write_task).await;
        write_task.abort();
    }

    if is_debug_webserver_enabled() {
        logger::debug(
            LogTag::Webserver,
            &format!("Session {} closed (active={})", session_id, hub.active_sessions()),
        );
    }
}

/// Write pump: queue → socket, plus keepalive pings
///
/// Every socket write runs under the write deadline; a slow or dead peer
/// fails the write and ends the session rather than wedging the pump.
async fn write_pump(
    mut ws_tx: SplitSink<WebSocket, Message>,
    mut queue_rx: mpsc::Receiver<Arc<str>>,
    session_id: SessionId,
    config: WebsocketConfig,
) {
    let write_deadline = config.write_deadline();
    let mut keepalive = tokio::time::interval(config.keepalive_interval());
    // interval() yields immediately; skip so the first ping comes after
    // one full keepalive period
    keepalive.tick().await;

    loop {
        tokio::select! {
            maybe_text = queue_rx.recv() => match maybe_text {
                Some(text) => {
                    if !send_with_deadline(
                        &mut ws_tx,
                        Message::Text(text.to_string()),
                        write_deadline,
                        session_id,
                        "message",
                    )
                    .await
                    {
                        return;
                    }
                }
                None => {
                    // Queue closed by the hub: say goodbye and stop
                    let _ = timeout(write_deadline, ws_tx.send(Message::Close(None))).await;
                    return;
                }
            },
            _ = keepalive.tick() => {
                if !send_with_deadline(
                    &mut ws_tx,
                    Message::Ping(Vec::new()),
                    write_deadline,
                    session_id,
                    "ping",
                )
                .await
                {
                    return;
                }
            }
        }
    }
}

async fn send_with_deadline(
    ws_tx: &mut SplitSink<WebSocket, Message>,
    frame: Message,
    deadline: Duration,
    session_id: SessionId,
    what: &str,
) -> bool {
    match timeout(deadline, ws_tx.send(frame)).await {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            if is_debug_webserver_enabled() {
                logger::debug(
                    LogTag::Webserver,
                    &format!("Session {}: {} write failed: {}", session_id, what, e),
                );
            }
            false
        }
        Err(_) => {
            logger::warning(
                LogTag::Webserver,
                &format!(
                    "Session {}: {} write exceeded deadline ({:?})",
                    session_id, what, deadline
                ),
            );
            false
        }
    }
}

/// Read pump: socket → control handling
///
/// Each iteration re-arms the read deadline, so any inbound frame (pong
/// included) counts as liveness. Control replies go through the outbound
/// queue, never through the hub, preserving per-session FIFO order.
async fn read_pump(
    mut ws_rx: SplitStream<WebSocket>,
    queue_tx: mpsc::Sender<Arc<str>>,
    session_id: SessionId,
    config: WebsocketConfig,
) {
    let read_deadline = config.read_deadline();

    loop {
        let frame = match timeout(read_deadline, ws_rx.next()).await {
            Err(_) => {
                logger::warning(
                    LogTag::Webserver,
                    &format!(
                        "Session {}: no traffic for {:?}, dropping idle connection",
                        session_id, read_deadline
                    ),
                );
                return;
            }
            Ok(None) => return,
            Ok(Some(Err(e))) => {
                if is_debug_webserver_enabled() {
                    logger::debug(
                        LogTag::Webserver,
                        &format!("Session {}: read error: {}", session_id, e),
                    );
                }
                return;
            }
            Ok(Some(Ok(frame))) => frame,
        };

        match frame {
            Message::Text(text) => {
                if text.len() > config.max_message_bytes {
                    logger::warning(
                        LogTag::Webserver,
                        &format!(
                            "Session {}: oversized message ({} bytes), dropping connection",
                            session_id,
                            text.len()
                        ),
                    );
                    return;
                }
                if !handle_client_message(&text, &queue_tx, session_id) {
                    return;
                }
            }
            // Any control frame refreshes the deadline by reaching here
            Message::Ping(_) | Message::Pong(_) | Message::Binary(_) => {}
            Message::Close(_) => return,
        }
    }
}

/// Interpret one client control message
///
/// Returns false when the session should be torn down: a full reply queue
/// gets the same backpressure rule the hub applies to broadcasts.
fn handle_client_message(
    text: &str,
    queue_tx: &mpsc::Sender<Arc<str>>,
    session_id: SessionId,
) -> bool {
    // Unparseable input is ignored, matching the tolerance of the rest of
    // the wire protocol toward unknown message types
    let Ok(message) = serde_json::from_str::<ClientMessage>(text) else {
        return true;
    };

    let reply = match message {
        ClientMessage::Ping => ControlReply::Pong,
        ClientMessage::Subscribe { channel } => {
            if is_debug_webserver_enabled() {
                logger::debug(
                    LogTag::Webserver,
                    &format!(
                        "Session {} subscribed (channel={:?})",
                        session_id, channel
                    ),
                );
            }
            ControlReply::Subscribed { channel }
        }
    };

    let json = match reply.to_json() {
        Ok(json) => json,
        Err(e) => {
            logger::error(
                LogTag::Webserver,
                &format!("Session {}: reply serialization failed: {}", session_id, e),
            );
            return true;
        }
    };

    match queue_tx.try_send(Arc::from(json)) {
        Ok(()) => true,
        Err(mpsc::error::TrySendError::Full(_)) => {
            logger::warning(
                LogTag::Webserver,
                &format!(
                    "Session {}: outbound queue full on control reply, disconnecting",
                    session_id
                ),
            );
            false
        }
        Err(mpsc::error::TrySendError::Closed(_)) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_replies_use_queue() {
        let (tx, mut rx) = mpsc::channel::<Arc<str>>(4);
        let id = Uuid::new_v4();

        assert!(handle_client_message(r#"{"type":"ping"}"#, &tx, id));
        let reply = rx.try_recv().unwrap();
        assert_eq!(&*reply, r#"{"type":"pong"}"#);

        assert!(handle_client_message(
            r#"{"type":"subscribe","channel":"alerts"}"#,
            &tx,
            id
        ));
        let reply = rx.try_recv().unwrap();
        assert!(reply.contains("subscribed"));
        assert!(reply.contains("alerts"));
    }

    #[test]
    fn test_garbage_input_is_ignored() {
        let (tx, mut rx) = mpsc::channel::<Arc<str>>(4);
        let id = Uuid::new_v4();

        assert!(handle_client_message("not json", &tx, id));
        assert!(handle_client_message(r#"{"type":"unknown"}"#, &tx, id));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_full_reply_queue_tears_session_down() {
        let (tx, _rx) = mpsc::channel::<Arc<str>>(1);
        let id = Uuid::new_v4();

        assert!(handle_client_message(r#"{"type":"ping"}"#, &tx, id));
        // Queue now full and the consumer is not draining
        assert!(!handle_client_message(r#"{"type":"ping"}"#, &tx, id));
    }
}

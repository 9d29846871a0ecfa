/// WebSocket upgrade endpoint
///
/// `GET /api/v1/ws?scope_id=<n>&user_id=<id>` hands the connection to the
/// hub, which runs it as a session until either side gives up. Both query
/// values are optional and opaque: the handshake cannot carry custom
/// headers, so identity arrives in the URL and is not verified here.
use axum::{
    extract::{Query, State, WebSocketUpgrade},
    response::Response,
    routing::get,
    Router,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::{
    arguments::is_debug_webserver_enabled,
    logger::{self, LogTag},
    webserver::{
        state::AppState,
        ws::session::{self, SessionContext},
    },
};

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// Target scope; absent or unparseable values fall back to 0 (broadcast)
    #[serde(default)]
    pub scope_id: Option<String>,

    #[serde(default)]
    pub user_id: Option<String>,
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/ws", get(ws_handler))
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsQuery>,
    State(state): State<Arc<AppState>>,
) -> Response {
    // Tolerate garbage scope values instead of failing the handshake;
    // an unscoped session still receives broadcasts
    let scope_id = params
        .scope_id
        .as_deref()
        .and_then(|raw| raw.parse::<u64>().ok())
        .unwrap_or(0);

    if is_debug_webserver_enabled() {
        logger::debug(
            LogTag::Webserver,
            &format!(
                "WebSocket upgrade (scope_id={}, user_id={:?})",
                scope_id, params.user_id
            ),
        );
    }

    let hub = state.hub.clone();
    let config = state.config.websocket.clone();
    let ctx = SessionContext {
        scope_id,
        user_id: params.user_id,
    };

    ws.on_upgrade(move |socket| session::run_session(socket, hub, ctx, config))
}

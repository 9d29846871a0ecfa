/// Push endpoints
///
/// Thin HTTP surface over the dispatcher for backend jobs that are not
/// in-process. Guarded by the strict fixed-window gate: notification blasts
/// are exactly the kind of endpoint that needs a hard, auditable cap.
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::webserver::{middleware, state::AppState, utils};

#[derive(Debug, Deserialize)]
pub struct NotifyRequest {
    /// Target scope, 0 = every connected session
    #[serde(default)]
    pub scope_id: u64,

    pub title: String,

    pub message: String,
}

pub fn routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/notify", post(notify))
        .route_layer(axum::middleware::from_fn_with_state(
            state,
            middleware::window_rate_limit,
        ))
}

/// Queue a notification for fan-out
///
/// Publication is best-effort: 202 means the event was handed to the hub,
/// not that any client received it.
async fn notify(
    State(state): State<Arc<AppState>>,
    Json(request): Json<NotifyRequest>,
) -> Response {
    if request.title.is_empty() || request.title.len() > 100 {
        return utils::error_response(
            StatusCode::BAD_REQUEST,
            "INVALID_TITLE",
            "title must be 1-100 characters",
            None,
        );
    }
    if request.message.is_empty() || request.message.len() > 1000 {
        return utils::error_response(
            StatusCode::BAD_REQUEST,
            "INVALID_MESSAGE",
            "message must be 1-1000 characters",
            None,
        );
    }

    state
        .dispatcher
        .notify(request.scope_id, &request.title, &request.message);

    (
        StatusCode::ACCEPTED,
        Json(json!({
            "status": "queued",
            "scope_id": request.scope_id,
        })),
    )
        .into_response()
}

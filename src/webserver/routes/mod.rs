use axum::{routing::get, Json, Router};
use serde_json::json;
use std::sync::Arc;

use crate::webserver::{middleware, state::AppState};

pub mod push;
pub mod status;
pub mod ws;

/// Build the full application router
///
/// Everything under /api/v1 sits behind the global per-caller token
/// bucket; the push routes add their own stricter fixed-window gate on
/// top. /health stays outside the API prefix but is throttled the same
/// way; probes are cheap and a caller hammering it is still abusive.
pub fn create_router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .merge(ws::routes())
        .merge(status::routes())
        .nest("/push", push::routes(state.clone()));

    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::global_rate_limit,
        ))
        .with_state(state)
}

/// Liveness probe
async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

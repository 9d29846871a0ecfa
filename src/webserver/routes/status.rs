/// Status endpoint
///
/// One JSON snapshot of everything worth watching: uptime, hub counters,
/// limiter registry size, request totals.
use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;

use crate::webserver::{state::AppState, ws::metrics::HubMetricsSnapshot};

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub uptime_seconds: u64,
    pub hub: HubMetricsSnapshot,
    pub limiter_keys: usize,
    pub requests: u64,
    pub denied: u64,
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/status", get(status))
}

async fn status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let (requests, denied) = state.http_stats.snapshot();
    Json(StatusResponse {
        status: "ok",
        uptime_seconds: state.uptime_seconds(),
        hub: state.hub.metrics_snapshot(),
        limiter_keys: state.ip_limiters.len(),
        requests,
        denied,
    })
}

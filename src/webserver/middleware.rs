/// Webserver middleware
///
/// Rate-limiting gates applied in front of route handlers. Two gates with
/// different guarantees:
/// - `global_rate_limit`: per-caller token bucket over the whole API,
///   smooth burst-tolerant throttling keyed by client IP
/// - `window_rate_limit`: fixed-window counter keyed by IP + path, a
///   hard auditable cap for sensitive endpoints with precise resets
///
/// Limiter exhaustion is a normal denial, not an error: the caller gets a
/// 429 with retry guidance and informational X-RateLimit-* headers.
use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::{
    arguments::is_debug_ratelimit_enabled,
    logger::{self, LogTag},
    webserver::state::AppState,
};

/// Denial body returned with every 429
#[derive(Debug, Serialize)]
struct RateLimitBody {
    code: u16,
    message: String,
    /// Seconds the caller should wait before retrying
    retry_after: u64,
}

/// Global per-caller token bucket gate
///
/// Looks up (or lazily creates) the caller's bucket in the registry and
/// consumes one token. Denials never block; the registry's sweep keeps the
/// key space bounded.
pub async fn global_rate_limit(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    state.http_stats.inc_request();

    let key = client_key(&request);
    let bucket = state.ip_limiters.limiter_for(&key);

    if bucket.allow() {
        let mut response = next.run(request).await;
        attach_limit_headers(
            &mut response,
            bucket.capacity(),
            bucket.remaining(),
            Utc::now().timestamp(),
        );
        return response;
    }

    state.http_stats.inc_denied();
    let retry_after = bucket.retry_after().as_secs().max(1);

    if is_debug_ratelimit_enabled() {
        logger::debug(
            LogTag::RateLimit,
            &format!("Denied {} (bucket empty, retry in {}s)", key, retry_after),
        );
    }

    let mut response = too_many_requests("Too many requests, please slow down", retry_after);
    attach_limit_headers(
        &mut response,
        bucket.capacity(),
        0,
        Utc::now().timestamp() + retry_after as i64,
    );
    response
}

/// Strict fixed-window gate for sensitive endpoints
///
/// Keyed by caller IP and request path so one noisy endpoint cannot eat
/// another's budget. Successful responses still carry the informational
/// headers so well-behaved callers can self-throttle.
pub async fn window_rate_limit(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let cfg = &state.config.ratelimit;
    let key = format!("{}:{}", client_key(&request), request.uri().path());
    let decision = state
        .windows
        .allow(&key, cfg.window_limit, cfg.window());

    let reset_unix = Utc::now().timestamp() + decision.reset_after.as_secs() as i64;

    if decision.allowed {
        let mut response = next.run(request).await;
        attach_limit_headers(
            &mut response,
            decision.limit as u64,
            decision.remaining as u64,
            reset_unix,
        );
        return response;
    }

    state.http_stats.inc_denied();
    let retry_after = decision.retry_after.as_secs().max(1);

    if is_debug_ratelimit_enabled() {
        logger::debug(
            LogTag::RateLimit,
            &format!(
                "Window limit hit for {} ({}/{}), retry in {}s",
                key, decision.limit, decision.limit, retry_after
            ),
        );
    }

    let mut response =
        too_many_requests("Rate limit exceeded for this endpoint", retry_after);
    attach_limit_headers(&mut response, decision.limit as u64, 0, reset_unix);
    response
}

/// Resolve the caller key for limiter lookups
///
/// First X-Forwarded-For hop when present (deployments behind a proxy),
/// otherwise the socket peer address.
fn client_key(request: &Request) -> String {
    if let Some(forwarded) = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
    {
        if let Some(first) = forwarded.split(',').next() {
            let ip = first.trim();
            if !ip.is_empty() {
                return ip.to_string();
            }
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn too_many_requests(message: &str, retry_after: u64) -> Response {
    let mut response = (
        StatusCode::TOO_MANY_REQUESTS,
        Json(RateLimitBody {
            code: 429,
            message: message.to_string(),
            retry_after,
        }),
    )
        .into_response();

    if let Ok(value) = HeaderValue::from_str(&retry_after.to_string()) {
        response.headers_mut().insert(header::RETRY_AFTER, value);
    }
    response
}

fn attach_limit_headers(response: &mut Response, limit: u64, remaining: u64, reset_unix: i64) {
    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&limit.to_string()) {
        headers.insert("x-ratelimit-limit", value);
    }
    if let Ok(value) = HeaderValue::from_str(&remaining.to_string()) {
        headers.insert("x-ratelimit-remaining", value);
    }
    if let Ok(value) = HeaderValue::from_str(&reset_unix.to_string()) {
        headers.insert("x-ratelimit-reset", value);
    }
}

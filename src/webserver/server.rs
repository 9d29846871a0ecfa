/// Axum webserver implementation
///
/// Server lifecycle: bind, serve with graceful shutdown, stop on request.
/// The shutdown notifier is the only process-wide static in this module;
/// all application state is injected through `AppState`.
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;

use axum::Router;

use crate::{
    logger::{self, LogTag},
    webserver::{routes, state::AppState},
};

/// Global shutdown notifier
static SHUTDOWN_NOTIFY: once_cell::sync::Lazy<Arc<Notify>> =
    once_cell::sync::Lazy::new(|| Arc::new(Notify::new()));

/// Start the webserver
///
/// Blocks until the server is shut down via `shutdown()`.
pub async fn start_server(state: Arc<AppState>) -> Result<(), String> {
    let bind_addr = state.config.server.bind_addr();
    let addr: SocketAddr = bind_addr
        .parse()
        .map_err(|e| format!("Invalid bind address {}: {}", bind_addr, e))?;

    let listener = TcpListener::bind(&addr).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::AddrInUse => format!(
            "Failed to bind to {}: address already in use\n\
             Another apphub instance is probably running on this port.",
            addr
        ),
        std::io::ErrorKind::PermissionDenied => format!(
            "Failed to bind to {}: permission denied\n\
             Ports below 1024 require elevated privileges; pick a higher port.",
            addr
        ),
        _ => format!("Failed to bind to {}: {}", addr, e),
    })?;

    logger::info(
        LogTag::Webserver,
        &format!("Listening on http://{}", addr),
    );
    logger::info(
        LogTag::Webserver,
        &format!("WebSocket endpoint at ws://{}/api/v1/ws", addr),
    );

    let app = build_app(state);

    let shutdown_signal = async {
        SHUTDOWN_NOTIFY.notified().await;
        logger::info(LogTag::Webserver, "Shutdown requested, stopping server...");
    };

    // ConnectInfo feeds the rate limiters their per-caller key
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal)
    .await
    .map_err(|e| format!("Server error: {}", e))?;

    logger::info(LogTag::Webserver, "Webserver stopped");
    Ok(())
}

/// Trigger webserver shutdown
pub fn shutdown() {
    SHUTDOWN_NOTIFY.notify_one();
}

/// Build the Axum application with all routes and middleware
fn build_app(state: Arc<AppState>) -> Router {
    routes::create_router(state)
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
}

use anyhow::Context;
use std::path::Path;
use std::sync::Arc;

use apphub::{
    arguments,
    config::Config,
    logger::{self, LogTag},
    webserver::{self, state::AppState, ws::hub::Hub, ws::sources},
};

/// Main entry point for apphub
///
/// Owns the lifecycle of every long-lived piece: the hub loop, the limiter
/// sweep, the monitor sampler and the webserver. Everything is constructed
/// here and wired together explicitly; shutdown is ctrl-c → graceful server
/// stop → hub drain.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logger::init();

    if arguments::is_help_requested() {
        arguments::print_help();
        return Ok(());
    }

    logger::info(LogTag::System, "apphub starting up...");
    arguments::print_debug_info();

    // Configuration
    let config_path = arguments::get_config_path().unwrap_or_else(|| "apphub.toml".to_string());
    let config = Config::load(Path::new(&config_path))
        .context("loading configuration")
        .map(Arc::new)?;

    // Hub actor loop
    let (hub, hub_handle) = Hub::new(config.websocket.hub_channel_capacity);
    let hub_task = tokio::spawn(hub.run());

    // Shared state: dispatcher, limiters, counters
    let state = Arc::new(AppState::new(Arc::clone(&config), hub_handle.clone()));

    // Idle-bucket eviction sweep
    let sweeper = state.ip_limiters.start_sweeper(
        config.ratelimit.sweep_interval(),
        config.ratelimit.idle_threshold(),
    );

    // In-process producers (monitor sampler)
    sources::start_all(Arc::clone(&state));

    // Ctrl-C triggers graceful shutdown
    tokio::spawn(async {
        if tokio::signal::ctrl_c().await.is_ok() {
            logger::info(LogTag::System, "Shutdown signal received");
            webserver::server::shutdown();
        }
    });

    // Serve until shutdown
    let served = webserver::server::start_server(Arc::clone(&state)).await;

    // Stop background work and drain the hub regardless of how serving ended
    sweeper.abort();
    hub_handle.shutdown().await;
    let _ = hub_task.await;

    if let Err(e) = served {
        logger::error(LogTag::Webserver, &e);
        anyhow::bail!(e);
    }

    logger::info(LogTag::System, "apphub stopped");
    Ok(())
}

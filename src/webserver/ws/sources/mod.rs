/// In-process event producers
///
/// Background tasks that feed the hub through the dispatcher. This file
/// only starts them; each source owns its own loop.
use std::sync::Arc;

use crate::{
    arguments::is_debug_monitor_enabled,
    logger::{self, LogTag},
    webserver::state::AppState,
};

pub mod monitor;

/// Start all enabled producers (spawns background tasks)
pub fn start_all(state: Arc<AppState>) {
    if state.config.monitor.enabled {
        monitor::start(state);
    } else if is_debug_monitor_enabled() {
        logger::debug(LogTag::Monitor, "Monitor sampler disabled by config");
    }
}

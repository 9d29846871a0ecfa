/// Monitor sampler
///
/// Publishes a process-level sample (request/denial counters, active
/// sessions, uptime) through the hub on a fixed interval so connected
/// dashboards get a live health feed without polling.
use std::sync::Arc;
use tokio::time::interval;

use crate::{
    arguments::is_debug_monitor_enabled,
    logger::{self, LogTag},
    webserver::state::AppState,
    webserver::ws::message::MonitorSample,
};

pub fn start(state: Arc<AppState>) {
    tokio::spawn(run(state));
    if is_debug_monitor_enabled() {
        logger::debug(LogTag::Monitor, "Monitor sampler started");
    }
}

async fn run(state: Arc<AppState>) {
    let mut ticker = interval(state.config.monitor.interval());
    // skip the immediate first tick; there is nothing to report yet
    ticker.tick().await;

    loop {
        ticker.tick().await;
        let sample = gather_sample(&state);

        if is_debug_monitor_enabled() {
            logger::debug(
                LogTag::Monitor,
                &format!(
                    "Sample: requests={} denied={} sessions={}",
                    sample.requests, sample.denied, sample.active_sessions
                ),
            );
        }

        // Unscoped: every connected dashboard gets the sample
        state.dispatcher.monitor(0, &sample);
    }
}

fn gather_sample(state: &AppState) -> MonitorSample {
    let (requests, denied) = state.http_stats.snapshot();
    let hub = state.hub.metrics_snapshot();

    MonitorSample {
        requests,
        denied,
        deny_rate: if requests > 0 {
            denied as f64 / requests as f64
        } else {
            0.0
        },
        active_sessions: hub.active_sessions,
        events_dispatched: hub.events_dispatched,
        uptime_seconds: state.uptime_seconds(),
    }
}

/// Centralized argument handling for apphub
///
/// Consolidates command-line argument parsing and debug flag checking so the
/// rest of the codebase never touches `std::env::args()` directly.
///
/// Features:
/// - Thread-safe CMD_ARGS storage (overridable from tests)
/// - Debug flag checking functions for all modules
/// - Value-flag lookup (`--config <path>`)
use once_cell::sync::Lazy;
use std::env;
use std::sync::Mutex;

/// Global command-line arguments storage
pub static CMD_ARGS: Lazy<Mutex<Vec<String>>> = Lazy::new(|| Mutex::new(env::args().collect()));

/// Sets the global command-line arguments
/// Used by tests to override the default env::args() collection
pub fn set_cmd_args(args: Vec<String>) {
    if let Ok(mut cmd_args) = CMD_ARGS.lock() {
        *cmd_args = args;
    }
}

/// Gets a copy of the current command-line arguments
pub fn get_cmd_args() -> Vec<String> {
    match CMD_ARGS.lock() {
        Ok(args) => args.clone(),
        Err(_) => env::args().collect(),
    }
}

/// Checks if a specific argument is present in the command line
pub fn has_arg(arg: &str) -> bool {
    get_cmd_args().iter().any(|a| a == arg)
}

/// Gets the value of a command-line argument that follows a flag
/// Returns None if the flag is not found or has no value
pub fn get_arg_value(flag: &str) -> Option<String> {
    let args = get_cmd_args();
    for (i, arg) in args.iter().enumerate() {
        if arg == flag && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
    }
    None
}

/// Path to the TOML configuration file (`--config <path>`)
pub fn get_config_path() -> Option<String> {
    get_arg_value("--config")
}

// =============================================================================
// DEBUG FLAG CHECKING FUNCTIONS
// These functions check for specific debug flags in the command-line arguments
// =============================================================================

/// Webserver module debug mode
pub fn is_debug_webserver_enabled() -> bool {
    has_arg("--debug-webserver")
}

/// Hub (websocket fan-out) debug mode
pub fn is_debug_hub_enabled() -> bool {
    has_arg("--debug-hub")
}

/// Rate limiter debug mode
pub fn is_debug_ratelimit_enabled() -> bool {
    has_arg("--debug-ratelimit")
}

/// Monitor sampler debug mode
pub fn is_debug_monitor_enabled() -> bool {
    has_arg("--debug-monitor")
}

/// Global verbose mode
pub fn is_verbose_enabled() -> bool {
    has_arg("--verbose")
}

/// Quiet mode (warnings and errors only)
pub fn is_quiet_enabled() -> bool {
    has_arg("--quiet")
}

/// Help requested via any of the common spellings
pub fn is_help_requested() -> bool {
    has_arg("--help") || has_arg("-h") || has_arg("help")
}

/// Print usage information
pub fn print_help() {
    println!("apphub - real-time push hub for the app platform");
    println!();
    println!("USAGE:");
    println!("    apphub [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    --config <path>       Path to TOML configuration file");
    println!("    --quiet               Only show warnings and errors");
    println!("    --verbose             Show verbose trace output");
    println!("    --debug-webserver     Debug logs for the HTTP/WebSocket server");
    println!("    --debug-hub           Debug logs for the fan-out hub");
    println!("    --debug-ratelimit     Debug logs for the rate limiters");
    println!("    --debug-monitor       Debug logs for the monitor sampler");
    println!("    -h, --help            Print this help text");
}

/// Print which debug modes are active at startup (if any)
pub fn print_debug_info() {
    let mut active = Vec::new();
    if is_debug_webserver_enabled() {
        active.push("webserver");
    }
    if is_debug_hub_enabled() {
        active.push("hub");
    }
    if is_debug_ratelimit_enabled() {
        active.push("ratelimit");
    }
    if is_debug_monitor_enabled() {
        active.push("monitor");
    }
    if !active.is_empty() {
        println!("Debug modes enabled: {}", active.join(", "));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arg_value_lookup() {
        set_cmd_args(vec![
            "apphub".to_string(),
            "--config".to_string(),
            "/tmp/apphub.toml".to_string(),
            "--debug-hub".to_string(),
        ]);

        assert_eq!(get_config_path().as_deref(), Some("/tmp/apphub.toml"));
        assert!(is_debug_hub_enabled());
        assert!(!is_debug_webserver_enabled());

        set_cmd_args(vec!["apphub".to_string()]);
    }
}

/// Logger configuration derived from command-line arguments
///
/// Holds the minimum level threshold plus the per-module debug/verbose
/// sets. The configuration is initialized once at startup and can be
/// swapped at runtime from tests.
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::HashSet;

use super::levels::LogLevel;
use super::tags::LogTag;
use crate::arguments;

/// Runtime logger configuration
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// Minimum level threshold (messages above it are suppressed)
    pub min_level: LogLevel,

    /// Modules with `--debug-<key>` enabled
    pub debug_tags: HashSet<String>,

    /// Modules with `--verbose-<key>` enabled
    pub verbose_tags: HashSet<String>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            min_level: LogLevel::Info,
            debug_tags: HashSet::new(),
            verbose_tags: HashSet::new(),
        }
    }
}

static LOGGER_CONFIG: Lazy<RwLock<LoggerConfig>> =
    Lazy::new(|| RwLock::new(LoggerConfig::default()));

/// Snapshot of the current logger configuration
pub fn get_logger_config() -> LoggerConfig {
    LOGGER_CONFIG.read().clone()
}

/// Replace the logger configuration (tests, runtime reconfiguration)
pub fn set_logger_config(config: LoggerConfig) {
    *LOGGER_CONFIG.write() = config;
}

/// Build the configuration from command-line arguments
///
/// Recognized flags:
/// - `--quiet` lowers the threshold to warnings only
/// - `--verbose` raises it to full trace output
/// - `--debug-<key>` / `--verbose-<key>` enable one module
pub fn init_from_args() {
    let mut config = LoggerConfig::default();

    if arguments::is_quiet_enabled() {
        config.min_level = LogLevel::Warning;
    }
    if arguments::is_verbose_enabled() {
        config.min_level = LogLevel::Verbose;
    }

    for arg in arguments::get_cmd_args() {
        if let Some(key) = arg.strip_prefix("--debug-") {
            config.debug_tags.insert(key.to_string());
        } else if let Some(key) = arg.strip_prefix("--verbose-") {
            config.verbose_tags.insert(key.to_string());
        }
    }

    set_logger_config(config);
}

/// Whether `--debug-<key>` was passed for this tag
pub fn is_debug_enabled_for_tag(tag: &LogTag) -> bool {
    LOGGER_CONFIG.read().debug_tags.contains(&tag.to_debug_key())
}

/// Whether `--verbose-<key>` was passed for this tag
pub fn is_verbose_enabled_for_tag(tag: &LogTag) -> bool {
    LOGGER_CONFIG
        .read()
        .verbose_tags
        .contains(&tag.to_debug_key())
}

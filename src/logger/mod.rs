//! Structured logging for apphub
//!
//! Provides a small, ergonomic logging API with:
//! - Standard log levels (Error/Warning/Info/Debug/Verbose)
//! - Per-module debug control via `--debug-<module>` flags
//! - Dual output: colored console + file persistence
//!
//! ## Usage
//!
//! ```rust
//! use apphub::logger::{self, LogTag};
//!
//! logger::info(LogTag::Webserver, "Listening on 127.0.0.1:8080");
//! logger::warning(LogTag::RateLimit, "Registry above 10k keys");
//! logger::debug(LogTag::Hub, "Session registered"); // only with --debug-hub
//! ```
//!
//! ## Initialization
//!
//! Call once at startup, before any logging occurs:
//! ```rust
//! apphub::logger::init();
//! ```

mod config;
mod core;
mod file;
mod format;
mod levels;
mod tags;

pub use config::{get_logger_config, init_from_args, set_logger_config, LoggerConfig};
pub use levels::LogLevel;
pub use tags::LogTag;

/// Initialize the logger system
///
/// Parses command-line arguments for debug flags, configures per-module
/// debug modes and opens the log file. Call this in main.rs before
/// starting any services.
pub fn init() {
    config::init_from_args();
    file::init_file_logging();
}

/// Log at ERROR level (always shown, critical issues)
pub fn error(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Error, message);
}

/// Log at WARNING level (important issues, shown unless --quiet)
pub fn warning(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Warning, message);
}

/// Log at INFO level (standard operations)
pub fn info(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Info, message);
}

/// Log at DEBUG level
///
/// Only shown when the matching `--debug-<module>` flag is provided,
/// e.g. `--debug-hub` for `LogTag::Hub`.
pub fn debug(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Debug, message);
}

/// Log at VERBOSE level (gated by --verbose)
pub fn verbose(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Verbose, message);
}

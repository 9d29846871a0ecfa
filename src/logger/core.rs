/// Core logging implementation with automatic filtering
///
/// Decides whether a message should be displayed based on level and tag,
/// then delegates to the format module for output.
use super::config::{get_logger_config, is_debug_enabled_for_tag, is_verbose_enabled_for_tag};
use super::levels::LogLevel;
use super::tags::LogTag;

/// Check if a log message should be displayed
///
/// Filtering rules:
/// 1. Errors are always shown
/// 2. Messages above the minimum level threshold are suppressed
/// 3. Debug level requires the `--debug-<module>` flag for that tag
/// 4. Verbose level requires `--verbose` or `--verbose-<module>`
pub fn should_log(tag: &LogTag, level: LogLevel) -> bool {
    let config = get_logger_config();

    if level == LogLevel::Error {
        return true;
    }

    if level == LogLevel::Debug {
        return is_debug_enabled_for_tag(tag) || config.min_level >= LogLevel::Debug;
    }

    if level == LogLevel::Verbose {
        return config.min_level == LogLevel::Verbose || is_verbose_enabled_for_tag(tag);
    }

    level <= config.min_level
}

/// Internal logging entry point used by the public level functions
pub fn log_internal(tag: LogTag, level: LogLevel, message: &str) {
    if !should_log(&tag, level) {
        return;
    }

    super::format::format_and_log(tag, level.as_str(), message);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::config::{set_logger_config, LoggerConfig};

    #[test]
    fn test_filtering_rules() {
        set_logger_config(LoggerConfig::default());

        // Errors always pass, even for un-flagged tags
        assert!(should_log(&LogTag::Hub, LogLevel::Error));

        // Info passes at the default threshold
        assert!(should_log(&LogTag::Webserver, LogLevel::Info));

        // Debug requires the module flag
        assert!(!should_log(&LogTag::Hub, LogLevel::Debug));

        let mut config = LoggerConfig::default();
        config.debug_tags.insert("hub".to_string());
        set_logger_config(config);
        assert!(should_log(&LogTag::Hub, LogLevel::Debug));

        set_logger_config(LoggerConfig::default());
    }
}

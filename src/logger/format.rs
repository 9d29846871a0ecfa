//! Log formatting and output with ANSI colors
//!
//! Handles colorized console output with aligned tag and level columns,
//! plus a plain-text mirror to the log file.

use super::file::write_to_file;
use super::tags::LogTag;
use chrono::Local;
use colored::*;
use std::io::{stdout, ErrorKind, Write};

/// Column widths for alignment
const TAG_WIDTH: usize = 9;
const LEVEL_WIDTH: usize = 7;

/// Format and output a log message
pub fn format_and_log(tag: LogTag, level: &str, message: &str) {
    let now = Local::now();
    let time = now.format("%H:%M:%S").to_string();

    let console_line = format!(
        "{} [{}] [{}] {}",
        time.dimmed(),
        format_tag(&tag),
        format_level(level),
        message
    );
    print_stdout_safe(&console_line);

    let file_line = format!(
        "{} [{}] [{}] {}",
        now.format("%Y-%m-%d %H:%M:%S"),
        tag.to_plain_string(),
        level,
        message
    );
    write_to_file(&file_line);
}

/// Format a tag with its module color
fn format_tag(tag: &LogTag) -> ColoredString {
    let padded = format!("{:<width$}", tag.to_plain_string(), width = TAG_WIDTH);
    match tag {
        LogTag::System => padded.bright_yellow().bold(),
        LogTag::Config => padded.bright_white().bold(),
        LogTag::Webserver => padded.bright_blue().bold(),
        LogTag::Hub => padded.bright_cyan().bold(),
        LogTag::RateLimit => padded.bright_magenta().bold(),
        LogTag::Monitor => padded.bright_green().bold(),
    }
}

/// Format a level string with severity color
fn format_level(level: &str) -> ColoredString {
    let padded = format!("{:<width$}", level, width = LEVEL_WIDTH);
    match level {
        "ERROR" => padded.bright_red().bold(),
        "WARNING" => padded.yellow().bold(),
        "INFO" => padded.green(),
        "DEBUG" => padded.cyan(),
        _ => padded.dimmed(),
    }
}

/// Print to stdout, tolerating broken pipes (e.g. `apphub | head`)
fn print_stdout_safe(line: &str) {
    let mut out = stdout().lock();
    if let Err(e) = writeln!(out, "{}", line) {
        if e.kind() == ErrorKind::BrokenPipe {
            std::process::exit(0);
        }
    }
}

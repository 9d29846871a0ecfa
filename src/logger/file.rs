/// File persistence for log output
///
/// Mirrors every console line into `logs/apphub.log` without ANSI codes.
/// File logging is best-effort: failures to open or append never interrupt
/// the process, the console remains the primary sink.
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::fs::{create_dir_all, File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

static LOG_FILE: Lazy<Mutex<Option<File>>> = Lazy::new(|| Mutex::new(None));

fn log_file_path() -> PathBuf {
    PathBuf::from("logs").join("apphub.log")
}

/// Open the log file for appending, creating the logs directory if needed
pub fn init_file_logging() {
    let path = log_file_path();
    if let Some(parent) = path.parent() {
        if create_dir_all(parent).is_err() {
            return;
        }
    }

    match OpenOptions::new().create(true).append(true).open(&path) {
        Ok(file) => {
            *LOG_FILE.lock() = Some(file);
        }
        Err(e) => {
            eprintln!("apphub: file logging disabled ({}: {})", path.display(), e);
        }
    }
}

/// Append one line to the log file (no-op when file logging is disabled)
pub fn write_to_file(line: &str) {
    let mut guard = LOG_FILE.lock();
    if let Some(file) = guard.as_mut() {
        let _ = writeln!(file, "{}", line);
    }
}

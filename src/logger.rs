//! Session logger: backend for the `log` facade.
//!
//! In window mode every record goes to a single file in the OS data
//! directory, **truncated at each launch** so it only holds the most recent
//! session. Warnings and errors are mirrored to stderr. In batch mode there is
//! no file and records go to stderr only.
//!
//! Log location:
//!   Windows:  `%APPDATA%\PaintRing\paintring.log`
//!   Linux:    `~/.local/share/PaintRing/paintring.log`
//!   macOS:    `~/Library/Application Support/PaintRing/paintring.log`
//!
//! The level defaults to `info` and can be overridden with `PAINTRING_LOG`
//! (`error`, `warn`, `info`, `debug`, `trace`, `off`).

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};

use log::{Level, LevelFilter, Log, Metadata, Record};

static LOG_FILE: OnceLock<Mutex<File>> = OnceLock::new();
static LOG_PATH: OnceLock<PathBuf> = OnceLock::new();
static LOGGER: SessionLogger = SessionLogger;

/// Records at or above this level are echoed to stderr.
static STDERR_LEVEL: OnceLock<Level> = OnceLock::new();

struct SessionLogger;

impl Log for SessionLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format!(
            "[{}] [{}] {}: {}",
            timestamp(),
            record.level(),
            record.target(),
            record.args()
        );
        write_line(&line);
        let echo = STDERR_LEVEL.get().copied().unwrap_or(Level::Warn);
        if record.level() <= echo {
            eprintln!("{line}");
        }
    }

    fn flush(&self) {
        if let Some(mutex) = LOG_FILE.get()
            && let Ok(mut file) = mutex.lock()
        {
            let _ = file.flush();
        }
    }
}

/// Returns the path to the current session log file.
pub fn log_path() -> Option<&'static PathBuf> {
    LOG_PATH.get()
}

/// Write a raw line to the session log. Silently ignores I/O errors so that
/// logging never crashes the application.
fn write_line(line: &str) {
    if let Some(mutex) = LOG_FILE.get()
        && let Ok(mut file) = mutex.lock()
    {
        let _ = writeln!(file, "{}", line);
    }
}

/// Initialise the window-mode logger. Call once, before any logging.
///
/// * Creates (or truncates) the log file.
/// * Installs a panic hook that writes the panic message to the log before
///   propagating to the default handler.
pub fn init() {
    let path = log_file_path();

    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }

    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&path);

    match file {
        Ok(f) => {
            let _ = LOG_PATH.set(path.clone());
            let _ = LOG_FILE.set(Mutex::new(f));
        }
        Err(e) => {
            // Not fatal: records still reach stderr.
            eprintln!("[logger] Failed to open log file {:?}: {}", path, e);
        }
    }

    install(level_from_env(LevelFilter::Info), Level::Warn);

    write_line(&format!(
        "=== PaintRing session started {} ===",
        human_timestamp()
    ));
    write_line(&format!("Log file: {}", path.display()));
    write_line("");

    let prev = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        write_line(&format!("[{}] [PANIC] {}", timestamp(), info));
        prev(info);
    }));
}

/// Initialise the batch-mode logger: stderr only, `info` when verbose and
/// `warn` otherwise.
pub fn init_console(verbose: bool) {
    let default = if verbose {
        LevelFilter::Info
    } else {
        LevelFilter::Warn
    };
    install(level_from_env(default), Level::Trace);
}

fn install(level: LevelFilter, stderr_level: Level) {
    let _ = STDERR_LEVEL.set(stderr_level);
    // A second init (tests, re-entry) keeps the first logger.
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}

fn level_from_env(default: LevelFilter) -> LevelFilter {
    std::env::var("PAINTRING_LOG")
        .ok()
        .and_then(|v| parse_level(&v))
        .unwrap_or(default)
}

fn parse_level(value: &str) -> Option<LevelFilter> {
    value.trim().parse().ok()
}

fn log_file_path() -> PathBuf {
    data_dir().join("PaintRing").join("paintring.log")
}

/// Platform data directory (without the app sub-folder).
fn data_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Ok(appdata) = std::env::var("APPDATA") {
            return PathBuf::from(appdata);
        }
    }
    #[cfg(target_os = "macos")]
    {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home)
                .join("Library")
                .join("Application Support");
        }
    }
    if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(xdg);
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".local").join("share");
    }
    PathBuf::from(".")
}

/// HH:MM:SS (UTC) within the current day.
fn timestamp() -> String {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(d) => {
            let secs = d.as_secs();
            let h = (secs % 86400) / 3600;
            let m = (secs % 3600) / 60;
            let s = secs % 60;
            format!("{:02}:{:02}:{:02}", h, m, s)
        }
        Err(_) => "??:??:??".to_string(),
    }
}

fn human_timestamp() -> String {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(d) => format!("(unix {})", d.as_secs()),
        Err(_) => "(unknown time)".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_names_parse_case_insensitively() {
        assert_eq!(parse_level("debug"), Some(LevelFilter::Debug));
        assert_eq!(parse_level(" WARN "), Some(LevelFilter::Warn));
        assert_eq!(parse_level("off"), Some(LevelFilter::Off));
        assert_eq!(parse_level("loud"), None);
    }

    #[test]
    fn timestamp_is_clock_shaped() {
        let ts = timestamp();
        assert_eq!(ts.len(), 8);
        assert_eq!(ts.as_bytes()[2], b':');
        assert_eq!(ts.as_bytes()[5], b':');
    }
}

//! Structured test output.
#![allow(dead_code)]
//!
//! `TestLogger` prints one line per step to stderr so a failing scenario
//! shows how far it got. `TEST_LOG_JSON=1` switches to JSON lines and
//! `TEST_LOG_LEVEL` filters (default: info).

use std::env;
use std::fmt::Display;
use std::sync::{Mutex, OnceLock};
use std::time::Instant;

use chrono::Utc;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
}

impl LogLevel {
    fn from_env() -> Self {
        match env::var("TEST_LOG_LEVEL")
            .unwrap_or_default()
            .to_lowercase()
            .as_str()
        {
            "trace" | "debug" => Self::Debug,
            "warn" | "warning" | "error" => Self::Warn,
            _ => Self::Info,
        }
    }
}

impl Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Serialize)]
struct LogEntry<'a> {
    timestamp: String,
    level: LogLevel,
    test: &'a str,
    phase: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_ms: Option<u64>,
}

static MIN_LEVEL: OnceLock<LogLevel> = OnceLock::new();
static JSON_MODE: OnceLock<bool> = OnceLock::new();

fn min_level() -> LogLevel {
    *MIN_LEVEL.get_or_init(LogLevel::from_env)
}

fn json_mode() -> bool {
    *JSON_MODE.get_or_init(|| {
        env::var("TEST_LOG_JSON").is_ok_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
    })
}

/// Per-test logger with phase and duration tracking.
pub struct TestLogger {
    test_name: String,
    start_time: Instant,
    current_phase: Mutex<String>,
}

impl TestLogger {
    #[must_use]
    pub fn new(test_name: &str) -> Self {
        let logger = Self {
            test_name: test_name.to_string(),
            start_time: Instant::now(),
            current_phase: Mutex::new("init".to_string()),
        };
        logger.log(LogLevel::Info, "Test starting", None);
        logger
    }

    /// Common phases: "setup", "act", "verify".
    pub fn phase(&self, phase: &str) {
        if let Ok(mut current) = self.current_phase.lock() {
            *current = phase.to_string();
        }
        self.log(LogLevel::Debug, &format!("Phase: {phase}"), None);
    }

    pub fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message, None);
    }

    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, message, None);
    }

    pub fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, message, None);
    }

    pub fn finish_ok(&self) {
        let duration_ms = self.elapsed_ms();
        self.log(
            LogLevel::Info,
            &format!("Test passed (duration: {duration_ms}ms)"),
            Some(duration_ms),
        );
    }

    #[must_use]
    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.start_time.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    fn log(&self, level: LogLevel, message: &str, duration_ms: Option<u64>) {
        if level < min_level() {
            return;
        }
        let phase = self
            .current_phase
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default();
        let timestamp = Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string();

        if json_mode() {
            let entry = LogEntry {
                timestamp,
                level,
                test: &self.test_name,
                phase: &phase,
                message,
                duration_ms,
            };
            if let Ok(json) = serde_json::to_string(&entry) {
                eprintln!("{json}");
            }
        } else {
            eprintln!("[{timestamp}] [{level}] [{}] {message}", self.test_name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_order_by_severity() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Warn);
    }

    #[test]
    fn logger_tracks_phases() {
        let log = TestLogger::new("logger_tracks_phases");
        log.phase("act");
        assert_eq!(*log.current_phase.lock().unwrap(), "act");
        log.finish_ok();
    }
}

//! Process-wide logging setup, built on `slog` + `sloggers`.
//!
//! Mirrors (and actually wires up) the pattern sketched by the originating
//! codebase's `flux::logging::init`: a `LoggerConfig`-shaped value picks a
//! destination and severity, `sloggers` builds the `slog::Logger`, and
//! downstream crates take a `&Logger` and call `.new(o!(...))` to attach
//! their own key-value context.

pub use slog::{crit, debug, error, info, o, trace, warn, Logger};

use serde_derive::{Deserialize, Serialize};
use slog::Drain;
use sloggers::terminal::{Destination as TerminalDestination, TerminalLoggerBuilder};
use sloggers::types::Severity;
use sloggers::Build;
use std::path::PathBuf;

/// Logging configuration, matching `log_filebase` (spec.md §6): when unset,
/// logs go to stderr only; when set, `<log_filebase>-<role>-<id>.log` is
/// written in addition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    pub level: String,
    pub file_base: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            level: "info".to_string(),
            file_base: None,
        }
    }
}

fn parse_severity(level: &str) -> Severity {
    match level.to_ascii_lowercase().as_str() {
        "trace" => Severity::Trace,
        "debug" => Severity::Debug,
        "info" => Severity::Info,
        "warning" | "warn" => Severity::Warning,
        "error" => Severity::Error,
        "critical" | "crit" => Severity::Critical,
        _ => Severity::Info,
    }
}

/// Builds the root logger for a worker process, tagged with its role and
/// zero-based index so every subsequent log line carries them.
pub fn init(config: &LogConfig, role: &str, worker_id: i32) -> Logger {
    let severity = parse_severity(&config.level);

    let mut builder = TerminalLoggerBuilder::new();
    builder.level(severity);
    builder.destination(TerminalDestination::Stderr);

    let root = match builder.build() {
        Ok(logger) => logger,
        Err(_) => Logger::root(slog::Discard, o!()),
    };

    let root = match &config.file_base {
        Some(base) => attach_file_drain(root, base, role, worker_id, severity),
        None => root,
    };

    root.new(o!("role" => role.to_string(), "worker_id" => worker_id))
}

fn attach_file_drain(root: Logger, base: &str, role: &str, worker_id: i32, severity: Severity) -> Logger {
    use sloggers::file::FileLoggerBuilder;

    let path: PathBuf = format!("{}-{}-{:05}.log", base, role, worker_id).into();
    let mut file_builder = FileLoggerBuilder::new(path);
    file_builder.level(severity);

    match file_builder.build() {
        Ok(file_logger) => {
            // Duplicate so lines reach both stderr and the log file.
            let drain = slog::Duplicate::new(root.clone(), file_logger).fuse();
            let drain = slog::Async::new(drain).build().fuse();
            Logger::root(drain, o!())
        }
        Err(_) => root,
    }
}

/// A logger that discards everything, used in unit tests that don't care
/// about log output.
pub fn discard() -> Logger {
    Logger::root(slog::Discard, o!())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_builds_a_logger() {
        let log = init(&LogConfig::default(), "mapper", 0);
        info!(log, "smoke test");
    }

    #[test]
    fn unknown_severity_falls_back_to_info() {
        assert!(matches!(parse_severity("bogus"), Severity::Info));
    }
}

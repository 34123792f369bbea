//! # Logger Module
//!
//! Logging is built from `tracing-subscriber` layers:
//! - **EnvFilter Layer**: `RUST_LOG` wins over the configured level
//! - **Format Layer**: one line per event, either text or JSON
//!
//! ## Output
//!
//! - Text: `[timestamp LEVEL - target] message`
//! - JSON: `{"timestamp": "...", "severity": "INFO", "target": "...", "message": "..."}`
//!
//! Events go to stdout or to a daily-rolling file `~/.bqv/cli.log.YYYY-MM-DD`. Files older
//! than seven days are deleted when logging starts.
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: standard filtering (e.g. `RUST_LOG=bqv_cli::infrastructure=debug`)
//! - `BQV_LOGGER__LEVEL`: DEBUG, INFO, WARN or ERROR
//! - `BQV_LOGGER__STDOUT`: log to stdout instead of the file (default: `false`)
//! - `BQV_LOGGER__FORMAT`: Text or Json (default: Text)

use serde::Deserialize;
use std::fmt;
use std::io::Write;
use std::time::{Duration, SystemTime};
use tracing::field::{Field, Visit};
use tracing::{warn, Event, Level, Subscriber};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::utilities::constants::CLI_LOG_FILE_PREFIX;

use super::settings::user_directory;

const LOG_RETENTION: Duration = Duration::from_secs(7 * 24 * 60 * 60);

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub enum LoggerLevel {
    #[serde(alias = "DEBUG", alias = "debug")]
    Debug,
    #[serde(alias = "INFO", alias = "info")]
    Info,
    #[serde(alias = "WARN", alias = "warn")]
    Warn,
    #[serde(alias = "ERROR", alias = "error")]
    Error,
}

impl LoggerLevel {
    pub fn to_tracing_level(&self) -> LevelFilter {
        match self {
            LoggerLevel::Debug => LevelFilter::DEBUG,
            LoggerLevel::Info => LevelFilter::INFO,
            LoggerLevel::Warn => LevelFilter::WARN,
            LoggerLevel::Error => LevelFilter::ERROR,
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub enum LogFormat {
    #[serde(alias = "json", alias = "JSON")]
    Json,
    #[serde(alias = "text", alias = "TEXT")]
    Text,
}

#[derive(Deserialize, Debug, Clone)]
pub struct LoggerSettings {
    #[serde(default = "default_log_level")]
    pub level: LoggerLevel,
    #[serde(default = "default_log_stdout")]
    pub stdout: bool,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
}

fn default_log_level() -> LoggerLevel {
    LoggerLevel::Info
}

fn default_log_stdout() -> bool {
    false
}

fn default_log_format() -> LogFormat {
    LogFormat::Text
}

impl Default for LoggerSettings {
    fn default() -> Self {
        LoggerSettings {
            level: default_log_level(),
            stdout: default_log_stdout(),
            format: default_log_format(),
        }
    }
}

fn is_cli_log(file_name: &str) -> bool {
    file_name.starts_with(CLI_LOG_FILE_PREFIX)
}

// Failures here are swallowed so logging setup never aborts the CLI, but they are
// surfaced as WARN since a log directory that cannot be cleaned keeps growing.
fn clean_old_logs() {
    let Some(cut_off) = SystemTime::now().checked_sub(LOG_RETENTION) else {
        return;
    };

    let Ok(dir) = user_directory().read_dir() else {
        warn!("failed to read directory");
        return;
    };

    for entry in dir.flatten() {
        if !entry.file_name().to_str().is_some_and(is_cli_log) {
            continue;
        }
        match entry.metadata().and_then(|md| md.modified()) {
            // Smaller time means older than the cut_off
            Ok(t) if t < cut_off => {
                let _ = std::fs::remove_file(entry.path());
            }
            Ok(_) => {}
            Err(e) => {
                warn!(
                    "Failed to read modification time for {:?}. {}",
                    entry.path(),
                    e
                )
            }
        }
    }
}

/// Formats every event on a single line.
struct LineFormatLayer<W> {
    writer: W,
    format: LogFormat,
}

impl<W> LineFormatLayer<W> {
    fn new(writer: W, format: LogFormat) -> Self {
        Self { writer, format }
    }

    fn format_text(&self, level: &Level, target: &str, message: &str) -> String {
        format!(
            "[{} {} - {}] {}",
            humantime::format_rfc3339_seconds(SystemTime::now()),
            level,
            target,
            message
        )
    }

    fn format_json(&self, level: &Level, target: &str, message: &str) -> String {
        let log_json = serde_json::json!({
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "severity": level.to_string(),
            "target": target,
            "message": message,
        });

        log_json.to_string()
    }
}

impl<S, W> Layer<S> for LineFormatLayer<W>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'writer> MakeWriter<'writer> + 'static,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let level = metadata.level();
        let target = metadata.target();

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        let message = visitor.message;

        let output = if self.format == LogFormat::Text {
            self.format_text(level, target, &message)
        } else {
            self.format_json(level, target, &message)
        };

        let mut writer = self.writer.make_writer();
        let _ = writer.write_all(output.as_bytes());
        let _ = writer.write_all(b"\n");
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
}

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
            // Remove surrounding quotes from debug format
            if self.message.starts_with('"') && self.message.ends_with('"') {
                self.message = self.message[1..self.message.len() - 1].to_string();
            }
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        }
    }
}

fn env_filter(level: &LoggerLevel) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_tracing_level().to_string()))
}

/// Installs the global subscriber. `verbose` forces DEBUG regardless of settings.
pub fn setup_logging(settings: &LoggerSettings, verbose: bool) {
    let level = if verbose {
        LoggerLevel::Debug
    } else {
        settings.level.clone()
    };

    if settings.stdout {
        tracing_subscriber::registry()
            .with(env_filter(&level))
            .with(LineFormatLayer::new(std::io::stdout, settings.format.clone()))
            .init();
    } else {
        clean_old_logs();
        let file_appender =
            tracing_appender::rolling::daily(user_directory(), CLI_LOG_FILE_PREFIX);
        tracing_subscriber::registry()
            .with(env_filter(&level))
            .with(LineFormatLayer::new(file_appender, settings.format.clone()))
            .init();
    }
}

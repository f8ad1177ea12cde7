//! Tracing setup for the server.
//!
//! Development writes pretty, colored output with span events to stdout.
//! Production writes JSON to daily rolling files and a plain compact copy
//! to stdout for the service journal.

use std::path::PathBuf;

use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable holding the default filter directive.
pub const LOG_LEVEL_ENV: &str = "CRUMBTRAIL_LOG_LEVEL";

/// Environment variable selecting the log mode (`production` or anything else).
pub const ENVIRONMENT_ENV: &str = "CRUMBTRAIL_ENV";

const DEFAULT_DIRECTIVE: &str = "info";

/// Where and how logs are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogMode {
    /// Pretty stdout only.
    Development,
    /// JSON rolling files plus compact stdout.
    Production,
}

impl LogMode {
    /// Mode selected by `CRUMBTRAIL_ENV`.
    #[must_use]
    pub fn from_env() -> Self {
        Self::parse(std::env::var(ENVIRONMENT_ENV).ok().as_deref())
    }

    fn parse(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.trim().eq_ignore_ascii_case("production") => Self::Production,
            _ => Self::Development,
        }
    }
}

/// Keeps the background log writers running. Hold it until exit.
#[must_use = "buffered log lines are lost once the guard is dropped"]
pub struct LogGuard {
    _writers: Vec<WorkerGuard>,
}

/// Install the global subscriber.
///
/// `RUST_LOG` takes precedence over `CRUMBTRAIL_LOG_LEVEL`; the default is `info`.
///
/// # Errors
///
/// Returns an error if the filter directive is malformed, the log directory
/// cannot be created, or a subscriber is already installed.
pub fn init(mode: LogMode) -> anyhow::Result<LogGuard> {
    let fallback = std::env::var(LOG_LEVEL_ENV).unwrap_or_else(|_| DEFAULT_DIRECTIVE.to_string());
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&fallback))
        .with_context(|| format!("invalid log filter {fallback:?}"))?;

    let writers = match mode {
        LogMode::Development => {
            init_development(filter)?;
            Vec::new()
        }
        LogMode::Production => init_production(filter)?,
    };
    Ok(LogGuard { _writers: writers })
}

fn init_production(filter: EnvFilter) -> anyhow::Result<Vec<WorkerGuard>> {
    let log_dir = log_directory();
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("creating log directory {}", log_dir.display()))?;

    let files = RollingFileAppender::new(Rotation::DAILY, &log_dir, "crumbtrail");
    let (file_writer, file_guard) = tracing_appender::non_blocking(files);
    let (stdout_writer, stdout_guard) = tracing_appender::non_blocking(std::io::stdout());

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(file_writer)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_writer(stdout_writer)
                .with_ansi(false),
        )
        .try_init()?;

    Ok(vec![file_guard, stdout_guard])
}

fn init_development(filter: EnvFilter) -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .pretty()
                .with_file(true)
                .with_line_number(true)
                .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE),
        )
        .try_init()?;
    Ok(())
}

/// Directory for rolling log files.
fn log_directory() -> PathBuf {
    directories::ProjectDirs::from("", "", "crumbtrail")
        .map_or_else(|| PathBuf::from("./logs"), |dirs| dirs.data_dir().join("logs"))
}

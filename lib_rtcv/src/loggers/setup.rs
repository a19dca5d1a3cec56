//! # Logging Setup
//!
//! The library only emits `tracing` events. Binaries embedding the client call
//! [`init_logging`] once at startup to decide where those events go.

use std::path::PathBuf;
use std::{env, io};

use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Errors raised while installing the subscriber.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// The log directory could not be created.
    #[error("unable to create log directory {path}: {source}")]
    LogDir {
        /// Directory that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The filter directive could not be parsed.
    #[error("invalid log filter {0:?}")]
    Filter(String),

    /// A global subscriber is already installed.
    #[error("a global tracing subscriber is already installed")]
    AlreadyInit,
}

/// # Logging Options
///
/// Controls verbosity and output targets.
#[derive(Debug, Clone)]
pub struct LoggingOptions {
    /// Filter used when `RUST_LOG` is not set, e.g. `"info"` or `"lib_rtcv=debug"`.
    pub level: String,
    /// Directory for daily rotating JSON log files. `None` disables file output.
    pub log_dir: Option<PathBuf>,
    /// File name prefix for the rotating log files.
    pub file_prefix: String,
    /// Colored console output.
    pub ansi: bool,
}

impl Default for LoggingOptions {
    /// Level from `RUST_LOG` (default "info"), files under `LOG_DIR` when set.
    fn default() -> Self {
        Self {
            level: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            log_dir: env::var("LOG_DIR").ok().map(PathBuf::from),
            file_prefix: "rtcv_scraper_client".to_string(),
            ansi: true,
        }
    }
}

/// Installs the global tracing subscriber.
///
/// Returns the file writer's [`WorkerGuard`] when file output is enabled. The
/// caller must keep it alive for as long as logs should be flushed to disk.
pub fn init_logging(options: LoggingOptions) -> Result<Option<WorkerGuard>, LoggingError> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&options.level))
        .map_err(|_| LoggingError::Filter(options.level.clone()))?;

    let console_layer = fmt::layer().with_target(true).with_ansi(options.ansi);

    let (file_layer, guard) = match &options.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir).map_err(|source| LoggingError::LogDir {
                path: dir.clone(),
                source,
            })?;
            let file_appender = rolling::daily(dir, &options.file_prefix);
            let (writer, guard) = non_blocking(file_appender);
            let layer = fmt::layer().with_ansi(false).with_writer(writer).json();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|_| LoggingError::AlreadyInit)?;

    tracing::info!(level = %options.level, file_output = guard.is_some(), "logging initialized");
    Ok(guard)
}

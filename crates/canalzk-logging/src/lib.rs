//! Tracing subscriber setup for the exporter: an optional console layer and
//! an optional rolling file layer under one `EnvFilter`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::layer::Layered;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

/// Re-export tracing macros for convenience.
pub use tracing::{debug, error, info, instrument, trace, warn};

/// How often the log file is rotated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    Hourly,
    #[default]
    Daily,
    Never,
}

impl LogRotation {
    pub fn as_str(self) -> &'static str {
        match self {
            LogRotation::Hourly => "hourly",
            LogRotation::Daily => "daily",
            LogRotation::Never => "never",
        }
    }
}

impl From<LogRotation> for rolling::Rotation {
    fn from(r: LogRotation) -> Self {
        match r {
            LogRotation::Hourly => rolling::Rotation::HOURLY,
            LogRotation::Daily => rolling::Rotation::DAILY,
            LogRotation::Never => rolling::Rotation::NEVER,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Filter directive used when `RUST_LOG` is unset, e.g. `info` or
    /// `canalzk_collector=debug,info`.
    #[serde(default = "default_level")]
    pub level: String,

    /// Directory for log files. If None, no file logging.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Log files are named `<file_prefix>.<date>.log`.
    #[serde(default = "default_prefix")]
    pub file_prefix: String,

    #[serde(default)]
    pub rotation: LogRotation,

    #[serde(default)]
    pub json_format: bool,

    /// Whether to also output to console (stdout).
    #[serde(default = "default_true")]
    pub console_output: bool,
}

fn default_level() -> String {
    "info".into()
}

fn default_prefix() -> String {
    "canalzk".into()
}

fn default_true() -> bool {
    true
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            level: default_level(),
            log_dir: None,
            file_prefix: default_prefix(),
            rotation: LogRotation::default(),
            json_format: false,
            console_output: true,
        }
    }
}

impl LogConfig {
    /// The filter built from `level` alone, ignoring `RUST_LOG`.
    pub fn level_filter(&self) -> Result<EnvFilter, ParseError> {
        EnvFilter::try_new(&self.level)
    }

    fn env_filter(&self) -> Result<EnvFilter, ParseError> {
        match EnvFilter::try_from_default_env() {
            Ok(filter) => Ok(filter),
            Err(_) => self.level_filter(),
        }
    }
}

#[derive(Debug, Error)]
pub enum LogInitError {
    #[error("invalid log level {level:?}: {source}")]
    Level { level: String, source: ParseError },

    #[error("failed to create rolling file appender: {0}")]
    Appender(#[from] rolling::InitError),

    #[error("global subscriber already set: {0}")]
    Subscriber(#[from] tracing_subscriber::util::TryInitError),
}

type Base = Layered<EnvFilter, Registry>;
type BoxedLayer = Box<dyn Layer<Base> + Send + Sync>;

fn console_layer(config: &LogConfig) -> BoxedLayer {
    if config.json_format {
        Box::new(fmt::layer().json())
    } else {
        Box::new(fmt::layer())
    }
}

fn file_layer(config: &LogConfig, dir: &Path) -> Result<(BoxedLayer, WorkerGuard), LogInitError> {
    let appender = rolling::RollingFileAppender::builder()
        .rotation(config.rotation.into())
        .filename_prefix(&config.file_prefix)
        .filename_suffix("log")
        .build(dir)?;
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let layer: BoxedLayer = if config.json_format {
        Box::new(fmt::layer().json().with_writer(writer))
    } else {
        Box::new(fmt::layer().with_ansi(false).with_writer(writer))
    };
    Ok((layer, guard))
}

/// Install the global subscriber. Call once at startup and hold the
/// returned guard until exit; dropping it stops the file writer.
pub fn init_logging(config: &LogConfig) -> Result<Option<WorkerGuard>, LogInitError> {
    let filter = config.env_filter().map_err(|source| LogInitError::Level {
        level: config.level.clone(),
        source,
    })?;

    let mut layers: Vec<BoxedLayer> = Vec::new();
    if config.console_output {
        layers.push(console_layer(config));
    }
    let guard = match &config.log_dir {
        Some(dir) => {
            let (layer, guard) = file_layer(config, dir)?;
            layers.push(layer);
            Some(guard)
        }
        None => None,
    };

    tracing_subscriber::registry().with(filter).with(layers).try_init()?;
    Ok(guard)
}

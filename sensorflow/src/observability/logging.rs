//! Process-wide `tracing` subscriber setup.

use crate::config::LoggingSettings;
use crate::errors::{IoResultExt, Result, SensorflowError};
use crate::utils::fs::ensure_dir;
use crate::utils::{file_stamp, now_utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// Output format of log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

fn format_layer<W>(format: LogFormat, writer: W, ansi: bool) -> BoxedLayer
where
    W: for<'w> fmt::MakeWriter<'w> + Send + Sync + 'static,
{
    match format {
        LogFormat::Text => fmt::layer().with_writer(writer).with_ansi(ansi).boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_writer(writer)
            .boxed(),
    }
}

/// Builds the filter from `RUST_LOG`, falling back to the configured level.
pub fn env_filter(level: &str) -> Result<EnvFilter> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| SensorflowError::config(format!("invalid log filter '{level}': {e}")))
}

/// Installs the global subscriber: stderr, plus a timestamped file under
/// `log_dir` when one is configured.
///
/// Returns the log file path, if any.
///
/// # Errors
///
/// Fails on an invalid filter, an unwritable log directory, or when a global
/// subscriber is already installed.
pub fn init_logging(settings: &LoggingSettings) -> Result<Option<PathBuf>> {
    let filter = env_filter(&settings.level)?;
    let mut layers: Vec<BoxedLayer> = vec![format_layer(settings.format, std::io::stderr, true)];

    let log_file = match &settings.log_dir {
        Some(dir) => {
            ensure_dir(dir)?;
            let path = dir.join(format!("{}.log", file_stamp(&now_utc())));
            let file = File::create(&path).at_path(&path)?;
            layers.push(format_layer(settings.format, Mutex::new(file), false));
            Some(path)
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .map_err(|e| SensorflowError::config(format!("logging already initialised: {e}")))?;
    Ok(log_file)
}

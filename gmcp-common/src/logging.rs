//! Logging initialization.
//!
//! Stdout carries the JSON-RPC wire, so log output goes exclusively to
//! stderr and, when configured, to an append-only log file. Writers are
//! non-blocking; the returned guards must be held for the lifetime of the
//! process or buffered lines are lost on shutdown.

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

/// Declarative description of where and how to log.
#[derive(Debug, Clone)]
pub struct LogConfig {
    level: String,
    stderr: bool,
    json: bool,
    file: Option<PathBuf>,
}

impl LogConfig {
    #[must_use]
    pub fn new(level: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            stderr: false,
            json: false,
            file: None,
        }
    }

    /// Add a human-readable stderr sink.
    #[must_use]
    pub fn with_stderr(mut self) -> Self {
        self.stderr = true;
        self
    }

    /// Replace the filter level.
    #[must_use]
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    /// Emit JSON lines instead of the human-readable format.
    #[must_use]
    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    /// Also append to a log file.
    #[must_use]
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }
}

/// Install the global tracing subscriber described by `config`.
///
/// Returns the writer guards; hold them until process exit.
pub fn init_logging(config: &LogConfig) -> Result<Vec<WorkerGuard>> {
    // RUST_LOG takes precedence over the configured level when set.
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .with_context(|| format!("invalid log filter '{}'", config.level))?;

    let mut guards = Vec::new();
    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();

    if config.stderr {
        let (writer, guard) = tracing_appender::non_blocking(std::io::stderr());
        guards.push(guard);
        let layer = fmt::layer().with_writer(writer).with_ansi(false);
        if config.json {
            layers.push(layer.json().boxed());
        } else {
            layers.push(layer.boxed());
        }
    }

    if let Some(path) = &config.file {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("failed to open log file {}", path.display()))?;
        let (writer, guard) = tracing_appender::non_blocking(file);
        guards.push(guard);
        let layer = fmt::layer().with_writer(writer).with_ansi(false);
        if config.json {
            layers.push(layer.json().boxed());
        } else {
            layers.push(layer.boxed());
        }
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .context("failed to install global tracing subscriber")?;

    Ok(guards)
}

//! Configuration system for the Gradle MCP server.
//!
//! All settings come from GMCP_-prefixed environment variables, which is
//! the one configuration channel every MCP host exposes. Parsing collects
//! every error before failing so a misconfigured host gets a single
//! complete report instead of a fix-one-rerun loop.

pub mod env;
pub mod source;

pub use env::{EnvError, EnvParser};
pub use source::{ConfigSource, Sourced};

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Wrapper script the server looks for in the project root.
#[cfg(windows)]
const WRAPPER_FILE: &str = "gradlew.bat";
#[cfg(not(windows))]
const WRAPPER_FILE: &str = "gradlew";

// ── Errors ───────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment configuration: {}", join_errors(.0))]
    Environment(Vec<EnvError>),

    #[error(
        "Gradle wrapper not found at specified path: {path}. \
         Please verify GMCP_WRAPPER environment variable."
    )]
    WrapperOverrideNotFound { path: PathBuf },

    #[error(
        "Gradle wrapper not found at {path}. \
         Please ensure gradlew script exists in the project root."
    )]
    WrapperNotFound { path: PathBuf },
}

fn join_errors(errors: &[EnvError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

// ── Server configuration ─────────────────────────────────────────────────

/// Effective server configuration with per-value source tracking.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Root of the Gradle project to operate on (GMCP_PROJECT_ROOT).
    pub project_root: Sourced<PathBuf>,
    /// Explicit wrapper path, bypassing auto-detection (GMCP_WRAPPER).
    pub wrapper_override: Sourced<Option<PathBuf>>,
    /// Log filter level (GMCP_LOG_LEVEL).
    pub log_level: Sourced<String>,
    /// Optional log file; stderr is always used (GMCP_LOG_FILE).
    pub log_file: Sourced<Option<PathBuf>>,
    /// Emit JSON log lines instead of human-readable ones (GMCP_LOG_JSON).
    pub log_json: Sourced<bool>,
    /// Wall-clock limit for a single task execution (GMCP_TASK_TIMEOUT).
    pub task_timeout: Sourced<Option<Duration>>,
}

impl ServerConfig {
    /// Load configuration from the environment.
    ///
    /// Returns all parse errors at once rather than the first one hit.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut parser = EnvParser::new();

        let project_root = parser.get_path("PROJECT_ROOT", ".", true);
        let wrapper_override = parser.get_optional_path("WRAPPER");
        let log_level = parser.get_log_level("LOG_LEVEL", "info");
        let log_file = parser.get_optional_path("LOG_FILE");
        let log_json = parser.get_bool("LOG_JSON", false);
        let task_timeout = parser.get_optional_duration("TASK_TIMEOUT");

        if parser.has_errors() {
            return Err(ConfigError::Environment(parser.take_errors()));
        }

        Ok(Self {
            project_root,
            wrapper_override,
            log_level,
            log_file,
            log_json,
            task_timeout,
        })
    }

    /// Resolve the wrapper executable the server will spawn.
    ///
    /// An explicit GMCP_WRAPPER wins over auto-detection; either way the
    /// script must already exist, so every later invocation starts from a
    /// known-good program path.
    pub fn resolve_wrapper(&self) -> Result<PathBuf, ConfigError> {
        if let Some(path) = &self.wrapper_override.value {
            if path.exists() {
                return Ok(path.clone());
            }
            return Err(ConfigError::WrapperOverrideNotFound { path: path.clone() });
        }

        let candidate = self.project_root.value.join(WRAPPER_FILE);
        if candidate.exists() {
            return Ok(candidate);
        }
        Err(ConfigError::WrapperNotFound { path: candidate })
    }

    /// Log the effective configuration and which variables overrode it.
    pub fn log_summary(&self) {
        debug!(
            project_root = %self.project_root.value.display(),
            wrapper_override = ?self.wrapper_override.value,
            log_level = %self.log_level.value,
            log_json = self.log_json.value,
            log_file = ?self.log_file.value,
            task_timeout = ?self.task_timeout.value,
            overridden = %self.overridden_vars().join(","),
            "effective configuration"
        );
    }

    /// Names of the environment variables that were explicitly set.
    fn overridden_vars(&self) -> Vec<&str> {
        [
            self.project_root.env_var.as_deref(),
            self.wrapper_override.env_var.as_deref(),
            self.log_level.env_var.as_deref(),
            self.log_file.env_var.as_deref(),
            self.log_json.env_var.as_deref(),
            self.task_timeout.env_var.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

#[cfg(test)]
pub(crate) fn env_test_lock() -> std::sync::MutexGuard<'static, ()> {
    use std::sync::{Mutex, OnceLock};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    ENV_LOCK.get_or_init(|| Mutex::new(())).lock().unwrap()
}

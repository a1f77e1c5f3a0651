//! Environment variable parsing with type safety.
//!
//! Provides a type-safe parser for GMCP environment variables with
//! validation, error collection, and source tracking. Parsing never
//! fails fast: every getter records its error and substitutes a default
//! so all misconfigurations can be reported in one pass.

use std::env;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use super::source::{ConfigSource, Sourced};

/// Errors that can occur during environment variable parsing.
#[derive(Debug, Error)]
pub enum EnvError {
    /// Invalid value for a variable.
    #[error("Invalid value for {var}: expected {expected}, got '{value}'")]
    InvalidValue {
        var: String,
        expected: String,
        value: String,
    },

    /// Path does not exist.
    #[error("Path not found for {var}: {path}")]
    PathNotFound { var: String, path: PathBuf },

    /// Invalid duration format.
    #[error("Invalid duration for {var}: '{value}' (expected e.g. '90s', '5m')")]
    InvalidDuration { var: String, value: String },

    /// Invalid log level.
    #[error("Invalid log level for {var}: {value}")]
    InvalidLogLevel { var: String, value: String },
}

/// Type-safe environment variable parser.
///
/// Collects errors during parsing so all issues can be reported at once.
pub struct EnvParser {
    prefix: &'static str,
    errors: Vec<EnvError>,
}

impl EnvParser {
    /// Create a new parser with the GMCP_ prefix.
    pub fn new() -> Self {
        Self {
            prefix: "GMCP_",
            errors: Vec::new(),
        }
    }

    /// Get all accumulated errors.
    pub fn errors(&self) -> &[EnvError] {
        &self.errors
    }

    /// Check if any errors occurred.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Take ownership of errors.
    pub fn take_errors(&mut self) -> Vec<EnvError> {
        std::mem::take(&mut self.errors)
    }

    /// Get the full variable name with prefix.
    fn var_name(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }

    /// Get a boolean value with default.
    ///
    /// Accepts: 1, true, yes, on (for true)
    ///          0, false, no, off, "" (for false)
    pub fn get_bool(&mut self, name: &str, default: bool) -> Sourced<bool> {
        let var_name = self.var_name(name);
        match env::var(&var_name) {
            Ok(value) => {
                let parsed = match value.to_lowercase().as_str() {
                    "1" | "true" | "yes" | "on" => true,
                    "0" | "false" | "no" | "off" | "" => false,
                    _ => {
                        self.errors.push(EnvError::InvalidValue {
                            var: var_name.clone(),
                            expected: "boolean (true/false/1/0/yes/no)".to_string(),
                            value: value.clone(),
                        });
                        default
                    }
                };
                Sourced::from_env(parsed, var_name)
            }
            Err(_) => Sourced::default_value(default),
        }
    }

    /// Get a path value with ~ expansion.
    ///
    /// If `must_exist` is true, records an error if the path doesn't exist.
    pub fn get_path(&mut self, name: &str, default: &str, must_exist: bool) -> Sourced<PathBuf> {
        let var_name = self.var_name(name);
        let (value, source) = match env::var(&var_name) {
            Ok(v) => (v, ConfigSource::Environment),
            Err(_) => (default.to_string(), ConfigSource::Default),
        };

        let expanded = expand_tilde(&value);
        if must_exist && !expanded.exists() {
            self.errors.push(EnvError::PathNotFound {
                var: var_name.clone(),
                path: expanded.clone(),
            });
        }

        if source == ConfigSource::Environment {
            Sourced::from_env(expanded, var_name)
        } else {
            Sourced::default_value(expanded)
        }
    }

    /// Get an optional path with ~ expansion (None if not set or empty).
    pub fn get_optional_path(&mut self, name: &str) -> Sourced<Option<PathBuf>> {
        let var_name = self.var_name(name);
        match env::var(&var_name) {
            Ok(value) if value.is_empty() => Sourced::from_env(None, var_name),
            Ok(value) => Sourced::from_env(Some(expand_tilde(&value)), var_name),
            Err(_) => Sourced::default_value(None),
        }
    }

    /// Get a log level value with validation.
    pub fn get_log_level(&mut self, name: &str, default: &str) -> Sourced<String> {
        let var_name = self.var_name(name);
        match env::var(&var_name) {
            Ok(value) => {
                let lower = value.to_lowercase();
                match lower.as_str() {
                    "trace" | "debug" | "info" | "warn" | "error" | "off" => {
                        Sourced::from_env(lower, var_name)
                    }
                    _ => {
                        self.errors.push(EnvError::InvalidLogLevel {
                            var: var_name.clone(),
                            value: value.clone(),
                        });
                        Sourced::from_env(default.to_string(), var_name)
                    }
                }
            }
            Err(_) => Sourced::default_value(default.to_string()),
        }
    }

    /// Get an optional duration in humantime format (None if not set or empty).
    pub fn get_optional_duration(&mut self, name: &str) -> Sourced<Option<Duration>> {
        let var_name = self.var_name(name);
        match env::var(&var_name) {
            Ok(value) if value.is_empty() => Sourced::from_env(None, var_name),
            Ok(value) => match humantime::parse_duration(&value) {
                Ok(duration) => Sourced::from_env(Some(duration), var_name),
                Err(_) => {
                    self.errors.push(EnvError::InvalidDuration {
                        var: var_name.clone(),
                        value,
                    });
                    Sourced::from_env(None, var_name)
                }
            },
            Err(_) => Sourced::default_value(None),
        }
    }
}

impl Default for EnvParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Expand a leading `~/` to the user's home directory.
fn expand_tilde(value: &str) -> PathBuf {
    if let Some(stripped) = value.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        home.join(stripped)
    } else {
        PathBuf::from(value)
    }
}

//! Source tracking for configuration values.

/// Where a configuration value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    /// Built-in default.
    Default,
    /// Read from an environment variable.
    Environment,
}

/// A configuration value together with its provenance.
///
/// Knowing whether a value was defaulted or explicitly set makes startup
/// logs debuggable when a server misbehaves inside an MCP host.
#[derive(Debug, Clone)]
pub struct Sourced<T> {
    pub value: T,
    pub source: ConfigSource,
    /// Variable name when the value came from the environment.
    pub env_var: Option<String>,
}

impl<T> Sourced<T> {
    pub fn from_env(value: T, env_var: String) -> Self {
        Self {
            value,
            source: ConfigSource::Environment,
            env_var: Some(env_var),
        }
    }

    pub fn default_value(value: T) -> Self {
        Self {
            value,
            source: ConfigSource::Default,
            env_var: None,
        }
    }

    /// True when the value was explicitly set rather than defaulted.
    #[must_use]
    pub fn is_explicit(&self) -> bool {
        self.source == ConfigSource::Environment
    }
}

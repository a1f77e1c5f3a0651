//! Core library for the Gradle MCP server.
//!
//! Everything that decides whether and how a Gradle command runs lives
//! here: the argument policy, the streaming process runner, progress
//! extraction, failure-message reconstruction, and the task gateway that
//! ties them together. The `gmcpd` binary adds the protocol surface on
//! top of these pieces.

pub mod config;
pub mod failure;
pub mod gateway;
pub mod listing;
pub mod logging;
pub mod policy;
pub mod progress;
pub mod runner;
pub mod types;

pub use config::{ConfigError, ConfigSource, EnvError, ServerConfig, Sourced};
pub use gateway::{InvocationError, TaskGateway, TaskPhase};
pub use logging::{LogConfig, init_logging};
pub use policy::{ArgumentClass, PolicyViolation, classify_arg, is_cleaning_task, validate_args};
pub use progress::{NullSink, ProgressSignal, ProgressSink, RecordingSink};
pub use runner::{GradleInvocation, ProcessOutcome, RunnerError, run_streaming};
pub use types::{CleanParams, ListTasksParams, ProjectInfo, RunTaskParams, TaskInfo, TaskResult};

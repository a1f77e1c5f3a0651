//! Wire-facing data model shared between the core and the MCP transport.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// ── Task Result ──────────────────────────────────────────────────────────

/// Terminal outcome of one task or clean invocation.
///
/// Immutable once constructed and fully populated on every terminal state.
/// A failing build is reported through this type rather than as an error:
/// `success` is false and `error` carries the reconstructed failure block,
/// while `stdout` and `stderr` always hold the complete untruncated streams
/// for caller-side debugging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TaskResult {
    /// Whether the invocation exited successfully.
    pub success: bool,
    /// Reconstructed failure detail; `None` on success.
    pub error: Option<String>,
    /// Complete captured standard output.
    pub stdout: String,
    /// Complete captured standard error.
    pub stderr: String,
}

impl TaskResult {
    /// Successful outcome carrying the full streams.
    #[must_use]
    pub fn succeeded(stdout: String, stderr: String) -> Self {
        Self {
            success: true,
            error: None,
            stdout,
            stderr,
        }
    }

    /// Failed outcome with a reconstructed error and the full streams.
    #[must_use]
    pub fn failed(error: impl Into<String>, stdout: String, stderr: String) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            stdout,
            stderr,
        }
    }
}

// ── Discovery ────────────────────────────────────────────────────────────

/// A Gradle project discovered via `gradlew projects`.
///
/// The root project is normalized to the name `":"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ProjectInfo {
    /// Project path notation (`":"` for root, `":app"` for a subproject).
    pub name: String,
    /// Filesystem path of the workspace root the project belongs to.
    pub path: String,
    /// Human-readable description, when Gradle reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A Gradle task discovered via `gradlew tasks --all`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TaskInfo {
    /// Task name as invokable from the command line.
    pub name: String,
    /// Project the listing was scoped to (`":"` for root).
    pub project: String,
    /// Description from the task listing, when Gradle prints one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Task group header the task was listed under.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

// ── Tool Parameters ──────────────────────────────────────────────────────

/// Parameters accepted by the `run_task` tool.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct RunTaskParams {
    /// Task to run. Simple (`build`) for the root project or qualified with
    /// a project path (`:app:build`).
    pub task: String,
    /// Additional Gradle arguments, validated against the safety policy.
    #[serde(default)]
    pub args: Vec<String>,
}

/// Parameters accepted by the `list_project_tasks` tool.
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
pub struct ListTasksParams {
    /// Project path (`:app`). `None`, empty, or `":"` means the root project.
    #[serde(default)]
    pub project: Option<String>,
}

/// Parameters accepted by the `clean` tool.
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
pub struct CleanParams {
    /// Project path (`:app`). `None`, empty, or `":"` means the root project.
    #[serde(default)]
    pub project: Option<String>,
}

//! Single entry point for everything that executes Gradle.
//!
//! Every task invocation moves through one lifecycle: validate, spawn,
//! run, then classify the exit. Validation happens before any process
//! exists, so a rejected request provably never touched Gradle. Clean
//! runs are funneled through [`TaskGateway::clean`], which builds the
//! task name itself and takes no caller arguments.
//!
//! A successful run returns a [`TaskResult`] with `error: None`; a failed
//! build is still a *successful invocation* whose result carries the
//! reconstructed error and both captured streams. Only pre-execution
//! rejections surface as [`InvocationError`].

use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::failure;
use crate::policy::{self, PolicyViolation};
use crate::progress::ProgressSink;
use crate::runner::{self, GradleInvocation};
use crate::types::TaskResult;

/// Always appended so MCP-triggered runs cannot poison the build cache.
const NO_BUILD_CACHE: &str = "--no-build-cache";

// ── Errors ───────────────────────────────────────────────────────────────

/// Rejections raised before any Gradle process is spawned.
#[derive(Debug, Error)]
pub enum InvocationError {
    #[error(
        "Task '{task}' is a cleaning task and cannot be run via run_task. \
         Please use the clean tool instead."
    )]
    CleaningTask { task: String },

    #[error(transparent)]
    Policy(#[from] PolicyViolation),
}

// ── Task Phase ───────────────────────────────────────────────────────────

/// State machine for an individual task invocation lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPhase {
    /// Request received, nothing inspected yet.
    Pending,
    /// Task name and arguments are being checked against policy.
    Validating,
    /// Rejected by policy; no process was created.
    Rejected,
    /// Validation passed, process being created.
    Spawning,
    /// Gradle is executing and streams are being drained.
    Running,
    /// Process exited and both streams reached EOF.
    Exited,
    /// Nonzero exit; root cause is being reconstructed from output.
    Reconstructing,
    /// Exit status zero.
    Succeeded,
    /// Spawn failure, timeout, or nonzero exit.
    Failed,
}

impl TaskPhase {
    /// True for phases with no outgoing transitions.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Rejected | Self::Succeeded | Self::Failed)
    }

    /// Whether `next` is a legal successor of this phase.
    #[must_use]
    pub fn can_transition(self, next: TaskPhase) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Validating)
                | (Self::Validating, Self::Rejected | Self::Spawning)
                | (Self::Spawning, Self::Running | Self::Failed)
                | (Self::Running, Self::Exited)
                | (Self::Exited, Self::Succeeded | Self::Reconstructing | Self::Failed)
                | (Self::Reconstructing, Self::Failed)
        )
    }
}

impl std::fmt::Display for TaskPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Validating => write!(f, "validating"),
            Self::Rejected => write!(f, "rejected"),
            Self::Spawning => write!(f, "spawning"),
            Self::Running => write!(f, "running"),
            Self::Exited => write!(f, "exited"),
            Self::Reconstructing => write!(f, "reconstructing"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Correlates every log line of one invocation under a fresh id.
struct PhaseTracker {
    invocation_id: Uuid,
    tool: &'static str,
    phase: TaskPhase,
}

impl PhaseTracker {
    fn new(tool: &'static str) -> Self {
        let tracker = Self {
            invocation_id: Uuid::new_v4(),
            tool,
            phase: TaskPhase::Pending,
        };
        debug!(invocation = %tracker.invocation_id, tool, phase = %tracker.phase, "invocation opened");
        tracker
    }

    fn advance(&mut self, next: TaskPhase) {
        debug!(
            invocation = %self.invocation_id,
            tool = self.tool,
            from = %self.phase,
            to = %next,
            "phase transition"
        );
        self.phase = next;
    }

    fn id(&self) -> Uuid {
        self.invocation_id
    }
}

// ── Gateway ──────────────────────────────────────────────────────────────

/// Executes Gradle tasks on behalf of MCP tool handlers.
#[derive(Debug, Clone)]
pub struct TaskGateway {
    wrapper: PathBuf,
    project_root: PathBuf,
    timeout: Option<Duration>,
}

impl TaskGateway {
    #[must_use]
    pub fn new(wrapper: PathBuf, project_root: PathBuf) -> Self {
        Self {
            wrapper,
            project_root,
            timeout: None,
        }
    }

    /// Apply a wall-clock limit to every task execution.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run a non-cleaning Gradle task with validated extra arguments.
    ///
    /// The command line is always `<wrapper> <task> --no-build-cache
    /// [args...]`; arguments arrive at Gradle exactly as validated, in
    /// order. Rejections return `Err` before anything is spawned.
    pub async fn run_task(
        &self,
        task: &str,
        args: &[String],
        sink: Arc<dyn ProgressSink>,
    ) -> Result<TaskResult, InvocationError> {
        let mut tracker = PhaseTracker::new("run_task");

        tracker.advance(TaskPhase::Validating);
        if policy::is_cleaning_task(task) {
            tracker.advance(TaskPhase::Rejected);
            warn!(invocation = %tracker.id(), task, "cleaning task routed to run_task");
            return Err(InvocationError::CleaningTask {
                task: task.to_string(),
            });
        }
        if let Err(violation) = policy::validate_args(args) {
            tracker.advance(TaskPhase::Rejected);
            warn!(
                invocation = %tracker.id(),
                task,
                argument = violation.argument(),
                "rejected gradle arguments"
            );
            return Err(InvocationError::Policy(violation));
        }

        let invocation = GradleInvocation::new(self.wrapper.clone(), self.project_root.clone())
            .arg(task)
            .arg(NO_BUILD_CACHE)
            .args(args.iter().cloned())
            .timeout(self.timeout);

        Ok(self.execute(tracker, invocation, sink, "Task failed").await)
    }

    /// Run the clean task, optionally scoped to one subproject.
    ///
    /// `None`, `""` and `":"` all mean the root project. No caller
    /// arguments are accepted, so there is nothing to validate.
    pub async fn clean(&self, project: Option<&str>, sink: Arc<dyn ProgressSink>) -> TaskResult {
        let mut tracker = PhaseTracker::new("clean");
        tracker.advance(TaskPhase::Validating);

        let invocation = GradleInvocation::new(self.wrapper.clone(), self.project_root.clone())
            .arg(clean_task_name(project))
            .arg(NO_BUILD_CACHE)
            .timeout(self.timeout);

        self.execute(tracker, invocation, sink, "Clean failed").await
    }

    async fn execute(
        &self,
        mut tracker: PhaseTracker,
        invocation: GradleInvocation,
        sink: Arc<dyn ProgressSink>,
        default_error: &str,
    ) -> TaskResult {
        tracker.advance(TaskPhase::Spawning);
        info!(
            invocation = %tracker.id(),
            program = %invocation.program.display(),
            args = ?invocation.args,
            "starting gradle"
        );

        let outcome = match runner::run_streaming(&invocation, sink).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracker.advance(TaskPhase::Failed);
                error!(invocation = %tracker.id(), error = %e, "gradle could not be executed");
                return TaskResult::failed(e.to_string(), String::new(), String::new());
            }
        };

        // The runner only returns once both streams hit EOF.
        tracker.advance(TaskPhase::Running);
        tracker.advance(TaskPhase::Exited);

        if outcome.success() {
            tracker.advance(TaskPhase::Succeeded);
            info!(invocation = %tracker.id(), "gradle finished successfully");
            return TaskResult::succeeded(outcome.stdout, outcome.stderr);
        }

        if outcome.timed_out {
            tracker.advance(TaskPhase::Failed);
            let limit = self.timeout.unwrap_or_default();
            warn!(invocation = %tracker.id(), timeout = %humantime::format_duration(limit), "gradle timed out");
            return TaskResult::failed(
                format!(
                    "Task execution exceeded the configured timeout of {}",
                    humantime::format_duration(limit)
                ),
                outcome.stdout,
                outcome.stderr,
            );
        }

        tracker.advance(TaskPhase::Reconstructing);
        let error = failure::reconstruct(&outcome.stdout, &outcome.stderr, default_error);
        tracker.advance(TaskPhase::Failed);
        warn!(
            invocation = %tracker.id(),
            exit_code = ?outcome.exit_code(),
            "gradle finished with failures"
        );
        TaskResult::failed(error, outcome.stdout, outcome.stderr)
    }
}

/// Gradle task name for cleaning `project`, defaulting to the root.
fn clean_task_name(project: Option<&str>) -> String {
    match project {
        None | Some("") | Some(":") => "clean".to_string(),
        Some(project) => format!("{project}:clean"),
    }
}

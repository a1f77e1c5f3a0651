//! Child-process execution for Gradle invocations.
//!
//! Invocations are spawned directly as an argv vector; no shell is ever
//! involved, so validated arguments cannot be reinterpreted by shell
//! expansion. Both pipes are drained concurrently with the process by
//! dedicated reader tasks. On Linux a pipe buffer is 64KB, so waiting
//! before reading deadlocks any build with nontrivial output; reading
//! before waiting also means the exit status is only declared after both
//! streams have reached EOF, which keeps captured output complete.
//!
//! Stdout lines are additionally observed as they arrive so progress can
//! be surfaced while the build is still running.

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, warn};

use crate::progress::{self, ProgressSink};

/// How long readers may keep draining after a timed-out process is killed.
const KILL_DRAIN_GRACE: Duration = Duration::from_secs(2);

// ── Errors ───────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("Failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Gradle process {stream} pipe was not captured")]
    MissingPipe { stream: &'static str },

    #[error("Failed waiting for Gradle process: {0}")]
    Wait(#[source] std::io::Error),
}

// ── Invocation ───────────────────────────────────────────────────────────

/// A fully resolved Gradle command line, ready to spawn.
#[derive(Debug, Clone)]
pub struct GradleInvocation {
    /// Path to the wrapper (or substitute) executable.
    pub program: PathBuf,
    /// Arguments passed verbatim as argv entries.
    pub args: Vec<String>,
    /// Working directory for the child.
    pub cwd: PathBuf,
    /// Wall-clock limit; the process is killed when exceeded.
    pub timeout: Option<Duration>,
}

impl GradleInvocation {
    #[must_use]
    pub fn new(program: impl Into<PathBuf>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: cwd.into(),
            timeout: None,
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn timeout(mut self, limit: Option<Duration>) -> Self {
        self.timeout = limit;
        self
    }
}

// ── Outcome ──────────────────────────────────────────────────────────────

/// Captured result of a completed (or killed) Gradle process.
#[derive(Debug)]
pub struct ProcessOutcome {
    pub status: ExitStatus,
    /// Full stdout, newline-joined in arrival order.
    pub stdout: String,
    /// Full stderr, newline-joined in arrival order.
    pub stderr: String,
    /// True when the process was killed for exceeding its timeout.
    pub timed_out: bool,
}

impl ProcessOutcome {
    /// True when the process ran to completion with exit status zero.
    #[must_use]
    pub fn success(&self) -> bool {
        !self.timed_out && self.status.success()
    }

    /// Exit code, if the process exited normally.
    #[must_use]
    pub fn exit_code(&self) -> Option<i32> {
        self.status.code()
    }
}

// ── Execution ────────────────────────────────────────────────────────────

/// Spawn the invocation and capture both streams to completion.
///
/// Each stdout line is reported to `sink` for progress extraction before
/// being stored. Returns `Err` only when the process could not be started
/// or waited on; a nonzero exit is a successful run with a failing
/// [`ProcessOutcome`].
pub async fn run_streaming(
    invocation: &GradleInvocation,
    sink: Arc<dyn ProgressSink>,
) -> Result<ProcessOutcome, RunnerError> {
    debug!(
        program = %invocation.program.display(),
        args = ?invocation.args,
        cwd = %invocation.cwd.display(),
        "spawning gradle process"
    );

    let mut child = Command::new(&invocation.program)
        .args(&invocation.args)
        .current_dir(&invocation.cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| RunnerError::Spawn {
            program: invocation.program.display().to_string(),
            source,
        })?;

    let stdout_pipe = child
        .stdout
        .take()
        .ok_or(RunnerError::MissingPipe { stream: "stdout" })?;
    let stderr_pipe = child
        .stderr
        .take()
        .ok_or(RunnerError::MissingPipe { stream: "stderr" })?;

    let stdout_task = {
        let sink = Arc::clone(&sink);
        tokio::spawn(async move {
            let mut lines = Vec::new();
            let mut reader = BufReader::new(stdout_pipe).lines();
            loop {
                match reader.next_line().await {
                    Ok(Some(line)) => {
                        progress::observe_line(&line, sink.as_ref());
                        lines.push(line);
                    }
                    Ok(None) => break,
                    Err(e) => {
                        warn!(error = %e, "stdout capture ended early");
                        break;
                    }
                }
            }
            lines
        })
    };

    let stderr_task = tokio::spawn(async move {
        let mut lines = Vec::new();
        let mut reader = BufReader::new(stderr_pipe).lines();
        loop {
            match reader.next_line().await {
                Ok(Some(line)) => lines.push(line),
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "stderr capture ended early");
                    break;
                }
            }
        }
        lines
    });

    let mut timed_out = false;
    let wait_result = match invocation.timeout {
        Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
            Ok(result) => result,
            Err(_) => {
                timed_out = true;
                warn!(timeout = ?limit, "gradle process exceeded timeout, killing");
                if let Err(e) = child.kill().await {
                    warn!(error = %e, "failed to kill timed-out gradle process");
                }
                child.wait().await
            }
        },
        None => child.wait().await,
    };
    let status = wait_result.map_err(RunnerError::Wait)?;

    // After a kill the pipes may be held open by orphaned build daemons,
    // so draining is bounded in that case.
    let grace = timed_out.then_some(KILL_DRAIN_GRACE);
    let stdout_lines = collect_lines(stdout_task, "stdout", grace).await;
    let stderr_lines = collect_lines(stderr_task, "stderr", grace).await;

    debug!(
        exit_code = ?status.code(),
        timed_out,
        stdout_lines = stdout_lines.len(),
        stderr_lines = stderr_lines.len(),
        "gradle process finished"
    );

    Ok(ProcessOutcome {
        status,
        stdout: stdout_lines.join("\n"),
        stderr: stderr_lines.join("\n"),
        timed_out,
    })
}

async fn collect_lines(
    mut handle: JoinHandle<Vec<String>>,
    stream: &'static str,
    grace: Option<Duration>,
) -> Vec<String> {
    let Some(limit) = grace else {
        return finish_join(handle.await, stream);
    };

    tokio::select! {
        joined = &mut handle => finish_join(joined, stream),
        () = tokio::time::sleep(limit) => {
            warn!(stream, "reader still draining after kill, abandoning capture");
            handle.abort();
            Vec::new()
        }
    }
}

fn finish_join(joined: Result<Vec<String>, JoinError>, stream: &'static str) -> Vec<String> {
    match joined {
        Ok(lines) => lines,
        Err(e) => {
            warn!(stream, error = %e, "reader task failed");
            Vec::new()
        }
    }
}

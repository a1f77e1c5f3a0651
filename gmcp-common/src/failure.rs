//! Root-cause reconstruction from failed Gradle output.
//!
//! Gradle splits failure information across its two streams: per-task
//! failure detail goes to stdout while the terminal `FAILURE:` summary and
//! `BUILD FAILED` go to stderr. True chronological interleaving is not
//! observable, so the streams are merged in fixed stdout-then-stderr order,
//! which puts the summary markers after all detail and makes a backward
//! search from the last marker well defined.
//!
//! The reconstruction is pure: same streams in, same error string out, and
//! the original streams are never mutated or truncated. Malformed output
//! degrades to a bounded context window rather than an empty error.

use memchr::memmem;

const FAILURE_MARKER: &str = "FAILURE:";
const BUILD_FAILED_MARKER: &str = "BUILD FAILED";

/// Lines of context kept when no task-failure line anchors the error.
const FALLBACK_WINDOW: usize = 100;

// ── Reconstruction ───────────────────────────────────────────────────────

/// Reconstruct a single human-meaningful error from captured output.
///
/// Invoked only when the exit status indicates failure. Returns
/// `default_message` verbatim when both streams are empty; otherwise always
/// returns a non-empty slice of the combined output:
///
/// 1. anchor at the last `FAILURE:` / `BUILD FAILED` marker,
/// 2. scan backward for the earliest `> Task … FAILED` line, bounded by the
///    nearest successful task or build-start indicator,
/// 3. return everything from that line to the end: every failed task plus
///    the full summary, not just the failure nearest the marker,
/// 4. or fall back to the last [`FALLBACK_WINDOW`] lines of context.
#[must_use]
pub fn reconstruct(stdout: &str, stderr: &str, default_message: &str) -> String {
    let combined = match (stdout.is_empty(), stderr.is_empty()) {
        (true, true) => return default_message.to_string(),
        (false, true) => stdout.to_string(),
        (true, false) => stderr.to_string(),
        (false, false) => format!("{stdout}\n{stderr}"),
    };

    let trimmed = combined.trim();
    let lines: Vec<&str> = trimmed.split('\n').collect();

    let Some(marker_line) = last_marker_line(trimmed) else {
        let start = lines.len().saturating_sub(FALLBACK_WINDOW);
        return lines[start..].join("\n");
    };

    if let Some(first_failure) = earliest_task_failure(&lines, marker_line) {
        return lines[first_failure..].join("\n");
    }

    let start = marker_line.saturating_sub(FALLBACK_WINDOW);
    lines[start..].join("\n")
}

/// Line index of the last summary marker, if any.
fn last_marker_line(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let failure = memmem::rfind(bytes, FAILURE_MARKER.as_bytes());
    let build_failed = memmem::rfind(bytes, BUILD_FAILED_MARKER.as_bytes());

    let offset = match (failure, build_failed) {
        (Some(a), Some(b)) => a.max(b),
        (a, b) => a.or(b)?,
    };

    Some(memchr::memchr_iter(b'\n', &bytes[..offset]).count())
}

/// A line reporting that a named task transitioned to a failed state.
fn is_task_failure_line(line: &str) -> bool {
    line.contains("> Task") && line.contains("FAILED")
}

/// A line bounding the backward scan: a task that did not fail
/// (UP-TO-DATE, NO-SOURCE, FROM-CACHE, …) or a build-start indicator.
fn is_scan_boundary(line: &str) -> bool {
    (line.contains("> Task") && !line.contains("FAILED"))
        || line.contains("BUILD SUCCESSFUL")
        || line.contains("Configuration cache")
}

/// Backward scan from the marker for the earliest failed-task line.
///
/// Keeps updating the anchor so that every contiguous failed task before
/// the summary is captured; stops once a non-failed task line or
/// build-start indicator shows the failure block has ended.
fn earliest_task_failure(lines: &[&str], marker_line: usize) -> Option<usize> {
    let mut earliest = None;
    for i in (0..marker_line).rev() {
        let line = lines[i];
        if is_task_failure_line(line) {
            earliest = Some(i);
        } else if is_scan_boundary(line) {
            break;
        }
    }
    earliest
}

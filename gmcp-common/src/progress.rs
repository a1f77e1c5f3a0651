//! Progress extraction from live Gradle output.
//!
//! Gradle writes status lines like `<============-> 93% EXECUTING [19s]` to
//! stdout when not silenced. This module recognizes the percentage in such
//! lines as they arrive and hands it to a caller-provided sink. Delivery is
//! fire-and-forget: a slow or absent sink must never stall the stream
//! reader, so sink implementations are expected to drop rather than block.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, OnceLock};

/// Denominator reported with every signal; Gradle reports percentages.
pub const PROGRESS_TOTAL: u32 = 100;

// ── Signal ───────────────────────────────────────────────────────────────

/// One observed progress value.
///
/// Values are forwarded as observed: Gradle reports progress across parallel
/// sub-tasks, so the sequence is not necessarily monotonic and is neither
/// clamped nor deduplicated here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSignal {
    /// Percentage as printed by Gradle.
    pub percent: u32,
    /// Always [`PROGRESS_TOTAL`].
    pub total: u32,
}

impl ProgressSignal {
    #[must_use]
    pub fn new(percent: u32) -> Self {
        Self {
            percent,
            total: PROGRESS_TOTAL,
        }
    }
}

// ── Extraction ───────────────────────────────────────────────────────────

fn percent_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(\d+)%").ok()).as_ref()
}

/// Extract the progress percentage from one output line.
///
/// Returns the first decimal integer immediately followed by `%`; `None`
/// when the line has no such pattern. Only the first match counts, so a
/// line is always worth at most one signal. No state is kept across lines.
#[must_use]
pub fn extract_percent(line: &str) -> Option<u32> {
    if !line.contains('%') {
        return None;
    }
    let captures = percent_pattern()?.captures(line)?;
    captures.get(1)?.as_str().parse().ok()
}

// ── Sink ─────────────────────────────────────────────────────────────────

/// Destination for progress signals; delivery guarantees are the
/// implementation's concern and calls must not block.
pub trait ProgressSink: Send + Sync {
    fn report(&self, signal: ProgressSignal);
}

/// Sink that discards every signal. Used when the caller asked for no
/// progress reporting.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn report(&self, _signal: ProgressSignal) {}
}

/// Deterministic in-memory sink for tests and local inspection.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    signals: Arc<Mutex<Vec<ProgressSignal>>>,
}

impl RecordingSink {
    /// Snapshot of all signals received so far.
    #[must_use]
    pub fn signals(&self) -> Vec<ProgressSignal> {
        self.signals.lock().expect("signals mutex poisoned").clone()
    }
}

impl ProgressSink for RecordingSink {
    fn report(&self, signal: ProgressSignal) {
        self.signals
            .lock()
            .expect("signals mutex poisoned")
            .push(signal);
    }
}

/// Scan one stdout line and report its percentage, if any, to the sink.
pub fn observe_line(line: &str, sink: &dyn ProgressSink) {
    if let Some(percent) = extract_percent(line) {
        sink.report(ProgressSignal::new(percent));
    }
}

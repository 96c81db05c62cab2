//! Live progress reporting for `solat fetch`.
//!
//! One event per finished job, emitted while the pool is still running.
//! Progress goes to **stderr** so stdout stays reserved for the final
//! report.

use anyhow::{bail, Result};
use std::io::Write;

use crate::models::{FetchOutcome, OutcomeKind};

/// A single progress event for a fetch run.
#[derive(Clone, Debug)]
pub enum ProgressEvent {
    /// The pool is about to start `total` jobs.
    Started { total: u64 },
    /// The `n`th outcome (1-based) of `total` arrived.
    Completed {
        zone_id: String,
        category: String,
        kind: OutcomeKind,
        detail: Option<String>,
        error_kind: Option<&'static str>,
        n: u64,
        total: u64,
    },
}

impl ProgressEvent {
    pub fn completed(outcome: &FetchOutcome, n: u64, total: u64) -> Self {
        ProgressEvent::Completed {
            zone_id: outcome.job().zone_id.clone(),
            category: outcome.job().category.clone(),
            kind: outcome.kind(),
            detail: outcome.failure().map(|e| e.to_string()),
            error_kind: outcome.failure().map(|e| e.category()),
            n,
            total,
        }
    }
}

/// Reports fetch progress. Implementations write to stderr (human or JSON).
pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// Human-friendly progress: `[ 3/60] ✓ Downloaded: JHR03`.
pub struct StderrProgress;

impl ProgressReporter for StderrProgress {
    fn report(&self, event: ProgressEvent) {
        let line = human_line(&event);
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        let _ = std::io::stderr().lock().flush();
    }
}

fn human_line(event: &ProgressEvent) -> String {
    match event {
        ProgressEvent::Started { total } => {
            format!("fetching {} zones...\n", format_number(*total))
        }
        ProgressEvent::Completed {
            zone_id,
            kind,
            detail,
            n,
            total,
            ..
        } => {
            let width = total.to_string().len();
            let body = match kind {
                OutcomeKind::Fetched => format!("✓ Downloaded: {}", zone_id),
                OutcomeKind::SkippedExisting => {
                    format!("⏭ Skipped: {} (already exists)", zone_id)
                }
                OutcomeKind::Failed => format!(
                    "✗ Failed: {} - {}",
                    zone_id,
                    detail.as_deref().unwrap_or("unknown error")
                ),
            };
            format!("[{:>width$}/{}] {}\n", n, total, body, width = width)
        }
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl ProgressReporter for JsonProgress {
    fn report(&self, event: ProgressEvent) {
        if let Ok(line) = serde_json::to_string(&json_event(&event)) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
            let _ = std::io::stderr().lock().flush();
        }
    }
}

fn json_event(event: &ProgressEvent) -> serde_json::Value {
    match event {
        ProgressEvent::Started { total } => serde_json::json!({
            "event": "started",
            "total": total
        }),
        ProgressEvent::Completed {
            zone_id,
            category,
            kind,
            detail,
            error_kind,
            n,
            total,
        } => serde_json::json!({
            "event": "progress",
            "zone": zone_id,
            "category": category,
            "outcome": kind.as_str(),
            "error_kind": error_kind,
            "error": detail,
            "n": n,
            "total": total
        }),
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _event: ProgressEvent) {}
}

pub(crate) fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    /// Resolve the `--progress` flag; `None` and `auto` pick the TTY default.
    pub fn from_flag(flag: Option<&str>) -> Result<Self> {
        match flag {
            None | Some("auto") => Ok(Self::default_for_tty()),
            Some("off") => Ok(ProgressMode::Off),
            Some("human") => Ok(ProgressMode::Human),
            Some("json") => Ok(ProgressMode::Json),
            Some(other) => bail!(
                "Unknown progress mode: '{}'. Must be auto, off, human, or json.",
                other
            ),
        }
    }

    pub fn reporter(&self) -> Box<dyn ProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}

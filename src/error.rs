//! Per-job failure taxonomy.
//!
//! A [`FetchError`] never escapes the worker pool: it is recorded on the
//! job's [`FetchOutcome`](crate::models::FetchOutcome) and the run carries
//! on. Run-level failures (config, catalog, output directory) use
//! `anyhow` instead.

use std::path::PathBuf;
use thiserror::Error;

/// Why a single fetch job failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// The request could not be sent, or no response arrived before the
    /// per-request timeout.
    #[error("request failed: {0}")]
    Transport(String),

    /// A response arrived with a non-success status.
    #[error("bad status: {code} {reason}")]
    Status { code: u16, reason: String },

    /// The body is not a well-formed JSON document.
    #[error("failed to parse JSON: {0}")]
    Parse(String),

    /// The destination could not be checked, created, or written.
    #[error("failed to write {}: {message}", .path.display())]
    Persist { path: PathBuf, message: String },

    /// The job's task panicked or was cancelled before producing a result.
    #[error("job aborted: {0}")]
    Aborted(String),
}

impl FetchError {
    pub fn persist(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        FetchError::Persist {
            path: path.into(),
            message: err.to_string(),
        }
    }

    /// Short machine-readable label, used in JSON progress output.
    pub fn category(&self) -> &'static str {
        match self {
            FetchError::Transport(_) => "transport",
            FetchError::Status { .. } => "status",
            FetchError::Parse(_) => "parse",
            FetchError::Persist { .. } => "persist",
            FetchError::Aborted(_) => "aborted",
        }
    }
}

//! Core data models that flow through the fetch pipeline.
//!
//! A [`FetchJob`] is built once per zone by [`crate::jobs`], handed to the
//! worker pool, and comes back wrapped in exactly one [`FetchOutcome`].

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::FetchError;

/// One zone to fetch for one period.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchJob {
    /// Grouping label, e.g. the state name.
    pub category: String,
    pub zone_id: String,
    /// Fully-formed URL to fetch from.
    pub source_locator: String,
    /// Where the normalized document is written. Unique within a run.
    pub destination_path: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OutcomeKind {
    Fetched,
    SkippedExisting,
    Failed,
}

impl OutcomeKind {
    pub const ALL: [OutcomeKind; 3] = [
        OutcomeKind::Fetched,
        OutcomeKind::SkippedExisting,
        OutcomeKind::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeKind::Fetched => "fetched",
            OutcomeKind::SkippedExisting => "skipped",
            OutcomeKind::Failed => "failed",
        }
    }
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The result of running one [`FetchJob`].
///
/// Fields are private so that `failure` is present exactly when the kind is
/// [`OutcomeKind::Failed`]; use the constructors.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    job: Arc<FetchJob>,
    kind: OutcomeKind,
    failure: Option<FetchError>,
}

impl FetchOutcome {
    pub fn fetched(job: Arc<FetchJob>) -> Self {
        Self {
            job,
            kind: OutcomeKind::Fetched,
            failure: None,
        }
    }

    pub fn skipped(job: Arc<FetchJob>) -> Self {
        Self {
            job,
            kind: OutcomeKind::SkippedExisting,
            failure: None,
        }
    }

    pub fn failed(job: Arc<FetchJob>, error: FetchError) -> Self {
        Self {
            job,
            kind: OutcomeKind::Failed,
            failure: Some(error),
        }
    }

    pub fn job(&self) -> &FetchJob {
        &self.job
    }

    pub fn kind(&self) -> OutcomeKind {
        self.kind
    }

    pub fn failure(&self) -> Option<&FetchError> {
        self.failure.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> Arc<FetchJob> {
        Arc::new(FetchJob {
            category: "Johor".to_string(),
            zone_id: "JHR01".to_string(),
            source_locator: "http://localhost/JHR01".to_string(),
            destination_path: PathBuf::from("2025/JHR01-2025.json"),
        })
    }

    #[test]
    fn failure_present_only_when_failed() {
        assert!(FetchOutcome::fetched(job()).failure().is_none());
        assert!(FetchOutcome::skipped(job()).failure().is_none());

        let failed = FetchOutcome::failed(job(), FetchError::Parse("eof".to_string()));
        assert_eq!(failed.kind(), OutcomeKind::Failed);
        assert_eq!(failed.failure(), Some(&FetchError::Parse("eof".to_string())));
    }

    #[test]
    fn kind_labels() {
        let labels: Vec<&str> = OutcomeKind::ALL.iter().map(|k| k.as_str()).collect();
        assert_eq!(labels, vec!["fetched", "skipped", "failed"]);
    }
}

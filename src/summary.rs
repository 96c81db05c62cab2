//! Result aggregation.
//!
//! [`Summary`] is a plain sequential reducer over outcomes; it holds no
//! locks. [`drain`] is the single consumer of the pool's outcome channel
//! and feeds the reducer as outcomes arrive.

use std::collections::BTreeMap;
use tokio::sync::mpsc;

use crate::models::{FetchOutcome, OutcomeKind};
use crate::progress::{ProgressEvent, ProgressReporter};

#[derive(Debug, Clone, Default)]
pub struct Summary {
    counts_by_kind: BTreeMap<OutcomeKind, usize>,
    /// Completion order within each category.
    outcomes_by_category: BTreeMap<String, Vec<FetchOutcome>>,
}

impl Summary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, outcome: FetchOutcome) {
        *self.counts_by_kind.entry(outcome.kind()).or_insert(0) += 1;
        self.outcomes_by_category
            .entry(outcome.job().category.clone())
            .or_default()
            .push(outcome);
    }

    pub fn from_outcomes<I>(outcomes: I) -> Self
    where
        I: IntoIterator<Item = FetchOutcome>,
    {
        let mut summary = Self::new();
        summary.extend(outcomes);
        summary
    }

    pub fn count(&self, kind: OutcomeKind) -> usize {
        self.counts_by_kind.get(&kind).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts_by_kind.values().sum()
    }

    pub fn counts_by_kind(&self) -> &BTreeMap<OutcomeKind, usize> {
        &self.counts_by_kind
    }

    pub fn outcomes_by_category(&self) -> &BTreeMap<String, Vec<FetchOutcome>> {
        &self.outcomes_by_category
    }

    pub fn outcomes(&self) -> impl Iterator<Item = &FetchOutcome> {
        self.outcomes_by_category.values().flatten()
    }

    pub fn failures(&self) -> impl Iterator<Item = &FetchOutcome> {
        self.outcomes().filter(|o| o.kind() == OutcomeKind::Failed)
    }
}

impl Extend<FetchOutcome> for Summary {
    fn extend<I: IntoIterator<Item = FetchOutcome>>(&mut self, iter: I) {
        for outcome in iter {
            self.record(outcome);
        }
    }
}

impl FromIterator<FetchOutcome> for Summary {
    fn from_iter<I: IntoIterator<Item = FetchOutcome>>(iter: I) -> Self {
        Self::from_outcomes(iter)
    }
}

/// Consume outcomes until every sender is dropped, reporting each one.
pub async fn drain(
    mut outcomes: mpsc::Receiver<FetchOutcome>,
    total: usize,
    reporter: &dyn ProgressReporter,
) -> Summary {
    let total = total as u64;
    reporter.report(ProgressEvent::Started { total });

    let mut summary = Summary::new();
    while let Some(outcome) = outcomes.recv().await {
        let job = outcome.job();
        match outcome.failure() {
            Some(err) => tracing::warn!(
                zone = %job.zone_id,
                category = %job.category,
                error = %err,
                "fetch failed"
            ),
            None => tracing::debug!(
                zone = %job.zone_id,
                category = %job.category,
                outcome = %outcome.kind(),
                "fetch finished"
            ),
        }

        let n = summary.total() as u64 + 1;
        reporter.report(ProgressEvent::completed(&outcome, n, total));
        summary.record(outcome);
    }

    summary
}

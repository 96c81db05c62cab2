//! Bounded fetch worker pool.
//!
//! ```text
//!   jobs ──▶ shared queue ──▶ worker 0 ─┐
//!                         ──▶ worker 1 ─┼──▶ mpsc ──▶ aggregator
//!                         ──▶ worker N ─┘
//! ```
//!
//! `min(concurrency, jobs)` workers pop from one queue, so a job is handed
//! out exactly once and at most `concurrency` jobs are in flight. Each job
//! runs in its own task: a panic becomes a `Failed` outcome instead of a
//! lost job. [`FetchPool::run`] returns once every worker has finished,
//! and by then every sender clone is dropped, which closes the channel.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::config::FetchConfig;
use crate::error::FetchError;
use crate::fetch::{self, FetchSource};
use crate::models::{FetchJob, FetchOutcome, OutcomeKind};

#[derive(Debug, Clone)]
pub struct PoolOptions {
    /// Upper bound on jobs in flight. Treated as 1 when 0.
    pub concurrency: usize,
    /// Per-worker pause after each outcome.
    pub pause: Duration,
    /// Pause after `SkippedExisting` outcomes as well.
    pub pace_skipped: bool,
    /// Top-level keys stripped from every document before it is written.
    pub volatile_fields: Vec<String>,
}

impl PoolOptions {
    pub fn from_config(config: &FetchConfig) -> Self {
        Self {
            concurrency: config.concurrency,
            pause: config.pause(),
            pace_skipped: config.pace_skipped,
            volatile_fields: config.volatile_fields.clone(),
        }
    }

    /// Workers spawned for `jobs` jobs: never more than there are jobs.
    pub fn worker_count(&self, jobs: usize) -> usize {
        self.concurrency.max(1).min(jobs)
    }

    fn should_pause(&self, kind: OutcomeKind) -> bool {
        !self.pause.is_zero() && (self.pace_skipped || kind != OutcomeKind::SkippedExisting)
    }
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self::from_config(&FetchConfig::default())
    }
}

type JobQueue = Arc<Mutex<VecDeque<Arc<FetchJob>>>>;

pub struct FetchPool {
    source: Arc<dyn FetchSource>,
    options: Arc<PoolOptions>,
}

impl FetchPool {
    pub fn new(source: Arc<dyn FetchSource>, options: PoolOptions) -> Self {
        Self {
            source,
            options: Arc::new(options),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.options.concurrency.max(1)
    }

    /// Capacity for the outcome channel handed to [`run`](Self::run).
    pub fn channel_capacity(&self) -> usize {
        self.concurrency()
    }

    /// Run every job, sending one outcome per job into `sink`.
    ///
    /// Returns after all workers have exited. If the receiving side is
    /// dropped early, workers stop taking new jobs.
    pub async fn run(&self, jobs: Vec<FetchJob>, sink: mpsc::Sender<FetchOutcome>) {
        let total = jobs.len();
        let queue: JobQueue = Arc::new(Mutex::new(jobs.into_iter().map(Arc::new).collect()));
        let workers = self.options.worker_count(total);

        tracing::info!(jobs = total, workers, "starting fetch pool");

        let mut set = JoinSet::new();
        for worker in 0..workers {
            set.spawn(worker_loop(
                worker,
                Arc::clone(&queue),
                sink.clone(),
                Arc::clone(&self.source),
                Arc::clone(&self.options),
            ));
        }
        drop(sink);

        while let Some(joined) = set.join_next().await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "fetch worker exited abnormally");
            }
        }

        tracing::info!(jobs = total, "fetch pool finished");
    }

    /// Run every job and return the outcomes in completion order.
    pub async fn collect(&self, jobs: Vec<FetchJob>) -> Vec<FetchOutcome> {
        let (tx, mut rx) = mpsc::channel(self.channel_capacity());
        let expected = jobs.len();

        let drain = async {
            let mut outcomes = Vec::with_capacity(expected);
            while let Some(outcome) = rx.recv().await {
                outcomes.push(outcome);
            }
            outcomes
        };

        let ((), outcomes) = tokio::join!(self.run(jobs, tx), drain);
        outcomes
    }
}

fn next_job(queue: &JobQueue) -> Option<Arc<FetchJob>> {
    let mut guard = queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    guard.pop_front()
}

async fn worker_loop(
    worker: usize,
    queue: JobQueue,
    sink: mpsc::Sender<FetchOutcome>,
    source: Arc<dyn FetchSource>,
    options: Arc<PoolOptions>,
) {
    while let Some(job) = next_job(&queue) {
        let outcome = execute(job, &source, &options).await;
        let kind = outcome.kind();

        if sink.send(outcome).await.is_err() {
            tracing::warn!(worker, "outcome receiver closed, worker stopping");
            break;
        }

        if options.should_pause(kind) {
            tokio::time::sleep(options.pause).await;
        }
    }
}

async fn execute(
    job: Arc<FetchJob>,
    source: &Arc<dyn FetchSource>,
    options: &Arc<PoolOptions>,
) -> FetchOutcome {
    let task = {
        let job = Arc::clone(&job);
        let source = Arc::clone(source);
        let options = Arc::clone(options);
        tokio::spawn(async move {
            fetch::run_job(job, source.as_ref(), &options.volatile_fields).await
        })
    };

    match task.await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!(zone = %job.zone_id, error = %e, "fetch task aborted");
            FetchOutcome::failed(job, FetchError::Aborted(e.to_string()))
        }
    }
}

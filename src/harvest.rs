//! Fetch-run orchestration.
//!
//! Coordinates the full `solat fetch` flow: catalog → jobs → worker pool →
//! aggregation → report → archive. Everything before the pool starts is
//! fatal; everything inside it is recorded per job; archiving is
//! best-effort.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;

use crate::archive;
use crate::catalog;
use crate::config::Config;
use crate::fetch::{FetchSource, HttpSource};
use crate::jobs;
use crate::models::FetchJob;
use crate::pool::{FetchPool, PoolOptions};
use crate::progress::{ProgressMode, ProgressReporter};
use crate::report;
use crate::summary::{self, Summary};

/// Run the pool over `jobs` and aggregate outcomes while they arrive.
pub async fn run_pipeline(
    jobs: Vec<FetchJob>,
    source: Arc<dyn FetchSource>,
    options: PoolOptions,
    reporter: &dyn ProgressReporter,
) -> Summary {
    let pool = FetchPool::new(source, options);
    let total = jobs.len();
    let (tx, rx) = mpsc::channel(pool.channel_capacity());

    let ((), summary) = tokio::join!(pool.run(jobs, tx), summary::drain(rx, total, reporter));
    summary
}

/// `solat fetch`: download every zone for `period`, print the report, and
/// optionally build the archive. Individual job failures do not make this
/// return an error.
pub async fn run_fetch(
    config: &Config,
    period: &str,
    progress: ProgressMode,
    archive: bool,
) -> Result<Summary> {
    let catalog = catalog::load_catalog(config)?;
    let jobs = jobs::build_jobs(
        &catalog,
        period,
        &config.fetch.base_url,
        &config.output.root,
    );

    let period_dir = jobs::period_dir(&config.output.root, period);
    std::fs::create_dir_all(&period_dir)
        .with_context(|| format!("Failed to create output directory: {}", period_dir.display()))?;

    let source = HttpSource::new(config.fetch.timeout())?;
    let options = PoolOptions::from_config(&config.fetch);

    println!("{}", banner(period, jobs.len(), options.worker_count(jobs.len())));

    let started = Instant::now();
    let reporter = progress.reporter();
    let summary = run_pipeline(jobs, Arc::new(source), options, reporter.as_ref()).await;

    report::print(&summary, &period_dir, started.elapsed());

    if archive {
        match archive::zip_period(&period_dir, period) {
            Ok(report) => println!(
                "  Archive:      {} ({} files)",
                report.path.display(),
                report.entries
            ),
            Err(e) => {
                tracing::error!(error = %e, "archive step failed");
                eprintln!("Warning: could not create archive: {:#}", e);
            }
        }
    }

    Ok(summary)
}

fn banner(period: &str, zones: usize, workers: usize) -> String {
    format!("fetch {}: {} zones, {} workers", period, zones, workers)
}

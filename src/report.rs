//! End-of-run report printed by `solat fetch`.

use std::fmt::Write;
use std::path::Path;
use std::time::Duration;

use crate::models::{FetchOutcome, OutcomeKind};
use crate::summary::Summary;

/// Render the per-category results followed by the totals.
///
/// Zones are listed by id within a category so the report reads the same
/// regardless of completion order.
pub fn render(summary: &Summary, output_dir: &Path, elapsed: Duration) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "=== Results by zone group ===");
    for (category, outcomes) in summary.outcomes_by_category() {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}:", category);

        let mut sorted: Vec<&FetchOutcome> = outcomes.iter().collect();
        sorted.sort_by(|a, b| a.job().zone_id.cmp(&b.job().zone_id));
        for outcome in sorted {
            let _ = writeln!(out, "  {}", outcome_line(outcome));
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "=== Summary ===");
    let _ = writeln!(out, "  Total zones:  {}", summary.total());
    let _ = writeln!(out, "  Downloaded:   {}", summary.count(OutcomeKind::Fetched));
    let _ = writeln!(
        out,
        "  Skipped:      {} (already exists)",
        summary.count(OutcomeKind::SkippedExisting)
    );
    let _ = writeln!(out, "  Failed:       {}", summary.count(OutcomeKind::Failed));
    let _ = writeln!(out, "  Total time:   {}", format_elapsed(elapsed));
    let _ = writeln!(out, "  Output:       {}", output_dir.display());

    if summary.count(OutcomeKind::Failed) > 0 {
        let _ = writeln!(out);
        let _ = writeln!(out, "Failed zones are retried on the next run.");
    }

    out
}

pub fn print(summary: &Summary, output_dir: &Path, elapsed: Duration) {
    println!();
    print!("{}", render(summary, output_dir, elapsed));
}

fn outcome_line(outcome: &FetchOutcome) -> String {
    let zone = &outcome.job().zone_id;
    match (outcome.kind(), outcome.failure()) {
        (OutcomeKind::Fetched, _) => format!("✓ {} downloaded", zone),
        (OutcomeKind::SkippedExisting, _) => format!("⏭ {} skipped (exists)", zone),
        (OutcomeKind::Failed, Some(err)) => format!("✗ {} failed: {}", zone, err),
        (OutcomeKind::Failed, None) => format!("✗ {} failed", zone),
    }
}

fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs_f64();
    if secs < 1.0 {
        format!("{} ms", elapsed.as_millis())
    } else if secs < 60.0 {
        format!("{:.1} s", secs)
    } else {
        let whole = elapsed.as_secs();
        format!("{}m {:02}s", whole / 60, whole % 60)
    }
}

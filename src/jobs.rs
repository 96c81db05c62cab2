//! Expands a zone catalog into fetch jobs for one period.

use anyhow::{bail, Result};
use std::path::{Path, PathBuf};

use crate::catalog::ZoneCatalog;
use crate::models::FetchJob;

/// The period becomes a directory and file-name component.
pub fn check_period(period: &str) -> Result<()> {
    if period.trim().is_empty() {
        bail!("period must not be empty");
    }
    if period.contains(['/', '\\']) || period == "." || period == ".." {
        bail!("period '{}' is not a valid directory name", period);
    }
    Ok(())
}

/// Directory that holds every file for `period`.
pub fn period_dir(output_root: &Path, period: &str) -> PathBuf {
    output_root.join(period)
}

/// `{output_root}/{period}/{zone_id}-{period}.json`
pub fn destination_for(output_root: &Path, zone_id: &str, period: &str) -> PathBuf {
    period_dir(output_root, period).join(format!("{}-{}.json", zone_id, period))
}

/// One job per zone, in catalog order. Pure: touches neither network nor disk.
pub fn build_jobs(
    catalog: &ZoneCatalog,
    period: &str,
    base_url: &str,
    output_root: &Path,
) -> Vec<FetchJob> {
    catalog
        .iter()
        .map(|(category, zone)| FetchJob {
            category: category.to_string(),
            zone_id: zone.id.clone(),
            source_locator: format!("{}{}", base_url, zone.id),
            destination_path: destination_for(output_root, &zone.id, period),
        })
        .collect()
}

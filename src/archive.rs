//! Bundle a period's JSON files into `{period}/{period}.zip`.
//!
//! The archive is derived data: it is rebuilt from scratch every time, and
//! only `.json` files are included, so an older archive in the same
//! directory is never nested inside the new one.

use anyhow::{bail, Context, Result};
use std::fs::File;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveReport {
    pub path: PathBuf,
    pub entries: usize,
}

pub fn archive_path(period_dir: &Path, period: &str) -> PathBuf {
    period_dir.join(format!("{}.zip", period))
}

/// Write every `.json` file under `period_dir` into the period archive.
/// Entries are named by their path relative to `period_dir` and stored in
/// sorted order.
pub fn zip_period(period_dir: &Path, period: &str) -> Result<ArchiveReport> {
    if !period_dir.is_dir() {
        bail!(
            "Output directory does not exist: {}",
            period_dir.display()
        );
    }

    let entries = collect_json_files(period_dir)?;
    let path = archive_path(period_dir, period);

    let file = File::create(&path)
        .with_context(|| format!("Failed to create archive: {}", path.display()))?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for (name, source) in &entries {
        zip.start_file(name.as_str(), options)
            .with_context(|| format!("Failed to add {} to archive", name))?;
        let mut input = File::open(source)
            .with_context(|| format!("Failed to open {}", source.display()))?;
        std::io::copy(&mut input, &mut zip)
            .with_context(|| format!("Failed to write {} to archive", name))?;
    }

    zip.finish()
        .with_context(|| format!("Failed to finish archive: {}", path.display()))?;

    tracing::info!(path = %path.display(), entries = entries.len(), "archive written");

    Ok(ArchiveReport {
        path,
        entries: entries.len(),
    })
}

/// `(entry name, absolute path)` for every `.json` file, sorted by name.
fn collect_json_files(root: &Path) -> Result<Vec<(String, PathBuf)>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }

        let relative = path.strip_prefix(root).unwrap_or(path);
        let name = relative.to_string_lossy().replace('\\', "/");
        files.push((name, path.to_path_buf()));
    }

    files.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(files)
}

/// `solat archive`: rebuild the archive for an existing period directory.
pub fn run_archive(period_dir: &Path, period: &str) -> Result<()> {
    let report = zip_period(period_dir, period)?;
    println!(
        "archive {}: {} files -> {}",
        period,
        report.entries,
        report.path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn entry_names(path: &Path) -> Vec<String> {
        let mut archive = zip::ZipArchive::new(File::open(path).unwrap()).unwrap();
        (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect()
    }

    #[test]
    fn zips_only_json_files_in_sorted_order() {
        let tmp = tempfile::TempDir::new().unwrap();
        let dir = tmp.path().join("2025");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("WLY01-2025.json"), "{}").unwrap();
        std::fs::write(dir.join("JHR01-2025.json"), "{\"zone\":\"JHR01\"}").unwrap();
        std::fs::write(dir.join("notes.txt"), "ignore me").unwrap();

        let report = zip_period(&dir, "2025").unwrap();

        assert_eq!(report.entries, 2);
        assert_eq!(report.path, dir.join("2025.zip"));
        assert_eq!(
            entry_names(&report.path),
            vec!["JHR01-2025.json", "WLY01-2025.json"]
        );

        let mut archive = zip::ZipArchive::new(File::open(&report.path).unwrap()).unwrap();
        let mut contents = String::new();
        archive
            .by_name("JHR01-2025.json")
            .unwrap()
            .read_to_string(&mut contents)
            .unwrap();
        assert_eq!(contents, "{\"zone\":\"JHR01\"}");
    }

    #[test]
    fn rebuild_replaces_previous_archive() {
        let tmp = tempfile::TempDir::new().unwrap();
        let dir = tmp.path().join("2025");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("A-2025.json"), "{}").unwrap();
        zip_period(&dir, "2025").unwrap();

        std::fs::write(dir.join("B-2025.json"), "{}").unwrap();
        let report = zip_period(&dir, "2025").unwrap();

        assert_eq!(entry_names(&report.path), vec!["A-2025.json", "B-2025.json"]);
    }

    #[test]
    fn missing_directory_is_an_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        assert!(zip_period(&tmp.path().join("1999"), "1999").is_err());
    }
}

//! Zone catalog: which zones exist and how they are grouped.
//!
//! The catalog is an input to the pipeline, never discovered at runtime.
//! A copy ships inside the binary; `[catalog].path` points at a JSON file
//! with the same shape to override it:
//!
//! ```json
//! { "zones": { "Johor": [ { "value": "JHR01", "label": "Pulau Aur" } ] } }
//! ```

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

use crate::config::Config;

const EMBEDDED_ZONES: &str = include_str!("../data/zones.json");

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Zone {
    #[serde(alias = "value")]
    pub id: String,
    #[serde(default)]
    pub label: String,
}

/// Category name → ordered zones. Categories iterate in sorted order.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct ZoneCatalog {
    pub zones: BTreeMap<String, Vec<Zone>>,
}

impl ZoneCatalog {
    pub fn embedded() -> Result<Self> {
        Self::from_json(EMBEDDED_ZONES).context("Failed to parse embedded zone catalog")
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let catalog: ZoneCatalog = serde_json::from_str(json)?;
        catalog.check()?;
        Ok(catalog)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read zone catalog: {}", path.display()))?;
        Self::from_json(&content)
            .with_context(|| format!("Failed to parse zone catalog: {}", path.display()))
    }

    pub fn zone_count(&self) -> usize {
        self.zones.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.zone_count() == 0
    }

    /// Every `(category, zone)` pair, categories sorted, zones in file order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Zone)> {
        self.zones
            .iter()
            .flat_map(|(category, zones)| zones.iter().map(move |z| (category.as_str(), z)))
    }

    /// Zone ids become file names and are appended to the base URL as-is.
    /// Only ASCII letters, digits, `-` and `_` are allowed, and each id
    /// appears once.
    fn check(&self) -> Result<()> {
        let mut seen: BTreeMap<&str, &str> = BTreeMap::new();
        for (category, zone) in self.iter() {
            let id = zone.id.as_str();
            if id.trim().is_empty() {
                bail!("zone with empty id in category '{}'", category);
            }
            if !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
                bail!(
                    "zone id '{}' may only contain ASCII letters, digits, '-' and '_'",
                    id
                );
            }
            if let Some(previous) = seen.insert(id, category) {
                bail!(
                    "zone '{}' listed twice (categories '{}' and '{}')",
                    id,
                    previous,
                    category
                );
            }
        }
        Ok(())
    }
}

/// Load the catalog named by the config, or the embedded one.
pub fn load_catalog(config: &Config) -> Result<ZoneCatalog> {
    match &config.catalog.path {
        Some(path) => ZoneCatalog::from_file(path),
        None => ZoneCatalog::embedded(),
    }
}

/// Print the catalog as a table (`solat zones`).
pub fn list_zones(config: &Config) -> Result<()> {
    let catalog = load_catalog(config)?;

    println!("{:<22} {:<8} LABEL", "CATEGORY", "ZONE");
    for (category, zone) in catalog.iter() {
        println!("{:<22} {:<8} {}", category, zone.id, zone.label);
    }
    println!();
    println!(
        "{} zones in {} categories",
        catalog.zone_count(),
        catalog.zones.len()
    );

    Ok(())
}

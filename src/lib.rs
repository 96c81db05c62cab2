//! # solat-sync
//!
//! Fetches a year of prayer times for every e-Solat zone, strips the
//! volatile `serverTime` field, and stores one JSON file per zone,
//! optionally bundled into a zip archive.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────┐   ┌──────────────┐   ┌───────────┐
//! │ Catalog  │──▶│   Jobs   │──▶│ Worker pool  │──▶│  Summary  │
//! │ (zones)  │   │ (1/zone) │   │ fetch+write  │   │ + report  │
//! └──────────┘   └──────────┘   └──────┬───────┘   └─────┬─────┘
//!                                      ▼                 ▼
//!                              {period}/*.json    {period}.zip
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! solat zones                    # list the zone catalog
//! solat fetch                    # fetch the current year
//! solat fetch --year 2025 --concurrency 8
//! solat archive --year 2025      # rebuild the zip
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`catalog`] | Zone catalog loading |
//! | [`jobs`] | Job builder |
//! | [`models`] | Jobs and outcomes |
//! | [`error`] | Per-job failure taxonomy |
//! | [`fetch`] | Fetch, normalize, persist one job |
//! | [`pool`] | Bounded worker pool |
//! | [`summary`] | Outcome aggregation |
//! | [`progress`] | Live progress on stderr |
//! | [`report`] | End-of-run report |
//! | [`archive`] | Zip bundling |
//! | [`harvest`] | Run orchestration |

pub mod archive;
pub mod catalog;
pub mod config;
pub mod error;
pub mod fetch;
pub mod harvest;
pub mod jobs;
pub mod models;
pub mod pool;
pub mod progress;
pub mod report;
pub mod summary;

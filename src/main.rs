//! # solat CLI
//!
//! ```bash
//! solat --config ./config/solat.toml <command>
//! ```
//!
//! | Command | Description |
//! |---------|-------------|
//! | `solat fetch` | Fetch every zone for a year, report, and archive |
//! | `solat zones` | List the zone catalog |
//! | `solat archive` | Rebuild the zip for an already fetched year |
//!
//! Set `RUST_LOG=solat_sync=debug` for per-job diagnostics on stderr.

use anyhow::Result;
use chrono::Datelike;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use solat_sync::{archive, catalog, config, harvest, jobs, progress::ProgressMode};

const DEFAULT_CONFIG: &str = "./config/solat.toml";

/// Fetch, normalize, and archive yearly e-Solat prayer-time schedules.
#[derive(Parser)]
#[command(name = "solat", version)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/solat.toml`; built-in defaults are used when
    /// that file does not exist.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch every zone in the catalog for one year.
    ///
    /// Zones whose file already exists are skipped, so re-running retries
    /// only what failed last time.
    Fetch {
        /// Year to fetch. Defaults to the current year.
        #[arg(long)]
        year: Option<String>,

        /// Maximum number of concurrent downloads (overrides config).
        #[arg(long)]
        concurrency: Option<usize>,

        /// Skip building the zip archive.
        #[arg(long)]
        no_archive: bool,

        /// Progress output: `auto`, `off`, `human`, or `json` (stderr).
        #[arg(long)]
        progress: Option<String>,
    },

    /// List zones in the catalog.
    Zones,

    /// Rebuild the zip archive for a fetched year.
    Archive {
        /// Year to archive. Defaults to the current year.
        #[arg(long)]
        year: Option<String>,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn current_year() -> String {
    chrono::Local::now().year().to_string()
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let explicit = cli.config.is_some();
    let config_path = cli.config.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG));
    let mut cfg = config::load_or_default(&config_path, explicit)?;

    match cli.command {
        Commands::Fetch {
            year,
            concurrency,
            no_archive,
            progress,
        } => {
            if let Some(n) = concurrency {
                cfg.fetch.concurrency = n;
                config::validate(&cfg)?;
            }
            let mode = ProgressMode::from_flag(progress.as_deref())?;
            let period = year.unwrap_or_else(current_year);
            jobs::check_period(&period)?;
            let archive = cfg.output.archive && !no_archive;

            harvest::run_fetch(&cfg, &period, mode, archive).await?;
        }
        Commands::Zones => {
            catalog::list_zones(&cfg)?;
        }
        Commands::Archive { year } => {
            let period = year.unwrap_or_else(current_year);
            jobs::check_period(&period)?;
            let dir = jobs::period_dir(&cfg.output.root, &period);
            archive::run_archive(&dir, &period)?;
        }
    }

    Ok(())
}

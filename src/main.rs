use crate::config::Config;
use crate::db::connection::{init_db, Database};
use crate::db::scrapes::get_recent_scrapes;
use crate::runner::{run_export, run_ingest, ExportFormat};
use crate::scraper::{PageDelay, WebmotorsClient};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::LevelFilter;
use std::path::{Path, PathBuf};

mod config;
mod db;
mod domain;
mod errors;
mod logger;
mod runner;
mod scraper;
mod spreadsheets;

#[cfg(test)]
mod tests;

/// Collects Webmotors sedan listings into SQLite, CSV or XLSX.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// TOML config file (falls back to $CONFIG_PATH, then defaults)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log debug output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch, normalize and store listings, skipping ones already stored
    Ingest {
        #[arg(long)]
        pages: Option<u32>,
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Fetch and normalize listings into a CSV file
    ExportCsv {
        #[arg(long)]
        pages: Option<u32>,
        #[arg(long, default_value = "webmotors_results.csv")]
        out: PathBuf,
    },
    /// Fetch and normalize listings into an XLSX workbook
    ExportXlsx {
        #[arg(long)]
        pages: Option<u32>,
        #[arg(long, default_value = "webmotors_results.xlsx")]
        out: PathBuf,
    },
    /// Show recent ingest runs
    History {
        #[arg(long)]
        db: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        LevelFilter::Debug
    } else if cli.quiet {
        LevelFilter::Warn
    } else {
        LevelFilter::Info
    };
    logger::setup_logger(level).context("failed to set up logging")?;

    let mut config = Config::load(cli.config.as_deref()).context("failed to load config")?;

    match cli.command {
        Command::Ingest { pages, db } => {
            if let Some(pages) = pages {
                config.total_pages = pages;
            }
            if let Some(db) = db {
                config.database_path = db;
            }
            config.validate()?;

            let db = Database::new(config.database_path.clone());
            init_db(&db).context("database initialization failed")?;

            let client = WebmotorsClient::new(&config)?;
            let delay = PageDelay::new(config.min_delay_secs, config.max_delay_secs);
            let report = run_ingest(&db, &client, config.total_pages, &delay)?;
            println!("{report}");
        }
        Command::ExportCsv { pages, out } => export(config, pages, &out, ExportFormat::Csv)?,
        Command::ExportXlsx { pages, out } => export(config, pages, &out, ExportFormat::Xlsx)?,
        Command::History { db } => {
            let db = Database::new(db.unwrap_or(config.database_path));
            init_db(&db)?;
            for run in db.with_conn(|conn| get_recent_scrapes(conn))? {
                let status = if run.success { "ok" } else { "failed" };
                println!(
                    "#{} {} started {} finished {} pages {} fetched {} inserted {} {}{}",
                    run.id,
                    run.facet,
                    run.started_at,
                    run.finished_at.map_or("-".to_string(), |t| t.to_string()),
                    run.pages_requested,
                    run.listings_fetched.unwrap_or(0),
                    run.listings_inserted.unwrap_or(0),
                    status,
                    run.error_message
                        .map(|e| format!(": {e}"))
                        .unwrap_or_default(),
                );
            }
        }
    }

    Ok(())
}

fn export(mut config: Config, pages: Option<u32>, out: &Path, format: ExportFormat) -> Result<()> {
    if let Some(pages) = pages {
        config.total_pages = pages;
    }
    config.validate()?;

    let client = WebmotorsClient::new(&config)?;
    let delay = PageDelay::new(config.min_delay_secs, config.max_delay_secs);
    let report = run_export(&client, config.total_pages, &delay, format, out)
        .with_context(|| format!("export to {} failed", out.display()))?;
    println!("{report}");
    println!("Saved as {}", out.display());
    Ok(())
}

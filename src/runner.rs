// Drives one run end to end: pages -> normalizer -> store or export.
use crate::db::connection::Database;
use crate::db::listings::save_listings;
use crate::db::scrapes::{end_scrape_run, start_scrape_run};
use crate::domain::listing::ListingRecord;
use crate::domain::normalize::normalize_listings;
use crate::errors::AppError;
use crate::scraper::{fetch_all_pages, ListingSource, PageDelay};
use crate::spreadsheets::{export_listings_csv, export_listings_xlsx};
use log::{error, info, warn};
use std::fmt;
use std::path::Path;

pub const FACET: &str = "sedans";

/// Counts reported at the end of a run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    pub fetched: usize,
    pub normalized: usize,
    pub skipped: usize,
    pub inserted: usize,
    pub already_present: usize,
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "fetched {}, normalized {}, skipped {} malformed, inserted {}, already present {}",
            self.fetched, self.normalized, self.skipped, self.inserted, self.already_present
        )
    }
}

pub enum ExportFormat {
    Csv,
    Xlsx,
}

fn now_unix() -> i64 {
    chrono::Utc::now().timestamp()
}

fn collect_records<S: ListingSource + ?Sized>(
    source: &S,
    total_pages: u32,
    delay: &PageDelay,
    report: &mut RunReport,
) -> Result<Vec<ListingRecord>, AppError> {
    let raw = fetch_all_pages(source, total_pages, delay)?;
    report.fetched = raw.len();

    let batch = normalize_listings(&raw);
    report.normalized = batch.records.len();
    report.skipped = batch.skipped;
    if batch.skipped > 0 {
        warn!("{} of {} listings were malformed and skipped", batch.skipped, raw.len());
    }

    Ok(batch.records)
}

/// Fetches `total_pages`, normalizes, and stores everything as one batch.
/// The run is recorded in `scrape_runs` whether it succeeds or not.
pub fn run_ingest<S: ListingSource + ?Sized>(
    db: &Database,
    source: &S,
    total_pages: u32,
    delay: &PageDelay,
) -> Result<RunReport, AppError> {
    let run_id = db.with_conn(|conn| start_scrape_run(conn, FACET, total_pages, now_unix()))?;
    info!("Scrape run {run_id} started ({total_pages} pages of {FACET})");

    let mut report = RunReport::default();
    let result = collect_records(source, total_pages, delay, &mut report).and_then(|records| {
        let stored = save_listings(db, &records)?;
        report.inserted = stored.inserted;
        report.already_present = stored.already_present;
        Ok(())
    });

    let error = result.as_ref().err().map(|e| e.to_string());
    if let Err(e) = db.with_conn(|conn| end_scrape_run(conn, run_id, now_unix(), &report, error)) {
        error!("Failed to record end of scrape run {run_id}: {e}");
    }

    result?;
    info!("Scrape run {run_id} complete: {report}");
    Ok(report)
}

/// Fetches and normalizes, then writes the records to `out` instead of the store.
pub fn run_export<S: ListingSource + ?Sized>(
    source: &S,
    total_pages: u32,
    delay: &PageDelay,
    format: ExportFormat,
    out: &Path,
) -> Result<RunReport, AppError> {
    let mut report = RunReport::default();
    let records = collect_records(source, total_pages, delay, &mut report)?;

    match format {
        ExportFormat::Csv => export_listings_csv(&records, out)?,
        ExportFormat::Xlsx => export_listings_xlsx(&records, out)?,
    }

    info!("Export complete: {report}");
    Ok(report)
}

use crate::errors::StorageError;
use crate::runner::RunReport;
use rusqlite::{params, Connection};

#[derive(Debug)]
pub struct ScrapeRun {
    pub id: i64,
    pub facet: String,
    pub started_at: i64,
    pub finished_at: Option<i64>,
    pub pages_requested: i64,
    pub listings_fetched: Option<i64>,
    pub listings_inserted: Option<i64>,
    pub success: bool,
    pub error_message: Option<String>,
}

pub fn start_scrape_run(
    conn: &Connection,
    facet: &str,
    pages_requested: u32,
    now: i64,
) -> Result<i64, StorageError> {
    conn.execute(
        "INSERT INTO scrape_runs (facet, started_at, pages_requested, success) VALUES (?, ?, ?, 0)",
        params![facet, now, pages_requested],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn end_scrape_run(
    conn: &Connection,
    run_id: i64,
    now: i64,
    report: &RunReport,
    error: Option<String>,
) -> Result<(), StorageError> {
    conn.execute(
        "UPDATE scrape_runs SET finished_at = ?, listings_fetched = ?, listings_normalized = ?, \
         listings_skipped = ?, listings_inserted = ?, listings_already_present = ?, success = ?, \
         error_message = ? WHERE id = ?",
        params![
            now,
            report.fetched as i64,
            report.normalized as i64,
            report.skipped as i64,
            report.inserted as i64,
            report.already_present as i64,
            error.is_none(),
            error,
            run_id
        ],
    )?;
    Ok(())
}

pub fn get_recent_scrapes(conn: &Connection) -> Result<Vec<ScrapeRun>, StorageError> {
    let mut stmt = conn.prepare(
        "SELECT id, facet, started_at, finished_at, pages_requested, listings_fetched, \
         listings_inserted, success, error_message FROM scrape_runs ORDER BY id DESC LIMIT 50",
    )?;

    let rows = stmt.query_map([], |row| {
        Ok(ScrapeRun {
            id: row.get(0)?,
            facet: row.get(1)?,
            started_at: row.get(2)?,
            finished_at: row.get(3)?,
            pages_requested: row.get(4)?,
            listings_fetched: row.get(5)?,
            listings_inserted: row.get(6)?,
            success: row.get(7)?,
            error_message: row.get(8)?,
        })
    })?;

    let mut runs = Vec::new();
    for r in rows {
        runs.push(r?);
    }
    Ok(runs)
}

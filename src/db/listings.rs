use crate::db::connection::Database;
use crate::db::encoding::{decode_attributes, encode_attributes};
use crate::domain::listing::{ColumnValue, ListingRecord, LISTING_COLUMNS};
use crate::errors::StorageError;
use log::{debug, info};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};

const TABLE: &str = "webmotors_data";

/// Outcome of one committed batch.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngestReport {
    pub inserted: usize,
    pub already_present: usize,
}

fn insert_sql() -> String {
    let placeholders: Vec<String> = (1..=LISTING_COLUMNS.len()).map(|i| format!("?{i}")).collect();
    format!(
        "INSERT INTO {TABLE} ({}) VALUES ({}) ON CONFLICT(UniqueId) DO NOTHING",
        LISTING_COLUMNS.join(", "),
        placeholders.join(", ")
    )
}

fn to_sql_value(cell: ColumnValue<'_>) -> Result<SqlValue, StorageError> {
    Ok(match cell {
        ColumnValue::Int(i) => SqlValue::Integer(i),
        ColumnValue::Float(f) => SqlValue::Real(f),
        ColumnValue::Text(s) => SqlValue::Text(s.to_string()),
        ColumnValue::Bool(b) => SqlValue::Integer(i64::from(b)),
        ColumnValue::Attributes(a) => SqlValue::Text(encode_attributes(a)?),
        ColumnValue::Null => SqlValue::Null,
    })
}

/// Stores a batch of listings in one transaction.
///
/// A listing whose `UniqueId` is already stored, whether from an earlier batch
/// or earlier in this one, is left untouched and counted as already present.
/// Any other failure rolls the whole batch back.
pub fn save_listings(db: &Database, listings: &[ListingRecord]) -> Result<IngestReport, StorageError> {
    let report = db.with_conn(|conn| {
        let tx = conn.transaction()?;
        let mut report = IngestReport::default();

        {
            let mut stmt = tx.prepare_cached(&insert_sql())?;
            for listing in listings {
                let values = listing
                    .column_values()
                    .into_iter()
                    .map(to_sql_value)
                    .collect::<Result<Vec<_>, _>>()?;

                match stmt.execute(params_from_iter(values))? {
                    0 => {
                        debug!("Listing {} already stored, skipping", listing.id);
                        report.already_present += 1;
                    }
                    _ => report.inserted += 1,
                }
            }
        }

        tx.commit()?;
        Ok(report)
    })?;

    info!(
        "Saved batch of {}: {} inserted, {} already present",
        listings.len(),
        report.inserted,
        report.already_present
    );
    Ok(report)
}

pub fn listing_exists(conn: &Connection, id: i64) -> Result<bool, StorageError> {
    let found = conn
        .query_row(
            &format!("SELECT 1 FROM {TABLE} WHERE UniqueId = ?"),
            params![id],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

pub fn count_listings(conn: &Connection) -> Result<i64, StorageError> {
    let count = conn.query_row(&format!("SELECT COUNT(*) FROM {TABLE}"), [], |row| row.get(0))?;
    Ok(count)
}

/// Reads one stored listing back, decoding `VehicleAttributes`.
pub fn get_listing(conn: &Connection, id: i64) -> Result<Option<ListingRecord>, StorageError> {
    let sql = format!(
        "SELECT {} FROM {TABLE} WHERE UniqueId = ?",
        LISTING_COLUMNS.join(", ")
    );

    let row = conn
        .query_row(&sql, params![id], |row| {
            let attributes_text: String = row.get(11)?;
            let record = ListingRecord {
                id: row.get(0)?,
                title: row.get(1)?,
                make: row.get(2)?,
                model: row.get(3)?,
                version: row.get(4)?,
                fabrication_year: row.get(5)?,
                model_year: row.get(6)?,
                odometer: row.get(7)?,
                transmission: row.get(8)?,
                door_count: row.get(9)?,
                body_type: row.get(10)?,
                attributes: Vec::new(),
                armored: row.get(12)?,
                color: row.get(13)?,
                price: row.get(14)?,
                listing_type: row.get(15)?,
                long_comment: row.get(16)?,
                fipe_percent: row.get(17)?,
                eligible_for_inspection: row.get(18)?,
                eligible_for_360_view: row.get(19)?,
                seller_id: row.get(20)?,
                seller_fantasy_name: row.get(21)?,
                seller_type: row.get(22)?,
                seller_city: row.get(23)?,
                seller_state: row.get(24)?,
                seller_ad_type: row.get(25)?,
                seller_dealer_score: row.get(26)?,
                seller_offers_delivery: row.get(27)?,
                seller_accepts_trade_in: row.get(28)?,
            };
            Ok((record, attributes_text))
        })
        .optional()?;

    match row {
        Some((mut record, attributes_text)) => {
            record.attributes = decode_attributes(&attributes_text)?;
            Ok(Some(record))
        }
        None => Ok(None),
    }
}

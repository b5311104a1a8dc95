use crate::db::encoding::encode_attributes;
use crate::domain::listing::{ColumnValue, ListingRecord, LISTING_COLUMNS};
use crate::errors::ExportError;
use rust_xlsxwriter::Workbook;
use std::path::Path;

/// Builds a single-sheet workbook: header row, then one row per listing.
pub fn build_listings_workbook(listings: &[ListingRecord]) -> Result<Vec<u8>, ExportError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("listings")?;

    for (col, header) in LISTING_COLUMNS.iter().enumerate() {
        worksheet.write_string(0, col as u16, *header)?;
    }

    for (i, listing) in listings.iter().enumerate() {
        let r = (i + 1) as u32;

        for (col, cell) in listing.column_values().into_iter().enumerate() {
            let c = col as u16;
            match cell {
                ColumnValue::Int(v) => {
                    worksheet.write_number(r, c, v as f64)?;
                }
                ColumnValue::Float(v) => {
                    worksheet.write_number(r, c, v)?;
                }
                ColumnValue::Text(s) => {
                    worksheet.write_string(r, c, s)?;
                }
                ColumnValue::Bool(b) => {
                    worksheet.write_boolean(r, c, b)?;
                }
                ColumnValue::Attributes(a) => {
                    worksheet.write_string(r, c, encode_attributes(a)?)?;
                }
                ColumnValue::Null => {}
            }
        }
    }

    Ok(workbook.save_to_buffer()?)
}

pub fn export_listings_xlsx(listings: &[ListingRecord], path: &Path) -> Result<(), ExportError> {
    let buffer = build_listings_workbook(listings)?;
    std::fs::write(path, buffer)?;
    log::info!("Wrote {} listings to {}", listings.len(), path.display());
    Ok(())
}

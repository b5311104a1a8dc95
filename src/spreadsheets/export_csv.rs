use crate::domain::listing::{ColumnValue, ListingRecord, LISTING_COLUMNS};
use crate::domain::repr::render_attributes;
use crate::errors::ExportError;
use csv::Writer;
use std::io;
use std::path::Path;

fn cell_text(cell: ColumnValue<'_>) -> String {
    match cell {
        ColumnValue::Int(i) => i.to_string(),
        // Debug keeps the trailing ".0" on whole numbers.
        ColumnValue::Float(f) => format!("{f:?}"),
        ColumnValue::Text(s) => s.to_string(),
        ColumnValue::Bool(true) => "True".to_string(),
        ColumnValue::Bool(false) => "False".to_string(),
        ColumnValue::Attributes(a) => render_attributes(a),
        ColumnValue::Null => String::new(),
    }
}

/// Writes a header row plus one row per listing, comma separated.
pub fn write_listings_csv<W: io::Write>(
    listings: &[ListingRecord],
    out: W,
) -> Result<(), ExportError> {
    let mut writer = Writer::from_writer(out);
    writer.write_record(LISTING_COLUMNS)?;

    for listing in listings {
        writer.write_record(listing.column_values().into_iter().map(cell_text))?;
    }

    writer.flush()?;
    Ok(())
}

pub fn export_listings_csv(listings: &[ListingRecord], path: &Path) -> Result<(), ExportError> {
    let file = std::fs::File::create(path)?;
    write_listings_csv(listings, file)?;
    log::info!("Wrote {} listings to {}", listings.len(), path.display());
    Ok(())
}

use crate::db::connection::{init_db, Database};
use crate::domain::listing::ListingRecord;
use crate::errors::AppError;
use crate::scraper::{FetchError, ListingSource, RawListing};
use serde_json::json;
use std::cell::RefCell;
use std::collections::HashMap;
use tempfile::TempDir;

/// Initialize a fresh test DB in its own temp directory.
/// Keep the `TempDir` alive for as long as the database is used.
pub fn init_test_db() -> (TempDir, Database) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db = Database::new(dir.path().join("test_db.sqlite"));

    init_db(&db).unwrap_or_else(|e| panic!("Database initialization failed: {e}"));

    (dir, db)
}

/// A fully populated listing as the search API returns it. `LongComment` is absent.
pub fn raw_listing(id: i64, title: &str) -> RawListing {
    RawListing::new(json!({
        "UniqueId": id,
        "ListingType": "U",
        "FipePercent": 98.5,
        "IsElegibleVehicleInspection": true,
        "IsElegible360View": false,
        "Specification": {
            "Title": title,
            "Make": {"id": 1, "Value": "HONDA"},
            "Model": {"id": 2, "Value": "CIVIC"},
            "Version": {"id": 3, "Value": "2.0 EXL 16V FLEX 4P AUTOMÁTICO"},
            "YearFabrication": "2019",
            "YearModel": 2020.0,
            "Odometer": 45000,
            "Transmission": "Automática",
            "NumberPorts": "4",
            "BodyType": "Sedã",
            "VehicleAttributes": [
                {"Name": "Aceita troca"},
                {"Name": "IPVA pago"}
            ],
            "Armored": "Sim",
            "Color": {"IdPrimary": "7", "Primary": "Prata"}
        },
        "Prices": {"Price": 112900.0, "SearchPrice": 112900.0},
        "Seller": {
            "Id": 9001,
            "FantasyName": "AUTO SHOPPING",
            "SellerType": "PJ",
            "City": "São Paulo",
            "State": "São Paulo (SP)",
            "AdType": {"id": 1, "Value": "Loja"},
            "DealerScore": 4,
            "CarDelivery": true,
            "TrocaComTroco": false
        }
    }))
}

pub fn sample_record(id: i64, title: &str) -> ListingRecord {
    ListingRecord::from_raw(&raw_listing(id, title)).expect("sample listing should normalize")
}

/// In-memory `ListingSource` serving canned pages and remembering what was asked.
#[derive(Default)]
pub struct StubSource {
    pub pages: HashMap<u32, Vec<RawListing>>,
    pub failing_page: Option<u32>,
    pub requested: RefCell<Vec<u32>>,
}

impl StubSource {
    pub fn with_pages(pages: Vec<Vec<RawListing>>) -> Self {
        Self {
            pages: pages
                .into_iter()
                .enumerate()
                .map(|(i, page)| (i as u32 + 1, page))
                .collect(),
            ..Self::default()
        }
    }
}

impl ListingSource for StubSource {
    fn fetch_page(&self, page: u32) -> Result<Vec<RawListing>, FetchError> {
        self.requested.borrow_mut().push(page);
        if self.failing_page == Some(page) {
            return Err(FetchError::Http {
                status: 403,
                body: "blocked".to_string(),
            });
        }
        Ok(self.pages.get(&page).cloned().unwrap_or_default())
    }
}

pub fn is_fetch_error(err: &AppError) -> bool {
    matches!(err, AppError::Fetch(_))
}

use serde::Deserialize;
use serde_json::Value;

// SearchResults[]
//  ├── UniqueId
//  ├── ListingType
//  ├── LongComment            (optional)
//  ├── FipePercent            (optional)
//  ├── IsElegibleVehicleInspection
//  ├── IsElegible360View
//  ├── Specification
//  │    ├── Title
//  │    ├── Make.Value / Model.Value / Version.Value
//  │    ├── YearFabrication / YearModel
//  │    ├── Odometer / Transmission / NumberPorts / BodyType
//  │    ├── VehicleAttributes[]
//  │    ├── Armored
//  │    └── Color.Primary
//  ├── Prices
//  │    └── Price
//  └── Seller
//       ├── Id / FantasyName / SellerType / City / State
//       ├── AdType.Value
//       ├── DealerScore
//       └── CarDelivery / TrocaComTroco

/// One untouched listing object from the search API.
///
/// The payload shape belongs to the remote site, so nothing here is typed:
/// the normalizer walks it by path and decides what is required.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct RawListing(pub Value);

impl RawListing {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Follows `path` through nested objects. A JSON `null` counts as absent.
    pub fn lookup(&self, path: &[&str]) -> Option<&Value> {
        self.lookup_present(path).filter(|v| !v.is_null())
    }

    /// Like `lookup`, but a key holding `null` is returned as `Value::Null`.
    pub fn lookup_present(&self, path: &[&str]) -> Option<&Value> {
        let mut current = &self.0;
        for key in path {
            current = current.as_object()?.get(*key)?;
        }
        Some(current)
    }

    /// Best-effort listing id, used to label errors and log lines.
    pub fn unique_id(&self) -> Option<i64> {
        self.lookup(&["UniqueId"]).and_then(value_as_i64)
    }
}

/// Integer reading shared by ids and integer fields: integral numbers,
/// whole floats (`555.0`) and numeric strings.
pub fn value_as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// Envelope of one search page. Only `SearchResults` matters to us.
#[derive(Debug, Deserialize)]
pub struct SearchPage {
    #[serde(rename = "SearchResults")]
    pub search_results: Vec<RawListing>,
}

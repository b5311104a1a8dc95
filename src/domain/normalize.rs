use crate::domain::repr::render_one_tuple;
use crate::domain::listing::{ListingRecord, VehicleAttributes};
use crate::scraper::models::value_as_i64;
use crate::scraper::RawListing;
use log::warn;
use serde_json::Value;
use thiserror::Error;

/// Why one raw listing could not be turned into a `ListingRecord`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NormalizeError {
    #[error("listing {}: missing required field {path}", display_id(.id))]
    MalformedRecord { path: String, id: Option<i64> },

    #[error("listing {}: field {path} should be {expected}, found {found}", display_id(.id))]
    TypeConversion {
        path: String,
        expected: &'static str,
        found: String,
        id: Option<i64>,
    },
}

fn display_id(id: &Option<i64>) -> String {
    id.map_or_else(|| "<unknown>".to_string(), |id| id.to_string())
}

/// Result of normalizing a whole batch: good records plus how many were dropped.
#[derive(Debug, Default)]
pub struct NormalizedBatch {
    pub records: Vec<ListingRecord>,
    pub skipped: usize,
}

/// Normalizes every listing, logging and skipping the ones that fail.
pub fn normalize_listings(raw: &[RawListing]) -> NormalizedBatch {
    let mut batch = NormalizedBatch::default();

    for listing in raw {
        match ListingRecord::from_raw(listing) {
            Ok(record) => batch.records.push(record),
            Err(e) => {
                warn!("Skipping listing due to normalization error: {e}");
                batch.skipped += 1;
            }
        }
    }

    batch
}

impl ListingRecord {
    /// Maps one raw API listing onto the fixed record shape.
    pub fn from_raw(raw: &RawListing) -> Result<Self, NormalizeError> {
        let f = Fields {
            raw,
            id: raw.unique_id(),
        };

        Ok(Self {
            id: f.int(&["UniqueId"])?,
            title: f.text(&["Specification", "Title"])?,
            make: f.text(&["Specification", "Make", "Value"])?,
            model: f.text(&["Specification", "Model", "Value"])?,
            version: f.text(&["Specification", "Version", "Value"])?,
            fabrication_year: f.text(&["Specification", "YearFabrication"])?,
            model_year: f.float(&["Specification", "YearModel"])?,
            odometer: f.float(&["Specification", "Odometer"])?,
            transmission: f.text(&["Specification", "Transmission"])?,
            door_count: f.text(&["Specification", "NumberPorts"])?,
            body_type: f.text(&["Specification", "BodyType"])?,
            attributes: f.attributes(&["Specification", "VehicleAttributes"])?,
            armored: render_one_tuple(f.present(&["Specification", "Armored"])?),
            color: f.text(&["Specification", "Color", "Primary"])?,

            price: f.float(&["Prices", "Price"])?,
            listing_type: f.text(&["ListingType"])?,
            long_comment: f.optional(&["LongComment"], Fields::text)?,
            fipe_percent: f.optional(&["FipePercent"], Fields::float)?,

            eligible_for_inspection: f.boolean(&["IsElegibleVehicleInspection"])?,
            eligible_for_360_view: f.boolean(&["IsElegible360View"])?,

            seller_id: f.int(&["Seller", "Id"])?,
            seller_fantasy_name: f.text(&["Seller", "FantasyName"])?,
            seller_type: f.text(&["Seller", "SellerType"])?,
            seller_city: f.text(&["Seller", "City"])?,
            seller_state: f.text(&["Seller", "State"])?,
            seller_ad_type: f.text(&["Seller", "AdType", "Value"])?,
            seller_dealer_score: f.int(&["Seller", "DealerScore"])?,
            seller_offers_delivery: f.boolean(&["Seller", "CarDelivery"])?,
            seller_accepts_trade_in: f.boolean(&["Seller", "TrocaComTroco"])?,
        })
    }
}

/// Typed accessors over one raw listing, all failing with a path-labelled error.
struct Fields<'a> {
    raw: &'a RawListing,
    id: Option<i64>,
}

impl<'a> Fields<'a> {
    fn required(&self, path: &[&str]) -> Result<&'a Value, NormalizeError> {
        self.raw
            .lookup(path)
            .ok_or_else(|| NormalizeError::MalformedRecord {
                path: path.join("."),
                id: self.id,
            })
    }

    /// The key must exist, but `null` is an acceptable value.
    fn present(&self, path: &[&str]) -> Result<&'a Value, NormalizeError> {
        self.raw
            .lookup_present(path)
            .ok_or_else(|| NormalizeError::MalformedRecord {
                path: path.join("."),
                id: self.id,
            })
    }

    fn optional<T>(
        &self,
        path: &[&str],
        read: fn(&Self, &[&str]) -> Result<T, NormalizeError>,
    ) -> Result<Option<T>, NormalizeError> {
        match self.raw.lookup(path) {
            Some(_) => read(self, path).map(Some),
            None => Ok(None),
        }
    }

    fn mismatch(&self, path: &[&str], expected: &'static str, found: &Value) -> NormalizeError {
        NormalizeError::TypeConversion {
            path: path.join("."),
            expected,
            found: found.to_string(),
            id: self.id,
        }
    }

    fn text(&self, path: &[&str]) -> Result<String, NormalizeError> {
        match self.required(path)? {
            Value::String(s) => Ok(s.clone()),
            Value::Number(n) => Ok(n.to_string()),
            other => Err(self.mismatch(path, "text", other)),
        }
    }

    fn float(&self, path: &[&str]) -> Result<f64, NormalizeError> {
        let value = self.required(path)?;
        let parsed = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        parsed
            .filter(|f| f.is_finite())
            .ok_or_else(|| self.mismatch(path, "a number", value))
    }

    fn int(&self, path: &[&str]) -> Result<i64, NormalizeError> {
        let value = self.required(path)?;
        value_as_i64(value).ok_or_else(|| self.mismatch(path, "an integer", value))
    }

    fn boolean(&self, path: &[&str]) -> Result<bool, NormalizeError> {
        match self.required(path)? {
            Value::Bool(b) => Ok(*b),
            other => Err(self.mismatch(path, "a boolean", other)),
        }
    }

    fn attributes(&self, path: &[&str]) -> Result<VehicleAttributes, NormalizeError> {
        let value = self.required(path)?;
        let items = value
            .as_array()
            .ok_or_else(|| self.mismatch(path, "a list of objects", value))?;

        items
            .iter()
            .map(|item| {
                item.as_object()
                    .cloned()
                    .ok_or_else(|| self.mismatch(path, "a list of objects", value))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::utils::raw_listing;

    #[test]
    fn normalizes_complete_listing() {
        let record = ListingRecord::from_raw(&raw_listing(555, "HONDA CIVIC 2.0 EXL")).unwrap();

        assert_eq!(record.id, 555);
        assert_eq!(record.title, "HONDA CIVIC 2.0 EXL");
        assert_eq!(record.make, "HONDA");
        assert_eq!(record.model, "CIVIC");
        assert_eq!(record.version, "2.0 EXL 16V FLEX 4P AUTOMÁTICO");
        assert_eq!(record.fabrication_year, "2019");
        assert_eq!(record.model_year, 2020.0);
        assert_eq!(record.odometer, 45000.0);
        assert_eq!(record.door_count, "4");
        assert_eq!(record.color, "Prata");
        assert_eq!(record.price, 112900.0);
        assert_eq!(record.long_comment, None);
        assert_eq!(record.fipe_percent, Some(98.5));
        assert_eq!(record.seller_id, 9001);
        assert_eq!(record.seller_ad_type, "Loja");
        assert_eq!(record.seller_dealer_score, 4);
        assert!(record.seller_offers_delivery);
        assert!(!record.seller_accepts_trade_in);
        assert_eq!(record.attributes.len(), 2);
        assert_eq!(record.attributes[0]["Name"], "Aceita troca");
    }

    #[test]
    fn armored_keeps_one_tuple_text() {
        let record = ListingRecord::from_raw(&raw_listing(1, "x")).unwrap();
        assert_eq!(record.armored, "('Sim',)");
        assert_ne!(record.armored, "Sim");
    }

    #[test]
    fn null_armored_is_kept_as_none_tuple() {
        let mut raw = raw_listing(5, "x");
        raw.0["Specification"]["Armored"] = serde_json::Value::Null;

        let record = ListingRecord::from_raw(&raw).unwrap();
        assert_eq!(record.armored, "(None,)");
    }

    #[test]
    fn absent_armored_is_malformed() {
        let mut raw = raw_listing(6, "x");
        raw.0["Specification"]
            .as_object_mut()
            .unwrap()
            .remove("Armored");

        let err = ListingRecord::from_raw(&raw).unwrap_err();
        assert!(matches!(
            err,
            NormalizeError::MalformedRecord { ref path, id: Some(6) } if path == "Specification.Armored"
        ));
    }

    #[test]
    fn float_id_labels_errors() {
        let mut raw = raw_listing(1, "x");
        raw.0["UniqueId"] = serde_json::json!(555.0);
        raw.0.as_object_mut().unwrap().remove("Prices");

        let err = ListingRecord::from_raw(&raw).unwrap_err();
        assert_eq!(
            err,
            NormalizeError::MalformedRecord {
                path: "Prices.Price".to_string(),
                id: Some(555),
            }
        );
    }

    #[test]
    fn optional_fields_present() {
        let mut raw = raw_listing(7, "x");
        raw.0["LongComment"] = serde_json::json!("Único dono");
        raw.0["FipePercent"] = serde_json::Value::Null;

        let record = ListingRecord::from_raw(&raw).unwrap();
        assert_eq!(record.long_comment.as_deref(), Some("Único dono"));
        assert_eq!(record.fipe_percent, None);
    }

    #[test]
    fn missing_nested_path_is_malformed() {
        let mut raw = raw_listing(42, "x");
        raw.0["Specification"]["Make"]
            .as_object_mut()
            .unwrap()
            .remove("Value");

        let err = ListingRecord::from_raw(&raw).unwrap_err();
        assert_eq!(
            err,
            NormalizeError::MalformedRecord {
                path: "Specification.Make.Value".to_string(),
                id: Some(42),
            }
        );
    }

    #[test]
    fn missing_parent_object_is_malformed() {
        let mut raw = raw_listing(43, "x");
        raw.0.as_object_mut().unwrap().remove("Seller");

        let err = ListingRecord::from_raw(&raw).unwrap_err();
        assert!(matches!(
            err,
            NormalizeError::MalformedRecord { ref path, id: Some(43) } if path == "Seller.Id"
        ));
    }

    #[test]
    fn non_numeric_odometer_is_type_error() {
        let mut raw = raw_listing(44, "x");
        raw.0["Specification"]["Odometer"] = serde_json::json!("muitos km");

        let err = ListingRecord::from_raw(&raw).unwrap_err();
        assert!(matches!(
            err,
            NormalizeError::TypeConversion { ref path, expected: "a number", .. }
                if path == "Specification.Odometer"
        ));
    }

    #[test]
    fn numeric_strings_are_coerced() {
        let mut raw = raw_listing(45, "x");
        raw.0["Specification"]["Odometer"] = serde_json::json!("1200");
        raw.0["Specification"]["YearFabrication"] = serde_json::json!(32000);

        let record = ListingRecord::from_raw(&raw).unwrap();
        assert_eq!(record.odometer, 1200.0);
        assert_eq!(record.fabrication_year, "32000");
    }

    #[test]
    fn attributes_must_be_list_of_objects() {
        let mut raw = raw_listing(46, "x");
        raw.0["Specification"]["VehicleAttributes"] = serde_json::json!(["ar"]);

        let err = ListingRecord::from_raw(&raw).unwrap_err();
        assert!(matches!(err, NormalizeError::TypeConversion { .. }));
    }

    #[test]
    fn batch_skips_bad_records_and_keeps_the_rest() {
        let mut broken = raw_listing(2, "broken");
        broken.0.as_object_mut().unwrap().remove("Prices");

        let raw = vec![raw_listing(1, "a"), broken, raw_listing(3, "c")];
        let batch = normalize_listings(&raw);

        assert_eq!(batch.skipped, 1);
        let ids: Vec<i64> = batch.records.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn error_message_names_listing_and_path() {
        let mut raw = raw_listing(77, "x");
        raw.0.as_object_mut().unwrap().remove("ListingType");
        let msg = ListingRecord::from_raw(&raw).unwrap_err().to_string();
        assert_eq!(msg, "listing 77: missing required field ListingType");
    }
}

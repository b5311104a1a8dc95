use serde_json::{Map, Value};

/// Opaque `VehicleAttributes` payload, kept in the order the API sent it.
pub type VehicleAttributes = Vec<Map<String, Value>>;

/// A listing flattened into the fixed shape we persist and export.
/// Built once by the normalizer and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingRecord {
    pub id: i64,
    pub title: String,
    pub make: String,
    pub model: String,
    pub version: String,
    /// Text on purpose: the site uses values like "32000" as a sentinel.
    pub fabrication_year: String,
    pub model_year: f64,
    pub odometer: f64,
    pub transmission: String,
    pub door_count: String,
    pub body_type: String,
    pub attributes: VehicleAttributes,
    /// Already rendered as a one-element tuple, e.g. `('Sim',)`.
    pub armored: String,
    pub color: String,

    pub price: f64,
    pub listing_type: String,
    pub long_comment: Option<String>,
    pub fipe_percent: Option<f64>,

    pub eligible_for_inspection: bool,
    pub eligible_for_360_view: bool,

    pub seller_id: i64,
    pub seller_fantasy_name: String,
    pub seller_type: String,
    pub seller_city: String,
    pub seller_state: String,
    pub seller_ad_type: String,
    pub seller_dealer_score: i64,
    pub seller_offers_delivery: bool,
    pub seller_accepts_trade_in: bool,
}

/// External column names, in storage and export order.
///
/// These are the names existing databases and CSV files already use, so
/// they must not change. `ListingRecord::column_values` follows this order.
pub const LISTING_COLUMNS: [&str; 29] = [
    "UniqueId",
    "Title",
    "Make",
    "Model",
    "Version",
    "YearFabrication",
    "YearModel",
    "Odometer",
    "Transmission",
    "NumberPorts",
    "BodyType",
    "VehicleAttributes",
    "Armored",
    "Color",
    "Price",
    "ListingType",
    "LongComment",
    "FipePercent",
    "IsElegibleVehicleInspection",
    "IsElegible360View",
    "SellerId",
    "SellerFantasyName",
    "SellerType",
    "SellerCity",
    "SellerState",
    "SellerAdType",
    "SellerDealerScore",
    "SellerCarDelivery",
    "SellerTrocaComTroco",
];

/// A single cell of a listing row, for the tabular writers.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValue<'a> {
    Int(i64),
    Float(f64),
    Text(&'a str),
    Bool(bool),
    Attributes(&'a VehicleAttributes),
    Null,
}

impl ListingRecord {
    /// Cells in `LISTING_COLUMNS` order.
    pub fn column_values(&self) -> [ColumnValue<'_>; 29] {
        use ColumnValue::*;

        [
            Int(self.id),
            Text(&self.title),
            Text(&self.make),
            Text(&self.model),
            Text(&self.version),
            Text(&self.fabrication_year),
            Float(self.model_year),
            Float(self.odometer),
            Text(&self.transmission),
            Text(&self.door_count),
            Text(&self.body_type),
            Attributes(&self.attributes),
            Text(&self.armored),
            Text(&self.color),
            Float(self.price),
            Text(&self.listing_type),
            self.long_comment.as_deref().map_or(Null, Text),
            self.fipe_percent.map_or(Null, Float),
            Bool(self.eligible_for_inspection),
            Bool(self.eligible_for_360_view),
            Int(self.seller_id),
            Text(&self.seller_fantasy_name),
            Text(&self.seller_type),
            Text(&self.seller_city),
            Text(&self.seller_state),
            Text(&self.seller_ad_type),
            Int(self.seller_dealer_score),
            Bool(self.seller_offers_delivery),
            Bool(self.seller_accepts_trade_in),
        ]
    }
}

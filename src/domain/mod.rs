pub mod repr;
pub mod listing;
pub mod normalize;

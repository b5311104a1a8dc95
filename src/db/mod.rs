pub mod connection;
pub mod encoding;
pub mod listings;
pub mod scrapes;

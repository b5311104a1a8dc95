pub mod models;
mod scraper;
mod scraper_error;

pub use models::RawListing;
pub use scraper::{fetch_all_pages, ListingSource, PageDelay, WebmotorsClient};
pub use scraper_error::FetchError;

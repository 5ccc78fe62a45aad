pub mod scrape;
pub mod store;

pub mod model;
pub mod scrape;
pub mod store;
pub mod util;

pub use model::{CanonicalEntities, FeatureIdentity, ScrapeResult};
pub use scrape::diagnostics::range_error_to_html;
pub use scrape::{ScrapeOptions, scrape_page, scrape_page_with};
pub use store::scrape_feature_page;

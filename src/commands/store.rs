use anyhow::Result;
use tracing::{info, warn};

use compat_scrape::model::CanonicalEntities;
use compat_scrape::store::{import_canonical, open_store, page_status_counts, scrape_feature_page};
use compat_scrape::util::{ensure_directory, read_json};

use crate::cli::{ImportPageArgs, InitDbArgs, StatusArgs};

pub fn init_db(args: InitDbArgs) -> Result<()> {
    if let Some(parent) = args.db.parent() {
        ensure_directory(parent)?;
    }
    let mut connection = open_store(&args.db)?;
    info!(path = %args.db.display(), "store schema ready");

    if let Some(path) = &args.canonical {
        let canonical: CanonicalEntities = read_json(path)?;
        import_canonical(&mut connection, &canonical)?;
    }
    Ok(())
}

pub fn import_page(args: ImportPageArgs) -> Result<()> {
    let mut connection = open_store(&args.db)?;
    let outcome = scrape_feature_page(&mut connection, args.page_id)?;
    if outcome.errors > 0 {
        warn!(
            page_id = args.page_id,
            errors = outcome.errors,
            "page scraped with errors"
        );
    }
    Ok(())
}

pub fn status(args: StatusArgs) -> Result<()> {
    if !args.db.exists() {
        warn!(path = %args.db.display(), "database file missing");
        return Ok(());
    }

    let connection = open_store(&args.db)?;
    let counts = page_status_counts(&connection)?;
    if counts.is_empty() {
        info!(path = %args.db.display(), "no feature pages recorded");
    }
    for (status, count) in counts {
        info!(status = %status, pages = count, "feature pages");
    }
    Ok(())
}

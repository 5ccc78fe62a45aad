use std::path::Path;

use anyhow::{Context, Result, bail};
use rusqlite::{Connection, OptionalExtension, params};
use tracing::info;

use crate::model::{
    CanonicalBrowser, CanonicalEntities, CanonicalFeature, CanonicalSection,
    CanonicalSpecification, CanonicalSupport, CanonicalVersion, Diagnostic, FeatureIdentity,
    ScrapeResult,
};
use crate::scrape::diagnostics::diagnostic_to_html;
use crate::scrape::scrape_page;
use crate::util::{now_utc_string, sha256_text};

pub const SOURCE_LOCALE: &str = "en-US";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageStatus {
    Starting,
    Meta,
    Pages,
    Parsing,
    Parsed,
    Error,
    NoData,
}

impl PageStatus {
    pub const ALL: [PageStatus; 7] = [
        PageStatus::Starting,
        PageStatus::Meta,
        PageStatus::Pages,
        PageStatus::Parsing,
        PageStatus::Parsed,
        PageStatus::Error,
        PageStatus::NoData,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PageStatus::Starting => "STARTING",
            PageStatus::Meta => "META",
            PageStatus::Pages => "PAGES",
            PageStatus::Parsing => "PARSING",
            PageStatus::Parsed => "PARSED",
            PageStatus::Error => "ERROR",
            PageStatus::NoData => "NO_DATA",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == value)
    }
}

#[derive(Debug, Clone)]
pub struct PageRecord {
    pub id: i64,
    pub feature_id: i64,
    pub url: String,
    pub status: PageStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrapeOutcome {
    pub status: PageStatus,
    pub issues: usize,
    pub errors: usize,
}

pub fn open_store(path: &Path) -> Result<Connection> {
    let connection = Connection::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    connection
        .pragma_update(None, "journal_mode", "WAL")
        .context("failed to set journal_mode=WAL")?;
    connection
        .pragma_update(None, "foreign_keys", "ON")
        .context("failed to enable foreign_keys")?;
    ensure_schema(&connection)?;
    Ok(connection)
}

pub fn ensure_schema(connection: &Connection) -> Result<()> {
    connection
        .execute_batch(
            "
            CREATE TABLE IF NOT EXISTS browsers (
              id INTEGER PRIMARY KEY,
              name TEXT NOT NULL,
              slug TEXT NOT NULL UNIQUE
            );

            CREATE TABLE IF NOT EXISTS versions (
              id INTEGER PRIMARY KEY,
              browser_id INTEGER NOT NULL,
              version TEXT NOT NULL,
              FOREIGN KEY(browser_id) REFERENCES browsers(id)
            );

            CREATE TABLE IF NOT EXISTS specifications (
              id INTEGER PRIMARY KEY,
              mdn_key TEXT NOT NULL UNIQUE
            );

            CREATE TABLE IF NOT EXISTS sections (
              id INTEGER PRIMARY KEY,
              specification_id INTEGER NOT NULL,
              subpath TEXT NOT NULL DEFAULT '',
              FOREIGN KEY(specification_id) REFERENCES specifications(id)
            );

            CREATE TABLE IF NOT EXISTS features (
              id INTEGER PRIMARY KEY,
              name TEXT NOT NULL,
              slug TEXT NOT NULL UNIQUE,
              parent_id INTEGER,
              FOREIGN KEY(parent_id) REFERENCES features(id)
            );

            CREATE TABLE IF NOT EXISTS supports (
              id INTEGER PRIMARY KEY,
              version_id INTEGER NOT NULL,
              feature_id INTEGER NOT NULL,
              FOREIGN KEY(version_id) REFERENCES versions(id),
              FOREIGN KEY(feature_id) REFERENCES features(id)
            );

            CREATE TABLE IF NOT EXISTS feature_pages (
              id INTEGER PRIMARY KEY,
              feature_id INTEGER NOT NULL,
              url TEXT NOT NULL,
              status TEXT NOT NULL DEFAULT 'STARTING',
              data TEXT,
              source_sha256 TEXT,
              scraped_at TEXT,
              updated_at TEXT,
              FOREIGN KEY(feature_id) REFERENCES features(id)
            );

            CREATE TABLE IF NOT EXISTS translated_content (
              page_id INTEGER NOT NULL,
              locale TEXT NOT NULL,
              raw TEXT NOT NULL,
              PRIMARY KEY(page_id, locale),
              FOREIGN KEY(page_id) REFERENCES feature_pages(id)
            );

            CREATE TABLE IF NOT EXISTS page_issues (
              id INTEGER PRIMARY KEY AUTOINCREMENT,
              page_id INTEGER NOT NULL,
              kind TEXT NOT NULL,
              span_start INTEGER,
              span_end INTEGER,
              message TEXT NOT NULL,
              html TEXT NOT NULL,
              created_at TEXT NOT NULL,
              FOREIGN KEY(page_id) REFERENCES feature_pages(id)
            );

            CREATE INDEX IF NOT EXISTS idx_page_issues_page ON page_issues(page_id);
            ",
        )
        .context("failed to create store schema")?;
    Ok(())
}

pub fn import_canonical(connection: &mut Connection, canonical: &CanonicalEntities) -> Result<()> {
    let tx = connection
        .transaction()
        .context("failed to start canonical import transaction")?;
    for browser in &canonical.browsers {
        tx.execute(
            "INSERT OR REPLACE INTO browsers (id, name, slug) VALUES (?1, ?2, ?3)",
            params![browser.id, browser.name, browser.slug],
        )
        .with_context(|| format!("failed to import browser {}", browser.id))?;
    }
    for version in &canonical.versions {
        tx.execute(
            "INSERT OR REPLACE INTO versions (id, browser_id, version) VALUES (?1, ?2, ?3)",
            params![version.id, version.browser_id, version.version],
        )
        .with_context(|| format!("failed to import version {}", version.id))?;
    }
    for spec in &canonical.specifications {
        tx.execute(
            "INSERT OR REPLACE INTO specifications (id, mdn_key) VALUES (?1, ?2)",
            params![spec.id, spec.mdn_key],
        )
        .with_context(|| format!("failed to import specification {}", spec.id))?;
    }
    for section in &canonical.sections {
        tx.execute(
            "INSERT OR REPLACE INTO sections (id, specification_id, subpath) VALUES (?1, ?2, ?3)",
            params![section.id, section.specification_id, section.subpath],
        )
        .with_context(|| format!("failed to import section {}", section.id))?;
    }
    for feature in &canonical.features {
        tx.execute(
            "INSERT OR REPLACE INTO features (id, name, slug, parent_id) VALUES (?1, ?2, ?3, ?4)",
            params![feature.id, feature.name, feature.slug, feature.parent_id],
        )
        .with_context(|| format!("failed to import feature {}", feature.id))?;
    }
    for support in &canonical.supports {
        tx.execute(
            "INSERT OR REPLACE INTO supports (id, version_id, feature_id) VALUES (?1, ?2, ?3)",
            params![support.id, support.version_id, support.feature_id],
        )
        .with_context(|| format!("failed to import support {}", support.id))?;
    }
    tx.commit().context("failed to commit canonical import")?;

    info!(
        browsers = canonical.browsers.len(),
        versions = canonical.versions.len(),
        features = canonical.features.len(),
        "imported canonical entities"
    );
    Ok(())
}

pub fn load_canonical(connection: &Connection) -> Result<CanonicalEntities> {
    let mut statement = connection
        .prepare("SELECT id, name, slug FROM browsers ORDER BY id")
        .context("failed to prepare browsers query")?;
    let browsers = statement
        .query_map([], |row| {
            Ok(CanonicalBrowser {
                id: row.get(0)?,
                name: row.get(1)?,
                slug: row.get(2)?,
            })
        })
        .context("failed to query browsers")?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("failed to read browsers rows")?;

    let mut statement = connection
        .prepare("SELECT id, browser_id, version FROM versions ORDER BY id")
        .context("failed to prepare versions query")?;
    let versions = statement
        .query_map([], |row| {
            Ok(CanonicalVersion {
                id: row.get(0)?,
                browser_id: row.get(1)?,
                version: row.get(2)?,
            })
        })
        .context("failed to query versions")?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("failed to read versions rows")?;

    let mut statement = connection
        .prepare("SELECT id, mdn_key FROM specifications ORDER BY id")
        .context("failed to prepare specifications query")?;
    let specifications = statement
        .query_map([], |row| {
            Ok(CanonicalSpecification {
                id: row.get(0)?,
                mdn_key: row.get(1)?,
            })
        })
        .context("failed to query specifications")?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("failed to read specifications rows")?;

    let mut statement = connection
        .prepare("SELECT id, specification_id, subpath FROM sections ORDER BY id")
        .context("failed to prepare sections query")?;
    let sections = statement
        .query_map([], |row| {
            Ok(CanonicalSection {
                id: row.get(0)?,
                specification_id: row.get(1)?,
                subpath: row.get(2)?,
            })
        })
        .context("failed to query sections")?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("failed to read sections rows")?;

    let mut statement = connection
        .prepare("SELECT id, name, slug, parent_id FROM features ORDER BY id")
        .context("failed to prepare features query")?;
    let features = statement
        .query_map([], |row| {
            Ok(CanonicalFeature {
                id: row.get(0)?,
                name: row.get(1)?,
                slug: row.get(2)?,
                parent_id: row.get(3)?,
            })
        })
        .context("failed to query features")?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("failed to read features rows")?;

    let mut statement = connection
        .prepare("SELECT id, version_id, feature_id FROM supports ORDER BY id")
        .context("failed to prepare supports query")?;
    let supports = statement
        .query_map([], |row| {
            Ok(CanonicalSupport {
                id: row.get(0)?,
                version_id: row.get(1)?,
                feature_id: row.get(2)?,
            })
        })
        .context("failed to query supports")?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("failed to read supports rows")?;

    Ok(CanonicalEntities {
        browsers,
        versions,
        specifications,
        sections,
        features,
        supports,
    })
}

pub fn create_page(connection: &Connection, feature_id: i64, url: &str) -> Result<i64> {
    connection.execute(
        "INSERT INTO feature_pages (feature_id, url, status, updated_at) VALUES (?1, ?2, ?3, ?4)",
        params![
            feature_id,
            url,
            PageStatus::Starting.as_str(),
            now_utc_string()
        ],
    )
    .with_context(|| format!("failed to create feature page for {url}"))?;
    Ok(connection.last_insert_rowid())
}

pub fn set_page_status(connection: &Connection, page_id: i64, status: PageStatus) -> Result<()> {
    let updated = connection.execute(
        "UPDATE feature_pages SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![status.as_str(), now_utc_string(), page_id],
    )
    .with_context(|| format!("failed to update status of feature page {page_id}"))?;
    if updated == 0 {
        bail!("feature page {page_id} does not exist");
    }
    Ok(())
}

pub fn save_translation(connection: &Connection, page_id: i64, locale: &str, raw: &str) -> Result<()> {
    connection.execute(
        "INSERT OR REPLACE INTO translated_content (page_id, locale, raw) VALUES (?1, ?2, ?3)",
        params![page_id, locale, raw],
    )
    .with_context(|| format!("failed to save {locale} content for feature page {page_id}"))?;
    Ok(())
}

pub fn load_page(connection: &Connection, page_id: i64) -> Result<PageRecord> {
    let row = connection
        .query_row(
            "SELECT id, feature_id, url, status FROM feature_pages WHERE id = ?1",
            [page_id],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            },
        )
        .optional()
        .with_context(|| format!("failed to load feature page {page_id}"))?;
    let Some((id, feature_id, url, status)) = row else {
        bail!("feature page {page_id} does not exist");
    };
    let Some(status) = PageStatus::parse(&status) else {
        bail!("feature page {page_id} has unknown status '{status}'");
    };

    Ok(PageRecord {
        id,
        feature_id,
        url,
        status,
    })
}

pub fn load_page_result(connection: &Connection, page_id: i64) -> Result<Option<String>> {
    let data = connection
        .query_row(
            "SELECT data FROM feature_pages WHERE id = ?1",
            [page_id],
            |row| row.get::<_, Option<String>>(0),
        )
        .optional()
        .with_context(|| format!("failed to load result of feature page {page_id}"))?
        .flatten();
    Ok(data)
}

fn load_feature_identity(connection: &Connection, feature_id: i64) -> Result<FeatureIdentity> {
    let slug = connection
        .query_row(
            "SELECT slug FROM features WHERE id = ?1",
            [feature_id],
            |row| row.get::<_, String>(0),
        )
        .optional()
        .with_context(|| format!("failed to load feature {feature_id}"))?;
    match slug {
        Some(slug) => Ok(FeatureIdentity {
            id: feature_id,
            slug,
        }),
        None => bail!("feature {feature_id} does not exist"),
    }
}

fn load_translation(connection: &Connection, page_id: i64, locale: &str) -> Result<String> {
    let raw = connection
        .query_row(
            "SELECT raw FROM translated_content WHERE page_id = ?1 AND locale = ?2",
            params![page_id, locale],
            |row| row.get::<_, String>(0),
        )
        .optional()
        .with_context(|| format!("failed to load {locale} content for feature page {page_id}"))?;
    match raw {
        Some(raw) => Ok(raw),
        None => bail!("feature page {page_id} has no {locale} content"),
    }
}

fn has_data(result: &ScrapeResult) -> bool {
    !result.specs.is_empty()
        || !result.compat.is_empty()
        || !result.issues.is_empty()
        || !result.errors.is_empty()
}

pub fn scrape_feature_page(connection: &mut Connection, page_id: i64) -> Result<ScrapeOutcome> {
    let page = load_page(connection, page_id)?;
    if page.status != PageStatus::Parsing {
        bail!(
            "feature page {page_id} is in status {}, expected {}",
            page.status.as_str(),
            PageStatus::Parsing.as_str()
        );
    }

    let raw = load_translation(connection, page_id, SOURCE_LOCALE)?;
    let target = load_feature_identity(connection, page.feature_id)?;
    let canonical = load_canonical(connection)?;

    let result = scrape_page(&raw, &target, &canonical);
    let data = serde_json::to_string(&result)
        .with_context(|| format!("failed to serialize scrape result for page {page_id}"))?;
    let status = if has_data(&result) {
        PageStatus::Parsed
    } else {
        PageStatus::NoData
    };
    let now = now_utc_string();

    let tx = connection
        .transaction()
        .context("failed to start scrape transaction")?;
    tx.execute("DELETE FROM page_issues WHERE page_id = ?1", [page_id])
        .with_context(|| format!("failed to clear issues of feature page {page_id}"))?;
    let records = result
        .issues
        .iter()
        .map(|diagnostic| ("issue", diagnostic))
        .chain(result.errors.iter().map(|diagnostic| ("error", diagnostic)));
    for (kind, diagnostic) in records {
        insert_issue(&tx, page_id, kind, diagnostic, &raw, &now)?;
    }
    tx.execute(
        "
        UPDATE feature_pages
        SET status = ?1, data = ?2, source_sha256 = ?3, scraped_at = ?4, updated_at = ?4
        WHERE id = ?5
        ",
        params![status.as_str(), data, sha256_text(&raw), now, page_id],
    )
    .with_context(|| format!("failed to store result of feature page {page_id}"))?;
    tx.commit()
        .with_context(|| format!("failed to commit scrape of feature page {page_id}"))?;

    info!(
        page_id,
        url = %page.url,
        status = status.as_str(),
        issues = result.issues.len(),
        errors = result.errors.len(),
        "scraped feature page"
    );

    Ok(ScrapeOutcome {
        status,
        issues: result.issues.len(),
        errors: result.errors.len(),
    })
}

fn insert_issue(
    connection: &Connection,
    page_id: i64,
    kind: &str,
    diagnostic: &Diagnostic,
    raw: &str,
    created_at: &str,
) -> Result<()> {
    let (start, end) = match diagnostic.span {
        Some(span) => (Some(span.start as i64), Some(span.end as i64)),
        None => (None, None),
    };
    connection.execute(
        "
        INSERT INTO page_issues (page_id, kind, span_start, span_end, message, html, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        ",
        params![
            page_id,
            kind,
            start,
            end,
            diagnostic.message,
            diagnostic_to_html(raw, diagnostic),
            created_at
        ],
    )
    .with_context(|| format!("failed to insert {kind} for feature page {page_id}"))?;
    Ok(())
}

pub fn page_status_counts(connection: &Connection) -> Result<Vec<(String, i64)>> {
    let mut statement = connection
        .prepare("SELECT status, COUNT(*) FROM feature_pages GROUP BY status ORDER BY status")
        .context("failed to prepare status count query")?;
    let counts = statement
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
        .context("failed to count feature pages by status")?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("failed to read status counts")?;
    Ok(counts)
}

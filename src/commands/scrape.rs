use std::io::Write;

use anyhow::{Context, Result};
use tracing::{info, warn};

use compat_scrape::model::{CanonicalEntities, FeatureIdentity, ScrapeResult};
use compat_scrape::scrape::diagnostics::{diagnostic_to_html, diagnostic_to_text};
use compat_scrape::scrape::{ScrapeOptions, scrape_page_with};
use compat_scrape::util::{read_json, read_text, write_json_pretty, write_text};

use crate::cli::{ReportFormat, ScrapeArgs};

pub fn run(args: ScrapeArgs) -> Result<()> {
    let text = read_text(&args.page)?;
    let canonical: CanonicalEntities = match &args.canonical {
        Some(path) => read_json(path)?,
        None => {
            warn!("no canonical entity snapshot given; every entity will be pending");
            CanonicalEntities::default()
        }
    };
    let target = FeatureIdentity {
        id: args.feature_id,
        slug: args.feature_slug.clone(),
    };
    let options = ScrapeOptions {
        locale: args.locale.clone(),
    };

    let result = scrape_page_with(&text, &target, &canonical, &options);
    info!(
        page = %args.page.display(),
        specs = result.specs.len(),
        tables = result.compat.len(),
        issues = result.issues.len(),
        errors = result.errors.len(),
        "scraped page"
    );

    match &args.output {
        Some(path) => {
            write_json_pretty(path, &result)?;
            info!(path = %path.display(), "wrote scrape result");
        }
        None => {
            let data =
                serde_json::to_string_pretty(&result).context("failed to serialize scrape result")?;
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{data}").context("failed to write scrape result")?;
        }
    }

    if let Some(path) = &args.report {
        write_text(path, &render_report(&text, &result, args.report_format))?;
        info!(path = %path.display(), "wrote diagnostics report");
    }

    Ok(())
}

fn render_report(text: &str, result: &ScrapeResult, format: ReportFormat) -> String {
    let mut out = String::new();
    let groups = [("Issues", &result.issues), ("Errors", &result.errors)];
    for (title, diagnostics) in groups {
        match format {
            ReportFormat::Text => out.push_str(&format!("== {title} ({}) ==\n", diagnostics.len())),
            ReportFormat::Html => out.push_str(&format!("<h2>{title} ({})</h2>\n", diagnostics.len())),
        }
        for diagnostic in diagnostics.iter() {
            match format {
                ReportFormat::Text => {
                    out.push_str(&diagnostic_to_text(text, diagnostic));
                    out.push('\n');
                }
                ReportFormat::Html => {
                    out.push_str(&diagnostic_to_html(text, diagnostic));
                    out.push('\n');
                }
            }
        }
    }
    out
}

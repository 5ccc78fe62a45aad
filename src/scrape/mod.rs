pub mod compat;
pub mod diagnostics;
pub mod grammar;
pub mod mapper;
pub mod reconcile;
pub mod resolver;
pub mod specs;
pub mod tokens;

#[cfg(test)]
mod tests;

use std::collections::HashSet;

use peg::error::ParseError;
use peg::str::LineCol;
use tracing::debug;

use crate::model::{CanonicalEntities, FeatureIdentity, ScrapeResult, Span};
use crate::scrape::diagnostics::{Diagnostics, end_of_line};
use crate::scrape::grammar::{NodeKind, SectionNode, SpecBody, failed_rule, mdn};
use crate::scrape::mapper::FeatureRegistry;
use crate::scrape::reconcile::CanonicalIndex;
use crate::scrape::resolver::MacroKind;

pub const FATAL_PARSE_MESSAGE: &str = "Unable to finish parsing MDN page, starting at this position.";
pub const NO_SECTIONS_MESSAGE: &str = "No <h2> found in page";

#[derive(Debug, Clone)]
pub struct ScrapeOptions {
    pub locale: String,
}

impl Default for ScrapeOptions {
    fn default() -> Self {
        Self {
            locale: "en".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SectionKind {
    Specifications,
    BrowserCompatibility,
}

impl SectionKind {
    fn from_title(title: &str) -> Option<Self> {
        let title = title.to_ascii_lowercase();
        match title.as_str() {
            "specification" | "specifications" => Some(SectionKind::Specifications),
            "browser compatibility" | "browser compatability" => {
                Some(SectionKind::BrowserCompatibility)
            }
            _ => None,
        }
    }

    fn label(self) -> &'static str {
        match self {
            SectionKind::Specifications => "Specifications",
            SectionKind::BrowserCompatibility => "Browser Compatibility",
        }
    }

    fn expected_ids(self) -> &'static [&'static str] {
        match self {
            SectionKind::Specifications => &["Specifications", "Specification"],
            SectionKind::BrowserCompatibility => &["Browser_compatibility"],
        }
    }
}

pub fn scrape_page(
    text: &str,
    target: &FeatureIdentity,
    canonical: &CanonicalEntities,
) -> ScrapeResult {
    scrape_page_with(text, target, canonical, &ScrapeOptions::default())
}

/// Never fails; anything that cannot be interpreted lands in `issues` or `errors`.
pub fn scrape_page_with(
    text: &str,
    target: &FeatureIdentity,
    canonical: &CanonicalEntities,
    options: &ScrapeOptions,
) -> ScrapeResult {
    let index = CanonicalIndex::new(canonical, target);
    let mut scraper = PageScraper {
        text,
        index: &index,
        features: FeatureRegistry::new(&target.slug),
        diagnostics: Diagnostics::default(),
        result: ScrapeResult {
            locale: options.locale.clone(),
            specs: Vec::new(),
            compat: Vec::new(),
            footnotes: None,
            issues: Vec::new(),
            errors: Vec::new(),
        },
    };
    scraper.scrape();
    scraper.finish()
}

struct PageScraper<'t, 'i> {
    text: &'t str,
    index: &'i CanonicalIndex<'i>,
    features: FeatureRegistry,
    diagnostics: Diagnostics,
    result: ScrapeResult,
}

impl PageScraper<'_, '_> {
    fn scrape(&mut self) {
        let page = match mdn::page(self.text, 0) {
            Ok(page) => page,
            Err(err) => {
                self.fatal(err.location.offset);
                return;
            }
        };

        if page.end < self.text.len() {
            self.fatal(page.end);
            return;
        }
        if page.sections.is_empty() {
            self.diagnostics.page_error(NO_SECTIONS_MESSAGE);
            return;
        }

        for section in &page.sections {
            match SectionKind::from_title(&section.title) {
                Some(kind) => {
                    debug!(title = %section.title, "scraping section");
                    self.check_header(kind, section);
                    match kind {
                        SectionKind::Specifications => self.scrape_specs(section),
                        SectionKind::BrowserCompatibility => self.scrape_compat(section),
                    }
                }
                None => debug!(title = %section.title, "skipping section"),
            }
        }
    }

    fn finish(mut self) -> ScrapeResult {
        self.result.issues = self.diagnostics.issues;
        self.result.errors = self.diagnostics.errors;
        self.result
    }

    fn fatal(&mut self, position: usize) {
        debug!(position, "page parse stopped early");
        self.diagnostics.error(
            Span::new(position, end_of_line(self.text, position)),
            FATAL_PARSE_MESSAGE,
        );
    }

    fn check_header(&mut self, kind: SectionKind, section: &SectionNode) {
        let expected = kind.expected_ids();
        for attr in &section.attrs {
            let name = attr.name.to_ascii_lowercase();
            if name != "id" && name != "name" {
                continue;
            }
            if expected
                .iter()
                .any(|candidate| candidate.eq_ignore_ascii_case(&attr.value))
            {
                continue;
            }

            let message = if name == "id" {
                format!(
                    "In {} section, expected <h2 id=\"{}\">, actual id=\"{}\"",
                    kind.label(),
                    expected[0],
                    attr.value
                )
            } else {
                format!(
                    "In {} section, expected <h2 name=\"{}\"> or no name attribute, actual name=\"{}\"",
                    kind.label(),
                    expected[0],
                    attr.value
                )
            };
            self.diagnostics.issue(section.header, message);
        }
    }

    fn section_failure(
        &mut self,
        section: &SectionNode,
        err: &ParseError<LineCol>,
        fallback: &'static str,
    ) {
        let start = section.body.start + err.location.offset;
        let (rule, definition) = failed_rule(err.expected.tokens(), fallback);
        debug!(title = %section.title, rule, position = start, "section not parsed");
        self.diagnostics.rule_error(
            Span::new(start, end_of_line(self.text, start)),
            format!(
                "Section <h2>{}</h2> was not parsed, because rule \"{rule}\" failed to match.  Definition:",
                section.title
            ),
            definition,
        );
    }

    fn scrape_specs(&mut self, section: &SectionNode) {
        let body = &self.text[section.body.start..section.body.end];
        match mdn::spec_section(body, section.body.start) {
            Ok(SpecBody::Table(rows)) => {
                let specs = specs::extract_specs(&rows, self.index, &mut self.diagnostics);
                self.result.specs.extend(specs);
            }
            Ok(SpecBody::WhyNoSpec) => debug!("page has no specification"),
            Err(err) => self.section_failure(section, &err, "spec_section"),
        }
    }

    fn footnote_texts(&mut self, footnotes: &str, offset: usize) -> Vec<(String, Span)> {
        let mut groups: Vec<(Option<String>, Span)> = Vec::new();
        for block in mdn::footnote_blocks(footnotes, offset).unwrap_or_default() {
            if block.id.is_none()
                && let Some((_, span)) = groups.last_mut()
            {
                span.end = block.span.end;
            } else {
                groups.push((block.id, block.span));
            }
        }

        let mut defined = Vec::new();
        for (footnote_id, span) in groups {
            match footnote_id {
                Some(footnote_id) => defined.push((footnote_id, span)),
                None => self.diagnostics.issue(span, "Footnote has no ID"),
            }
        }
        defined
    }

    fn scrape_compat(&mut self, section: &SectionNode) {
        let body = &self.text[section.body.start..section.body.end];
        let node = match mdn::compat_section(body, section.body.start) {
            Ok(node) => node,
            Err(err) => {
                self.section_failure(section, &err, "compat_section");
                return;
            }
        };

        if let NodeKind::Macro { name, args } = &node.kumascript.kind
            && MacroKind::classify(name, args) != MacroKind::CompatibilityTable
        {
            self.diagnostics.issue(
                node.kumascript.span,
                format!("Expected {{{{CompatibilityTable}}}}, actual {{{{{name}}}}}"),
            );
        }

        let mut footnote_refs = Vec::new();
        for div in &node.divs {
            let extraction = compat::extract_table(
                &div.name,
                &div.table,
                self.index,
                &mut self.features,
                &mut self.diagnostics,
            );
            self.result.compat.push(extraction.table);
            footnote_refs.extend(extraction.footnote_refs);
        }

        let defined = self.footnote_texts(&node.footnotes, node.footnotes_start);
        let mut referenced = HashSet::new();
        for (footnote_id, span) in footnote_refs {
            if !referenced.contains(&footnote_id)
                && !defined.iter().any(|(id, _)| *id == footnote_id)
            {
                self.diagnostics
                    .issue(span, format!("Footnote [{footnote_id}] not found"));
            }
            referenced.insert(footnote_id);
        }
        for (footnote_id, span) in &defined {
            if !referenced.contains(footnote_id) {
                self.diagnostics
                    .issue(*span, format!("Footnote [{footnote_id}] is not used"));
            }
        }

        let footnotes = node.footnotes.trim();
        if !footnotes.is_empty() {
            let merged = match self.result.footnotes.take() {
                Some(existing) => format!("{existing}\n{footnotes}"),
                None => footnotes.to_string(),
            };
            self.result.footnotes = Some(merged);
        }
    }
}

use std::collections::{HashMap, HashSet};

use crate::model::{
    BrowserDescriptor, CanonicalBrowser, CanonicalEntities, CanonicalFeature, EntityId,
    FeatureIdentity, Span, VersionDescriptor,
};
use crate::scrape::diagnostics::Diagnostics;
use crate::scrape::tokens::normalize_whitespace;

const BROWSER_NAME_FIXES: &[(&str, &str)] = &[
    ("Firefox (Gecko)", "Firefox"),
    ("Firefox Mobile (Gecko)", "Firefox Mobile"),
    ("Firefox OS (Gecko)", "Firefox OS"),
    ("Safari (WebKit)", "Safari"),
    ("Windows Phone", "IE Mobile"),
    ("IE Phone", "IE Mobile"),
    ("IE", "Internet Explorer"),
];

pub fn fix_browser_name(name: &str) -> &str {
    BROWSER_NAME_FIXES
        .iter()
        .find(|(raw, _)| *raw == name)
        .map_or(name, |(_, fixed)| *fixed)
}

pub fn feature_key(name: &str) -> String {
    name.to_lowercase()
        .replace("<code>", "")
        .replace("</code>", "")
        .replace("&lt;", "")
        .replace("&gt;", "")
}

pub struct CanonicalIndex<'a> {
    browsers: HashMap<&'a str, &'a CanonicalBrowser>,
    versions: HashMap<i64, HashMap<&'a str, i64>>,
    specifications: HashMap<&'a str, i64>,
    sections: HashMap<i64, HashMap<&'a str, i64>>,
    child_features: HashMap<String, &'a CanonicalFeature>,
    feature_slugs: HashSet<&'a str>,
    supports: HashMap<(i64, i64), i64>,
}

impl<'a> CanonicalIndex<'a> {
    pub fn new(canonical: &'a CanonicalEntities, target: &'a FeatureIdentity) -> Self {
        let mut browsers = HashMap::new();
        for browser in &canonical.browsers {
            browsers.entry(browser.name.as_str()).or_insert(browser);
        }

        let mut versions: HashMap<i64, HashMap<&str, i64>> = HashMap::new();
        for version in &canonical.versions {
            versions
                .entry(version.browser_id)
                .or_default()
                .entry(version.version.as_str())
                .or_insert(version.id);
        }

        let mut specifications = HashMap::new();
        for spec in &canonical.specifications {
            specifications.entry(spec.mdn_key.as_str()).or_insert(spec.id);
        }

        let mut sections: HashMap<i64, HashMap<&str, i64>> = HashMap::new();
        for section in &canonical.sections {
            sections
                .entry(section.specification_id)
                .or_default()
                .entry(section.subpath.as_str())
                .or_insert(section.id);
        }

        let mut child_features = HashMap::new();
        for feature in &canonical.features {
            if feature.parent_id == Some(target.id) {
                child_features
                    .entry(feature_key(&feature.name))
                    .or_insert(feature);
            }
        }

        let feature_slugs = canonical
            .features
            .iter()
            .map(|feature| feature.slug.as_str())
            .collect();

        let mut supports = HashMap::new();
        for support in &canonical.supports {
            supports
                .entry((support.version_id, support.feature_id))
                .or_insert(support.id);
        }

        Self {
            browsers,
            versions,
            specifications,
            sections,
            child_features,
            feature_slugs,
            supports,
        }
    }

    pub fn specification_id(&self, mdn_key: &str) -> Option<i64> {
        self.specifications.get(mdn_key).copied()
    }

    pub fn section_id(&self, specification_id: i64, subpath: &str) -> Option<i64> {
        self.sections
            .get(&specification_id)
            .and_then(|subpaths| subpaths.get(subpath))
            .copied()
    }

    pub fn child_feature(&self, key: &str) -> Option<&'a CanonicalFeature> {
        self.child_features.get(key).copied()
    }

    pub fn feature_slug_taken(&self, slug: &str) -> bool {
        self.feature_slugs.contains(slug)
    }

    pub fn browser(
        &self,
        raw_name: &str,
        span: Span,
        diagnostics: &mut Diagnostics,
    ) -> BrowserDescriptor {
        let raw_name = normalize_whitespace(raw_name);
        let name = fix_browser_name(&raw_name);

        match self.browsers.get(name) {
            Some(browser) => BrowserDescriptor {
                id: EntityId::Real(browser.id),
                name: browser.name.clone(),
                slug: browser.slug.clone(),
            },
            None => {
                diagnostics.error(span, format!("Unknown Browser \"{raw_name}\""));
                let id = EntityId::pending(&raw_name);
                BrowserDescriptor {
                    slug: id.to_string(),
                    id,
                    name: name.to_string(),
                }
            }
        }
    }

    pub fn version(&self, browser: &BrowserDescriptor, version: &str) -> VersionDescriptor {
        let id = browser
            .id
            .real()
            .and_then(|browser_id| self.versions.get(&browser_id))
            .and_then(|versions| versions.get(version).copied())
            .map_or_else(
                || EntityId::pending(format!("{}-{}", browser.name, version)),
                EntityId::Real,
            );

        VersionDescriptor {
            id,
            browser: browser.id.clone(),
            version: version.to_string(),
        }
    }

    pub fn support_id(&self, feature: &EntityId, version: &EntityId) -> EntityId {
        let existing = match (feature, version) {
            (EntityId::Real(feature_id), EntityId::Real(version_id)) => {
                self.supports.get(&(*version_id, *feature_id)).copied()
            }
            _ => None,
        };
        existing.map_or_else(
            || EntityId::pending(format!("{feature}-{version}")),
            EntityId::Real,
        )
    }
}

pub fn unknown_version_message(browser: &BrowserDescriptor, version: &str) -> String {
    format!(
        "Unknown version \"{version}\" for browser \"{}\" (id {}, slug \"{}\")",
        browser.name, browser.id, browser.slug
    )
}

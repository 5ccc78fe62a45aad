use std::collections::{HashMap, HashSet};

use crate::model::{EntityId, FeatureDescriptor};
use crate::scrape::diagnostics::Diagnostics;
use crate::scrape::reconcile::{CanonicalIndex, feature_key};
use crate::scrape::resolver::{MacroKind, unknown_macro_message};
use crate::scrape::tokens::{Token, join_content};

pub const SLUG_MAX_LEN: usize = 50;

pub fn slugify(text: &str, max_len: usize, suffix: Option<usize>) -> String {
    let mut slug = String::with_capacity(text.len());
    for ch in text.to_lowercase().chars() {
        let ch = match ch {
            'a'..='z' | '0'..='9' | '-' | '_' => ch,
            _ => '_',
        };
        if ch == '_' && slug.ends_with('_') {
            continue;
        }
        slug.push(ch);
    }

    let suffix = suffix.map(|n| n.to_string()).unwrap_or_default();
    slug.truncate(max_len.saturating_sub(suffix.len()));
    slug.push_str(&suffix);
    slug
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureCell {
    pub name: String,
    pub canonical: bool,
    pub experimental: bool,
}

enum Bit {
    Text(String),
    Code(String),
    Markup(String),
}

pub fn map_feature_cell(
    tokens: impl IntoIterator<Item = Token>,
    diagnostics: &mut Diagnostics,
) -> FeatureCell {
    let mut bits = Vec::new();
    let mut experimental = false;
    for token in tokens {
        collect_bits(token, &mut bits, &mut experimental, diagnostics);
    }

    if let [Bit::Code(code)] = bits.as_slice() {
        return FeatureCell {
            name: code.clone(),
            canonical: true,
            experimental,
        };
    }

    let mut name = String::new();
    for bit in &bits {
        match bit {
            Bit::Text(text) | Bit::Markup(text) => join_content(&mut name, text),
            Bit::Code(code) => join_content(&mut name, &format!("<code>{code}</code>")),
        }
    }
    FeatureCell {
        name,
        canonical: false,
        experimental,
    }
}

fn collect_bits(
    token: Token,
    bits: &mut Vec<Bit>,
    experimental: &mut bool,
    diagnostics: &mut Diagnostics,
) {
    match token {
        Token::Text { content, .. } => bits.push(Bit::Text(content)),
        Token::CodeBlock { content, .. } => bits.push(Bit::Code(content)),
        Token::Break { .. } => {}
        Token::Paragraph { children, .. } => {
            for child in children {
                collect_bits(child, bits, experimental, diagnostics);
            }
        }
        Token::Macro { name, args, span } => match MacroKind::classify(&name, &args) {
            MacroKind::ExperimentalInline => *experimental = true,
            MacroKind::CrossReference(html) => bits.push(Bit::Markup(html)),
            _ => diagnostics.error(span, unknown_macro_message(&name, &args)),
        },
    }
}

pub struct FeatureRegistry {
    target_slug: String,
    by_key: HashMap<String, Vec<FeatureDescriptor>>,
    issued_ids: HashSet<EntityId>,
    issued_slugs: HashSet<String>,
}

impl FeatureRegistry {
    pub fn new(target_slug: &str) -> Self {
        Self {
            target_slug: target_slug.to_string(),
            by_key: HashMap::new(),
            issued_ids: HashSet::new(),
            issued_slugs: HashSet::new(),
        }
    }

    pub fn descriptor(
        &mut self,
        cell: &FeatureCell,
        occurrence: usize,
        index: &CanonicalIndex<'_>,
    ) -> FeatureDescriptor {
        let key = feature_key(&cell.name);
        if let Some(existing) = self.by_key.get(&key).and_then(|known| known.get(occurrence)) {
            return existing.clone();
        }

        let canonical = if occurrence == 0 {
            index.child_feature(&key)
        } else {
            None
        };
        let (id, slug) = match canonical {
            Some(feature) => (EntityId::Real(feature.id), feature.slug.clone()),
            None => (
                self.unique_pending_id(&key, occurrence),
                self.unique_slug(&key, index),
            ),
        };
        self.issued_ids.insert(id.clone());
        self.issued_slugs.insert(slug.clone());

        let descriptor = FeatureDescriptor {
            id,
            name: cell.name.clone(),
            slug,
            canonical: cell.canonical,
            experimental: cell.experimental,
        };
        self.by_key
            .entry(key)
            .or_default()
            .push(descriptor.clone());
        descriptor
    }

    fn unique_pending_id(&self, key: &str, occurrence: usize) -> EntityId {
        let mut suffix = occurrence;
        loop {
            let id = if suffix == 0 {
                EntityId::pending(key)
            } else {
                EntityId::pending(format!("{key}{suffix}"))
            };
            if !self.issued_ids.contains(&id) {
                return id;
            }
            suffix += 1;
        }
    }

    fn unique_slug(&self, key: &str, index: &CanonicalIndex<'_>) -> String {
        let base = format!("{}_{}", self.target_slug, key);
        let mut attempt = 0;
        loop {
            let slug = slugify(&base, SLUG_MAX_LEN, (attempt > 0).then_some(attempt));
            if !index.feature_slug_taken(&slug) && !self.issued_slugs.contains(&slug) {
                return slug;
            }
            attempt += 1;
        }
    }
}

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityId {
    Real(i64),
    Pending(String),
}

impl EntityId {
    pub fn pending(key: impl fmt::Display) -> Self {
        EntityId::Pending(format!("_{key}"))
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, EntityId::Pending(_))
    }

    pub fn real(&self) -> Option<i64> {
        match self {
            EntityId::Real(id) => Some(*id),
            EntityId::Pending(_) => None,
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityId::Real(id) => write!(f, "{id}"),
            EntityId::Pending(key) => f.write_str(key),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    #[serde(flatten)]
    pub span: Option<Span>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureIdentity {
    pub id: i64,
    pub slug: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalBrowser {
    pub id: i64,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalVersion {
    pub id: i64,
    pub browser_id: i64,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalSpecification {
    pub id: i64,
    pub mdn_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalSection {
    pub id: i64,
    pub specification_id: i64,
    pub subpath: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalFeature {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub parent_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalSupport {
    pub id: i64,
    pub version_id: i64,
    pub feature_id: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CanonicalEntities {
    pub browsers: Vec<CanonicalBrowser>,
    pub versions: Vec<CanonicalVersion>,
    pub specifications: Vec<CanonicalSpecification>,
    pub sections: Vec<CanonicalSection>,
    pub features: Vec<CanonicalFeature>,
    pub supports: Vec<CanonicalSupport>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BrowserDescriptor {
    pub id: EntityId,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeatureDescriptor {
    pub id: EntityId,
    pub name: String,
    pub slug: String,
    pub canonical: bool,
    pub experimental: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionDescriptor {
    pub id: EntityId,
    pub browser: EntityId,
    pub version: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SupportLevel {
    Yes,
    No,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SupportDescriptor {
    pub id: EntityId,
    pub feature: EntityId,
    pub version: EntityId,
    pub support: SupportLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footnote_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpecificationRef {
    pub mdn_key: String,
    pub id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionRef {
    pub subpath: String,
    pub name: String,
    pub note: String,
    pub id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpecRef {
    pub specification: SpecificationRef,
    pub section: SectionRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompatTable {
    pub name: String,
    pub browsers: Vec<BrowserDescriptor>,
    pub features: Vec<FeatureDescriptor>,
    pub versions: Vec<VersionDescriptor>,
    pub supports: Vec<SupportDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScrapeResult {
    pub locale: String,
    pub specs: Vec<SpecRef>,
    pub compat: Vec<CompatTable>,
    pub footnotes: Option<String>,
    pub issues: Vec<Diagnostic>,
    pub errors: Vec<Diagnostic>,
}

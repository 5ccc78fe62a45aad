use crate::model::{Span, SupportLevel};
use crate::scrape::diagnostics::Diagnostics;
use crate::scrape::grammar::mdn;
use crate::scrape::tokens::Token;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MacroKind {
    CompatNo,
    CompatVersionUnknown,
    CompatUnknown,
    CompatGeckoDesktop(String),
    CompatGeckoMobile(String),
    CompatGeckoFxOs {
        gecko: String,
        override_version: Option<String>,
    },
    CompatVersion(String),
    PropertyPrefix(String),
    ExperimentalInline,
    CompatibilityTable,
    SpecName {
        key: String,
        subpath: String,
        name: String,
    },
    Spec2(String),
    CrossReference(String),
    Unknown {
        name: String,
        args: Vec<String>,
    },
}

impl MacroKind {
    pub fn classify(name: &str, args: &[String]) -> Self {
        let arg = |idx: usize| args.get(idx).map(|raw| unquote(raw).to_string());
        let lowered = name.to_ascii_lowercase();

        match (lowered.as_str(), arg(0)) {
            ("compatno", _) => MacroKind::CompatNo,
            ("compatversionunknown", _) => MacroKind::CompatVersionUnknown,
            ("compatunknown", _) => MacroKind::CompatUnknown,
            ("compatgeckodesktop", Some(gecko)) => MacroKind::CompatGeckoDesktop(gecko),
            ("compatgeckomobile", Some(gecko)) => MacroKind::CompatGeckoMobile(gecko),
            ("compatgeckofxos", Some(gecko)) => MacroKind::CompatGeckoFxOs {
                gecko,
                override_version: arg(1),
            },
            (
                "compatandroid" | "compatchrome" | "compatie" | "compatopera" | "compatoperamobile"
                | "compatsafari",
                Some(version),
            ) => MacroKind::CompatVersion(version),
            ("property_prefix", Some(prefix)) => MacroKind::PropertyPrefix(prefix),
            ("experimental_inline", _) => MacroKind::ExperimentalInline,
            ("compatibilitytable", _) => MacroKind::CompatibilityTable,
            ("specname", Some(key)) => MacroKind::SpecName {
                key,
                subpath: arg(1).unwrap_or_default(),
                name: arg(2).unwrap_or_default(),
            },
            ("spec2", Some(key)) => MacroKind::Spec2(key),
            ("cssxref" | "domxref" | "jsxref", Some(_)) if args.len() < 3 => {
                let content = arg(args.len() - 1).unwrap_or_default();
                MacroKind::CrossReference(format!("<code>{content}</code>"))
            }
            ("htmlelement", Some(element)) => {
                let html = if element.contains(' ') {
                    format!("<code>{element}</code>")
                } else {
                    format!("<code>&lt;{element}&gt;</code>")
                };
                MacroKind::CrossReference(html)
            }
            (
                "xref_csslength" | "xref_csspercentage" | "xref_cssstring" | "xref_cssimage",
                None,
            ) => MacroKind::CrossReference(format!(
                "<code>&lt;{}&gt;</code>",
                &lowered["xref_css".len()..]
            )),
            ("xref_csscolorvalue", None) => {
                MacroKind::CrossReference("<code>&lt;color&gt;</code>".to_string())
            }
            ("xref_cssvisual", None) => MacroKind::CrossReference("<code>visual</code>".to_string()),
            _ => MacroKind::Unknown {
                name: name.to_string(),
                args: args.to_vec(),
            },
        }
    }
}

pub fn unknown_macro_message(name: &str, args: &[String]) -> String {
    if args.is_empty() {
        format!("Unknown kuma function {name}")
    } else {
        format!("Unknown kuma function {name}({})", args.join(", "))
    }
}

pub fn unquote(raw: &str) -> &str {
    for quote in ['"', '\''] {
        if raw.len() >= 2 && raw.starts_with(quote) && raw.ends_with(quote) {
            return &raw[1..raw.len() - 1];
        }
    }
    raw
}

pub fn normalize_version(version: &str) -> String {
    if version.is_empty() || version.contains('.') {
        version.to_string()
    } else {
        format!("{version}.0")
    }
}

const GECKO_DESKTOP: &[(&str, &str)] = &[
    ("1", "1.0"),
    ("1.0", "1.0"),
    ("1.7 or earlier", "1.0"),
    ("1.7", "1.0"),
    ("1.8", "1.5"),
    ("1.8.1", "2.0"),
    ("1.9", "3.0"),
    ("1.9.1", "3.5"),
    ("1.9.1.4", "3.5.4"),
    ("1.9.2", "3.6"),
    ("1.9.2.4", "3.6.4"),
    ("1.9.2.5", "3.6.5"),
    ("1.9.2.9", "3.6.9"),
    ("2", "4.0"),
    ("2.0", "4.0"),
];

// (first gecko, end gecko, accepted overrides, release)
const GECKO_FXOS: &[(f64, f64, &[&str], &str)] = &[
    (0.0, 19.0, &["", "1.0"], "1.0"),
    (0.0, 21.0, &["1.0.1"], "1.0.1"),
    (0.0, 24.0, &["1.1", "1.1.0", "1.1.1"], "1.1"),
    (19.0, 27.0, &["", "1.2"], "1.2"),
    (27.0, 29.0, &["", "1.3"], "1.3"),
    (29.0, 31.0, &["", "1.4"], "1.4"),
    (31.0, 33.0, &["", "2.0"], "2.0"),
    (33.0, 35.0, &["", "2.1"], "2.1"),
    (35.0, 38.0, &["", "2.2"], "2.2"),
];

pub fn gecko_desktop_version(gecko: &str) -> Option<String> {
    if let Some((_, firefox)) = GECKO_DESKTOP.iter().find(|(key, _)| *key == gecko) {
        return Some((*firefox).to_string());
    }
    match gecko.parse::<f64>() {
        Ok(number) if number >= 5.0 => Some(format!("{number:?}")),
        _ => None,
    }
}

pub fn gecko_mobile_version(gecko: &str) -> Option<String> {
    let major = gecko.split('.').next().unwrap_or_default();
    match major.parse::<u32>() {
        Ok(1) => Some("1.0".to_string()),
        Ok(2) => Some("4.0".to_string()),
        Ok(number) if number >= 4 => Some(format!("{number}.0")),
        _ => None,
    }
}

pub fn gecko_fxos_version(gecko: &str, override_version: Option<&str>) -> Result<String, String> {
    let number = gecko.parse::<f64>().unwrap_or(-1.0);
    let override_version = override_version.unwrap_or_default();

    let release = GECKO_FXOS.iter().find(|(first, end, overrides, _)| {
        number >= *first && number < *end && overrides.contains(&override_version)
    });
    match release {
        Some((_, _, _, release)) => Ok((*release).to_string()),
        None if !(0.0..38.0).contains(&number) => Err(format!("Unknown Gecko version \"{gecko}\"")),
        None => Err(format!(
            "Override \"{override_version}\" is invalid for Gecko \"{gecko}\""
        )),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSupport {
    pub version: String,
    pub support: SupportLevel,
    pub prefix: Option<String>,
    pub footnote: Option<(String, Span)>,
    pub span: Span,
}

pub fn resolve_support(
    tokens: impl IntoIterator<Item = Token>,
    diagnostics: &mut Diagnostics,
) -> Vec<RawSupport> {
    let mut resolver = SupportResolver::default();
    for token in tokens {
        resolver.visit(&token, false, diagnostics);
    }
    resolver.end_segment(diagnostics);
    resolver.entries
}

#[derive(Default)]
struct SupportResolver {
    entries: Vec<RawSupport>,
    current: Option<RawSupport>,
    prefix: Option<String>,
    footnote: Option<(String, Span)>,
}

impl SupportResolver {
    fn visit(&mut self, token: &Token, in_paragraph: bool, diagnostics: &mut Diagnostics) {
        match token {
            Token::Text { content, span } => self.visit_text(content, *span, diagnostics),
            Token::CodeBlock { content, span } => diagnostics.error(
                *span,
                format!("Unknown support text \"<code>{content}</code>\""),
            ),
            Token::Break { .. } => self.end_segment(diagnostics),
            Token::Paragraph {
                children,
                open_end,
                span,
            } => {
                if in_paragraph {
                    diagnostics.error(
                        Span::new(span.start, *open_end),
                        "Nested <p> tags not supported",
                    );
                    return;
                }
                self.end_segment(diagnostics);
                for child in children {
                    self.visit(child, true, diagnostics);
                }
                self.end_segment(diagnostics);
            }
            Token::Macro { name, args, span } => {
                self.visit_macro(name, args, *span, diagnostics);
            }
        }
    }

    fn visit_text(&mut self, content: &str, span: Span, diagnostics: &mut Diagnostics) {
        if let Ok((version, _engine)) = mdn::cell_version(content, 0) {
            self.push_version(normalize_version(&version), SupportLevel::Yes, span, diagnostics);
        } else if let Ok(footnote_id) = mdn::footnote_id(content, 0) {
            self.attach_footnote(footnote_id, span, diagnostics);
        } else {
            diagnostics.error(span, format!("Unknown support text \"{content}\""));
        }
    }

    fn visit_macro(
        &mut self,
        name: &str,
        args: &[String],
        span: Span,
        diagnostics: &mut Diagnostics,
    ) {
        match MacroKind::classify(name, args) {
            MacroKind::CompatNo => {
                self.push_version(String::new(), SupportLevel::No, span, diagnostics);
            }
            MacroKind::CompatVersionUnknown => {
                self.push_version(String::new(), SupportLevel::Yes, span, diagnostics);
            }
            MacroKind::CompatUnknown | MacroKind::ExperimentalInline => {}
            MacroKind::CompatGeckoDesktop(gecko) => match gecko_desktop_version(&gecko) {
                Some(version) => self.push_version(version, SupportLevel::Yes, span, diagnostics),
                None => diagnostics.error(span, format!("Unknown Gecko version \"{gecko}\"")),
            },
            MacroKind::CompatGeckoMobile(gecko) => match gecko_mobile_version(&gecko) {
                Some(version) => self.push_version(version, SupportLevel::Yes, span, diagnostics),
                None => diagnostics.error(span, format!("Unknown Gecko version \"{gecko}\"")),
            },
            MacroKind::CompatGeckoFxOs {
                gecko,
                override_version,
            } => match gecko_fxos_version(&gecko, override_version.as_deref()) {
                Ok(version) => self.push_version(version, SupportLevel::Yes, span, diagnostics),
                Err(message) => diagnostics.error(span, message),
            },
            MacroKind::CompatVersion(version) => {
                self.push_version(
                    normalize_version(&version),
                    SupportLevel::Yes,
                    span,
                    diagnostics,
                );
            }
            MacroKind::PropertyPrefix(prefix) => match self.current.as_mut() {
                Some(current) => current.prefix = Some(prefix),
                None => self.prefix = Some(prefix),
            },
            MacroKind::CompatibilityTable
            | MacroKind::SpecName { .. }
            | MacroKind::Spec2(_)
            | MacroKind::CrossReference(_)
            | MacroKind::Unknown { .. } => {
                diagnostics.error(span, unknown_macro_message(name, args));
            }
        }
    }

    fn push_version(
        &mut self,
        version: String,
        support: SupportLevel,
        span: Span,
        diagnostics: &mut Diagnostics,
    ) {
        if let Some(current) = &self.current {
            diagnostics.error(
                span,
                format!(
                    "Unexpected version \"{version}\" after \"{}\"",
                    current.version
                ),
            );
            return;
        }
        self.current = Some(RawSupport {
            version,
            support,
            prefix: self.prefix.take(),
            footnote: self.footnote.take(),
            span,
        });
    }

    fn attach_footnote(&mut self, footnote_id: String, span: Span, diagnostics: &mut Diagnostics) {
        let slot = match self.current.as_mut() {
            Some(current) => &mut current.footnote,
            None => &mut self.footnote,
        };
        set_footnote(slot, footnote_id, span, diagnostics);
    }

    fn end_segment(&mut self, diagnostics: &mut Diagnostics) {
        if let Some(current) = self.current.take() {
            self.entries.push(current);
            return;
        }

        let Some(last) = self.entries.last_mut() else {
            return;
        };
        if let Some(prefix) = self.prefix.take() {
            last.prefix = Some(prefix);
        }
        if let Some((footnote_id, span)) = self.footnote.take() {
            set_footnote(&mut last.footnote, footnote_id, span, diagnostics);
        }
    }
}

fn set_footnote(
    slot: &mut Option<(String, Span)>,
    footnote_id: String,
    span: Span,
    diagnostics: &mut Diagnostics,
) {
    match slot {
        Some((existing, _)) => diagnostics.issue(
            span,
            format!("Footnote [{footnote_id}] ignored, entry already has footnote [{existing}]"),
        ),
        None => *slot = Some((footnote_id, span)),
    }
}

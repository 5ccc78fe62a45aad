use crate::model::{SectionRef, SpecRef, SpecificationRef};
use crate::scrape::diagnostics::Diagnostics;
use crate::scrape::grammar::SpecRowNode;
use crate::scrape::reconcile::CanonicalIndex;
use crate::scrape::resolver::{MacroKind, unknown_macro_message};
use crate::scrape::tokens::{Token, join_content, tokens};

pub fn extract_specs(
    rows: &[SpecRowNode],
    index: &CanonicalIndex<'_>,
    diagnostics: &mut Diagnostics,
) -> Vec<SpecRef> {
    rows.iter()
        .filter_map(|row| extract_spec_row(row, index, diagnostics))
        .collect()
}

fn extract_spec_row(
    row: &SpecRowNode,
    index: &CanonicalIndex<'_>,
    diagnostics: &mut Diagnostics,
) -> Option<SpecRef> {
    let spec_name = tokens(&row.name.children).find_map(|token| match token {
        Token::Macro { name, args, .. } => match MacroKind::classify(&name, &args) {
            MacroKind::SpecName { key, subpath, name } => Some((key, subpath, name)),
            _ => None,
        },
        _ => None,
    });
    let Some((key, subpath, name)) = spec_name else {
        diagnostics.error(
            row.name.span,
            "Expected {{SpecName}} in specification name cell",
        );
        return None;
    };

    let spec2 = tokens(&row.status.children).find_map(|token| match token {
        Token::Macro { name, args, .. } => match MacroKind::classify(&name, &args) {
            MacroKind::Spec2(status_key) => Some(status_key),
            _ => None,
        },
        _ => None,
    });
    if let Some(status_key) = spec2
        && status_key != key
    {
        diagnostics.issue(
            row.status.span,
            format!("SpecName key \"{key}\" does not match Spec2 key \"{status_key}\""),
        );
    }

    let specification_id = index.specification_id(&key);
    if specification_id.is_none() {
        diagnostics.error(row.name.span, format!("Unknown Specification \"{key}\""));
    }
    let section_id = specification_id.and_then(|id| index.section_id(id, &subpath));

    let mut note = String::new();
    for token in tokens(&row.note.children) {
        render_note(token, &mut note, diagnostics);
    }

    Some(SpecRef {
        specification: SpecificationRef {
            mdn_key: key,
            id: specification_id,
        },
        section: SectionRef {
            subpath,
            name,
            note,
            id: section_id,
        },
    })
}

fn render_note(token: Token, out: &mut String, diagnostics: &mut Diagnostics) {
    match token {
        Token::Text { content, .. } => join_content(out, &content),
        Token::CodeBlock { content, .. } => join_content(out, &format!("<code>{content}</code>")),
        Token::Break { .. } => out.push_str("<br>"),
        Token::Paragraph { children, .. } => {
            for child in children {
                render_note(child, out, diagnostics);
            }
        }
        Token::Macro { name, args, span } => match MacroKind::classify(&name, &args) {
            MacroKind::CrossReference(html) => join_content(out, &html),
            MacroKind::SpecName { key, .. } => join_content(out, &format!("specification {key}")),
            _ => diagnostics.error(span, unknown_macro_message(&name, &args)),
        },
    }
}

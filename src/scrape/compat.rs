use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::model::{
    BrowserDescriptor, CompatTable, EntityId, FeatureDescriptor, Span, SupportDescriptor,
    VersionDescriptor,
};
use crate::scrape::diagnostics::Diagnostics;
use crate::scrape::grammar::{Attr, CellNode, HeaderCellNode, TableNode};
use crate::scrape::mapper::{FeatureRegistry, map_feature_cell};
use crate::scrape::reconcile::{CanonicalIndex, feature_key, unknown_version_message};
use crate::scrape::resolver::resolve_support;
use crate::scrape::tokens::tokens;

struct Registry<T> {
    items: Vec<T>,
    seen: HashSet<EntityId>,
}

impl<T> Registry<T> {
    fn new() -> Self {
        Self {
            items: Vec::new(),
            seen: HashSet::new(),
        }
    }

    fn insert(&mut self, id: &EntityId, item: T) -> bool {
        if !self.seen.insert(id.clone()) {
            return false;
        }
        self.items.push(item);
        true
    }
}

pub const MAX_CELL_SPAN: usize = 100;

struct HeaderColumn {
    browser: BrowserDescriptor,
    span: usize,
}

fn browser_at(columns: &[HeaderColumn], column: usize) -> Option<&BrowserDescriptor> {
    let mut first = 0;
    for header in columns {
        if column < first + header.span {
            return Some(&header.browser);
        }
        first += header.span;
    }
    None
}

struct PlacedCell<'n> {
    cell: &'n CellNode,
    row: usize,
    column: usize,
    rowspan: usize,
    colspan: usize,
}

pub struct TableExtraction {
    pub table: CompatTable,
    pub footnote_refs: Vec<(String, Span)>,
}

pub fn extract_table(
    name: &str,
    node: &TableNode,
    index: &CanonicalIndex<'_>,
    features: &mut FeatureRegistry,
    diagnostics: &mut Diagnostics,
) -> TableExtraction {
    let mut browsers = Registry::new();
    let columns = header_columns(&node.headers, index, diagnostics);
    for header in &columns {
        browsers.insert(&header.browser.id, header.browser.clone());
    }

    let width = columns.iter().map(|header| header.span).sum::<usize>() + 1;
    let placed = place_cells(node, width, diagnostics);

    let mut row_features: Vec<Option<FeatureDescriptor>> = vec![None; node.rows.len()];
    let mut feature_list = Registry::new();
    let mut occurrences: HashMap<String, usize> = HashMap::new();
    for placed_cell in placed.iter().filter(|placed_cell| placed_cell.column == 0) {
        let cell = map_feature_cell(tokens(&placed_cell.cell.children), diagnostics);
        let occurrence = occurrences.entry(feature_key(&cell.name)).or_insert(0);
        let feature = features.descriptor(&cell, *occurrence, index);
        *occurrence += 1;

        feature_list.insert(&feature.id, feature.clone());
        let last_row = (placed_cell.row + placed_cell.rowspan).min(node.rows.len());
        for slot in &mut row_features[placed_cell.row..last_row] {
            *slot = Some(feature.clone());
        }
    }

    let mut versions: Registry<VersionDescriptor> = Registry::new();
    let mut supports: Registry<SupportDescriptor> = Registry::new();
    let mut footnote_refs = Vec::new();
    for placed_cell in placed.iter().filter(|placed_cell| placed_cell.column > 0) {
        let entries = resolve_support(tokens(&placed_cell.cell.children), diagnostics);
        let last_row = (placed_cell.row + placed_cell.rowspan).min(node.rows.len());
        let last_column = (placed_cell.column + placed_cell.colspan).min(width);

        for feature in row_features[placed_cell.row..last_row].iter().flatten() {
            let cell_browsers = (placed_cell.column - 1..last_column - 1)
                .filter_map(|column| browser_at(&columns, column));
            for browser in cell_browsers {
                for entry in &entries {
                    let version = index.version(browser, &entry.version);
                    let unknown = version.id.is_pending() && !browser.id.is_pending();
                    let version_id = version.id.clone();
                    if versions.insert(&version_id, version) && unknown {
                        diagnostics.error(entry.span, unknown_version_message(browser, &entry.version));
                    }

                    let support = SupportDescriptor {
                        id: index.support_id(&feature.id, &version_id),
                        feature: feature.id.clone(),
                        version: version_id,
                        support: entry.support,
                        prefix: entry.prefix.clone(),
                        footnote_id: entry.footnote.as_ref().map(|(id, _)| id.clone()),
                    };
                    let support_id = support.id.clone();
                    if supports.insert(&support_id, support)
                        && let Some(footnote) = &entry.footnote
                    {
                        footnote_refs.push(footnote.clone());
                    }
                }
            }
        }
    }

    debug!(
        table = name,
        browsers = browsers.items.len(),
        features = feature_list.items.len(),
        supports = supports.items.len(),
        "extracted compatibility table"
    );

    TableExtraction {
        table: CompatTable {
            name: name.to_string(),
            browsers: browsers.items,
            features: feature_list.items,
            versions: versions.items,
            supports: supports.items,
        },
        footnote_refs,
    }
}

fn header_columns(
    headers: &[HeaderCellNode],
    index: &CanonicalIndex<'_>,
    diagnostics: &mut Diagnostics,
) -> Vec<HeaderColumn> {
    let Some((first, rest)) = headers.split_first() else {
        return Vec::new();
    };
    if first.text != "Feature" {
        diagnostics.issue(
            first.text_span,
            format!("Expected first header \"Feature\", actual \"{}\"", first.text),
        );
    }
    check_attrs(&first.attrs, "th", &["colspan"], diagnostics);

    let mut columns = Vec::new();
    for header in rest {
        let spans = check_attrs(&header.attrs, "th", &["colspan"], diagnostics);
        columns.push(HeaderColumn {
            browser: index.browser(&header.text, header.text_span, diagnostics),
            span: spans.colspan,
        });
    }
    columns
}

fn place_cells<'n>(
    node: &'n TableNode,
    width: usize,
    diagnostics: &mut Diagnostics,
) -> Vec<PlacedCell<'n>> {
    let row_count = node.rows.len();
    let mut occupied = vec![vec![false; width]; row_count];
    let mut placed = Vec::new();

    for (row, row_node) in node.rows.iter().enumerate() {
        for cell in &row_node.cells {
            let spans = check_attrs(&cell.attrs, "td", &["rowspan", "colspan"], diagnostics);
            let Some(column) = occupied[row].iter().position(|taken| !taken) else {
                diagnostics.issue(cell.span, "Extra cell in row, no column left");
                continue;
            };

            let last_row = (row + spans.rowspan).min(row_count);
            let last_column = (column + spans.colspan).min(width);
            for taken_row in &mut occupied[row..last_row] {
                for taken in &mut taken_row[column..last_column] {
                    *taken = true;
                }
            }
            placed.push(PlacedCell {
                cell,
                row,
                column,
                rowspan: spans.rowspan,
                colspan: spans.colspan,
            });
        }
    }
    placed
}

struct CellSpans {
    rowspan: usize,
    colspan: usize,
}

fn check_attrs(
    attrs: &[Attr],
    tag: &str,
    allowed: &[&str],
    diagnostics: &mut Diagnostics,
) -> CellSpans {
    let mut spans = CellSpans {
        rowspan: 1,
        colspan: 1,
    };
    for attr in attrs {
        let name = attr.name.to_ascii_lowercase();
        if !allowed.contains(&name.as_str()) {
            diagnostics.issue(
                attr.span,
                format!(
                    "Unexpected attribute {}=\"{}\" on <{tag}>, expected {}",
                    attr.name,
                    attr.value,
                    allowed.join(" or ")
                ),
            );
            continue;
        }

        match attr.value.trim().parse::<usize>() {
            Ok(value) if value > MAX_CELL_SPAN => diagnostics.issue(
                attr.span,
                format!(
                    "Invalid {}=\"{}\" on <{tag}>, expected at most {MAX_CELL_SPAN}",
                    attr.name, attr.value
                ),
            ),
            Ok(value) if value >= 1 => {
                if name == "rowspan" {
                    spans.rowspan = value;
                } else {
                    spans.colspan = value;
                }
            }
            _ => diagnostics.issue(
                attr.span,
                format!(
                    "Invalid {}=\"{}\" on <{tag}>, expected a positive integer",
                    attr.name, attr.value
                ),
            ),
        }
    }
    spans
}

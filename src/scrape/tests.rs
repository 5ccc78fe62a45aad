use super::*;

use crate::model::{
    CanonicalBrowser, CanonicalFeature, CanonicalSection, CanonicalSpecification,
    CanonicalSupport, CanonicalVersion, EntityId, SupportLevel,
};
use crate::scrape::diagnostics::range_error_to_html;
use crate::scrape::mapper::{map_feature_cell, slugify};
use crate::scrape::resolver::{RawSupport, gecko_fxos_version, gecko_mobile_version, resolve_support};
use crate::scrape::tokens::{Token, tokens};

const BACKGROUND_SIZE_PAGE: &str = r#"<p>The <code>background-size</code> property.</p>
<h2 id="Specifications" name="Specifications">Specifications</h2>
<table class="standard-table">
 <thead>
  <tr>
   <th scope="col">Specification</th>
   <th scope="col">Status</th>
   <th scope="col">Comment</th>
  </tr>
 </thead>
 <tbody>
  <tr>
   <td>{{SpecName('CSS3 Backgrounds', '#the-background-size', 'background-size')}}</td>
   <td>{{Spec2('CSS3 Backgrounds')}}</td>
   <td>Initial definition.</td>
  </tr>
 </tbody>
</table>
<h2 id="Browser_compatibility" name="Browser_compatibility">Browser compatibility</h2>
<div>{{CompatibilityTable}}</div>
<div id="compat-desktop">
<table class="compat-table">
 <tbody>
  <tr>
   <th>Feature</th>
   <th>Chrome</th>
   <th>Firefox (Gecko)</th>
  </tr>
  <tr>
   <td>Basic support</td>
   <td>1.0 {{property_prefix("-webkit")}}<br>
       3.0</td>
   <td>{{CompatGeckoDesktop("1.9.2")}} [1]</td>
  </tr>
  <tr>
   <td>Support for <code>contain</code> and <code>cover</code></td>
   <td>{{CompatVersionUnknown}}</td>
   <td>{{CompatNo}}</td>
  </tr>
 </tbody>
</table>
</div>
<div id="compat-mobile">
<table class="compat-table">
 <tbody>
  <tr>
   <th>Feature</th>
   <th>Firefox Mobile (Gecko)</th>
  </tr>
  <tr>
   <td>Basic support</td>
   <td>{{CompatGeckoMobile("1.9.2")}}</td>
  </tr>
 </tbody>
</table>
</div>
<p>[1] Gecko 1.9.2 supported a different syntax.</p>
<h2 id="See_also">See also</h2>
<ul><li>Nothing</li></ul>
"#;

fn target() -> FeatureIdentity {
    FeatureIdentity {
        id: 100,
        slug: "web-css-background-size".to_string(),
    }
}

fn canonical() -> CanonicalEntities {
    CanonicalEntities {
        browsers: vec![
            CanonicalBrowser {
                id: 1,
                name: "Chrome".to_string(),
                slug: "chrome".to_string(),
            },
            CanonicalBrowser {
                id: 2,
                name: "Firefox".to_string(),
                slug: "firefox".to_string(),
            },
            CanonicalBrowser {
                id: 3,
                name: "Firefox Mobile".to_string(),
                slug: "firefox_mobile".to_string(),
            },
        ],
        versions: vec![
            CanonicalVersion {
                id: 10,
                browser_id: 1,
                version: "1.0".to_string(),
            },
            CanonicalVersion {
                id: 11,
                browser_id: 1,
                version: String::new(),
            },
            CanonicalVersion {
                id: 20,
                browser_id: 2,
                version: "3.6".to_string(),
            },
            CanonicalVersion {
                id: 21,
                browser_id: 2,
                version: String::new(),
            },
            CanonicalVersion {
                id: 30,
                browser_id: 3,
                version: "1.0".to_string(),
            },
        ],
        specifications: vec![CanonicalSpecification {
            id: 5,
            mdn_key: "CSS3 Backgrounds".to_string(),
        }],
        sections: vec![CanonicalSection {
            id: 50,
            specification_id: 5,
            subpath: "#the-background-size".to_string(),
        }],
        features: vec![
            CanonicalFeature {
                id: 100,
                name: "background-size".to_string(),
                slug: "web-css-background-size".to_string(),
                parent_id: None,
            },
            CanonicalFeature {
                id: 101,
                name: "Basic support".to_string(),
                slug: "web-css-background-size_basic_support".to_string(),
                parent_id: Some(100),
            },
        ],
        supports: vec![CanonicalSupport {
            id: 1000,
            version_id: 10,
            feature_id: 101,
        }],
    }
}

fn cell_support(cell: &str) -> (Vec<RawSupport>, Diagnostics) {
    let node = mdn::compat_td(cell, 0).expect("cell parses");
    let mut diagnostics = Diagnostics::default();
    let entries = resolve_support(tokens(&node.children), &mut diagnostics);
    (entries, diagnostics)
}

fn compat_page(header: &str, rows: &str) -> String {
    format!(
        "<h2 id=\"Browser_compatibility\">Browser compatibility</h2>\n\
         <div>{{{{CompatibilityTable}}}}</div>\n\
         <div id=\"compat-desktop\">\n<table class=\"compat-table\">\n<tbody>\n\
         {header}\n{rows}\n</tbody>\n</table>\n</div>\n"
    )
}

fn messages(diagnostics: &[crate::model::Diagnostic]) -> Vec<&str> {
    diagnostics
        .iter()
        .map(|diagnostic| diagnostic.message.as_str())
        .collect()
}

#[test]
fn empty_page_reports_missing_sections() {
    let result = scrape_page("", &target(), &CanonicalEntities::default());

    assert_eq!(messages(&result.errors), vec![NO_SECTIONS_MESSAGE]);
    assert_eq!(result.errors[0].span, None);
    assert!(result.specs.is_empty());
    assert!(result.compat.is_empty());
    assert_eq!(result.footnotes, None);
    assert_eq!(result.locale, "en");
}

#[test]
fn unclosed_header_is_a_fatal_parse_failure() {
    let text = "<p>Intro</p>\n<h2 id=\"x\">Specifications</h3>\n<p>Body</p>\n";
    let result = scrape_page(text, &target(), &canonical());

    let start = text.find("<h2").expect("header present");
    let end = text[start..].find('\n').expect("newline") + start;
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].message, FATAL_PARSE_MESSAGE);
    assert_eq!(result.errors[0].span, Some(Span::new(start, end)));
    assert!(result.specs.is_empty());
    assert!(result.compat.is_empty());
}

#[test]
fn cell_tokens_carry_source_offsets() {
    let cell = "<td> Support for<br>\n     <code>contain</code> and <code>cover</code> </td>";
    let node = mdn::compat_td(cell, 0).expect("cell parses");
    let found: Vec<Token> = tokens(&node.children).collect();

    assert_eq!(
        found,
        vec![
            Token::Text {
                content: "Support for".to_string(),
                span: Span::new(5, 16),
            },
            Token::Break {
                span: Span::new(16, 26),
            },
            Token::CodeBlock {
                content: "contain".to_string(),
                span: Span::new(26, 47),
            },
            Token::Text {
                content: "and".to_string(),
                span: Span::new(47, 51),
            },
            Token::CodeBlock {
                content: "cover".to_string(),
                span: Span::new(51, 70),
            },
        ]
    );
}

#[test]
fn token_offsets_increase_without_overlap() {
    let cell = "<td><a href=\"#x\">1.0</a> {{property_prefix(\"-moz\")}}&nbsp;[2]<br/>\n<span>4.0</span></td>";
    let node = mdn::compat_td(cell, 0).expect("cell parses");
    let spans: Vec<Span> = tokens(&node.children).map(|token| token.span()).collect();

    assert_eq!(spans.len(), 5);
    for pair in spans.windows(2) {
        assert!(pair[0].end <= pair[1].start, "{pair:?}");
        assert!(pair[0].start < pair[0].end);
    }
    assert!(spans[0].start >= node.span.start);
    assert!(spans[4].end <= node.span.end);
}

#[test]
fn whitespace_is_normalized_in_text_tokens() {
    let node = mdn::compat_td("<td>Basic&nbsp;\u{a0} support  </td>", 0).expect("cell parses");
    let found: Vec<Token> = tokens(&node.children).collect();

    assert!(matches!(
        found.as_slice(),
        [Token::Text { content, .. }] if content == "Basic support"
    ));
}

#[test]
fn compat_no_yields_unsupported_entry() {
    let (entries, diagnostics) = cell_support("<td>{{CompatNo}}</td>");

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].version, "");
    assert_eq!(entries[0].support, SupportLevel::No);
    assert!(diagnostics.errors.is_empty());
}

#[test]
fn gecko_desktop_versions_map_to_firefox_releases() {
    let (entries, _) = cell_support("<td>{{CompatGeckoDesktop(\"1\")}}</td>");
    assert_eq!(entries[0].version, "1.0");
    assert_eq!(entries[0].support, SupportLevel::Yes);

    let (entries, _) = cell_support("<td>{{CompatGeckoDesktop(\"1.9.2\")}}</td>");
    assert_eq!(entries[0].version, "3.6");

    let (entries, _) = cell_support("<td>{{CompatGeckoDesktop(\"8\")}}</td>");
    assert_eq!(entries[0].version, "8.0");
}

#[test]
fn unmapped_gecko_version_is_an_error_at_the_macro() {
    let (entries, diagnostics) = cell_support("<td>{{CompatGeckoDesktop(\"1.1\")}}</td>");

    assert!(entries.is_empty());
    assert_eq!(messages(&diagnostics.errors), vec!["Unknown Gecko version \"1.1\""]);
    assert_eq!(diagnostics.errors[0].span, Some(Span::new(4, 33)));
}

#[test]
fn gecko_mobile_and_firefox_os_tables() {
    assert_eq!(gecko_mobile_version("1.11").as_deref(), Some("1.0"));
    assert_eq!(gecko_mobile_version("2").as_deref(), Some("4.0"));
    assert_eq!(gecko_mobile_version("8.0").as_deref(), Some("8.0"));
    assert_eq!(gecko_mobile_version("Yep"), None);

    assert_eq!(gecko_fxos_version("18", None), Ok("1.0".to_string()));
    assert_eq!(gecko_fxos_version("26", Some("1.2")), Ok("1.2".to_string()));
    assert_eq!(
        gecko_fxos_version("40", None),
        Err("Unknown Gecko version \"40\"".to_string())
    );
    assert_eq!(
        gecko_fxos_version("18", Some("1.2")),
        Err("Override \"1.2\" is invalid for Gecko \"18\"".to_string())
    );
}

#[test]
fn prefix_attaches_to_previous_entry_and_break_starts_new_one() {
    let (entries, diagnostics) =
        cell_support("<td>{{CompatVersionUnknown}}{{property_prefix(\"-webkit\")}}<br>2.3</td>");

    assert!(diagnostics.errors.is_empty());
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].version, "");
    assert_eq!(entries[0].prefix.as_deref(), Some("-webkit"));
    assert_eq!(entries[1].version, "2.3");
    assert_eq!(entries[1].prefix, None);
}

#[test]
fn bare_versions_and_footnotes() {
    let (entries, diagnostics) = cell_support("<td>32 [1]</td>");

    assert!(diagnostics.errors.is_empty());
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].version, "32.0");
    assert_eq!(
        entries[0].footnote.as_ref().map(|(id, _)| id.as_str()),
        Some("1")
    );

    let (entries, _) = cell_support("<td>18 (18)[**]</td>");
    assert_eq!(entries[0].version, "18.0");
    assert_eq!(
        entries[0].footnote.as_ref().map(|(id, _)| id.as_str()),
        Some("2")
    );
}

#[test]
fn paragraphs_are_resolved_independently() {
    let (entries, diagnostics) = cell_support("<td><p>1.0</p><p>{{CompatNo}}</p></td>");

    assert!(diagnostics.errors.is_empty());
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].version, "1.0");
    assert_eq!(entries[1].support, SupportLevel::No);
}

#[test]
fn nested_paragraph_is_reported_at_inner_tag() {
    let (entries, diagnostics) = cell_support("<td><p><p>1.0</p></p></td>");

    assert!(entries.is_empty());
    assert_eq!(messages(&diagnostics.errors), vec!["Nested <p> tags not supported"]);
    assert_eq!(diagnostics.errors[0].span, Some(Span::new(7, 10)));
}

#[test]
fn unrecognized_cell_content_is_reported() {
    let (entries, diagnostics) =
        cell_support("<td>Yes {{foo(\"a\", \"b\")}}{{bar}} <code>x</code></td>");

    assert!(entries.is_empty());
    assert_eq!(
        messages(&diagnostics.errors),
        vec![
            "Unknown support text \"Yes\"",
            "Unknown kuma function foo(\"a\", \"b\")",
            "Unknown kuma function bar",
            "Unknown support text \"<code>x</code>\"",
        ]
    );
}

#[test]
fn second_version_in_one_segment_is_an_error() {
    let (entries, diagnostics) = cell_support("<td>1.0 {{CompatNo}}</td>");

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].version, "1.0");
    assert_eq!(
        messages(&diagnostics.errors),
        vec!["Unexpected version \"\" after \"1.0\""]
    );
}

#[test]
fn duplicate_footnote_is_an_issue() {
    let (entries, diagnostics) = cell_support("<td>1.0 [1] [2]</td>");

    assert_eq!(
        entries[0].footnote.as_ref().map(|(id, _)| id.as_str()),
        Some("1")
    );
    assert_eq!(
        messages(&diagnostics.issues),
        vec!["Footnote [2] ignored, entry already has footnote [1]"]
    );
}

#[test]
fn feature_cells_render_names() {
    let node = mdn::compat_td(
        "<td>Support for <code>contain</code> and <code>cover</code>{{experimental_inline}}</td>",
        0,
    )
    .expect("cell parses");
    let mut diagnostics = Diagnostics::default();
    let cell = map_feature_cell(tokens(&node.children), &mut diagnostics);

    assert_eq!(cell.name, "Support for <code>contain</code> and <code>cover</code>");
    assert!(!cell.canonical);
    assert!(cell.experimental);

    let node = mdn::compat_td("<td><code>contain</code> {{experimental_inline}}</td>", 0)
        .expect("cell parses");
    let cell = map_feature_cell(tokens(&node.children), &mut diagnostics);
    assert_eq!(cell.name, "contain");
    assert!(cell.canonical);
    assert!(diagnostics.errors.is_empty());
}

#[test]
fn slugify_truncates_and_suffixes() {
    assert_eq!(
        slugify(
            "web-css-background-size_support for contain and cover",
            50,
            None
        ),
        "web-css-background-size_support_for_contain_and_co"
    );
    assert_eq!(
        slugify("web-css-background-size_basic support", 50, Some(1)),
        "web-css-background-size_basic_support1"
    );
    assert_eq!(slugify("A  (b) -- C", 50, None), "a_b_--_c");
}

#[test]
fn renders_range_with_context_and_carets() {
    let text = "line1\nline2\nline3 bad here\nline4\nline5\nline6";
    let start = text.find("bad").expect("marker");
    let html = range_error_to_html(text, start, start + 3, "Bad <thing>", Some("rule = \"x\""));

    assert_eq!(
        html,
        "<div><p>Bad &lt;thing&gt;</p><p><code>rule = &quot;x&quot;</code></p>\
         <p>Context:<pre>1 line1\n2 line2\n3 line3 bad here\n*       ^^^\n4 line4\n5 line5\n</pre></p></div>"
    );
}

#[test]
fn renders_ranges_spanning_lines_with_wide_numbers() {
    let text = (1..=12)
        .map(|n| format!("row{n}"))
        .collect::<Vec<_>>()
        .join("\n");
    let start = text.find("row9").expect("row9");
    let end = text.find("row10").expect("row10") + 2;
    let html = range_error_to_html(&text, start, end, "span", None);

    assert!(html.contains(" 9 row9\n** ^^^^\n10 row10\n** ^^\n"), "{html}");
    assert!(html.contains(" 7 row7\n"));
    assert!(html.contains("12 row12\n"));
    assert!(!html.contains("row6"));
}

#[test]
fn full_page_extracts_specs_and_tables() {
    let text = BACKGROUND_SIZE_PAGE;
    let result = scrape_page(text, &target(), &canonical());

    assert!(result.issues.is_empty(), "{:?}", result.issues);
    let chrome_three = text.find("3.0</td>").expect("chrome 3.0");
    assert_eq!(
        messages(&result.errors),
        vec!["Unknown version \"3.0\" for browser \"Chrome\" (id 1, slug \"chrome\")"]
    );
    assert_eq!(
        result.errors[0].span,
        Some(Span::new(chrome_three, chrome_three + 3))
    );

    assert_eq!(result.specs.len(), 1);
    let spec = &result.specs[0];
    assert_eq!(spec.specification.mdn_key, "CSS3 Backgrounds");
    assert_eq!(spec.specification.id, Some(5));
    assert_eq!(spec.section.subpath, "#the-background-size");
    assert_eq!(spec.section.name, "background-size");
    assert_eq!(spec.section.note, "Initial definition.");
    assert_eq!(spec.section.id, Some(50));

    assert_eq!(result.compat.len(), 2);
    let desktop = &result.compat[0];
    assert_eq!(desktop.name, "desktop");
    assert_eq!(
        desktop
            .browsers
            .iter()
            .map(|browser| browser.id.clone())
            .collect::<Vec<_>>(),
        vec![EntityId::Real(1), EntityId::Real(2)]
    );
    assert_eq!(desktop.features.len(), 2);
    assert_eq!(desktop.features[0].id, EntityId::Real(101));
    assert_eq!(desktop.features[0].slug, "web-css-background-size_basic_support");
    assert_eq!(
        desktop.features[1].id,
        EntityId::Pending("_support for contain and cover".to_string())
    );
    assert_eq!(
        desktop.features[1].slug,
        "web-css-background-size_support_for_contain_and_co"
    );

    let supports: Vec<(EntityId, SupportLevel, Option<&str>, Option<&str>)> = desktop
        .supports
        .iter()
        .map(|support| {
            (
                support.id.clone(),
                support.support,
                support.prefix.as_deref(),
                support.footnote_id.as_deref(),
            )
        })
        .collect();
    assert_eq!(
        supports,
        vec![
            (EntityId::Real(1000), SupportLevel::Yes, Some("-webkit"), None),
            (
                EntityId::Pending("_101-_Chrome-3.0".to_string()),
                SupportLevel::Yes,
                None,
                None
            ),
            (
                EntityId::Pending("_101-20".to_string()),
                SupportLevel::Yes,
                None,
                Some("1")
            ),
            (
                EntityId::Pending("__support for contain and cover-11".to_string()),
                SupportLevel::Yes,
                None,
                None
            ),
            (
                EntityId::Pending("__support for contain and cover-21".to_string()),
                SupportLevel::No,
                None,
                None
            ),
        ]
    );

    let mobile = &result.compat[1];
    assert_eq!(mobile.name, "mobile");
    assert_eq!(mobile.features, vec![desktop.features[0].clone()]);
    assert_eq!(mobile.versions[0].id, EntityId::Real(30));
    assert_eq!(mobile.versions[0].version, "1.0");

    assert_eq!(
        result.footnotes.as_deref(),
        Some("<p>[1] Gecko 1.9.2 supported a different syntax.</p>")
    );
}

#[test]
fn supports_reference_entries_of_their_table() {
    let result = scrape_page(BACKGROUND_SIZE_PAGE, &target(), &canonical());

    for table in &result.compat {
        for support in &table.supports {
            assert!(table.features.iter().any(|feature| feature.id == support.feature));
            assert!(table.versions.iter().any(|version| version.id == support.version));
        }
    }
}

#[test]
fn scraping_is_deterministic() {
    let first = scrape_page(BACKGROUND_SIZE_PAGE, &target(), &canonical());
    let second = scrape_page(BACKGROUND_SIZE_PAGE, &target(), &canonical());

    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).expect("serializes"),
        serde_json::to_string(&second).expect("serializes")
    );
}

#[test]
fn duplicate_feature_rows_get_suffixed_slugs() {
    let text = compat_page(
        "<tr><th>Feature</th><th>Chrome</th></tr>",
        "<tr><td>Basic support</td><td>1.0</td></tr>\n\
         <tr><td>Basic support</td><td>2.0</td></tr>",
    );
    let target = FeatureIdentity {
        id: 7,
        slug: "web-api".to_string(),
    };
    let result = scrape_page(&text, &target, &canonical());

    let slugs: Vec<&str> = result.compat[0]
        .features
        .iter()
        .map(|feature| feature.slug.as_str())
        .collect();
    assert_eq!(slugs, vec!["web-api_basic_support", "web-api_basic_support1"]);
}

#[test]
fn unknown_entities_get_pending_ids() {
    let text = compat_page(
        "<tr><th>Feature</th><th>Netscape</th></tr>",
        "<tr><td>Basic support</td><td>4.0</td></tr>",
    );
    let result = scrape_page(&text, &target(), &canonical());

    assert_eq!(messages(&result.errors), vec!["Unknown Browser \"Netscape\""]);
    let table = &result.compat[0];
    assert_eq!(table.browsers[0].id, EntityId::Pending("_Netscape".to_string()));
    assert_eq!(table.browsers[0].slug, "_Netscape");
    assert_eq!(
        table.versions[0].id,
        EntityId::Pending("_Netscape-4.0".to_string())
    );
    assert_eq!(
        table.supports[0].id,
        EntityId::Pending("_101-_Netscape-4.0".to_string())
    );
}

#[test]
fn rowspan_and_colspan_fill_the_grid() {
    let text = compat_page(
        "<tr><th>Feature</th><th>Chrome</th><th>Firefox (Gecko)</th></tr>",
        "<tr><td rowspan=\"2\">Basic support</td><td colspan=\"2\">{{CompatNo}}</td></tr>\n\
         <tr><td>1.0</td><td>{{CompatGeckoDesktop(\"1.9.2\")}}</td></tr>",
    );
    let result = scrape_page(&text, &target(), &canonical());

    assert!(result.issues.is_empty(), "{:?}", result.issues);
    let table = &result.compat[0];
    assert_eq!(table.features.len(), 1);
    let pairs: Vec<(EntityId, SupportLevel)> = table
        .supports
        .iter()
        .map(|support| (support.version.clone(), support.support))
        .collect();
    assert_eq!(
        pairs,
        vec![
            (EntityId::Real(11), SupportLevel::No),
            (EntityId::Real(21), SupportLevel::No),
            (EntityId::Real(10), SupportLevel::Yes),
            (EntityId::Real(20), SupportLevel::Yes),
        ]
    );
}

#[test]
fn table_structure_issues() {
    let text = compat_page(
        "<tr><th>Features</th><th>Chrome</th></tr>",
        "<tr><td>Basic support</td><td class=\"x\">1.0</td><td>2.0</td></tr>",
    );
    let result = scrape_page(&text, &target(), &canonical());

    assert_eq!(
        messages(&result.issues),
        vec![
            "Expected first header \"Feature\", actual \"Features\"",
            "Unexpected attribute class=\"x\" on <td>, expected rowspan or colspan",
            "Extra cell in row, no column left",
        ]
    );
}

#[test]
fn missing_footnote_text_is_an_issue() {
    let text = compat_page(
        "<tr><th>Feature</th><th>Chrome</th></tr>",
        "<tr><td>Basic support</td><td>1.0 [3]</td></tr>",
    );
    let result = scrape_page(&text, &target(), &canonical());

    assert_eq!(messages(&result.issues), vec!["Footnote [3] not found"]);
    assert_eq!(result.footnotes, None);
}

#[test]
fn header_attribute_mismatch_is_an_issue() {
    let text = BACKGROUND_SIZE_PAGE.replace(
        "<h2 id=\"Specifications\" name=\"Specifications\">",
        "<h2 id=\"Specs\" name=\"Spec_table\">",
    );
    let result = scrape_page(&text, &target(), &canonical());

    let start = text.find("<h2 id=\"Specs\"").expect("header");
    let end = text.find("</h2>").expect("close") + "</h2>".len();
    assert_eq!(
        messages(&result.issues),
        vec![
            "In Specifications section, expected <h2 id=\"Specifications\">, actual id=\"Specs\"",
            "In Specifications section, expected <h2 name=\"Specifications\"> or no name attribute, actual name=\"Spec_table\"",
        ]
    );
    assert_eq!(result.issues[0].span, Some(Span::new(start, end)));
    assert_eq!(result.specs.len(), 1);
}

#[test]
fn unknown_specification_is_an_error() {
    let text = BACKGROUND_SIZE_PAGE.replace("'CSS3 Backgrounds'", "'CSS4 Backgrounds'");
    let result = scrape_page(&text, &target(), &canonical());

    assert!(
        messages(&result.errors).contains(&"Unknown Specification \"CSS4 Backgrounds\"")
    );
    assert_eq!(result.specs[0].specification.id, None);
    assert_eq!(result.specs[0].section.id, None);
}

#[test]
fn spec_status_key_mismatch_is_an_issue() {
    let text = BACKGROUND_SIZE_PAGE.replace("{{Spec2('CSS3 Backgrounds')}}", "{{Spec2('CSS3 Borders')}}");
    let result = scrape_page(&text, &target(), &canonical());

    assert_eq!(
        messages(&result.issues),
        vec!["SpecName key \"CSS3 Backgrounds\" does not match Spec2 key \"CSS3 Borders\""]
    );
}

#[test]
fn whynospec_paragraph_yields_no_specs() {
    let text = "<h2 id=\"Specifications\">Specifications</h2>\n\
                <p>{{WhyNoSpecStart}}Not part of any specification.{{WhyNoSpecEnd}}</p>\n";
    let result = scrape_page(text, &target(), &canonical());

    assert!(result.specs.is_empty());
    assert!(result.errors.is_empty());
    assert!(result.issues.is_empty());
}

#[test]
fn unparseable_section_is_dropped_with_rule_error() {
    let text = compat_page(
        "<tr><th>Feature</th><th>Chrome</th></tr>",
        "<tr><td>Basic support</td><td>1.0 <kuma>x</kuma></td></tr>",
    );
    let result = scrape_page(&text, &target(), &canonical());

    assert!(result.compat.is_empty());
    assert_eq!(result.errors.len(), 1);
    let error = &result.errors[0];
    assert_eq!(
        error.message,
        "Section <h2>Browser compatibility</h2> was not parsed, because rule \"compat_cell\" failed to match.  Definition:"
    );
    assert!(
        error
            .rule
            .as_deref()
            .is_some_and(|rule| rule.starts_with("compat_td ="))
    );
    let start = text.find("<kuma>").expect("kuma");
    let end = text[start..].find('\n').expect("newline") + start;
    assert_eq!(error.span, Some(Span::new(start, end)));
}

#[test]
fn other_sections_are_ignored() {
    let text = "<h2 id=\"Summary\">Summary</h2>\n<p>Anything <b>goes</b> here.</p>\n";
    let result = scrape_page(text, &target(), &canonical());

    assert!(result.errors.is_empty());
    assert!(result.issues.is_empty());
    assert!(result.specs.is_empty());
    assert!(result.compat.is_empty());
}

fn feature_ids(table: &crate::model::CompatTable) -> Vec<EntityId> {
    table.features.iter().map(|feature| feature.id.clone()).collect()
}

#[test]
fn repeated_feature_names_keep_every_row() {
    let target = FeatureIdentity {
        id: 7,
        slug: "web-api".to_string(),
    };
    let text = compat_page(
        "<tr><th>Feature</th><th>Chrome</th></tr>",
        "<tr><td>foo</td><td>1.0</td></tr>\n\
         <tr><td>foo</td><td>2.0</td></tr>\n\
         <tr><td>foo1</td><td>2.0</td></tr>",
    );
    let result = scrape_page(&text, &target, &canonical());

    let table = &result.compat[0];
    assert_eq!(
        feature_ids(table),
        vec![
            EntityId::Pending("_foo".to_string()),
            EntityId::Pending("_foo1".to_string()),
            EntityId::Pending("_foo11".to_string()),
        ]
    );
    assert_eq!(
        table
            .features
            .iter()
            .map(|feature| feature.slug.as_str())
            .collect::<Vec<_>>(),
        vec!["web-api_foo", "web-api_foo1", "web-api_foo11"]
    );
    assert_eq!(
        table
            .supports
            .iter()
            .map(|support| support.id.clone())
            .collect::<Vec<_>>(),
        vec![
            EntityId::Pending("__foo-10".to_string()),
            EntityId::Pending("__foo1-_Chrome-2.0".to_string()),
            EntityId::Pending("__foo11-_Chrome-2.0".to_string()),
        ]
    );

    let text = compat_page(
        "<tr><th>Feature</th><th>Chrome</th></tr>",
        "<tr><td>foo1</td><td>1.0</td></tr>\n\
         <tr><td>foo</td><td>1.0</td></tr>\n\
         <tr><td>foo</td><td>1.0</td></tr>",
    );
    let result = scrape_page(&text, &target, &canonical());
    assert_eq!(
        feature_ids(&result.compat[0]),
        vec![
            EntityId::Pending("_foo1".to_string()),
            EntityId::Pending("_foo".to_string()),
            EntityId::Pending("_foo2".to_string()),
        ]
    );
    assert_eq!(result.compat[0].supports.len(), 3);
}

#[test]
fn oversized_header_colspan_is_capped() {
    let text = compat_page(
        "<tr><th>Feature</th><th colspan=\"20000000\">Chrome</th></tr>",
        "<tr><td>Basic support</td><td>1.0</td></tr>\n\
         <tr><td rowspan=\"5000\">Other</td><td>{{CompatNo}}</td></tr>",
    );
    let result = scrape_page(&text, &target(), &canonical());

    let colspan = text.find("colspan=").expect("colspan attribute");
    let rowspan = text.find("rowspan=").expect("rowspan attribute");
    assert_eq!(
        messages(&result.issues),
        vec![
            "Invalid colspan=\"20000000\" on <th>, expected at most 100",
            "Invalid rowspan=\"5000\" on <td>, expected at most 100",
        ]
    );
    assert_eq!(
        result.issues[0].span,
        Some(Span::new(colspan, colspan + "colspan=\"20000000\"".len()))
    );
    assert_eq!(
        result.issues[1].span,
        Some(Span::new(rowspan, rowspan + "rowspan=\"5000\"".len()))
    );

    let table = &result.compat[0];
    assert_eq!(table.browsers.len(), 1);
    assert_eq!(table.features.len(), 2);
    assert_eq!(table.supports.len(), 2);
    assert_eq!(table.supports[0].id, EntityId::Real(1000));
}

#[test]
fn unused_and_unlabelled_footnotes_are_issues() {
    let footnotes = "<p>Intro without marker.</p>\n\
                     <p>[1] Used by Chrome.</p>\n\
                     <p>More about the first note.</p>\n\
                     <p>[2] Never referenced.</p>\n";
    let text = compat_page(
        "<tr><th>Feature</th><th>Chrome</th></tr>",
        "<tr><td>Basic support</td><td>1.0 [1]</td></tr>",
    ) + footnotes;
    let result = scrape_page(&text, &target(), &canonical());

    assert_eq!(
        messages(&result.issues),
        vec!["Footnote has no ID", "Footnote [2] is not used"]
    );
    let intro = text.find("<p>Intro").expect("intro");
    let unused = text.find("<p>[2]").expect("second footnote");
    assert_eq!(
        result.issues[0].span,
        Some(Span::new(intro, intro + "<p>Intro without marker.</p>".len()))
    );
    assert_eq!(
        result.issues[1].span,
        Some(Span::new(unused, unused + "<p>[2] Never referenced.</p>".len()))
    );
    assert_eq!(result.footnotes.as_deref(), Some(footnotes.trim()));
}

#[test]
fn footnote_blocks_group_continuations() {
    let text = "<p>[1] First.</p>\n<p>Continued.</p>\n[*] Plain text note.\n";
    let blocks = mdn::footnote_blocks(text, 10).expect("footnotes parse");

    assert_eq!(
        blocks
            .iter()
            .map(|block| block.id.as_deref())
            .collect::<Vec<_>>(),
        vec![Some("1"), None, Some("1")]
    );
    let plain = text.find("[*]").expect("star marker");
    assert_eq!(
        blocks[2].span,
        Span::new(plain + 10, plain + 10 + "[*] Plain text note.".len())
    );
}

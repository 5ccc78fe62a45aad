use crate::model::Span;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attr {
    pub name: String,
    pub value: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageNode {
    pub sections: Vec<SectionNode>,
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionNode {
    pub header: Span,
    pub attrs: Vec<Attr>,
    pub title: String,
    pub body: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Text(String),
    Code(String),
    Break,
    Paragraph { open_end: usize, children: Vec<Node> },
    Wrapper(Vec<Node>),
    Macro { name: String, args: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub kind: NodeKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellNode {
    pub attrs: Vec<Attr>,
    pub children: Vec<Node>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderCellNode {
    pub attrs: Vec<Attr>,
    pub text: String,
    pub text_span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowNode {
    pub cells: Vec<CellNode>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableNode {
    pub headers: Vec<HeaderCellNode>,
    pub rows: Vec<RowNode>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DivNode {
    pub name: String,
    pub table: TableNode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompatSectionNode {
    pub kumascript: Node,
    pub divs: Vec<DivNode>,
    pub footnotes: String,
    pub footnotes_start: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FootnoteBlock {
    pub id: Option<String>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecRowNode {
    pub name: CellNode,
    pub status: CellNode,
    pub note: CellNode,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecBody {
    Table(Vec<SpecRowNode>),
    WhyNoSpec,
}

pub const RULE_DEFINITIONS: &[(&str, &str)] = &[
    (
        "compat_cell",
        r#"compat_td = "<td" attr* _ ">" _ inline* "</td>" _
inline = (macro / code / br / p / wrapper / footnote / text) _"#,
    ),
    (
        "compat_row",
        r#"compat_row = "<tr>" _ compat_td* "</tr>" _"#,
    ),
    (
        "compat_headers",
        r#"compat_headers = "<tr>" _ compat_th+ "</tr>" _
compat_th = "<th" attr* _ ">" _ ("<strong>" _ text "</strong>" / text) _ "</th>" _"#,
    ),
    (
        "compat_table",
        r#"compat_table = "<table" attr* _ ">" _ "<tbody>" _ compat_headers compat_row* "</tbody>" _ "</table>" _"#,
    ),
    (
        "compat_div",
        r#"compat_div = "<div" ws+ "id=\"compat-" name "\"" attr* _ ">" _ compat_table "</div>" _"#,
    ),
    (
        "compat_kumascript",
        r#"compat_kumascript = ("<div>" _ macro _ "</div>" / "<p>" _ macro _ "</p>") _"#,
    ),
    (
        "spec_row",
        r#"spec_row = "<tr>" _ spec_td spec_td spec_td "</tr>" _
spec_td = "<td" attr* _ ">" _ inline* "</td>" _"#,
    ),
    (
        "spec_table",
        r#"spec_table = "<table" attr* _ ">" _ spec_headers spec_row* "</tbody>" _ "</table>""#,
    ),
    (
        "compat_section",
        r#"compat_section = _ compat_kumascript compat_div+ footnotes"#,
    ),
    (
        "spec_section",
        r#"spec_section = _ (spec_table / whynospec) .*"#,
    ),
];

pub fn failed_rule<'a>(
    expected: impl Iterator<Item = &'a str>,
    fallback: &'static str,
) -> (&'static str, &'static str) {
    let expected: Vec<&str> = expected.collect();
    RULE_DEFINITIONS
        .iter()
        .find(|(name, _)| expected.contains(name))
        .or_else(|| RULE_DEFINITIONS.iter().find(|(name, _)| *name == fallback))
        .map(|(name, definition)| (*name, *definition))
        .unwrap_or((fallback, ""))
}

fn normalize_args(args: Vec<String>) -> Vec<String> {
    if args.len() == 1 && args[0] == "\"\"" {
        Vec::new()
    } else {
        args
    }
}

fn header_text(raw: &str, start: usize) -> (String, Span) {
    let text = raw.trim_end();
    (text.to_string(), Span::new(start, start + text.len()))
}

peg::parser! { pub grammar mdn(offset: usize) for str {
    rule ws() = quiet!{[' ' | '\t' | '\n' | '\r']}
    rule _() = ws()*
    rule pos() -> usize = p:position!() { p + offset }
    rule alpha() = ['a'..='z' | 'A'..='Z']
    rule digits() = ['0'..='9']+

    pub rule page() -> PageNode
        = (!"<h2" [_])* sections:section()* end:pos() [_]*
          { PageNode { sections, end } }

    rule section() -> SectionNode
        = start:pos() "<h2" attrs:attr()* _ ">" title:$((!"</h2>" [^'\n'])*) "</h2>" header_end:pos()
          body_start:pos() (!"<h2" [_])* body_end:pos()
          {
              SectionNode {
                  header: Span::new(start, header_end),
                  attrs,
                  title: title.trim().to_string(),
                  body: Span::new(body_start, body_end),
              }
          }

    rule attr() -> Attr
        = ws()+ start:pos() name:$(['a'..='z' | 'A'..='Z' | '_' | '-' | ':']+) _ "=" _ value:attr_value() end:pos()
          { Attr { name: name.to_string(), value, span: Span::new(start, end) } }

    rule attr_value() -> String
        = "\"" v:$([^'"']*) "\"" { v.to_string() }
        / "'" v:$([^'\'']*) "'" { v.to_string() }
        / v:$([^' ' | '\t' | '\n' | '\r' | '>' | '"' | '\'']+) { v.to_string() }

    rule inline() -> Node
        = start:pos() kind:inline_kind() _ end:pos()
          { Node { kind, span: Span::new(start, end) } }

    rule inline_kind() -> NodeKind
        = macro_call()
        / code()
        / br()
        / paragraph()
        / wrapper()
        / t:$(footnote_marker()) { NodeKind::Text(t.to_string()) }
        / t:$(text_char()+) { NodeKind::Text(t.to_string()) }

    rule text_char() = !"{{" !footnote_marker() [^'<']

    rule footnote_marker() = "[" (digits() / "*"+) "]"

    rule macro_call() -> NodeKind
        = "{{" _ name:$(['a'..='z' | 'A'..='Z' | '0'..='9' | '_' | '-']+) _ args:macro_args()? _ "}}"
          { NodeKind::Macro { name: name.to_string(), args: normalize_args(args.unwrap_or_default()) } }

    rule macro_args() -> Vec<String>
        = "(" _ args:(macro_arg() ** (_ "," _)) _ ")" { args }

    rule macro_arg() -> String
        = a:$("\"" [^'"']* "\"" / "'" [^'\'']* "'" / ['0'..='9' | '.' | '-' | '+']+) { a.to_string() }

    rule macro_node() -> Node
        = start:pos() kind:macro_call() end:pos()
          { Node { kind, span: Span::new(start, end) } }

    rule code() -> NodeKind
        = "<code" !alpha() attr()* _ ">" content:$((!"</code>" [_])*) "</code>"
          { NodeKind::Code(content.to_string()) }

    rule br() -> NodeKind
        = "<br" !alpha() _ ("/>" / ">") { NodeKind::Break }

    rule paragraph() -> NodeKind
        = "<p" !alpha() attr()* _ ">" open_end:pos() _ children:inline()* "</p>"
          { NodeKind::Paragraph { open_end, children } }

    rule wrapper_open() -> &'static str
        = "<span" { "span" }
        / "<strong" { "strong" }
        / "<em" { "em" }
        / "<sup" { "sup" }
        / "<a" { "a" }

    rule wrapper() -> NodeKind
        = tag:wrapper_open() !alpha() attr()* _ ">" _ children:inline()*
          close:$("</" alpha()+ ">")
          {?
              if close[2..close.len() - 1].eq_ignore_ascii_case(tag) {
                  Ok(NodeKind::Wrapper(children))
              } else {
                  Err("matching closing tag")
              }
          }

    pub rule compat_section() -> CompatSectionNode
        = _ kumascript:compat_kumascript() divs:compat_div()+ !compat_div_open()
          footnotes_start:pos() footnotes:$([_]*)
          {
              CompatSectionNode {
                  kumascript,
                  divs,
                  footnotes: footnotes.to_string(),
                  footnotes_start,
              }
          }

    rule compat_kumascript() -> Node
        = "<div>" _ m:macro_node() _ ("</div>" / expected!("compat_kumascript")) _ { m }
        / "<p>" _ m:macro_node() _ ("</p>" / expected!("compat_kumascript")) _ { m }
        / expected!("compat_kumascript")

    rule compat_div_open() = _ "<div" ws()+ "id=\"compat-"

    rule compat_div() -> DivNode
        = "<div" ws()+ "id=\"compat-" name:$(['a'..='z' | 'A'..='Z' | '0'..='9' | '_' | '-']+) "\""
          attr()* _ ">" _ table:compat_table() ("</div>" / expected!("compat_div")) _
          { DivNode { name: name.to_string(), table } }

    rule compat_table() -> TableNode
        = "<table" attr()* _ ">" _ "<tbody>" _ headers:compat_headers() rows:compat_row()*
          ("</tbody>" / expected!("compat_table")) _ "</table>" _
          { TableNode { headers, rows } }

    rule compat_headers() -> Vec<HeaderCellNode>
        = "<tr>" _ cells:compat_th()+ ("</tr>" / expected!("compat_headers")) _ { cells }

    rule compat_th() -> HeaderCellNode
        = "<th" attrs:attr()* _ ">" _ text:compat_th_text() _ ("</th>" / expected!("compat_headers")) _
          { HeaderCellNode { attrs, text: text.0, text_span: text.1 } }

    rule compat_th_text() -> (String, Span)
        = "<strong>" _ start:pos() t:$([^'<']*) "</strong>" { header_text(t, start) }
        / start:pos() t:$([^'<']*) { header_text(t, start) }

    rule compat_row() -> RowNode
        = start:pos() "<tr>" _ cells:compat_td()* ("</tr>" / expected!("compat_row")) end:pos() _
          { RowNode { cells, span: Span::new(start, end) } }

    pub rule compat_td() -> CellNode
        = start:pos() "<td" attrs:attr()* _ ">" _ children:inline()* ("</td>" / expected!("compat_cell")) end:pos() _
          { CellNode { attrs, children, span: Span::new(start, end) } }

    pub rule spec_section() -> SpecBody
        = _ body:(rows:spec_table() { SpecBody::Table(rows) } / whynospec() { SpecBody::WhyNoSpec }) [_]*
          { body }

    rule spec_table() -> Vec<SpecRowNode>
        = "<table" attr()* _ ">" _ spec_headers() rows:spec_row()*
          ("</tbody>" / expected!("spec_table")) _ "</table>"
          { rows }

    rule spec_headers()
        = "<thead>" _ spec_header_row() "</thead>" _ "<tbody>" _
        / "<tbody>" _ spec_header_row()

    rule spec_header_row()
        = "<tr>" _ ("<th" attr()* _ ">" (!"</th>" [_])* "</th>" _)+ "</tr>" _

    rule spec_row() -> SpecRowNode
        = start:pos() "<tr>" _ name:spec_td() status:spec_td() note:spec_td()
          ("</tr>" / expected!("spec_row")) end:pos() _
          { SpecRowNode { name, status, note, span: Span::new(start, end) } }

    rule spec_td() -> CellNode
        = start:pos() "<td" attrs:attr()* _ ">" _ children:inline()* ("</td>" / expected!("spec_row")) end:pos() _
          { CellNode { attrs, children, span: Span::new(start, end) } }

    rule whynospec()
        = "<p>" _ "{{" _ "WhyNoSpecStart" _ "}}" (!("{{" _ "WhyNoSpecEnd") [_])*
          "{{" _ "WhyNoSpecEnd" _ "}}" _ "</p>"

    pub rule cell_version() -> (String, Option<String>)
        = _ version:$(digits() ("." digits())*) _
          eng:("(" _ e:$(digits() ("." digits())*) _ ")" { e })? _
          { (version.to_string(), eng.map(str::to_string)) }

    pub rule footnote_id() -> String
        = "[" n:$(digits()) "]" { n.to_string() }
        / "[" stars:$("*"+) "]" { stars.len().to_string() }

    pub rule footnote_blocks() -> Vec<FootnoteBlock>
        = _ blocks:(b:footnote_block() _ { b })* { blocks }

    rule footnote_block() -> FootnoteBlock
        = start:pos() "<p" !alpha() attr()* _ ">" _ id:footnote_id()? (!"</p>" [_])* "</p>" end:pos()
          { FootnoteBlock { id, span: Span::new(start, end) } }
        / start:pos() id:footnote_id() body_start:pos() rest:$((!("<p" !alpha()) [_])*)
          { FootnoteBlock { id: Some(id), span: Span::new(start, body_start + rest.trim_end().len()) } }
        / start:pos() rest:$([_] (!("<p" !alpha()) [_])*)
          { FootnoteBlock { id: None, span: Span::new(start, start + rest.trim_end().len()) } }
}}

use crate::model::{Diagnostic, Span};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    pub issues: Vec<Diagnostic>,
    pub errors: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn issue(&mut self, span: Span, message: impl Into<String>) {
        self.issues.push(Diagnostic {
            span: Some(span),
            message: message.into(),
            rule: None,
        });
    }

    pub fn error(&mut self, span: Span, message: impl Into<String>) {
        self.errors.push(Diagnostic {
            span: Some(span),
            message: message.into(),
            rule: None,
        });
    }

    pub fn page_error(&mut self, message: impl Into<String>) {
        self.errors.push(Diagnostic {
            span: None,
            message: message.into(),
            rule: None,
        });
    }

    pub fn rule_error(&mut self, span: Span, message: impl Into<String>, rule: &str) {
        self.errors.push(Diagnostic {
            span: Some(span),
            message: message.into(),
            rule: Some(rule.to_string()),
        });
    }
}

pub fn end_of_line(text: &str, pos: usize) -> usize {
    let pos = pos.min(text.len());
    text[pos..].find('\n').map_or(text.len(), |idx| pos + idx)
}

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

pub fn range_error_to_html(
    text: &str,
    start: usize,
    end: usize,
    message: &str,
    rule: Option<&str>,
) -> String {
    let mut out = format!("<div><p>{}</p>", escape_html(message));
    if let Some(rule) = rule {
        out.push_str(&format!("<p><code>{}</code></p>", escape_html(rule)));
    }
    out.push_str("<p>Context:<pre>");
    out.push_str(&context_lines(text, start, end, escape_html));
    out.push_str("</pre></p></div>");
    out
}

pub fn range_error_to_text(
    text: &str,
    start: usize,
    end: usize,
    message: &str,
    rule: Option<&str>,
) -> String {
    let mut out = format!("{message}\n");
    if let Some(rule) = rule {
        out.push_str(rule);
        out.push('\n');
    }
    out.push_str("Context:\n");
    out.push_str(&context_lines(text, start, end, str::to_string));
    out
}

pub fn diagnostic_to_html(text: &str, diagnostic: &Diagnostic) -> String {
    match diagnostic.span {
        Some(span) => range_error_to_html(
            text,
            span.start,
            span.end,
            &diagnostic.message,
            diagnostic.rule.as_deref(),
        ),
        None => format!("<pre>{}</pre>", escape_html(&diagnostic.message)),
    }
}

pub fn diagnostic_to_text(text: &str, diagnostic: &Diagnostic) -> String {
    match diagnostic.span {
        Some(span) => range_error_to_text(
            text,
            span.start,
            span.end,
            &diagnostic.message,
            diagnostic.rule.as_deref(),
        ),
        None => format!("{}\n", diagnostic.message),
    }
}

struct Line<'a> {
    start: usize,
    content: &'a str,
}

fn split_lines(text: &str) -> Vec<Line<'_>> {
    let mut lines = Vec::new();
    let mut start = 0;
    for content in text.split('\n') {
        lines.push(Line { start, content });
        start += content.len() + 1;
    }
    lines
}

fn line_index(lines: &[Line<'_>], pos: usize) -> usize {
    lines
        .iter()
        .rposition(|line| line.start <= pos)
        .unwrap_or(0)
}

fn column(line: &Line<'_>, pos: usize) -> usize {
    let local = pos.saturating_sub(line.start).min(line.content.len());
    line.content
        .char_indices()
        .take_while(|(idx, _)| *idx < local)
        .count()
}

fn context_lines(text: &str, start: usize, end: usize, escape: fn(&str) -> String) -> String {
    let end = end.max(start);
    let lines = split_lines(text);
    let first = line_index(&lines, start);
    let last = if end > start {
        line_index(&lines, end - 1)
    } else {
        first
    };

    let from = first.saturating_sub(2);
    let to = (last + 2).min(lines.len().saturating_sub(1));
    let width = (to + 1).to_string().len();

    let mut out = String::new();
    for (idx, line) in lines.iter().enumerate().take(to + 1).skip(from) {
        out.push_str(&format!("{:>width$} {}\n", idx + 1, escape(line.content)));
        if idx < first || idx > last {
            continue;
        }

        let col_start = if idx == first { column(line, start) } else { 0 };
        let col_end = if idx == last {
            column(line, end)
        } else {
            line.content.chars().count()
        };
        let carets = col_end.saturating_sub(col_start).max(1);
        out.push_str(&format!(
            "{} {}{}\n",
            "*".repeat(width),
            " ".repeat(col_start),
            "^".repeat(carets)
        ));
    }
    out
}

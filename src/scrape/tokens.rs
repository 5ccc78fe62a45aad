use std::slice;

use crate::model::Span;
use crate::scrape::grammar::{Node, NodeKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Text {
        content: String,
        span: Span,
    },
    CodeBlock {
        content: String,
        span: Span,
    },
    Break {
        span: Span,
    },
    Paragraph {
        children: Vec<Token>,
        open_end: usize,
        span: Span,
    },
    Macro {
        name: String,
        args: Vec<String>,
        span: Span,
    },
}

impl Token {
    pub fn span(&self) -> Span {
        match self {
            Token::Text { span, .. }
            | Token::CodeBlock { span, .. }
            | Token::Break { span }
            | Token::Paragraph { span, .. }
            | Token::Macro { span, .. } => *span,
        }
    }
}

pub struct Tokens<'a> {
    stack: Vec<slice::Iter<'a, Node>>,
}

pub fn tokens(nodes: &[Node]) -> Tokens<'_> {
    Tokens {
        stack: vec![nodes.iter()],
    }
}

impl Iterator for Tokens<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        loop {
            let top = self.stack.last_mut()?;
            let Some(node) = top.next() else {
                self.stack.pop();
                continue;
            };

            let span = node.span;
            match &node.kind {
                NodeKind::Wrapper(children) => self.stack.push(children.iter()),
                NodeKind::Text(raw) => {
                    let content = normalize_whitespace(raw);
                    if !content.is_empty() {
                        return Some(Token::Text { content, span });
                    }
                }
                NodeKind::Code(raw) => {
                    return Some(Token::CodeBlock {
                        content: normalize_whitespace(raw),
                        span,
                    });
                }
                NodeKind::Break => return Some(Token::Break { span }),
                NodeKind::Paragraph { open_end, children } => {
                    return Some(Token::Paragraph {
                        children: tokens(children).collect(),
                        open_end: *open_end,
                        span,
                    });
                }
                NodeKind::Macro { name, args } => {
                    return Some(Token::Macro {
                        name: name.clone(),
                        args: args.clone(),
                        span,
                    });
                }
            }
        }
    }
}

pub fn normalize_whitespace(raw: &str) -> String {
    raw.replace("&nbsp;", " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn join_content(out: &mut String, next: &str) {
    if next.is_empty() {
        return;
    }
    let attach = out.is_empty()
        || out.ends_with(' ')
        || next.starts_with(['!', ',', '.', ';', '?', ' ']);
    if !attach {
        out.push(' ');
    }
    out.push_str(next);
}

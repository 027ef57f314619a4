//! Tree builder: turns the token stream into a [`Fragment`]
//!
//! The builder is deliberately lenient about HTML's implied-end-tag rules:
//! an end tag closes the nearest open element with that name (closing any
//! elements opened after it), and anything still open at end of input is
//! closed implicitly. Only structurally broken input is an error.

use logos::Logos;

use super::ast::{Element, Fragment, Node, RAW_TEXT_ELEMENTS};
use super::lexer::{parse_start_tag, Span, Token};
use crate::error::ParseError;

struct TreeBuilder {
    stack: Vec<Element>,
    root: Vec<Node>,
    errors: Vec<ParseError>,
}

impl TreeBuilder {
    fn new() -> Self {
        Self {
            stack: Vec::new(),
            root: Vec::new(),
            errors: Vec::new(),
        }
    }

    fn push_node(&mut self, node: Node) {
        match self.stack.last_mut() {
            Some(parent) => parent.children.push(node),
            None => self.root.push(node),
        }
    }

    fn push_text(&mut self, text: &str) {
        let siblings = match self.stack.last_mut() {
            Some(parent) => &mut parent.children,
            None => &mut self.root,
        };
        match siblings.last_mut() {
            Some(Node::Text(existing)) => existing.push_str(text),
            _ => siblings.push(Node::Text(text.to_string())),
        }
    }

    fn pop(&mut self) {
        if let Some(el) = self.stack.pop() {
            self.push_node(Node::Element(el));
        }
    }

    fn close(&mut self, name: &str, span: Span) {
        match self.stack.iter().rposition(|el| el.name == name) {
            Some(index) => {
                while self.stack.len() > index {
                    self.pop();
                }
            }
            None if super::ast::VOID_ELEMENTS.contains(&name) => {}
            None => {
                let message = format!("unexpected closing tag </{}>", name);
                let err = match self.stack.last() {
                    Some(open) => {
                        ParseError::expecting(span, message, &format!("</{}>", open.name))
                    }
                    None => ParseError::syntax(span, message),
                };
                self.errors.push(err);
            }
        }
    }

    fn finish(mut self) -> Result<Fragment, Vec<ParseError>> {
        while !self.stack.is_empty() {
            self.pop();
        }
        if self.errors.is_empty() {
            Ok(Fragment::new(self.root))
        } else {
            Err(self.errors)
        }
    }
}

fn lex_error(slice: &str, span: Span) -> ParseError {
    if slice.starts_with("<!--") {
        ParseError::expecting(span, "unterminated comment", "-->")
    } else if slice.starts_with('<') {
        ParseError::expecting(span, "unterminated tag", ">")
    } else {
        ParseError::syntax(span, format!("unexpected input {:?}", slice))
    }
}

/// Parse markup into a fragment
pub fn parse(source: &str) -> Result<Fragment, Vec<ParseError>> {
    let mut builder = TreeBuilder::new();
    let mut lexer = Token::lexer(source);

    while let Some(token) = lexer.next() {
        let span = lexer.span();
        let token = match token {
            Ok(token) => token,
            Err(()) => {
                builder.errors.push(lex_error(lexer.slice(), span));
                break;
            }
        };

        match token {
            Token::Text(text) => builder.push_text(&text),
            Token::Lt => builder.push_text("<"),
            Token::Comment(body) => builder.push_node(Node::Comment(body)),
            Token::Doctype(body) => builder.push_node(Node::Doctype(body)),
            Token::EndTag(name) => builder.close(&name, span),
            Token::StartTag(raw) => {
                let tag = parse_start_tag(&raw);
                let mut element = Element::new(tag.name);
                element.attributes = tag.attributes;

                if tag.self_closing || element.is_void() {
                    builder.push_node(Node::Element(element));
                    continue;
                }

                if RAW_TEXT_ELEMENTS.contains(&element.name.as_str()) {
                    let rest = lexer.remainder();
                    let closing = format!("</{}", element.name);
                    match rest.to_ascii_lowercase().find(&closing) {
                        Some(end) => {
                            if end > 0 {
                                element.children.push(Node::Text(rest[..end].to_string()));
                            }
                            lexer.bump(end);
                        }
                        None => {
                            builder.errors.push(ParseError::expecting(
                                span,
                                format!("unterminated <{}> element", element.name),
                                &format!("</{}>", element.name),
                            ));
                            break;
                        }
                    }
                }

                builder.stack.push(element);
            }
        }
    }

    builder.finish()
}

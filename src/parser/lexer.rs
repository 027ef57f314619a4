//! Lexer for HTML markup using logos

use logos::{Lexer, Logos};

use super::ast::Attribute;

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

/// Markup-level tokens.
///
/// Start tags are lexed as one token (name plus raw attribute text) and split
/// into attributes by [`parse_start_tag`]. Raw-text element bodies
/// (`<script>`, `<style>`, ...) are not tokenized here; the tree builder reads
/// them straight from the lexer remainder.
#[derive(Logos, Debug, Clone, PartialEq)]
pub enum Token {
    #[token("<!--", lex_comment)]
    Comment(String),

    #[regex(r"<![a-zA-Z][^>]*>", |lex| {
        let s = lex.slice();
        s[2..s.len() - 1].to_string()
    })]
    Doctype(String),

    #[regex(r"</[a-zA-Z][^\s/>]*\s*>", |lex| end_tag_name(lex.slice()))]
    EndTag(String),

    #[regex(r"<[a-zA-Z]", lex_start_tag)]
    StartTag(String),

    #[regex(r"[^<]+", |lex| lex.slice().to_string())]
    Text(String),

    /// A `<` that does not open a tag; kept as text
    #[token("<")]
    Lt,
}

fn lex_comment(lex: &mut Lexer<Token>) -> Option<String> {
    let rest = lex.remainder();
    let end = rest.find("-->")?;
    let body = rest[..end].to_string();
    lex.bump(end + 3);
    Some(body)
}

/// Extend a start tag to its closing `>`. Quotes only delimit values that
/// follow `=`, so `>` inside a quoted value does not end the tag.
fn lex_start_tag(lex: &mut Lexer<Token>) -> Option<String> {
    let rest = lex.remainder();
    let mut quote: Option<char> = None;
    let mut after_equals = false;

    for (i, c) in rest.char_indices() {
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '>' => {
                let raw = format!("{}{}", lex.slice(), &rest[..=i]);
                lex.bump(i + 1);
                return Some(raw);
            }
            '=' => {
                after_equals = true;
                continue;
            }
            c if c.is_whitespace() => continue,
            '"' | '\'' if after_equals => quote = Some(c),
            _ => {}
        }
        after_equals = false;
    }
    None
}

fn end_tag_name(slice: &str) -> String {
    slice[2..slice.len() - 1].trim().to_ascii_lowercase()
}

/// Tokens inside a start tag, after the tag name
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
enum AttrToken {
    #[regex(r#"[^\s"'<>/=`]+"#)]
    Word,
    #[token("=")]
    Equals,
    #[regex(r#""[^"]*""#)]
    DoubleQuoted,
    #[regex(r"'[^']*'")]
    SingleQuoted,
    #[token("/")]
    Slash,
}

/// A start tag split into its parts
#[derive(Debug, Clone, PartialEq)]
pub struct StartTag {
    pub name: String,
    pub attributes: Vec<Attribute>,
    pub self_closing: bool,
}

/// Split the raw text of a [`Token::StartTag`] into name and attributes.
///
/// Names are lower-cased; values are kept verbatim (quotes stripped). A
/// repeated attribute keeps its first occurrence.
pub fn parse_start_tag(raw: &str) -> StartTag {
    let self_closing = raw.ends_with("/>");
    let inner = raw[1..raw.len() - 1].trim_end_matches('/');

    let name_end = inner
        .find(|c: char| c.is_whitespace())
        .unwrap_or(inner.len());
    let name = inner[..name_end].to_ascii_lowercase();

    let mut attributes: Vec<Attribute> = Vec::new();
    let mut lex = AttrToken::lexer(&inner[name_end..]);

    while let Some(token) = lex.next() {
        let Ok(AttrToken::Word) = token else {
            continue;
        };
        let attr_name = lex.slice().to_ascii_lowercase();

        let mut value = None;
        if lex.remainder().trim_start().starts_with('=') {
            lex.next();
            let rest = lex.remainder();
            let trimmed = rest.trim_start();
            let skipped = rest.len() - trimmed.len();
            if trimmed.starts_with('"') || trimmed.starts_with('\'') {
                if let Some(Ok(AttrToken::DoubleQuoted | AttrToken::SingleQuoted)) = lex.next() {
                    let quoted = lex.slice();
                    value = Some(quoted[1..quoted.len() - 1].to_string());
                }
            } else {
                let end = trimmed
                    .find(|c: char| c.is_whitespace())
                    .unwrap_or(trimmed.len());
                value = Some(trimmed[..end].to_string());
                lex.bump(skipped + end);
            }
        }

        if !attributes.iter().any(|a| a.name == attr_name) {
            attributes.push(Attribute {
                name: attr_name,
                value,
            });
        }
    }

    StartTag {
        name,
        attributes,
        self_closing,
    }
}

/// Lex input string into tokens with spans
pub fn lex(input: &str) -> impl Iterator<Item = (Token, Span)> + '_ {
    Token::lexer(input)
        .spanned()
        .filter_map(|(tok, span)| tok.ok().map(|t| (t, span)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_tokens() {
        let tokens: Vec<_> = lex(r#"<p class="a">hi</p>"#).map(|(t, _)| t).collect();
        assert_eq!(
            tokens,
            vec![
                Token::StartTag(r#"<p class="a">"#.to_string()),
                Token::Text("hi".to_string()),
                Token::EndTag("p".to_string()),
            ]
        );
    }

    #[test]
    fn test_comment_and_doctype() {
        let tokens: Vec<_> = lex("<!DOCTYPE html><!-- a <b> -->").map(|(t, _)| t).collect();
        assert_eq!(
            tokens,
            vec![
                Token::Doctype("DOCTYPE html".to_string()),
                Token::Comment(" a <b> ".to_string()),
            ]
        );
    }

    #[test]
    fn test_stray_lt_is_not_a_tag() {
        let tokens: Vec<_> = lex("a < b").map(|(t, _)| t).collect();
        assert_eq!(
            tokens,
            vec![
                Token::Text("a ".to_string()),
                Token::Lt,
                Token::Text(" b".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_start_tag_attributes() {
        let tag = parse_start_tag(r#"<A Href="/x" hidden data-var-title='t' size=3>"#);
        assert_eq!(tag.name, "a");
        assert!(!tag.self_closing);
        assert_eq!(
            tag.attributes,
            vec![
                Attribute::new("href", "/x"),
                Attribute::boolean("hidden"),
                Attribute::new("data-var-title", "t"),
                Attribute::new("size", "3"),
            ]
        );
    }

    #[test]
    fn test_parse_self_closing_tag() {
        let tag = parse_start_tag("<x-icon name=star />");
        assert_eq!(tag.name, "x-icon");
        assert!(tag.self_closing);
        assert_eq!(tag.attributes, vec![Attribute::new("name", "star")]);
    }

    #[test]
    fn test_valueless_attributes_before_others() {
        let tokens: Vec<_> = lex(r#"<script defer src="/app.js"></script><button disabled type="submit">"#)
            .map(|(t, _)| t)
            .collect();
        assert_eq!(
            tokens,
            vec![
                Token::StartTag(r#"<script defer src="/app.js">"#.to_string()),
                Token::EndTag("script".to_string()),
                Token::StartTag(r#"<button disabled type="submit">"#.to_string()),
            ]
        );

        let tag = parse_start_tag(r#"<a data-var-href href="https://example.com/default">"#);
        assert_eq!(
            tag.attributes,
            vec![
                Attribute::boolean("data-var-href"),
                Attribute::new("href", "https://example.com/default"),
            ]
        );
    }

    #[test]
    fn test_quoted_gt_does_not_end_tag() {
        let tokens: Vec<_> = lex(r#"<a title="a > b" hidden>x"#).map(|(t, _)| t).collect();
        assert_eq!(
            tokens,
            vec![
                Token::StartTag(r#"<a title="a > b" hidden>"#.to_string()),
                Token::Text("x".to_string()),
            ]
        );
    }

    #[test]
    fn test_self_closing_with_space() {
        let tokens: Vec<_> = lex("<x-icon />").map(|(t, _)| t).collect();
        assert_eq!(tokens, vec![Token::StartTag("<x-icon />".to_string())]);
        let tag = parse_start_tag("<x-icon />");
        assert_eq!(tag.name, "x-icon");
        assert!(tag.self_closing);
        assert!(tag.attributes.is_empty());
    }

    #[test]
    fn test_unterminated_start_tag_is_error() {
        let results: Vec<_> = Token::lexer(r#"<p class="a"#).collect();
        assert!(results.iter().any(|r| r.is_err()));
    }

    #[test]
    fn test_unterminated_comment_is_error() {
        let results: Vec<_> = Token::lexer("<!-- open").collect();
        assert!(results.iter().any(|r| r.is_err()));
    }
}

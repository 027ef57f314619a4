//! Selector scoping for template stylesheets

use lightningcss::rules::CssRule;
use lightningcss::stylesheet::{ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::traits::ToCss;

use super::StyleError;

/// Attribute selector matching a template's rendered output
pub fn scope_selector(template: &str) -> String {
    format!("[data-template=\"{}\"]", template)
}

/// Rewrite every style rule in `source` so it only matches inside `template`.
///
/// `:host` is replaced by the scope selector; any other selector is prefixed
/// with it as an ancestor. Rules inside conditional group at-rules (`@media`,
/// `@supports`, `@container`, `@layer` blocks, `@document`) are rewritten
/// too; other at-rules are printed unchanged. One top-level rule per line.
pub fn scope_stylesheet(source: &str, template: &str) -> Result<String, StyleError> {
    let sheet = StyleSheet::parse(source, ParserOptions::default())
        .map_err(|e| StyleError::Parse(e.to_string()))?;
    let scope = scope_selector(template);

    let mut out = Vec::new();
    scope_rules(&sheet.rules.0, &scope, &mut out)?;
    Ok(out.join("\n"))
}

fn scope_rules(rules: &[CssRule], scope: &str, out: &mut Vec<String>) -> Result<(), StyleError> {
    for rule in rules {
        let css = match rule {
            CssRule::Style(style) => {
                let selectors = scope_selector_list(&print(&style.selectors)?, scope);
                let mut body = vec![print(&style.declarations)?];
                // Nested rules are relative to the scoped parent
                for nested in &style.rules.0 {
                    body.push(print(nested)?);
                }
                block(&selectors, &body)
            }
            CssRule::Media(media) => {
                let mut body = Vec::new();
                scope_rules(&media.rules.0, scope, &mut body)?;
                block(&format!("@media {}", print(&media.query)?), &body)
            }
            CssRule::Supports(supports) => {
                let mut body = Vec::new();
                scope_rules(&supports.rules.0, scope, &mut body)?;
                block(&format!("@supports {}", print(&supports.condition)?), &body)
            }
            CssRule::Container(group) => {
                let mut body = Vec::new();
                scope_rules(&group.rules.0, scope, &mut body)?;
                block(prelude(&print(rule)?), &body)
            }
            CssRule::LayerBlock(group) => {
                let mut body = Vec::new();
                scope_rules(&group.rules.0, scope, &mut body)?;
                block(prelude(&print(rule)?), &body)
            }
            CssRule::MozDocument(group) => {
                let mut body = Vec::new();
                scope_rules(&group.rules.0, scope, &mut body)?;
                block(prelude(&print(rule)?), &body)
            }
            other => print(other)?,
        };
        if !css.is_empty() {
            out.push(css);
        }
    }
    Ok(())
}

fn print<T: ToCss>(value: &T) -> Result<String, StyleError> {
    value
        .to_css_string(PrinterOptions::default())
        .map_err(|e| StyleError::Print(e.to_string()))
}

/// At-rule text up to its block
fn prelude(css: &str) -> &str {
    css.find('{').map_or(css, |end| &css[..end]).trim()
}

fn block(prelude: &str, body: &[String]) -> String {
    let body: Vec<&str> = body
        .iter()
        .map(String::as_str)
        .filter(|part| !part.is_empty())
        .collect();
    if body.is_empty() {
        format!("{} {{}}", prelude)
    } else {
        format!("{} {{ {} }}", prelude, body.join(" "))
    }
}

/// Scope each selector of a comma-separated list
pub fn scope_selector_list(list: &str, scope: &str) -> String {
    split_top_level(list)
        .into_iter()
        .map(|selector| scope_one(selector.trim(), scope))
        .collect::<Vec<_>>()
        .join(", ")
}

fn scope_one(selector: &str, scope: &str) -> String {
    match replace_host(selector, scope) {
        Some(replaced) => replaced,
        None => format!("{} {}", scope, selector),
    }
}

/// Replace every `:host` / `:host(...)` with the scope selector; `None` if
/// the selector has no host reference
fn replace_host(selector: &str, scope: &str) -> Option<String> {
    const HOST: &str = ":host";

    let mut out = String::with_capacity(selector.len() + scope.len());
    let mut rest = selector;
    let mut found = false;

    while let Some(index) = rest.find(HOST) {
        let after = &rest[index + HOST.len()..];
        // `:host-context` and friends are ordinary selectors here
        if after.starts_with(|c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            out.push_str(&rest[..index + HOST.len()]);
            rest = after;
            continue;
        }

        found = true;
        out.push_str(&rest[..index]);
        out.push_str(scope);
        rest = after;

        if rest.starts_with('(') {
            if let Some(close) = matching_paren(rest) {
                out.push_str(rest[1..close].trim());
                rest = &rest[close + 1..];
            }
        }
    }

    out.push_str(rest);
    found.then_some(out)
}

fn matching_paren(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (index, c) in text.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(index);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split on commas outside parentheses, brackets and strings
fn split_top_level(list: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (index, c) in list.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '(' | '[') => depth += 1,
            (None, ')' | ']') => depth -= 1,
            (None, ',') if depth == 0 => {
                parts.push(&list[start..index]);
                start = index + 1;
            }
            _ => {}
        }
    }
    parts.push(&list[start..]);
    parts
}

//! Scoped styles
//!
//! Each template's stylesheet is scoped to its `data-template` marker and all
//! of them are emitted as one `<style>` element in the document head.

pub mod scope;

pub use scope::{scope_selector, scope_stylesheet};

use thiserror::Error;

use crate::parser::ast::{Element, Node};
use crate::template::TemplateRegistry;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StyleError {
    #[error("invalid stylesheet: {0}")]
    Parse(String),

    #[error("failed to print stylesheet: {0}")]
    Print(String),
}

/// Scoped stylesheets of all templates, in registration order
pub fn aggregate(registry: &TemplateRegistry) -> Result<String, StyleError> {
    let mut sheets = Vec::new();
    for template in registry.iter() {
        if let Some(style) = template.style.as_deref() {
            let scoped = scope_stylesheet(style, &template.name)?;
            sheets.push(scoped.trim().to_string());
        }
    }
    Ok(sheets.join("\n"))
}

/// Place `css` in `<style id="{style_id}">`.
///
/// An existing element with that id is refilled. Otherwise the style goes at
/// the end of `<head>`, creating the head inside `<html>` if needed; a
/// document without `<html>` gets it prepended.
pub fn inject(nodes: &mut Vec<Node>, css: &str, style_id: &str) {
    if let Some(existing) = find_by_id(nodes, "style", style_id) {
        existing.children = vec![Node::Text(css.to_string())];
        return;
    }

    let style = Node::Element(
        Element::new("style")
            .with_attr("id", style_id)
            .with_children(vec![Node::Text(css.to_string())]),
    );

    if let Some(head) = top_level(nodes, "head") {
        head.children.push(style);
        return;
    }

    if let Some(html) = top_level(nodes, "html") {
        match top_level(&mut html.children, "head") {
            Some(head) => head.children.push(style),
            None => html
                .children
                .insert(0, Node::Element(Element::new("head").with_children(vec![style]))),
        }
        return;
    }

    nodes.insert(0, style);
}

fn top_level<'a>(nodes: &'a mut [Node], name: &str) -> Option<&'a mut Element> {
    nodes
        .iter_mut()
        .filter_map(Node::as_element_mut)
        .find(|el| el.name == name)
}

fn find_by_id<'a>(nodes: &'a mut [Node], name: &str, id: &str) -> Option<&'a mut Element> {
    for node in nodes {
        if let Node::Element(el) = node {
            if el.name == name && el.attr("id") == Some(id) {
                return Some(el);
            }
            if let Some(found) = find_by_id(&mut el.children, name, id) {
                return Some(found);
            }
        }
    }
    None
}

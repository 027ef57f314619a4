//! Markup serialization

use std::fmt::{self, Display, Write};

use super::ast::{Element, Fragment, Node};

/// Serialize a node list to markup
pub fn to_html(nodes: &[Node]) -> String {
    let mut out = String::new();
    for node in nodes {
        // Writing to a String cannot fail
        let _ = write_node(&mut out, node);
    }
    out
}

fn write_node(out: &mut String, node: &Node) -> fmt::Result {
    match node {
        Node::Text(text) => out.write_str(text),
        Node::Comment(body) => write!(out, "<!--{}-->", body),
        Node::Doctype(body) => write!(out, "<!{}>", body),
        Node::Element(el) => write_element(out, el),
    }
}

fn write_element(out: &mut String, el: &Element) -> fmt::Result {
    write!(out, "<{}", el.name)?;
    for attr in &el.attributes {
        match &attr.value {
            Some(value) => write!(out, " {}=\"{}\"", attr.name, value.replace('"', "&quot;"))?,
            None => write!(out, " {}", attr.name)?,
        }
    }
    out.write_char('>')?;
    if el.is_void() {
        return Ok(());
    }
    for child in &el.children {
        write_node(out, child)?;
    }
    write!(out, "</{}>", el.name)
}

impl Element {
    /// Markup of this element including its own tag
    pub fn outer_html(&self) -> String {
        let mut out = String::new();
        let _ = write_element(&mut out, self);
        out
    }

    /// Markup of the children only
    pub fn inner_html(&self) -> String {
        to_html(&self.children)
    }
}

impl Fragment {
    pub fn to_html(&self) -> String {
        to_html(&self.children)
    }
}

impl Display for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_html())
    }
}

impl Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.outer_html())
    }
}

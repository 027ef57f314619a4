//! Output self-containment check

use std::fmt;

use super::variables::variable_key;
use crate::parser::ast::{Element, Node};

/// A template marker that survived compilation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Leak {
    ImportReference { href: String },
    TemplateDefinition { id: String },
    CustomElement { tag: String },
    PolymorphicElement { template: String },
    VariableMarker { tag: String, attribute: String },
}

impl fmt::Display for Leak {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Leak::ImportReference { href } => write!(f, "import reference `{}`", href),
            Leak::TemplateDefinition { id } => write!(f, "<template id=\"{}\">", id),
            Leak::CustomElement { tag } => write!(f, "unresolved <{}>", tag),
            Leak::PolymorphicElement { template } => {
                write!(f, "unresolved is=\"{}\"", template)
            }
            Leak::VariableMarker { tag, attribute } => {
                write!(f, "`{}` left on <{}>", attribute, tag)
            }
        }
    }
}

/// Every leftover marker in `nodes`, in document order
pub fn verify(nodes: &[Node]) -> Vec<Leak> {
    let mut leaks = Vec::new();
    walk(nodes, &mut leaks);
    leaks
}

fn walk(nodes: &[Node], leaks: &mut Vec<Leak>) {
    for node in nodes {
        if let Node::Element(el) = node {
            check(el, leaks);
            walk(&el.children, leaks);
        }
    }
}

fn check(el: &Element, leaks: &mut Vec<Leak>) {
    if el.name == "link" && el.attr("rel").is_some_and(|r| r.eq_ignore_ascii_case("import")) {
        leaks.push(Leak::ImportReference {
            href: el.attr("href").unwrap_or("").to_string(),
        });
    }
    if el.name == "template" {
        leaks.push(Leak::TemplateDefinition {
            id: el.attr("id").unwrap_or("").to_string(),
        });
    }
    let rendered = el.has_attr("data-template");
    if el.is_custom() && !rendered {
        leaks.push(Leak::CustomElement {
            tag: el.name.clone(),
        });
    }
    if let (Some(template), false) = (el.attr("is"), rendered) {
        leaks.push(Leak::PolymorphicElement {
            template: template.to_string(),
        });
    }
    for attr in &el.attributes {
        if variable_key(&attr.name).is_some() {
            leaks.push(Leak::VariableMarker {
                tag: el.name.clone(),
                attribute: attr.name.clone(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[test]
    fn test_clean_output_has_no_leaks() {
        let doc = parse(r#"<div data-template="x-card" class="card"><p>hi</p></div>"#).unwrap();
        assert!(verify(&doc.children).is_empty());
    }

    #[test]
    fn test_reports_each_leak_kind() {
        let doc = parse(
            r#"<link rel="import" href="a.html">
<template id="x-a"></template>
<x-b></x-b>
<button is="x-c"></button>
<span data-var-title></span>"#,
        )
        .unwrap();
        let leaks = verify(&doc.children);
        assert_eq!(
            leaks,
            vec![
                Leak::ImportReference {
                    href: "a.html".into()
                },
                Leak::TemplateDefinition { id: "x-a".into() },
                Leak::CustomElement { tag: "x-b".into() },
                Leak::PolymorphicElement {
                    template: "x-c".into()
                },
                Leak::VariableMarker {
                    tag: "span".into(),
                    attribute: "data-var-title".into()
                },
            ]
        );
    }
}

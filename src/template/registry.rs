//! Template registry for storing and retrieving template definitions

use std::collections::HashMap;

use thiserror::Error;

use crate::compiler::variables::{variable_key, VAR_PREFIX};
use crate::parser::ast::{take_elements, trim_blank_edges, Element, Node};

/// Errors that can occur during template operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TemplateError {
    /// Template not found in registry
    #[error("template not found: {name}")]
    NotFound { name: String },

    /// Duplicate template definition
    #[error("duplicate template definition: {name}")]
    Duplicate { name: String },

    /// `<template>` without an `id`
    #[error("<template> without an id in {origin}")]
    MissingId { origin: String },

    /// Template id that cannot be used as a custom tag
    #[error("invalid template name `{name}`: custom element names must contain a hyphen")]
    InvalidName { name: String },
}

/// A stored template definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    /// Tag name (the `<template id>`)
    pub name: String,
    /// Markup fragment with slots and variable markers still in place
    pub content: Vec<Node>,
    /// Raw stylesheet text, unscoped
    pub style: Option<String>,
    /// Behavior source; opaque to the compiler
    pub script: Option<String>,
    /// Native wrapper tag (`data-element`)
    pub element: Option<String>,
    /// Class applied to the wrapper or polymorphic host
    pub class_name: Option<String>,
    /// Graph vertex this template was loaded from; `None` for inline templates
    pub source: Option<String>,
    /// Variable keys referenced by `data-var-*` markers, first-seen order
    pub variables: Vec<String>,
}

impl Template {
    /// Build a template from a `<template>` element.
    ///
    /// `<style>` elements inside the content are lifted into [`Template::style`].
    pub fn from_element(element: Element, origin: Option<&str>) -> Result<Self, TemplateError> {
        let name = element
            .non_empty_attr("id")
            .map(str::to_ascii_lowercase)
            .ok_or_else(|| TemplateError::MissingId {
                origin: origin.unwrap_or("inline template").to_string(),
            })?;
        if !name.contains('-') {
            return Err(TemplateError::InvalidName { name });
        }

        let wrapper = element.non_empty_attr("data-element").map(str::to_ascii_lowercase);
        let class_name = element.non_empty_attr("class").map(str::to_string);

        let mut content = element.children;
        let styles = take_elements(&mut content, &|el| el.name == "style");
        let style = join_text(&styles);
        trim_blank_edges(&mut content);

        let variables = declared_variables(&content);

        Ok(Self {
            name,
            content,
            style,
            script: None,
            element: wrapper,
            class_name,
            source: origin.map(str::to_string),
            variables,
        })
    }

    /// Append stylesheet text found next to the `<template>` in its file
    pub fn with_style(mut self, style: Option<String>) -> Self {
        self.style = match (self.style.take(), style) {
            (Some(own), Some(extra)) => Some(format!("{}\n{}", extra, own)),
            (own, extra) => own.or(extra),
        };
        self
    }

    pub fn with_script(mut self, script: Option<String>) -> Self {
        self.script = script;
        self
    }

    /// Wrapper tag, defaulting to `div`
    pub fn wrapper_element(&self) -> &str {
        self.element.as_deref().unwrap_or("div")
    }

    /// Whether content references the given variable key
    pub fn has_variable(&self, key: &str) -> bool {
        self.variables.iter().any(|v| v == key)
    }
}

/// Concatenated text of the given elements, `None` if all empty
pub(crate) fn join_text(elements: &[Element]) -> Option<String> {
    let text = elements
        .iter()
        .map(Element::text_content)
        .filter(|t| !t.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    (!text.is_empty()).then_some(text)
}

fn declared_variables(content: &[Node]) -> Vec<String> {
    fn walk(nodes: &[Node], found: &mut Vec<String>) {
        for node in nodes {
            if let Node::Element(el) = node {
                for attr in &el.attributes {
                    if let Some(key) = variable_key(&attr.name) {
                        if !found.iter().any(|k| k == key) {
                            found.push(key.to_string());
                        }
                    }
                }
                walk(&el.children, found);
            }
        }
    }

    let mut found = Vec::new();
    walk(content, &mut found);
    debug_assert!(found.iter().all(|k| !k.starts_with(VAR_PREFIX)));
    found
}

/// Registry for storing template definitions, in registration order
#[derive(Debug, Default, Clone)]
pub struct TemplateRegistry {
    templates: HashMap<String, Template>,
    order: Vec<String>,
}

impl TemplateRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new template; a second definition of the same name is an error
    pub fn register(&mut self, template: Template) -> Result<(), TemplateError> {
        if self.templates.contains_key(&template.name) {
            return Err(TemplateError::Duplicate {
                name: template.name,
            });
        }
        self.order.push(template.name.clone());
        self.templates.insert(template.name.clone(), template);
        Ok(())
    }

    /// Insert or replace a template wholesale, keeping its registration slot
    pub fn replace(&mut self, template: Template) -> Option<Template> {
        if !self.templates.contains_key(&template.name) {
            self.order.push(template.name.clone());
        }
        self.templates.insert(template.name.clone(), template)
    }

    /// Get a template by name
    pub fn get(&self, name: &str) -> Option<&Template> {
        self.templates.get(name)
    }

    /// Check if a template exists
    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    /// Template names in registration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(|s| s.as_str())
    }

    /// Templates in registration order
    pub fn iter(&self) -> impl Iterator<Item = &Template> {
        self.order.iter().filter_map(|name| self.templates.get(name))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn template_element(source: &str) -> Element {
        let doc = parse(source).expect("Should parse");
        doc.find("template").expect("template element").clone()
    }

    #[test]
    fn test_from_element_reads_metadata() {
        let el = template_element(
            r#"<template id="Hero-Text" data-element="section" class="hero">
                <style>:host { color: red }</style>
                <h1 data-var-title="textcontent"></h1>
                <a data-var-href href="/">link</a>
            </template>"#,
        );
        let template = Template::from_element(el, Some("/hero.html")).expect("Should build");

        assert_eq!(template.name, "hero-text");
        assert_eq!(template.wrapper_element(), "section");
        assert_eq!(template.class_name.as_deref(), Some("hero"));
        assert_eq!(template.style.as_deref(), Some(":host { color: red }"));
        assert_eq!(template.source.as_deref(), Some("/hero.html"));
        assert_eq!(template.variables, vec!["title", "href"]);
        assert!(template.content.first().unwrap().as_element().is_some());
    }

    #[test]
    fn test_name_requires_hyphen() {
        let el = template_element(r#"<template id="card"></template>"#);
        assert_eq!(
            Template::from_element(el, None),
            Err(TemplateError::InvalidName {
                name: "card".to_string()
            })
        );
    }

    #[test]
    fn test_missing_id() {
        let el = template_element("<template><p></p></template>");
        assert!(matches!(
            Template::from_element(el, Some("/a.html")),
            Err(TemplateError::MissingId { .. })
        ));
    }

    #[test]
    fn test_registry_register_and_get() {
        let mut registry = TemplateRegistry::new();
        let el = template_element(r#"<template id="x-box"><p></p></template>"#);
        registry
            .register(Template::from_element(el, None).unwrap())
            .expect("Should register");
        assert!(registry.contains("x-box"));
        assert!(registry.get("x-box").is_some());
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["x-box"]);
    }

    #[test]
    fn test_registry_duplicate_error() {
        let mut registry = TemplateRegistry::new();
        let el = template_element(r#"<template id="x-box"><p></p></template>"#);
        let template = Template::from_element(el, None).unwrap();

        registry
            .register(template.clone())
            .expect("First register should succeed");
        let result = registry.register(template);
        assert!(matches!(result, Err(TemplateError::Duplicate { .. })));
    }

    #[test]
    fn test_replace_keeps_order() {
        let mut registry = TemplateRegistry::new();
        for id in ["x-a", "x-b"] {
            let el = template_element(&format!(r#"<template id="{}"></template>"#, id));
            registry.register(Template::from_element(el, None).unwrap()).unwrap();
        }
        let el = template_element(r#"<template id="x-a"><b>new</b></template>"#);
        let old = registry.replace(Template::from_element(el, None).unwrap());

        assert!(old.is_some());
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["x-a", "x-b"]);
        assert_eq!(registry.get("x-a").unwrap().content.len(), 1);
    }
}

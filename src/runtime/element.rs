//! Per-element render state

use std::rc::Rc;

use super::behavior::Behavior;
use super::document::{LiveDocument, NodeId};
use crate::compiler::variables::{attribute_markers, marker_name, Bindings};
use crate::template::Template;

/// What a defined name renders: the template plus its behavior.
///
/// Hot replacement swaps the `Rc<Definition>` held by each live element.
pub struct Definition {
    pub template: Template,
    pub behavior: Option<Rc<dyn Behavior>>,
}

impl Definition {
    pub fn new(template: Template, behavior: Option<Rc<dyn Behavior>>) -> Self {
        Self { template, behavior }
    }

    pub fn name(&self) -> &str {
        &self.template.name
    }

    /// Host attributes whose changes are propagated
    pub fn observed_attributes(&self) -> Vec<String> {
        self.template
            .variables
            .iter()
            .map(|key| marker_name(key))
            .collect()
    }

    pub fn observes(&self, key: &str) -> bool {
        self.template.has_variable(key)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    CustomTag,
    Polymorphic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Unattached,
    Attached,
    Detached,
}

/// An element in a rendering root listening to one variable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub node: NodeId,
    pub key: String,
    pub target: String,
    /// Templated subscribers receive `data-var-<target>` instead of `<target>`
    pub templated: bool,
}

impl Subscription {
    /// Attribute the value is written to
    pub fn attribute(&self) -> String {
        if self.templated {
            marker_name(&self.target)
        } else {
            self.target.clone()
        }
    }
}

pub struct ElementState {
    pub definition: Rc<Definition>,
    pub kind: ElementKind,
    pub vars: Bindings,
    pub shadow_root: Option<NodeId>,
    pub subscriptions: Vec<Subscription>,
    pub adopted_styles: Vec<String>,
    pub load_listener: bool,
    pub lifecycle: Lifecycle,
}

impl ElementState {
    pub fn new(definition: Rc<Definition>, kind: ElementKind) -> Self {
        Self {
            definition,
            kind,
            vars: Bindings::new(),
            shadow_root: None,
            subscriptions: Vec::new(),
            adopted_styles: Vec::new(),
            load_listener: false,
            lifecycle: Lifecycle::Unattached,
        }
    }

    pub fn is_attached(&self) -> bool {
        self.lifecycle == Lifecycle::Attached
    }
}

/// Template name an element asks for, and how
pub fn usage(document: &LiveDocument, id: NodeId) -> Option<(String, ElementKind)> {
    let tag = document.tag(id)?;
    if tag.contains('-') {
        return Some((tag.to_string(), ElementKind::CustomTag));
    }
    document
        .attr(id, "is")
        .filter(|name| !name.is_empty())
        .map(|name| (name.to_ascii_lowercase(), ElementKind::Polymorphic))
}

/// Marker subscriptions in a rendering root; nested shadow roots are not entered
pub fn collect_subscriptions(document: &LiveDocument, root: NodeId) -> Vec<Subscription> {
    let mut subscriptions = Vec::new();
    for id in document.descendants(root) {
        let Some(element) = document.element(id) else {
            continue;
        };
        let templated = usage(document, id).is_some();
        for marker in attribute_markers(&element.attributes) {
            subscriptions.push(Subscription {
                node: id,
                key: marker.key,
                target: marker.target,
                templated,
            });
        }
    }
    subscriptions
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_usage_kinds() {
        let doc =
            LiveDocument::parse(r#"<x-card></x-card><section is="Hero-Text"></section><p is=""></p>"#)
                .unwrap();
        let ids = doc.descendants(doc.root());
        assert_eq!(
            usage(&doc, ids[0]),
            Some(("x-card".to_string(), ElementKind::CustomTag))
        );
        assert_eq!(
            usage(&doc, ids[1]),
            Some(("hero-text".to_string(), ElementKind::Polymorphic))
        );
        assert_eq!(usage(&doc, ids[2]), None);
    }

    #[test]
    fn test_collect_subscriptions() {
        let doc = LiveDocument::parse(
            r#"<a data-var-url="href"></a><x-icon data-var-name></x-icon><p><b data-var-title></b></p>"#,
        )
        .unwrap();
        let subs = collect_subscriptions(&doc, doc.root());
        let summary: Vec<_> = subs
            .iter()
            .map(|s| (s.key.as_str(), s.attribute()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("url", "href".to_string()),
                ("name", "data-var-name".to_string()),
                ("title", "title".to_string()),
            ]
        );
    }
}

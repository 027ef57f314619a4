//! Variable markers and usage-site bindings
//!
//! In template content, `data-var-<key>` marks an attribute to be filled from
//! the usage site. The marker's value, if any, names the target attribute;
//! otherwise the target is `<key>` itself.

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::parser::ast::{Attribute, Element, Node};

pub const VAR_PREFIX: &str = "data-var-";

const LEGACY_PREFIX: &str = "data-";

/// `data-*` attributes that are never read as legacy bindings
const RESERVED: &[&str] = &["data-template", "data-element"];

/// Key of a `data-var-<key>` attribute name
pub fn variable_key(attr_name: &str) -> Option<&str> {
    attr_name
        .strip_prefix(VAR_PREFIX)
        .filter(|key| !key.is_empty())
}

pub fn marker_name(key: &str) -> String {
    format!("{}{}", VAR_PREFIX, key)
}

/// One `data-var-*` marker on a content element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker {
    pub key: String,
    /// Attribute written on native elements, or `data-var-<target>` on templated ones
    pub target: String,
}

impl Marker {
    pub fn attr_name(&self) -> String {
        marker_name(&self.key)
    }
}

/// Markers on an element, in attribute order
pub fn markers(element: &Element) -> Vec<Marker> {
    attribute_markers(&element.attributes)
}

pub fn attribute_markers(attributes: &[Attribute]) -> Vec<Marker> {
    attributes
        .iter()
        .filter_map(|attr| {
            let key = variable_key(&attr.name)?;
            let target = attr
                .value
                .as_deref()
                .map(|v| v.strip_prefix(VAR_PREFIX).unwrap_or(v))
                .filter(|v| !v.is_empty())
                .unwrap_or(key);
            Some(Marker {
                key: key.to_string(),
                target: target.to_string(),
            })
        })
        .collect()
}

/// Values supplied at a usage site
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bindings {
    values: Vec<(String, String)>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read `data-var-<key>` and legacy `data-<key>` attributes. Valueless or
    /// empty attributes supply nothing; `data-var-` wins over the legacy form.
    pub fn from_usage(element: &Element) -> Self {
        let mut bindings = Self::new();
        for attr in &element.attributes {
            if let (Some(key), Some(value)) = (variable_key(&attr.name), attr.value.as_deref()) {
                if !value.is_empty() {
                    bindings.insert(key, value);
                }
            }
        }
        for attr in &element.attributes {
            if RESERVED.contains(&attr.name.as_str()) || attr.name.starts_with(VAR_PREFIX) {
                continue;
            }
            let Some(key) = attr.name.strip_prefix(LEGACY_PREFIX) else {
                continue;
            };
            match attr.value.as_deref() {
                Some(value) if !key.is_empty() && !value.is_empty() && bindings.get(key).is_none() => {
                    bindings.insert(key, value)
                }
                _ => {}
            }
        }
        bindings
    }

    /// Set a value, replacing an earlier one
    pub fn insert(&mut self, key: &str, value: &str) {
        match self.values.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.values.push((key.to_string(), value.to_string())),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Substitute `bindings` into every marked element of `nodes`, removing the
/// markers of native elements. Templated elements receive supplied values as
/// `data-var-<target>` for their own pass and keep unsupplied markers as is.
pub fn bind_variables(
    nodes: &mut [Node],
    template: &str,
    bindings: &Bindings,
    diagnostics: &mut Diagnostics,
) {
    for node in nodes {
        if let Node::Element(element) = node {
            bind_element(element, template, bindings, diagnostics);
            bind_variables(&mut element.children, template, bindings, diagnostics);
        }
    }
}

fn bind_element(
    element: &mut Element,
    template: &str,
    bindings: &Bindings,
    diagnostics: &mut Diagnostics,
) {
    let found = markers(element);
    if found.is_empty() {
        return;
    }

    // An unsupplied marker on a templated element is a literal binding for
    // the nested template's own pass
    if element.is_templated() {
        for marker in found {
            if let Some(value) = bindings.get(&marker.key) {
                element.remove_attr(&marker.attr_name());
                element.set_attr(marker_name(&marker.target), value);
            }
        }
        return;
    }

    for marker in &found {
        element.remove_attr(&marker.attr_name());
    }
    for marker in found {
        match bindings.get(&marker.key) {
            Some(value) => element.set_attr(marker.target, value),
            None if element.non_empty_attr(&marker.target).is_some() => {}
            None => diagnostics.push(Diagnostic::MissingVariable {
                template: template.to_string(),
                variable: marker.key,
            }),
        }
    }
}

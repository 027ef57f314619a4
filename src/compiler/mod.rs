//! Template compiler - rewrites usage sites into resolved markup
//!
//! A usage site is either a tag named after a registered template
//! (`<user-card>`) or any element with `is="user-card"`. Each pass rewrites
//! every usage it finds without descending into the content it just produced,
//! so nested usages are picked up by the following pass. Compilation stops at
//! the first pass that finds nothing to do.

pub mod slots;
pub mod variables;
pub mod verify;

use crate::config::CompileConfig;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::parser::ast::{Element, Node};
use crate::template::{Template, TemplateRegistry};
use crate::CompileError;

pub use slots::fill_slots;
pub use variables::{bind_variables, Bindings};
pub use verify::{verify, Leak};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UsageKind {
    CustomTag,
    Polymorphic,
}

pub struct Compiler<'a> {
    registry: &'a TemplateRegistry,
    config: &'a CompileConfig,
}

impl<'a> Compiler<'a> {
    pub fn new(registry: &'a TemplateRegistry, config: &'a CompileConfig) -> Self {
        Self { registry, config }
    }

    /// Pass limit: one pass per template plus the confirming pass
    pub fn max_passes(&self) -> usize {
        self.config
            .max_passes
            .unwrap_or(self.registry.len() + 1)
    }

    /// Run passes until none rewrites anything. Returns the number of
    /// productive passes.
    pub fn compile(
        &self,
        nodes: &mut Vec<Node>,
        diagnostics: &mut Diagnostics,
    ) -> Result<usize, CompileError> {
        let limit = self.max_passes();
        let mut passes = 0;
        loop {
            if passes >= limit {
                return Err(CompileError::RecursiveUsage { passes });
            }
            let rewritten = self.pass(nodes, diagnostics);
            passes += 1;
            crate::debug!("compile"; "pass {} rewrote {} usage sites", passes, rewritten);
            if rewritten == 0 {
                break;
            }
        }

        self.report_unresolved(nodes, diagnostics);
        Ok(passes - 1)
    }

    /// One pass over `nodes`; returns the number of usages rewritten
    pub fn pass(&self, nodes: &mut [Node], diagnostics: &mut Diagnostics) -> usize {
        let mut rewritten = 0;
        for node in nodes.iter_mut() {
            let Node::Element(el) = node else { continue };
            match self.usage(el) {
                Some((template, kind)) => {
                    let usage = std::mem::replace(el, Element::new(""));
                    *el = self.expand(usage, template, kind, diagnostics);
                    rewritten += 1;
                }
                None => rewritten += self.pass(&mut el.children, diagnostics),
            }
        }
        rewritten
    }

    fn usage(&self, el: &Element) -> Option<(&'a Template, UsageKind)> {
        if el.has_attr("data-template") {
            return None;
        }
        if let Some(template) = self.registry.get(&el.name) {
            return Some((template, UsageKind::CustomTag));
        }
        let name = el.non_empty_attr("is")?.to_ascii_lowercase();
        self.registry
            .get(&name)
            .map(|template| (template, UsageKind::Polymorphic))
    }

    fn expand(
        &self,
        mut usage: Element,
        template: &Template,
        kind: UsageKind,
        diagnostics: &mut Diagnostics,
    ) -> Element {
        let mut content = template.content.clone();
        let children = std::mem::take(&mut usage.children);
        fill_slots(&mut content, children, &self.config.flatten);

        let bindings = Bindings::from_usage(&usage);
        bind_variables(&mut content, &template.name, &bindings, diagnostics);

        match kind {
            UsageKind::CustomTag => {
                let mut wrapper = Element::new(template.wrapper_element())
                    .with_attr("data-template", template.name.as_str());
                if let Some(class) = &template.class_name {
                    wrapper.set_attr("class", class.as_str());
                }
                wrapper.with_children(content)
            }
            UsageKind::Polymorphic => {
                usage.remove_attr("is");
                usage
                    .attributes
                    .retain(|a| variables::variable_key(&a.name).is_none());
                usage.set_attr("data-template", template.name.as_str());
                if let Some(class) = &template.class_name {
                    usage.merge_classes(class);
                }
                usage.with_children(content)
            }
        }
    }

    fn report_unresolved(&self, nodes: &[Node], diagnostics: &mut Diagnostics) {
        for node in nodes {
            let Node::Element(el) = node else { continue };
            if !el.has_attr("data-template") {
                if let Some(name) = el.attr("is") {
                    diagnostics.push(Diagnostic::UnresolvedPolymorphicTemplate {
                        template: name.to_string(),
                    });
                } else if el.is_custom() {
                    diagnostics.push(Diagnostic::UnresolvedCustomElement {
                        tag: el.name.clone(),
                    });
                }
            }
            self.report_unresolved(&el.children, diagnostics);
        }
    }
}

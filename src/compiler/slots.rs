//! Slot filling
//!
//! `<slot name="X">` placeholders in template content receive the usage
//! site's direct children marked `slot="X"`. An unnamed `<slot>` receives the
//! children that carry no `slot` attribute.

use crate::config::FlattenPolicy;
use crate::parser::ast::{trim_blank_edges, Element, Node};

/// Usage-site children grouped by target slot
#[derive(Debug, Default)]
struct SlotContent {
    named: Vec<(String, Vec<Node>)>,
    default: Vec<Node>,
}

impl SlotContent {
    fn collect(children: Vec<Node>, policy: &FlattenPolicy) -> Self {
        let mut content = SlotContent::default();
        for node in children {
            match node {
                Node::Element(mut el) if el.has_attr("slot") => {
                    let name = el
                        .remove_attr("slot")
                        .map(|a| a.value_str().to_string())
                        .unwrap_or_default();
                    let nodes = if policy.applies(&el) {
                        el.children
                    } else {
                        vec![Node::Element(el)]
                    };
                    match content.named.iter_mut().find(|(n, _)| *n == name) {
                        Some((_, bucket)) => bucket.extend(nodes),
                        None => content.named.push((name, nodes)),
                    }
                }
                other => content.default.push(other),
            }
        }
        trim_blank_edges(&mut content.default);
        content
    }

    fn for_slot(&self, slot: &Element) -> Vec<Node> {
        match slot.non_empty_attr("name") {
            Some(name) => self
                .named
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, nodes)| nodes.clone())
                .unwrap_or_default(),
            None => self.default.clone(),
        }
    }
}

/// Replace every `<slot>` in `content` with the matching usage children.
/// Inserted nodes are not searched for further slots.
pub fn fill_slots(content: &mut Vec<Node>, usage_children: Vec<Node>, policy: &FlattenPolicy) {
    let slotted = SlotContent::collect(usage_children, policy);
    replace_slots(content, &slotted);
}

fn replace_slots(nodes: &mut Vec<Node>, slotted: &SlotContent) {
    let mut out = Vec::with_capacity(nodes.len());
    for node in nodes.drain(..) {
        match node {
            Node::Element(el) if el.name == "slot" => out.extend(slotted.for_slot(&el)),
            Node::Element(mut el) => {
                replace_slots(&mut el.children, slotted);
                out.push(Node::Element(el));
            }
            other => out.push(other),
        }
    }
    *nodes = out;
}

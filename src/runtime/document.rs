//! Live document model
//!
//! An arena of nodes addressed by [`NodeId`]. Ids stay valid for the life of
//! the document: detached nodes remain in the arena, so a node can be removed
//! and re-inserted without losing its identity or its shadow root.

use crate::error::ParseError;
use crate::parser::ast::{Attribute, Element, Node};
use crate::parser::{parse, to_html};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementData {
    pub name: String,
    pub attributes: Vec<Attribute>,
}

impl ElementData {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(Attribute::value_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    Document,
    ShadowRoot,
    Element(ElementData),
    Text(String),
    Comment(String),
    Doctype(String),
}

#[derive(Debug, Clone)]
struct LiveNode {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    /// Shadow root attached to an element
    shadow_root: Option<NodeId>,
    /// Element owning a shadow root
    host: Option<NodeId>,
}

impl LiveNode {
    fn new(data: NodeData) -> Self {
        Self {
            data,
            parent: None,
            children: Vec::new(),
            shadow_root: None,
            host: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LiveDocument {
    nodes: Vec<LiveNode>,
}

impl Default for LiveDocument {
    fn default() -> Self {
        Self {
            nodes: vec![LiveNode::new(NodeData::Document)],
        }
    }
}

impl LiveDocument {
    pub fn parse(html: &str) -> Result<Self, Vec<ParseError>> {
        Ok(Self::from_nodes(parse(html)?.children))
    }

    pub fn from_nodes(nodes: Vec<Node>) -> Self {
        let mut document = Self::default();
        let root = document.root();
        document.append_nodes(root, nodes);
        document
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        id.0 < self.nodes.len()
    }

    pub fn data(&self, id: NodeId) -> Option<&NodeData> {
        self.nodes.get(id.0).map(|n| &n.data)
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        match self.data(id)? {
            NodeData::Element(el) => Some(el),
            _ => None,
        }
    }

    fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        match self.nodes.get_mut(id.0).map(|n| &mut n.data) {
            Some(NodeData::Element(el)) => Some(el),
            _ => None,
        }
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|el| el.name.as_str())
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)?.attr(name)
    }

    /// Set an attribute; returns the previous value
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) -> Option<String> {
        let el = self.element_mut(id)?;
        match el.attributes.iter_mut().find(|a| a.name == name) {
            Some(attr) => attr.value.replace(value.to_string()),
            None => {
                el.attributes.push(Attribute::new(name, value));
                None
            }
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) -> Option<Attribute> {
        let el = self.element_mut(id)?;
        let index = el.attributes.iter().position(|a| a.name == name)?;
        Some(el.attributes.remove(index))
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0)?.parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id.0)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    /// Element children only
    pub fn child_elements(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|c| self.element(*c).is_some())
            .collect()
    }

    pub fn shadow_root(&self, host: NodeId) -> Option<NodeId> {
        self.nodes.get(host.0)?.shadow_root
    }

    pub fn host(&self, shadow_root: NodeId) -> Option<NodeId> {
        self.nodes.get(shadow_root.0)?.host
    }

    /// Shadow root of `host`, created if it has none
    pub fn attach_shadow(&mut self, host: NodeId) -> NodeId {
        if let Some(existing) = self.shadow_root(host) {
            return existing;
        }
        let id = self.push(LiveNode {
            host: Some(host),
            ..LiveNode::new(NodeData::ShadowRoot)
        });
        self.nodes[host.0].shadow_root = Some(id);
        id
    }

    fn push(&mut self, node: LiveNode) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    /// Append a markup tree under `parent`; returns the ids of the new top-level nodes
    pub fn append_nodes(&mut self, parent: NodeId, nodes: Vec<Node>) -> Vec<NodeId> {
        nodes
            .into_iter()
            .map(|node| self.append_node(parent, node))
            .collect()
    }

    fn append_node(&mut self, parent: NodeId, node: Node) -> NodeId {
        let (data, children) = match node {
            Node::Element(Element {
                name,
                attributes,
                children,
            }) => (NodeData::Element(ElementData { name, attributes }), children),
            Node::Text(text) => (NodeData::Text(text), Vec::new()),
            Node::Comment(text) => (NodeData::Comment(text), Vec::new()),
            Node::Doctype(text) => (NodeData::Doctype(text), Vec::new()),
        };
        let id = self.push(LiveNode {
            parent: Some(parent),
            ..LiveNode::new(data)
        });
        self.nodes[parent.0].children.push(id);
        for child in children {
            self.append_node(id, child);
        }
        id
    }

    /// Move a (detached) node to the end of `parent`'s children
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    /// Unlink a node from its parent. It stays in the arena.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes.get_mut(id.0).and_then(|n| n.parent.take()) {
            self.nodes[parent.0].children.retain(|c| *c != id);
        }
    }

    /// Detach every child of `id`
    pub fn clear_children(&mut self, id: NodeId) {
        let children = std::mem::take(&mut self.nodes[id.0].children);
        for child in children {
            self.nodes[child.0].parent = None;
        }
    }

    /// Whether the node is reachable from the document root, through shadow
    /// hosts where needed
    pub fn is_connected(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == self.root() {
                return true;
            }
            current = self.parent(node).or_else(|| self.host(node));
        }
        false
    }

    /// Elements under `scope` in document order, not entering shadow roots
    pub fn descendants(&self, scope: NodeId) -> Vec<NodeId> {
        let mut found = Vec::new();
        self.collect(scope, false, &mut found);
        found
    }

    /// Elements under `scope` in document order, shadow trees included
    /// (a host's shadow tree before its light children)
    pub fn deep_descendants(&self, scope: NodeId) -> Vec<NodeId> {
        let mut found = Vec::new();
        self.collect(scope, true, &mut found);
        found
    }

    fn collect(&self, id: NodeId, deep: bool, found: &mut Vec<NodeId>) {
        for &child in self.children(id) {
            if self.element(child).is_none() {
                continue;
            }
            found.push(child);
            if deep {
                if let Some(shadow) = self.shadow_root(child) {
                    self.collect(shadow, deep, found);
                }
            }
            self.collect(child, deep, found);
        }
    }

    /// First element (deep) whose `id` attribute matches
    pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        self.deep_descendants(self.root())
            .into_iter()
            .find(|n| self.attr(*n, "id") == Some(id))
    }

    /// Elements under `scope` (light tree only) with the given tag
    pub fn elements_by_tag(&self, scope: NodeId, tag: &str) -> Vec<NodeId> {
        self.descendants(scope)
            .into_iter()
            .filter(|n| self.tag(*n) == Some(tag))
            .collect()
    }

    /// Rebuild the markup tree of a node's light children
    pub fn to_nodes(&self, id: NodeId) -> Vec<Node> {
        self.children(id)
            .iter()
            .filter_map(|child| self.to_node(*child))
            .collect()
    }

    fn to_node(&self, id: NodeId) -> Option<Node> {
        Some(match self.data(id)? {
            NodeData::Element(el) => Node::Element(Element {
                name: el.name.clone(),
                attributes: el.attributes.clone(),
                children: self.to_nodes(id),
            }),
            NodeData::Text(text) => Node::Text(text.clone()),
            NodeData::Comment(text) => Node::Comment(text.clone()),
            NodeData::Doctype(text) => Node::Doctype(text.clone()),
            NodeData::Document | NodeData::ShadowRoot => return None,
        })
    }

    /// Markup of a node's light children
    pub fn inner_html(&self, id: NodeId) -> String {
        to_html(&self.to_nodes(id))
    }

    /// Markup of the element itself
    pub fn outer_html(&self, id: NodeId) -> String {
        self.to_node(id)
            .map(|node| to_html(std::slice::from_ref(&node)))
            .unwrap_or_default()
    }

    /// Markup rendered into a host's shadow root
    pub fn shadow_html(&self, host: NodeId) -> Option<String> {
        self.shadow_root(host).map(|root| self.inner_html(root))
    }

    /// Light-tree markup of the whole document
    pub fn to_html(&self) -> String {
        self.inner_html(self.root())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_light_tree() {
        let html = r#"<div id="a"><p>hi</p><br></div>"#;
        let doc = LiveDocument::parse(html).unwrap();
        assert_eq!(doc.to_html(), html);
    }

    #[test]
    fn test_shadow_root_is_reused() {
        let mut doc = LiveDocument::parse("<x-a></x-a>").unwrap();
        let host = doc.elements_by_tag(doc.root(), "x-a")[0];
        let first = doc.attach_shadow(host);
        let second = doc.attach_shadow(host);
        assert_eq!(first, second);
        assert_eq!(doc.host(first), Some(host));
    }

    #[test]
    fn test_deep_descendants_enter_shadow_roots() {
        let mut doc = LiveDocument::parse("<x-a><i></i></x-a>").unwrap();
        let host = doc.elements_by_tag(doc.root(), "x-a")[0];
        let shadow = doc.attach_shadow(host);
        let inner = doc.append_nodes(shadow, vec![Node::Element(Element::new("b"))]);

        assert_eq!(doc.descendants(doc.root()).len(), 2);
        let deep = doc.deep_descendants(doc.root());
        assert_eq!(deep.len(), 3);
        assert_eq!(deep[1], inner[0]);
        assert!(doc.is_connected(inner[0]));
        assert_eq!(doc.shadow_html(host).as_deref(), Some("<b></b>"));
        assert_eq!(doc.to_html(), "<x-a><i></i></x-a>");
    }

    #[test]
    fn test_detach_and_reinsert_keeps_identity() {
        let mut doc = LiveDocument::parse("<main></main><aside><p id=\"p\"></p></aside>").unwrap();
        let p = doc.get_element_by_id("p").unwrap();
        doc.detach(p);
        assert!(!doc.is_connected(p));

        let main = doc.elements_by_tag(doc.root(), "main")[0];
        doc.append_child(main, p);
        assert!(doc.is_connected(p));
        assert_eq!(doc.to_html(), r#"<main><p id="p"></p></main><aside></aside>"#);
    }

    #[test]
    fn test_set_attr_returns_previous() {
        let mut doc = LiveDocument::parse(r#"<a href="/x"></a>"#).unwrap();
        let a = doc.elements_by_tag(doc.root(), "a")[0];
        assert_eq!(doc.set_attr(a, "href", "/y"), Some("/x".to_string()));
        assert_eq!(doc.set_attr(a, "title", "t"), None);
        assert_eq!(doc.outer_html(a), r#"<a href="/y" title="t"></a>"#);
    }
}

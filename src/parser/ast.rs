//! Markup tree types shared by the build-time compiler and the live runtime

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

/// Elements that never have children or an end tag
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Elements whose body is raw text rather than markup
pub const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea", "title"];

/// A single attribute. `value` is `None` for boolean attributes (`<input hidden>`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: Option<String>,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
        }
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
        }
    }

    /// The value, or `""` for a boolean attribute
    pub fn value_str(&self) -> &str {
        self.value.as_deref().unwrap_or("")
    }
}

/// A node in the markup tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
    Comment(String),
    Doctype(String),
}

impl Node {
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            Node::Element(el) => Some(el),
            _ => None,
        }
    }

    /// True for text nodes containing only whitespace
    pub fn is_blank(&self) -> bool {
        matches!(self, Node::Text(t) if t.trim().is_empty())
    }
}

/// An element with its attributes (in source order) and children
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<Attribute>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Builder-style attribute setter
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    /// Builder-style children setter
    pub fn with_children(mut self, children: Vec<Node>) -> Self {
        self.children = children;
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Attribute value; boolean attributes read as `""`
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attribute(name).map(Attribute::value_str)
    }

    /// Attribute value if present and non-empty
    pub fn non_empty_attr(&self, name: &str) -> Option<&str> {
        self.attr(name).filter(|v| !v.is_empty())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }

    /// Set an attribute, replacing an existing value in place
    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|a| a.name == name) {
            Some(attr) => attr.value = Some(value),
            None => self.attributes.push(Attribute {
                name,
                value: Some(value),
            }),
        }
    }

    pub fn remove_attr(&mut self, name: &str) -> Option<Attribute> {
        let index = self.attributes.iter().position(|a| a.name == name)?;
        Some(self.attributes.remove(index))
    }

    pub fn is_void(&self) -> bool {
        VOID_ELEMENTS.contains(&self.name.as_str())
    }

    /// Custom-element-style tag name (contains a hyphen)
    pub fn is_custom(&self) -> bool {
        self.name.contains('-')
    }

    /// Rendered by a template: custom tag or polymorphic `is` attribute
    pub fn is_templated(&self) -> bool {
        self.is_custom() || self.has_attr("is")
    }

    /// Union the given classes into the `class` attribute, keeping existing order first
    pub fn merge_classes(&mut self, classes: &str) {
        let mut merged: Vec<String> = self
            .attr("class")
            .unwrap_or("")
            .split_whitespace()
            .map(str::to_string)
            .collect();
        for class in classes.split_whitespace() {
            if !merged.iter().any(|c| c == class) {
                merged.push(class.to_string());
            }
        }
        if !merged.is_empty() {
            self.set_attr("class", merged.join(" "));
        }
    }

    /// Concatenated text of all descendant text nodes
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(&self.children, &mut out);
        out
    }
}

fn collect_text(nodes: &[Node], out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(t) => out.push_str(t),
            Node::Element(el) => collect_text(&el.children, out),
            _ => {}
        }
    }
}

/// A parsed document or document fragment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fragment {
    pub children: Vec<Node>,
}

impl Fragment {
    pub fn new(children: Vec<Node>) -> Self {
        Self { children }
    }

    /// All elements in document order
    pub fn elements(&self) -> Vec<&Element> {
        let mut found = Vec::new();
        collect_elements(&self.children, &mut found);
        found
    }

    /// First element with the given tag name, in document order
    pub fn find(&self, name: &str) -> Option<&Element> {
        self.elements().into_iter().find(|el| el.name == name)
    }
}

fn collect_elements<'a>(nodes: &'a [Node], found: &mut Vec<&'a Element>) {
    for node in nodes {
        if let Node::Element(el) = node {
            found.push(el);
            collect_elements(&el.children, found);
        }
    }
}

/// Remove every element matching `pred` (searching depth-first, not inside
/// removed elements) and return them in document order.
pub fn take_elements(nodes: &mut Vec<Node>, pred: &dyn Fn(&Element) -> bool) -> Vec<Element> {
    let mut taken = Vec::new();
    take_into(nodes, pred, &mut taken);
    taken
}

fn take_into(nodes: &mut Vec<Node>, pred: &dyn Fn(&Element) -> bool, taken: &mut Vec<Element>) {
    let mut kept = Vec::with_capacity(nodes.len());
    for node in nodes.drain(..) {
        match node {
            Node::Element(el) if pred(&el) => taken.push(el),
            Node::Element(mut el) => {
                take_into(&mut el.children, pred, taken);
                kept.push(Node::Element(el));
            }
            other => kept.push(other),
        }
    }
    *nodes = kept;
}

/// Visit every element mutably, parents before children
pub fn for_each_element_mut(nodes: &mut [Node], f: &mut dyn FnMut(&mut Element)) {
    for node in nodes {
        if let Node::Element(el) = node {
            f(el);
            for_each_element_mut(&mut el.children, f);
        }
    }
}

/// Drop whitespace-only text nodes at both ends
pub fn trim_blank_edges(nodes: &mut Vec<Node>) {
    while nodes.first().is_some_and(Node::is_blank) {
        nodes.remove(0);
    }
    while nodes.last().is_some_and(Node::is_blank) {
        nodes.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_attr_replaces_in_place() {
        let mut el = Element::new("a").with_attr("href", "/a").with_attr("id", "x");
        el.set_attr("href", "/b");
        assert_eq!(el.attributes[0], Attribute::new("href", "/b"));
        assert_eq!(el.attributes.len(), 2);
    }

    #[test]
    fn test_merge_classes_is_a_union() {
        let mut el = Element::new("button").with_attr("class", "btn primary");
        el.merge_classes("primary card");
        assert_eq!(el.attr("class"), Some("btn primary card"));
    }

    #[test]
    fn test_take_elements_skips_inside_taken() {
        let inner = Element::new("link").with_attr("rel", "import");
        let outer = Element::new("link")
            .with_attr("rel", "import")
            .with_children(vec![Node::Element(inner)]);
        let mut nodes = vec![
            Node::Element(Element::new("div").with_children(vec![Node::Element(outer)])),
            Node::Text("x".into()),
        ];

        let taken = take_elements(&mut nodes, &|el| el.name == "link");
        assert_eq!(taken.len(), 1);
        assert_eq!(nodes.len(), 2);
        assert!(nodes[0].as_element().unwrap().children.is_empty());
    }

    #[test]
    fn test_trim_blank_edges() {
        let mut nodes = vec![
            Node::Text("\n  ".into()),
            Node::Element(Element::new("p")),
            Node::Text(" ".into()),
        ];
        trim_blank_edges(&mut nodes);
        assert_eq!(nodes.len(), 1);
    }
}

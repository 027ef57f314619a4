//! Dependency graph of template sources
//!
//! An edge `from -> to` means "`from` imports `to`". It is stored on `to` as an
//! incoming edge, so walking the incoming direction from a vertex visits every
//! template that (transitively) imports it, up to the synthetic root.

use std::collections::{HashMap, HashSet};

use thiserror::Error;

/// Vertex name used for the top-level document
pub const ROOT_VERTEX: &str = "root";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// Inserting an edge would close a cycle
    #[error("circular dependencies detected: {}", cycle.join(" <- "))]
    CircularDependency { cycle: Vec<String> },
}

/// A template source in the graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vertex {
    /// Resolved source path (or [`ROOT_VERTEX`])
    pub name: String,
    /// Names of the vertices importing this one, in insertion order
    pub incoming: Vec<String>,
    /// Declared template id, once the source has been parsed
    pub value: Option<String>,
}

#[derive(Debug, Default, Clone)]
pub struct DependencyGraph {
    vertices: HashMap<String, Vertex>,
    names: Vec<String>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create a vertex
    pub fn add_vertex(&mut self, name: &str) -> &Vertex {
        if !self.vertices.contains_key(name) {
            self.names.push(name.to_string());
            self.vertices.insert(
                name.to_string(),
                Vertex {
                    name: name.to_string(),
                    incoming: Vec::new(),
                    value: None,
                },
            );
        }
        &self.vertices[name]
    }

    /// Record the template id declared by a source
    pub fn set_value(&mut self, name: &str, value: impl Into<String>) {
        self.add_vertex(name);
        if let Some(vertex) = self.vertices.get_mut(name) {
            vertex.value = Some(value.into());
        }
    }

    /// Record that `from` imports `to`.
    ///
    /// A repeated edge is a no-op. An edge whose target already (transitively)
    /// imports `from` is rejected with the cycle path.
    pub fn add_edge(&mut self, from: &str, to: &str) -> Result<(), GraphError> {
        self.add_vertex(from);
        self.add_vertex(to);

        if self.vertices[to].incoming.iter().any(|n| n == from) {
            return Ok(());
        }

        self.visit_dag(from, &mut |vertex, path| {
            if vertex.name == to {
                let mut cycle = Vec::with_capacity(path.len() + 1);
                cycle.push(to.to_string());
                cycle.extend(path.iter().cloned());
                return Err(GraphError::CircularDependency { cycle });
            }
            Ok(())
        })?;

        if let Some(vertex) = self.vertices.get_mut(to) {
            vertex.incoming.push(from.to_string());
        }
        Ok(())
    }

    /// Depth-first post-order walk along incoming edges.
    ///
    /// Every importer of a vertex is visited before the callback runs on the
    /// vertex itself. `path` is the chain from `start` to the current vertex
    /// (inclusive). Each vertex is visited at most once.
    pub fn visit_dag<E>(
        &self,
        start: &str,
        callback: &mut dyn FnMut(&Vertex, &[String]) -> Result<(), E>,
    ) -> Result<(), E> {
        let mut visited = HashSet::new();
        let mut path = Vec::new();
        if let Some(vertex) = self.vertices.get(start) {
            self.visit(vertex, callback, &mut visited, &mut path)?;
        }
        Ok(())
    }

    fn visit<'a, E>(
        &'a self,
        vertex: &'a Vertex,
        callback: &mut dyn FnMut(&Vertex, &[String]) -> Result<(), E>,
        visited: &mut HashSet<&'a str>,
        path: &mut Vec<String>,
    ) -> Result<(), E> {
        if !visited.insert(vertex.name.as_str()) {
            return Ok(());
        }

        path.push(vertex.name.clone());
        for name in &vertex.incoming {
            if let Some(importer) = self.vertices.get(name) {
                self.visit(importer, callback, visited, path)?;
            }
        }
        callback(vertex, path)?;
        path.pop();
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Vertex> {
        self.vertices.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vertices.contains_key(name)
    }

    /// Vertex names in insertion order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Known source with the longest name that is a suffix of `path`
    pub fn find_by_suffix(&self, path: &str) -> Option<&str> {
        self.names()
            .filter(|name| *name != ROOT_VERTEX && path.ends_with(name))
            .max_by_key(|name| name.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_vertex_is_idempotent() {
        let mut graph = DependencyGraph::new();
        graph.add_vertex("/a.html");
        graph.set_value("/a.html", "x-a");
        graph.add_vertex("/a.html");
        assert_eq!(graph.len(), 1);
        assert_eq!(graph.get("/a.html").unwrap().value.as_deref(), Some("x-a"));
    }

    #[test]
    fn test_diamond_edges_are_recorded_once() {
        let mut graph = DependencyGraph::new();
        graph.add_edge(ROOT_VERTEX, "/a.html").unwrap();
        graph.add_edge(ROOT_VERTEX, "/b.html").unwrap();
        graph.add_edge("/a.html", "/shared.html").unwrap();
        graph.add_edge("/b.html", "/shared.html").unwrap();
        graph.add_edge("/b.html", "/shared.html").unwrap();

        let shared = graph.get("/shared.html").unwrap();
        assert_eq!(shared.incoming, vec!["/a.html", "/b.html"]);
        assert_eq!(graph.len(), 4);
    }

    #[test]
    fn test_cycle_is_rejected_with_path() {
        let mut graph = DependencyGraph::new();
        graph.add_edge("A", "B").unwrap();
        graph.add_edge("B", "C").unwrap();
        let err = graph.add_edge("C", "A").unwrap_err();

        let GraphError::CircularDependency { cycle } = &err;
        assert_eq!(cycle, &vec!["A", "C", "B", "A"]);
        assert_eq!(
            err.to_string(),
            "circular dependencies detected: A <- C <- B <- A"
        );
        // Rejected edge is not recorded
        assert!(graph.get("A").unwrap().incoming.is_empty());
    }

    #[test]
    fn test_self_import_is_a_cycle() {
        let mut graph = DependencyGraph::new();
        assert!(graph.add_edge("A", "A").is_err());
    }

    #[test]
    fn test_visit_is_post_order_over_importers() {
        let mut graph = DependencyGraph::new();
        graph.add_edge(ROOT_VERTEX, "/page.html").unwrap();
        graph.add_edge("/page.html", "/card.html").unwrap();
        graph.add_edge("/card.html", "/icon.html").unwrap();

        let mut order = Vec::new();
        graph
            .visit_dag::<()>("/icon.html", &mut |vertex, _| {
                order.push(vertex.name.clone());
                Ok(())
            })
            .unwrap();
        assert_eq!(order, vec![ROOT_VERTEX, "/page.html", "/card.html", "/icon.html"]);
    }

    #[test]
    fn test_find_by_suffix() {
        let mut graph = DependencyGraph::new();
        graph.add_edge(ROOT_VERTEX, "/components/card.html").unwrap();
        assert_eq!(
            graph.find_by_suffix("/home/me/site/components/card.html"),
            Some("/components/card.html")
        );
        assert_eq!(graph.find_by_suffix("/home/me/site/other.html"), None);
    }

    #[test]
    fn test_find_by_suffix_prefers_longest_match() {
        let mut graph = DependencyGraph::new();
        graph.add_edge(ROOT_VERTEX, "/card.html").unwrap();
        graph.add_edge(ROOT_VERTEX, "/components/card.html").unwrap();
        assert_eq!(
            graph.find_by_suffix("/site/components/card.html"),
            Some("/components/card.html")
        );
        assert_eq!(graph.find_by_suffix("/site/card.html"), Some("/card.html"));
    }
}

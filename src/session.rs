//! Per-document compilation state

use std::collections::HashMap;

use crate::diagnostics::Diagnostics;
use crate::graph::DependencyGraph;
use crate::parser::ast::Node;
use crate::template::TemplateRegistry;

/// Owner of everything one build, or one live document, accumulates:
/// the import graph, the registered templates, fetched HTML includes and
/// diagnostics.
#[derive(Debug, Default)]
pub struct Session {
    pub graph: DependencyGraph,
    pub registry: TemplateRegistry,
    pub diagnostics: Diagnostics,
    includes: HashMap<String, Vec<Node>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_diagnostics(diagnostics: Diagnostics) -> Self {
        Self {
            diagnostics,
            ..Self::default()
        }
    }

    /// Parsed include content, if already fetched
    pub fn cached_include(&self, path: &str) -> Option<&Vec<Node>> {
        self.includes.get(path)
    }

    pub fn cache_include(&mut self, path: &str, nodes: Vec<Node>) {
        self.includes.insert(path.to_string(), nodes);
    }

    /// Forget a fetched include so the next use re-reads it
    pub fn invalidate_include(&mut self, path: &str) -> bool {
        self.includes.remove(path).is_some()
    }

    pub fn clear_includes(&mut self) {
        self.includes.clear();
    }
}

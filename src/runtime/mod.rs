//! Runtime component engine
//!
//! The live counterpart of the compiler. Instead of rewriting usage sites,
//! each upgraded element renders its template into a shadow root, keeps its
//! variable markers as subscriptions and re-renders in place when its
//! template file changes.
//!
//! ```text
//! boot ─▶ define ─▶ attach ─▶ [set_attribute ─▶ propagate]* ─▶ remove
//!                     ▲
//!        hot_update ──┘ (same NodeId, same shadow root)
//! ```

pub mod behavior;
pub mod document;
pub mod element;
pub mod reload;
pub mod styles;

use std::collections::{HashMap, HashSet};
use std::convert::Infallible;
use std::rc::Rc;
use std::sync::Arc;

use thiserror::Error;

use crate::compiler::variables::{variable_key, VAR_PREFIX};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::{summarize_parse_errors, ParseError};
use crate::graph::{Vertex, ROOT_VERTEX};
use crate::parser::ast::Fragment;
use crate::parser::parse;
use crate::session::Session;
use crate::template::{Loader, ResolveError, Resolver, Template};

pub use behavior::{Behavior, BehaviorContext, FnBehavior};
pub use document::{LiveDocument, NodeData, NodeId};
pub use element::{Definition, ElementKind, ElementState, Lifecycle, Subscription};
pub use reload::{HotReloadMessage, UpdateQueue};

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("failed to parse document: {}", summarize_parse_errors(.0))]
    Parse(Vec<ParseError>),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("template `{name}` is already defined")]
    AlreadyDefined { name: String },

    #[error("template `{name}` is not registered")]
    NotRegistered { name: String },

    #[error("runtime has already booted")]
    AlreadyBooted,

    #[error("invalid reload message: {0}")]
    Message(#[from] serde_json::Error),
}

pub struct Runtime {
    session: Session,
    loader: Arc<dyn Loader>,
    document: LiveDocument,
    /// Parsed page, consumed by `boot`
    pending: Option<Fragment>,
    base: String,
    definitions: HashMap<String, Rc<Definition>>,
    behaviors: HashMap<String, Rc<dyn Behavior>>,
    states: HashMap<NodeId, ElementState>,
    queue: UpdateQueue,
    booted: bool,
    loaded: bool,
}

impl Runtime {
    pub fn new(html: &str, loader: Arc<dyn Loader>) -> Result<Self, RuntimeError> {
        let page = parse(html).map_err(RuntimeError::Parse)?;
        Ok(Self {
            session: Session::new(),
            loader,
            document: LiveDocument::default(),
            pending: Some(page),
            base: "/".to_string(),
            definitions: HashMap::new(),
            behaviors: HashMap::new(),
            states: HashMap::new(),
            queue: UpdateQueue::new(),
            booted: false,
            loaded: false,
        })
    }

    /// Directory the page's relative references resolve against
    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = base.into();
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        self.session.diagnostics = diagnostics;
        self
    }

    pub fn document(&self) -> &LiveDocument {
        &self.document
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.session.diagnostics
    }

    pub fn state(&self, id: NodeId) -> Option<&ElementState> {
        self.states.get(&id)
    }

    pub fn definition(&self, name: &str) -> Option<&Rc<Definition>> {
        self.definitions.get(name)
    }

    /// Sheets adopted by an element's shadow root, in cascade order
    pub fn adopted_styles(&self, host: NodeId) -> &[String] {
        self.states
            .get(&host)
            .map(|s| s.adopted_styles.as_slice())
            .unwrap_or(&[])
    }

    pub fn is_booted(&self) -> bool {
        self.booted
    }

    /// Attach a behavior to a template name. Takes effect for definitions
    /// created afterwards, including hot swaps.
    pub fn register_behavior(&mut self, name: &str, behavior: impl Behavior + 'static) {
        self.behaviors
            .insert(name.to_ascii_lowercase(), Rc::new(behavior));
    }

    /// Resolve the page's imports, includes and inline templates, build the
    /// live document and define every template
    pub async fn boot(&mut self) -> Result<(), RuntimeError> {
        let mut page = self.pending.take().ok_or(RuntimeError::AlreadyBooted)?;
        Resolver::new(&mut self.session, Arc::clone(&self.loader))
            .resolve_document(&mut page, &self.base)
            .await?;
        self.document = LiveDocument::from_nodes(page.children);

        let names: Vec<String> = self.session.registry.names().map(str::to_string).collect();
        for name in &names {
            self.define(name)?;
        }

        let all = self.document.deep_descendants(self.document.root());
        self.report_unresolved(&all);
        self.booted = true;
        crate::log!("runtime"; "booted with {} templates", names.len());
        Ok(())
    }

    /// Define a registered template and upgrade its existing usages
    pub fn define(&mut self, name: &str) -> Result<(), RuntimeError> {
        if self.definitions.contains_key(name) {
            return Err(RuntimeError::AlreadyDefined {
                name: name.to_string(),
            });
        }
        let template = self
            .session
            .registry
            .get(name)
            .cloned()
            .ok_or_else(|| RuntimeError::NotRegistered {
                name: name.to_string(),
            })?;
        let definition = self.definition_for(template);
        self.definitions.insert(name.to_string(), definition);

        let all = self.document.deep_descendants(self.document.root());
        self.upgrade(all);
        Ok(())
    }

    fn definition_for(&mut self, template: Template) -> Rc<Definition> {
        let behavior = self.behaviors.get(&template.name).cloned();
        if template.script.is_some() && behavior.is_none() {
            self.session.diagnostics.push(Diagnostic::MissingBehavior {
                template: template.name.clone(),
            });
        }
        Rc::new(Definition::new(template, behavior))
    }

    /// Attach every connected, defined element among `ids` that is not
    /// attached yet
    fn upgrade(&mut self, ids: Vec<NodeId>) {
        for id in ids {
            if !self.document.is_connected(id) {
                continue;
            }
            match self.states.get(&id) {
                Some(state) if state.is_attached() => continue,
                Some(_) => {}
                None => {
                    let Some((name, kind)) = element::usage(&self.document, id) else {
                        continue;
                    };
                    let Some(definition) = self.definitions.get(&name).cloned() else {
                        continue;
                    };
                    self.states.insert(id, ElementState::new(definition, kind));
                }
            }
            self.attach(id);
        }
    }

    fn report_unresolved(&mut self, ids: &[NodeId]) {
        for &id in ids {
            if let Some((name, ElementKind::Polymorphic)) = element::usage(&self.document, id) {
                if !self.definitions.contains_key(&name) {
                    self.session
                        .diagnostics
                        .push(Diagnostic::UnresolvedPolymorphicTemplate { template: name });
                }
            }
        }
    }

    /// Render `host` from its current definition
    fn attach(&mut self, host: NodeId) {
        if !self.states.contains_key(&host) {
            return;
        }
        let shadow = self.document.attach_shadow(host);
        for stale in self.document.deep_descendants(shadow) {
            self.detach(stale);
        }
        self.document.clear_children(shadow);

        let Some(state) = self.states.get_mut(&host) else {
            return;
        };

        if let Some(element) = self.document.element(host) {
            for attr in &element.attributes {
                let (Some(key), Some(value)) = (variable_key(&attr.name), attr.value.as_deref()) else {
                    continue;
                };
                // Unbound markers name their target, not a value
                if !value.is_empty() && !value.starts_with(VAR_PREFIX) {
                    state.vars.insert(key, value);
                }
            }
        }

        let definition = Rc::clone(&state.definition);
        let kind = state.kind;
        self.document
            .append_nodes(shadow, definition.template.content.clone());

        state.shadow_root = Some(shadow);
        state.subscriptions = element::collect_subscriptions(&self.document, shadow);
        state.lifecycle = Lifecycle::Attached;
        state.load_listener = !self.loaded;
        let subscriptions = state.subscriptions.clone();
        let vars = state.vars.clone();

        for sub in subscriptions {
            match vars.get(&sub.key) {
                Some(value) => self.set_attribute(sub.node, &sub.attribute(), value),
                None if sub.templated => {}
                None if self
                    .document
                    .attr(sub.node, &sub.target)
                    .is_some_and(|v| !v.is_empty()) => {}
                None => self.session.diagnostics.push(Diagnostic::MissingVariable {
                    template: definition.name().to_string(),
                    variable: sub.key,
                }),
            }
        }
        let rendered = self.document.deep_descendants(shadow);
        self.upgrade(rendered);

        if let Some(class) = &definition.template.class_name {
            merge_class(&mut self.document, host, class);
        }
        self.apply_styles(host);

        if kind == ElementKind::CustomTag {
            if let Some(behavior) = &definition.behavior {
                let mut ctx = BehaviorContext {
                    document: &mut self.document,
                    host,
                    shadow_root: Some(shadow),
                    template: definition.name(),
                };
                behavior.setup(&mut ctx);
            }
        }
        crate::debug!("runtime"; "rendered <{}> into node {:?}", definition.name(), host);
    }

    /// Ambient sheets, then the template sheet, then the display reset for
    /// custom tags
    fn apply_styles(&mut self, host: NodeId) {
        let mut sheets = styles::ambient_styles(&self.document);
        let Some(state) = self.states.get_mut(&host) else {
            return;
        };
        let template = &state.definition.template;
        if let Some(style) = &template.style {
            sheets.push(style.clone());
        }
        if state.kind == ElementKind::CustomTag {
            sheets.push(styles::reset_sheet(template.wrapper_element()));
        }
        state.adopted_styles = sheets;
    }

    fn detach(&mut self, host: NodeId) {
        let Some(state) = self.states.get_mut(&host) else {
            return;
        };
        if !state.is_attached() {
            return;
        }
        state.load_listener = false;
        state.lifecycle = Lifecycle::Detached;
        if state.kind != ElementKind::CustomTag {
            return;
        }
        let definition = Rc::clone(&state.definition);
        let shadow_root = state.shadow_root;
        if let Some(behavior) = &definition.behavior {
            let mut ctx = BehaviorContext {
                document: &mut self.document,
                host,
                shadow_root,
                template: definition.name(),
            };
            behavior.teardown(&mut ctx);
        }
    }

    /// Set an attribute. A `data-var-<key>` observed by an upgraded element
    /// propagates to its subscribers; empty values only touch the attribute.
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) {
        self.document.set_attr(id, name, value);
        if let Some(key) = variable_key(name) {
            self.variable_changed(id, key, value);
        }
    }

    fn variable_changed(&mut self, host: NodeId, key: &str, value: &str) {
        if value.is_empty() {
            return;
        }
        let Some(state) = self.states.get_mut(&host) else {
            return;
        };
        if !state.definition.observes(key) {
            return;
        }
        state.vars.insert(key, value);
        if !state.is_attached() {
            return;
        }
        let targets: Vec<(NodeId, String)> = state
            .subscriptions
            .iter()
            .filter(|s| s.key == key)
            .map(|s| (s.node, s.attribute()))
            .collect();
        for (node, attribute) in targets {
            self.set_attribute(node, &attribute, value);
        }
    }

    /// Parse `html` and append it under `parent`; defined elements in it are
    /// upgraded
    pub fn append_html(&mut self, parent: NodeId, html: &str) -> Result<Vec<NodeId>, RuntimeError> {
        let fragment = parse(html).map_err(RuntimeError::Parse)?;
        let added = self.document.append_nodes(parent, fragment.children);
        let mut inserted = Vec::new();
        for &id in &added {
            inserted.push(id);
            inserted.extend(self.document.deep_descendants(id));
        }
        self.report_unresolved(&inserted);
        self.upgrade(inserted);
        Ok(added)
    }

    /// Move `child` under `parent`, re-attaching upgraded elements in it
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.document.append_child(parent, child);
        let mut moved = vec![child];
        moved.extend(self.document.deep_descendants(child));
        self.upgrade(moved);
    }

    /// Take a node out of the document, detaching upgraded elements in it.
    /// Their shadow roots are kept for a later re-attach.
    pub fn remove(&mut self, id: NodeId) {
        let mut removed = vec![id];
        removed.extend(self.document.deep_descendants(id));
        self.document.detach(id);
        for host in removed {
            self.detach(host);
        }
    }

    /// Fire the page load event: elements attached before it re-apply styles
    pub fn dispatch_load(&mut self) {
        self.loaded = true;
        let mut listening: Vec<NodeId> = self
            .states
            .iter()
            .filter(|(_, state)| state.load_listener)
            .map(|(id, _)| *id)
            .collect();
        listening.sort();
        for host in listening {
            self.apply_styles(host);
        }
    }

    /// Queue a changed file for [`Runtime::process_updates`]
    pub fn notify(&mut self, path: impl Into<String>) -> bool {
        self.queue.push(path)
    }

    /// Queue the file named by a dev-server message, if it is a
    /// `template-update` event
    pub fn handle_message(&mut self, json: &str) -> Result<bool, RuntimeError> {
        let message = HotReloadMessage::from_json(json)?;
        Ok(match message.template_update_path() {
            Some(path) => self.notify(path),
            None => false,
        })
    }

    pub fn pending_updates(&self) -> usize {
        self.queue.len()
    }

    /// Apply queued updates one at a time. Nothing runs before `boot`.
    /// Returns how many updates matched a known template file.
    pub async fn process_updates(&mut self) -> Result<usize, RuntimeError> {
        if !self.booted {
            return Ok(0);
        }
        let mut applied = 0;
        while let Some(path) = self.queue.pop() {
            if self.hot_update(&path).await?.is_some() {
                applied += 1;
            }
        }
        Ok(applied)
    }

    /// Re-read the template file whose name is a suffix of `path` and
    /// re-render its live instances in place. Returns the template name, or
    /// `None` for files that are not known template sources.
    pub async fn hot_update(&mut self, path: &str) -> Result<Option<String>, RuntimeError> {
        let Some(vertex) = self.session.graph.find_by_suffix(path).map(str::to_string) else {
            crate::debug!("hmr"; "ignoring {}", path);
            return Ok(None);
        };

        let name = Resolver::new(&mut self.session, Arc::clone(&self.loader))
            .reload(&vertex)
            .await?;
        let template = self
            .session
            .registry
            .get(&name)
            .cloned()
            .ok_or_else(|| RuntimeError::NotRegistered { name: name.clone() })?;
        let definition = self.definition_for(template);
        let redefined = self
            .definitions
            .insert(name.clone(), Rc::clone(&definition))
            .is_some();

        let instances = self.live_instances(&vertex, &name);
        for &host in &instances {
            self.detach(host);
            if let Some(state) = self.states.get_mut(&host) {
                state.definition = Rc::clone(&definition);
            }
            self.attach(host);
        }
        if !redefined {
            let all = self.document.deep_descendants(self.document.root());
            self.upgrade(all);
        }

        crate::log!("hmr"; "updated <{}> ({} instances)", name, instances.len());
        Ok(Some(name))
    }

    /// Upgraded elements rendering `name`. The search starts at the document
    /// and enters only shadow roots of templates that import `vertex`,
    /// directly or transitively, or of inline templates.
    fn live_instances(&self, vertex: &str, name: &str) -> Vec<NodeId> {
        let mut importers: HashSet<String> = self
            .session
            .registry
            .iter()
            .filter(|t| t.source.is_none())
            .map(|t| t.name.clone())
            .collect();
        let _ = self
            .session
            .graph
            .visit_dag::<Infallible>(vertex, &mut |v: &Vertex, _: &[String]| {
                if v.name != ROOT_VERTEX && v.name != vertex {
                    if let Some(value) = &v.value {
                        importers.insert(value.clone());
                    }
                }
                Ok(())
            });

        let mut found = Vec::new();
        self.collect_instances(self.document.root(), name, &importers, &mut found);
        found
    }

    fn collect_instances(
        &self,
        root: NodeId,
        name: &str,
        importers: &HashSet<String>,
        found: &mut Vec<NodeId>,
    ) {
        for id in self.document.descendants(root) {
            let Some(state) = self.states.get(&id) else {
                continue;
            };
            if element::usage(&self.document, id).is_some_and(|(n, _)| n == name) {
                found.push(id);
            }
            if importers.contains(state.definition.name()) {
                if let Some(shadow) = state.shadow_root {
                    self.collect_instances(shadow, name, importers, found);
                }
            }
        }
    }
}

fn merge_class(document: &mut LiveDocument, host: NodeId, classes: &str) {
    let mut merged: Vec<String> = document
        .attr(host, "class")
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
        document.set_attr(host, "class", &merged.join(" "));
    }
}

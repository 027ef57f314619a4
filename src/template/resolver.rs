//! Template resolution - follows import references and fills the registry
//!
//! Resolution is depth-first: a template's own imports are registered before
//! the template itself. Sibling imports of one file are fetched concurrently,
//! then loaded one by one in reference order.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use base64::Engine;
use thiserror::Error;
use tokio::task::JoinSet;

use crate::error::{format_parse_errors, summarize_parse_errors, ParseError};
use crate::graph::{GraphError, ROOT_VERTEX};
use crate::parser::ast::{take_elements, Element, Fragment, Node};
use crate::parser::parse;
use crate::session::Session;

use super::loader::{LoadError, Loader};
use super::path::{self, OutOfScope};
use super::registry::{join_text, Template, TemplateError};

const DATA_URI_PREFIX: &str = "data:text/html";

/// Errors that stop resolution
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(transparent)]
    CircularDependency(#[from] GraphError),

    #[error("no <template> element found in {path}")]
    TemplateNotFound { path: String },

    #[error(transparent)]
    OutOfScope(#[from] OutOfScope),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("parse errors in {path}: {}", summarize_parse_errors(.errors))]
    Parse {
        path: String,
        source_text: String,
        errors: Vec<ParseError>,
    },

    #[error("invalid data URI import: {reason}")]
    InvalidDataUri { reason: String },

    #[error("fetch task failed: {0}")]
    Task(String),
}

impl ResolveError {
    /// Error text for terminal output; parse errors are shown with source context
    pub fn report(&self) -> String {
        match self {
            ResolveError::Parse {
                path,
                source_text,
                errors,
            } => format_parse_errors(errors, source_text, path),
            other => other.to_string(),
        }
    }
}

/// `<link rel="import">` pointing at an HTML file or inline HTML payload
pub fn is_import_link(el: &Element) -> bool {
    el.name == "link"
        && el
            .attr("rel")
            .is_some_and(|rel| rel.eq_ignore_ascii_case("import"))
        && el
            .attr("href")
            .is_some_and(|href| href.ends_with(".html") || href.starts_with(DATA_URI_PREFIX))
}

/// `<script type="text/html" src="...">`
pub fn is_include(el: &Element) -> bool {
    el.name == "script"
        && el
            .attr("type")
            .is_some_and(|t| t.eq_ignore_ascii_case("text/html"))
        && el.non_empty_attr("src").is_some()
}

/// One import reference, in document order
enum ImportRef {
    Path(String),
    Data(String),
}

/// Where a template's markup came from
enum Source {
    File { path: String, text: String },
    Data { text: String },
}

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Resolves references against a [`Loader`], recording into a [`Session`]
pub struct Resolver<'s> {
    session: &'s mut Session,
    loader: Arc<dyn Loader>,
}

impl<'s> Resolver<'s> {
    pub fn new(session: &'s mut Session, loader: Arc<dyn Loader>) -> Self {
        Self { session, loader }
    }

    /// Resolve a top-level document.
    ///
    /// Import references are removed and their templates registered, HTML
    /// includes are spliced in, and inline `<template>`s are registered after
    /// the external ones and removed.
    pub async fn resolve_document(
        &mut self,
        document: &mut Fragment,
        base: &str,
    ) -> Result<(), ResolveError> {
        self.session.graph.add_vertex(ROOT_VERTEX);

        let links = take_elements(&mut document.children, &is_import_link);
        self.resolve_imports(links, base.to_string(), ROOT_VERTEX.to_string())
            .await?;

        self.splice_includes(&mut document.children, base).await?;

        let inline = take_elements(&mut document.children, &|el| el.name == "template");
        for mut element in inline {
            self.splice_includes(&mut element.children, base).await?;
            let template = Template::from_element(element, None)?;
            crate::debug!("resolve"; "inline template <{}>", template.name);
            self.session.registry.register(template)?;
        }
        Ok(())
    }

    /// Re-read a known source and replace its registry entry. Returns the
    /// template name it declares. Cached includes are dropped so they are
    /// read again too.
    pub async fn reload(&mut self, vertex: &str) -> Result<String, ResolveError> {
        if !self.session.graph.contains(vertex) || vertex.starts_with("data:") {
            return Err(ResolveError::TemplateNotFound {
                path: vertex.to_string(),
            });
        }
        self.session.clear_includes();
        let text = self
            .fetch_all(&[vertex.to_string()])
            .await?
            .into_iter()
            .next()
            .unwrap_or_default();

        let base = path::parent_dir(vertex);
        let source = Source::File {
            path: vertex.to_string(),
            text,
        };
        self.load(source, None, base, true).await
    }

    fn resolve_imports<'a>(
        &'a mut self,
        links: Vec<Element>,
        base: String,
        from: String,
    ) -> BoxFuture<'a, Result<(), ResolveError>> {
        Box::pin(async move {
            let mut refs = Vec::with_capacity(links.len());
            for link in &links {
                let href = link.attr("href").unwrap_or("");
                if href.starts_with(DATA_URI_PREFIX) {
                    refs.push(ImportRef::Data(decode_data_uri(href)?));
                } else {
                    refs.push(ImportRef::Path(path::resolve(&base, href)?));
                }
            }

            let mut unseen: Vec<String> = Vec::new();
            for r in &refs {
                if let ImportRef::Path(target) = r {
                    if !self.session.graph.contains(target) && !unseen.contains(target) {
                        unseen.push(target.clone());
                    }
                }
            }
            let texts = self.fetch_all(&unseen).await?;
            let mut fetched: HashMap<String, String> = unseen.into_iter().zip(texts).collect();

            for r in refs {
                match r {
                    ImportRef::Path(target) => match fetched.remove(&target) {
                        Some(text) if !self.session.graph.contains(&target) => {
                            let base = path::parent_dir(&target);
                            let source = Source::File { path: target, text };
                            self.load(source, Some(from.clone()), base, false).await?;
                        }
                        _ => self.session.graph.add_edge(&from, &target)?,
                    },
                    ImportRef::Data(text) => {
                        let source = Source::Data { text };
                        self.load(source, Some(from.clone()), base.clone(), false)
                            .await?;
                    }
                }
            }
            Ok(())
        })
    }

    /// Parse one template source, resolve its imports, then register it
    async fn load(
        &mut self,
        source: Source,
        from: Option<String>,
        base: String,
        replace: bool,
    ) -> Result<String, ResolveError> {
        let is_data = matches!(source, Source::Data { .. });
        let (label, text) = match &source {
            Source::File { path, text } => (path.clone(), text.as_str()),
            Source::Data { text } => ("data URI".to_string(), text.as_str()),
        };

        let mut document = parse(text).map_err(|errors| ResolveError::Parse {
            path: label.clone(),
            source_text: text.to_string(),
            errors,
        })?;

        let mut templates = take_elements(&mut document.children, &|el| el.name == "template");
        if templates.is_empty() {
            return Err(ResolveError::TemplateNotFound { path: label });
        }
        let mut element = templates.remove(0);

        let name = element
            .non_empty_attr("id")
            .map(str::to_ascii_lowercase)
            .ok_or_else(|| TemplateError::MissingId {
                origin: label.clone(),
            })?;
        let vertex = match source {
            Source::File { path, .. } => path,
            Source::Data { .. } => format!("data:{}", name),
        };

        if is_data && self.session.registry.contains(&name) && self.session.graph.contains(&vertex) {
            if let Some(from) = &from {
                self.session.graph.add_edge(from, &vertex)?;
            }
            return Ok(name);
        }

        let style = join_text(&take_elements(&mut document.children, &|el| el.name == "style"));
        let script = join_text(&take_elements(&mut document.children, &|el| {
            el.name == "script" && !is_include(el)
        }));

        let mut links = take_elements(&mut document.children, &is_import_link);
        links.extend(take_elements(&mut element.children, &is_import_link));

        self.session.graph.set_value(&vertex, name.as_str());
        if let Some(from) = &from {
            self.session.graph.add_edge(from, &vertex)?;
        }
        crate::debug!("resolve"; "{} declares <{}>", vertex, name);

        self.resolve_imports(links, base.clone(), vertex.clone())
            .await?;
        self.splice_includes(&mut element.children, &base).await?;

        let template = Template::from_element(element, Some(vertex.as_str()))?
            .with_style(style)
            .with_script(script);

        if replace {
            self.session.registry.replace(template);
        } else {
            self.session.registry.register(template)?;
        }
        Ok(name)
    }

    /// Replace `<script type="text/html" src>` elements with the parsed
    /// content of the referenced file. Paths resolve against `base`.
    async fn splice_includes(&mut self, nodes: &mut Vec<Node>, base: &str) -> Result<(), ResolveError> {
        let mut targets = Vec::new();
        collect_includes(nodes, base, &mut targets)?;
        if targets.is_empty() {
            return Ok(());
        }

        let missing: Vec<String> = targets
            .iter()
            .filter(|t| self.session.cached_include(t).is_none())
            .cloned()
            .collect();
        let texts = self.fetch_all(&missing).await?;
        for (target, text) in missing.into_iter().zip(texts) {
            let fragment = parse(&text).map_err(|errors| ResolveError::Parse {
                path: target.clone(),
                source_text: text.clone(),
                errors,
            })?;
            self.session.cache_include(&target, fragment.children);
        }

        replace_includes(nodes, base, &*self.session);
        Ok(())
    }

    /// Read every path on the blocking pool; results keep input order
    async fn fetch_all(&self, paths: &[String]) -> Result<Vec<String>, ResolveError> {
        let mut set = JoinSet::new();
        for (index, path) in paths.iter().enumerate() {
            let loader = Arc::clone(&self.loader);
            let path = path.clone();
            set.spawn_blocking(move || (index, loader.read(&path)));
        }

        let mut results: Vec<Option<String>> = vec![None; paths.len()];
        while let Some(joined) = set.join_next().await {
            let (index, read) = joined.map_err(|e| ResolveError::Task(e.to_string()))?;
            crate::debug!("resolve"; "fetched {}", paths[index]);
            results[index] = Some(read?);
        }
        Ok(results.into_iter().flatten().collect())
    }
}

fn collect_includes(nodes: &[Node], base: &str, targets: &mut Vec<String>) -> Result<(), ResolveError> {
    for node in nodes {
        if let Node::Element(el) = node {
            if is_include(el) {
                let target = path::resolve(base, el.attr("src").unwrap_or(""))?;
                if !targets.contains(&target) {
                    targets.push(target);
                }
            } else {
                collect_includes(&el.children, base, targets)?;
            }
        }
    }
    Ok(())
}

fn replace_includes(nodes: &mut Vec<Node>, base: &str, session: &Session) {
    let mut out = Vec::with_capacity(nodes.len());
    for node in nodes.drain(..) {
        match node {
            Node::Element(el) if is_include(&el) => {
                let content = path::resolve(base, el.attr("src").unwrap_or(""))
                    .ok()
                    .and_then(|target| session.cached_include(&target));
                match content {
                    Some(content) => out.extend(content.iter().cloned()),
                    None => out.push(Node::Element(el)),
                }
            }
            Node::Element(mut el) => {
                replace_includes(&mut el.children, base, session);
                out.push(Node::Element(el));
            }
            other => out.push(other),
        }
    }
    *nodes = out;
}

fn decode_data_uri(href: &str) -> Result<String, ResolveError> {
    let (header, payload) = href
        .split_once(',')
        .ok_or_else(|| ResolveError::InvalidDataUri {
            reason: "missing `,` separator".to_string(),
        })?;
    if !header.ends_with(";base64") {
        return Err(ResolveError::InvalidDataUri {
            reason: format!("unsupported encoding in `{}`", header),
        });
    }
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| ResolveError::InvalidDataUri {
            reason: e.to_string(),
        })?;
    String::from_utf8(bytes).map_err(|e| ResolveError::InvalidDataUri {
        reason: e.to_string(),
    })
}

//! sloth - HTML template compiler
//!
//! Resolves a tree of imported and inline `<template>`s into one
//! self-contained document: variables, slots and scoped styles are bound at
//! build time. The [`runtime`] module applies the same resolution inside a
//! live document and re-renders in place when a template file changes.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use sloth::{compile, CompileConfig, MemoryLoader};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let loader = MemoryLoader::new().with_file(
//!     "/greeting.html",
//!     r#"<template id="x-greeting"><p data-var-name="title">Hello</p></template>"#,
//! );
//! let page = r#"<link rel="import" href="greeting.html"><x-greeting data-var-name="Ada"></x-greeting>"#;
//!
//! let compiled = compile(page, Arc::new(loader), &CompileConfig::default()).await.unwrap();
//! assert_eq!(
//!     compiled.html,
//!     r#"<div data-template="x-greeting"><p title="Ada">Hello</p></div>"#
//! );
//! # });
//! ```

pub mod compiler;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod graph;
pub mod logger;
pub mod parser;
pub mod runtime;
pub mod session;
pub mod style;
pub mod template;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

pub use compiler::{Compiler, Leak};
pub use config::{CompileConfig, ConfigError, FlattenPolicy};
pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use error::ParseError;
pub use graph::{DependencyGraph, GraphError};
pub use parser::{parse, Fragment};
pub use runtime::{Runtime, RuntimeError};
pub use session::Session;
pub use style::StyleError;
pub use template::{FsLoader, LoadError, Loader, MemoryLoader, ResolveError, Template, TemplateRegistry};

use error::{format_parse_errors, summarize_parse_errors};
use template::Resolver;

/// Errors that abort a build
#[derive(Debug, Error)]
pub enum CompileError {
    /// Markup errors in the input document
    #[error("parse errors: {}", summarize_parse_errors(.0))]
    Parse(Vec<ParseError>),

    /// Import, include or template definition failure
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// A template stylesheet could not be scoped
    #[error("stylesheet error: {0}")]
    Style(#[from] StyleError),

    /// Usages kept producing usages; a template (indirectly) contains itself
    #[error("template usages still unresolved after {passes} passes; is a template using itself?")]
    RecursiveUsage { passes: usize },

    /// Strict mode found template artifacts in the output
    #[error("unresolved template artifacts: {}", join_leaks(.0))]
    Unresolved(Vec<Leak>),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<Vec<ParseError>> for CompileError {
    fn from(errors: Vec<ParseError>) -> Self {
        CompileError::Parse(errors)
    }
}

impl CompileError {
    /// Human-readable report; markup errors are rendered with source context
    pub fn report(&self, source: &str, filename: &str) -> String {
        match self {
            CompileError::Parse(errors) => format_parse_errors(errors, source, filename),
            CompileError::Resolve(err) => err.report(),
            other => other.to_string(),
        }
    }
}

fn join_leaks(leaks: &[Leak]) -> String {
    leaks
        .iter()
        .map(|l| l.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// A compiled document
#[derive(Debug, Clone)]
pub struct Compiled {
    pub html: String,
    pub diagnostics: Diagnostics,
    /// Productive compiler passes
    pub passes: usize,
    /// Artifacts left in the output; always empty in strict mode
    pub leaks: Vec<Leak>,
}

/// Compile a document whose references resolve against the scope root
pub async fn compile(
    source: &str,
    loader: Arc<dyn Loader>,
    config: &CompileConfig,
) -> Result<Compiled, CompileError> {
    compile_in(source, "/", loader, config).await
}

/// Compile a document located in the scope directory `base`
/// (`/` or `/pages/`)
pub async fn compile_in(
    source: &str,
    base: &str,
    loader: Arc<dyn Loader>,
    config: &CompileConfig,
) -> Result<Compiled, CompileError> {
    let mut document = parse(source)?;
    let mut session = Session::new();

    Resolver::new(&mut session, loader)
        .resolve_document(&mut document, base)
        .await?;

    let passes = Compiler::new(&session.registry, config)
        .compile(&mut document.children, &mut session.diagnostics)?;

    let css = style::aggregate(&session.registry)?;
    if !css.is_empty() {
        style::inject(&mut document.children, &css, &config.style_id);
    }

    let leaks = compiler::verify(&document.children);
    if config.strict && (!leaks.is_empty() || session.diagnostics.has_errors()) {
        return Err(CompileError::Unresolved(leaks));
    }
    crate::debug!("compile"; "{} templates, {} passes", session.registry.len(), passes);

    Ok(Compiled {
        html: document.to_html(),
        diagnostics: session.diagnostics,
        passes,
        leaks,
    })
}

/// Compile a file from disk. Imports resolve inside `config.root`, or the
/// file's own directory when no root is set.
pub async fn compile_file(path: &Path, config: &CompileConfig) -> Result<Compiled, CompileError> {
    let source = std::fs::read_to_string(path).map_err(|e| LoadError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    let dir = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let root = config.root.clone().unwrap_or_else(|| dir.clone());
    let base = scope_base(&dir, &root);

    compile_in(&source, &base, Arc::new(FsLoader::new(root)), config).await
}

/// Scope directory of `dir` under `root`, with leading and trailing slash
fn scope_base(dir: &Path, root: &Path) -> String {
    let relative = dir.strip_prefix(root).ok().map(|rel| {
        rel.components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
    });
    match relative {
        Some(parts) if !parts.is_empty() => format!("/{}/", parts.join("/")),
        _ => "/".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn loader() -> Arc<dyn Loader> {
        Arc::new(
            MemoryLoader::new()
                .with_file(
                    "/link.html",
                    r#"<template id="x-link" data-element="span"><a data-var-href href="https://example.com/default">go</a></template>"#,
                )
                .with_file(
                    "/hero-text.html",
                    r#"<template id="hero-text"><style>:host { display: block } .with-cursor::after { content: "_" }</style><h1 class="with-cursor"><slot></slot></h1></template>"#,
                ),
        )
    }

    #[tokio::test]
    async fn test_variable_default_and_override() {
        let page = r#"<link rel="import" href="link.html"><x-link data-var-href="https://custom"></x-link><x-link></x-link>"#;
        let compiled = compile(page, loader(), &CompileConfig::default())
            .await
            .unwrap();
        assert_eq!(
            compiled.html,
            concat!(
                r#"<span data-template="x-link"><a href="https://custom">go</a></span>"#,
                r#"<span data-template="x-link"><a href="https://example.com/default">go</a></span>"#
            )
        );
        assert!(compiled.diagnostics.is_empty());
        assert_eq!(compiled.passes, 1);
    }

    #[tokio::test]
    async fn test_scoped_style_is_injected() {
        let page = r#"<html><head><link rel="import" href="hero-text.html"></head><body><hero-text>Hi</hero-text></body></html>"#;
        let compiled = compile(page, loader(), &CompileConfig::default())
            .await
            .unwrap();
        assert_eq!(
            compiled.html,
            concat!(
                r#"<html><head><style id="scoped-sloth">[data-template="hero-text"] { display: block }"#,
                "\n",
                r#"[data-template="hero-text"] .with-cursor::after { content: "_" }</style></head>"#,
                r#"<body><div data-template="hero-text"><h1 class="with-cursor">Hi</h1></div></body></html>"#
            )
        );
    }

    #[tokio::test]
    async fn test_strict_rejects_unknown_polymorphic_template() {
        let page = r#"<section is="x-missing"></section>"#;
        let config = CompileConfig::default();
        let err = compile(page, loader(), &config).await.unwrap_err();
        assert!(matches!(err, CompileError::Unresolved(ref leaks) if leaks.len() == 1));

        let lenient = compile(page, loader(), &config.clone().with_strict(false))
            .await
            .unwrap();
        assert_eq!(lenient.leaks.len(), 1);
        assert!(lenient.diagnostics.has_errors());
    }

    #[tokio::test]
    async fn test_parse_error_report() {
        let err = compile("<p><!-- open", loader(), &CompileConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CompileError::Parse(_)));
        assert!(err.report("<p><!-- open", "page.html").contains("page.html"));
    }

    #[test]
    fn test_scope_base() {
        let root = Path::new("/site");
        assert_eq!(scope_base(Path::new("/site"), root), "/");
        assert_eq!(scope_base(Path::new("/site/pages/blog"), root), "/pages/blog/");
        assert_eq!(scope_base(Path::new("/elsewhere"), root), "/");
    }
}

//! Template system: loading, registering and resolving template definitions
//!
//! A template is declared with `<template id="NAME">`, either inline in the
//! document or in a separate file pulled in through an import reference:
//!
//! ```text
//! <link rel="import" href="components/user-card.html">
//!
//! <user-card data-var-name="Ada">
//!   <img slot="avatar" src="ada.png">
//! </user-card>
//! ```

pub mod loader;
pub mod path;
mod registry;
mod resolver;

pub use loader::{FsLoader, LoadError, Loader, MemoryLoader};
pub use path::OutOfScope;
pub use registry::{Template, TemplateError, TemplateRegistry};
pub use resolver::{is_import_link, is_include, ResolveError, Resolver};

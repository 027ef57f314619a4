//! Compiler configuration
//!
//! Settings come from the [`CompileConfig`] builder or from a `sloth.toml` file:
//!
//! ```toml
//! [compile]
//! flatten_slot = ["span", "em"]   # or true / false
//! strict = true
//! max_passes = 16
//!
//! [resolve]
//! root = "site"
//!
//! [output]
//! style_id = "scoped-sloth"
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;

use crate::parser::ast::Element;

/// Id of the aggregate stylesheet element
pub const DEFAULT_STYLE_ID: &str = "scoped-sloth";

/// Errors that can occur when loading configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// Predicate deciding whether a slotted child is unwrapped
#[derive(Clone)]
pub struct FlattenPredicate(Arc<dyn Fn(&Element) -> bool + Send + Sync>);

impl fmt::Debug for FlattenPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FlattenPredicate(..)")
    }
}

/// Whether a filled slot keeps the slotted element or only its inner content
#[derive(Debug, Clone, Default)]
pub enum FlattenPolicy {
    #[default]
    Never,
    Always,
    /// Unwrap children whose tag is listed
    Tags(Vec<String>),
    Predicate(FlattenPredicate),
}

impl FlattenPolicy {
    pub fn predicate(f: impl Fn(&Element) -> bool + Send + Sync + 'static) -> Self {
        FlattenPolicy::Predicate(FlattenPredicate(Arc::new(f)))
    }

    pub fn tags<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FlattenPolicy::Tags(
            tags.into_iter()
                .map(|t| t.into().to_ascii_lowercase())
                .collect(),
        )
    }

    /// Whether `child` should be replaced by its children
    pub fn applies(&self, child: &Element) -> bool {
        match self {
            FlattenPolicy::Never => false,
            FlattenPolicy::Always => true,
            FlattenPolicy::Tags(tags) => tags.iter().any(|t| *t == child.name),
            FlattenPolicy::Predicate(FlattenPredicate(f)) => f(child),
        }
    }
}

impl From<bool> for FlattenPolicy {
    fn from(flatten: bool) -> Self {
        if flatten {
            FlattenPolicy::Always
        } else {
            FlattenPolicy::Never
        }
    }
}

/// Configuration for a compilation
#[derive(Debug, Clone)]
pub struct CompileConfig {
    /// Slot flattening policy
    pub flatten: FlattenPolicy,
    /// Fail on leftover template markers instead of only reporting them
    pub strict: bool,
    /// Upper bound on compiler passes; defaults to registered templates + 1
    pub max_passes: Option<usize>,
    /// Scope root for template imports; defaults to the input file's directory
    pub root: Option<PathBuf>,
    /// Id of the aggregate `<style>` element
    pub style_id: String,
}

impl Default for CompileConfig {
    fn default() -> Self {
        Self {
            flatten: FlattenPolicy::Never,
            strict: true,
            max_passes: None,
            root: None,
            style_id: DEFAULT_STYLE_ID.to_string(),
        }
    }
}

/// TOML structure for deserializing `sloth.toml`
#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct TomlConfig {
    #[serde(default)]
    compile: TomlCompile,
    #[serde(default)]
    resolve: TomlResolve,
    #[serde(default)]
    output: TomlOutput,
}

#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct TomlCompile {
    flatten_slot: Option<TomlFlatten>,
    strict: Option<bool>,
    max_passes: Option<usize>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TomlFlatten {
    Uniform(bool),
    Tags(Vec<String>),
}

#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct TomlResolve {
    root: Option<PathBuf>,
}

#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct TomlOutput {
    style_id: Option<String>,
}

impl CompileConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML file. A relative `resolve.root` is taken
    /// relative to the file's directory.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml(&content)?;
        if let (Some(root), Some(dir)) = (&config.root, path.parent()) {
            if root.is_relative() {
                config.root = Some(dir.join(root));
            }
        }
        Ok(config)
    }

    /// Load configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let parsed: TomlConfig = toml::from_str(content)?;
        let defaults = Self::default();

        Ok(CompileConfig {
            flatten: match parsed.compile.flatten_slot {
                Some(TomlFlatten::Uniform(flag)) => flag.into(),
                Some(TomlFlatten::Tags(tags)) => FlattenPolicy::tags(tags),
                None => defaults.flatten,
            },
            strict: parsed.compile.strict.unwrap_or(defaults.strict),
            max_passes: parsed.compile.max_passes,
            root: parsed.resolve.root,
            style_id: parsed.output.style_id.unwrap_or(defaults.style_id),
        })
    }

    pub fn with_flatten(mut self, flatten: impl Into<FlattenPolicy>) -> Self {
        self.flatten = flatten.into();
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn with_max_passes(mut self, max_passes: usize) -> Self {
        self.max_passes = Some(max_passes);
        self
    }

    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    pub fn with_style_id(mut self, style_id: impl Into<String>) -> Self {
        self.style_id = style_id.into();
        self
    }
}

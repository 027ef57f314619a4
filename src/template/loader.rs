//! Source loading capability
//!
//! Template sources are addressed by scope-absolute paths (`/components/card.html`).
//! A [`Loader`] turns such a path into text. Loaders are synchronous; the
//! resolver runs them on the blocking pool so sibling fetches overlap.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LoadError {
    #[error("file not found: {path}")]
    NotFound { path: String },

    #[error("error reading {path}: {message}")]
    Io { path: String, message: String },
}

/// Reads template sources by path
pub trait Loader: Send + Sync {
    fn read(&self, path: &str) -> Result<String, LoadError>;
}

/// Reads from a directory on disk; scope paths are relative to `root`
#[derive(Debug, Clone)]
pub struct FsLoader {
    root: PathBuf,
}

impl FsLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    /// Filesystem location of a scope path
    pub fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }
}

impl Loader for FsLoader {
    fn read(&self, path: &str) -> Result<String, LoadError> {
        let full_path = self.resolve(path);
        std::fs::read_to_string(&full_path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => LoadError::NotFound {
                path: path.to_string(),
            },
            _ => LoadError::Io {
                path: full_path.display().to_string(),
                message: e.to_string(),
            },
        })
    }
}

/// In-memory sources, keyed by scope path. Contents can be replaced while
/// shared, which is how live-reload tests simulate an edited file.
#[derive(Debug, Default)]
pub struct MemoryLoader {
    files: RwLock<HashMap<String, String>>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style file insertion
    pub fn with_file(self, path: &str, content: impl Into<String>) -> Self {
        self.insert(path, content);
        self
    }

    pub fn insert(&self, path: &str, content: impl Into<String>) {
        let mut files = match self.files.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        files.insert(normalize_key(path), content.into());
    }
}

impl Loader for MemoryLoader {
    fn read(&self, path: &str) -> Result<String, LoadError> {
        let files = match self.files.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        files
            .get(&normalize_key(path))
            .cloned()
            .ok_or_else(|| LoadError::NotFound {
                path: path.to_string(),
            })
    }
}

fn normalize_key(path: &str) -> String {
    format!("/{}", path.trim_start_matches('/'))
}

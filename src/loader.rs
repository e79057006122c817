//! Template source loading by name against search roots

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

/// Search root holding layouts and includes
pub const TEMPLATES: &str = "templates";
/// Search root holding imports
pub const MODULES: &str = "modules";

/// Named search roots ("templates", "modules") and their directories
pub type SearchPaths = BTreeMap<String, Vec<PathBuf>>;

/// Errors that can occur while loading template source
#[derive(Debug, Error)]
pub enum LoadError {
    /// No candidate matched the name
    #[error("template source not found: {name}")]
    NotFound { name: String },

    /// A candidate exists but could not be read
    #[error("error reading template file {path}: {message}")]
    FileReadError { path: PathBuf, message: String },
}

/// Resolves a template name to its source text
pub trait SourceLoader: Send + Sync {
    fn load(&self, name: &str, search_paths: &[PathBuf]) -> Result<String, LoadError>;
}

/// Extension tried when the exact name does not resolve
const EXTENSION: &str = "tpl";

fn with_extension(name: &str) -> String {
    format!("{}.{}", name, EXTENSION)
}

/// In-memory sources keyed by name; search paths are ignored
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    sources: HashMap<String, String>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(mut self, name: impl Into<String>, source: impl Into<String>) -> Self {
        self.insert(name, source);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, source: impl Into<String>) {
        self.sources.insert(name.into(), source.into());
    }
}

impl SourceLoader for MemoryLoader {
    fn load(&self, name: &str, _search_paths: &[PathBuf]) -> Result<String, LoadError> {
        self.sources
            .get(name)
            .or_else(|| self.sources.get(&with_extension(name)))
            .cloned()
            .ok_or_else(|| LoadError::NotFound {
                name: name.to_string(),
            })
    }
}

/// Loads sources from disk, trying each search directory in order
#[derive(Debug, Clone, Default)]
pub struct FileLoader;

impl FileLoader {
    pub fn new() -> Self {
        Self
    }

    fn candidates(name: &str, search_paths: &[PathBuf]) -> Vec<PathBuf> {
        let names = [name.to_string(), with_extension(name)];
        if search_paths.is_empty() {
            return names.iter().map(PathBuf::from).collect();
        }
        search_paths
            .iter()
            .flat_map(|dir| names.iter().map(move |n| dir.join(n)))
            .collect()
    }
}

impl SourceLoader for FileLoader {
    fn load(&self, name: &str, search_paths: &[PathBuf]) -> Result<String, LoadError> {
        let path = Self::candidates(name, search_paths)
            .into_iter()
            .find(|p| p.is_file())
            .ok_or_else(|| LoadError::NotFound {
                name: name.to_string(),
            })?;
        debug!(name, path = %path.display(), "loading template source");
        read_source(&path)
    }
}

/// Read one file as template source
pub fn read_source(path: &Path) -> Result<String, LoadError> {
    std::fs::read_to_string(path).map_err(|e| LoadError::FileReadError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

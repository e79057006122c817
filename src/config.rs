//! Render configuration: delimiters, search roots, limits
//!
//! Built in code with the `with_*` methods or loaded from TOML:
//!
//! ```toml
//! [delimiters]
//! open = "{{"
//! close = "}}"
//!
//! [paths]
//! templates = ["./templates"]
//! modules = ["./modules"]
//!
//! [limits]
//! max_loop_iterations = 1000
//! max_depth = 32
//!
//! [includes]
//! strict = false
//!
//! [events]
//! bubble = true
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::loader::{SearchPaths, MODULES, TEMPLATES};
use crate::tags::Delimiters;

/// Errors that can occur when loading configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Delimiters must not be empty")]
    EmptyDelimiter,
}

/// Configuration for one template
#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig {
    pub delimiters: Delimiters,
    /// Named search roots for layouts, includes and imports
    pub search_paths: SearchPaths,
    /// Iteration cap for `while` blocks
    pub max_loop_iterations: usize,
    /// Nesting cap for layouts, includes and macro invocations
    pub max_depth: usize,
    /// Missing include/import targets raise instead of rendering empty
    pub strict_includes: bool,
    /// Elements report their events to the template sink
    pub bubble_events: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            delimiters: Delimiters::default(),
            search_paths: SearchPaths::new(),
            max_loop_iterations: 1000,
            max_depth: 32,
            strict_includes: false,
            bubble_events: true,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TomlConfig {
    delimiters: Option<Delimiters>,
    paths: SearchPaths,
    limits: TomlLimits,
    includes: TomlIncludes,
    events: TomlEvents,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TomlLimits {
    max_loop_iterations: Option<usize>,
    max_depth: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TomlIncludes {
    strict: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TomlEvents {
    bubble: Option<bool>,
}

impl RenderConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string; absent keys keep defaults
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let parsed: TomlConfig = toml::from_str(content)?;
        let defaults = Self::default();

        let delimiters = parsed.delimiters.unwrap_or(defaults.delimiters);
        if delimiters.open.is_empty() || delimiters.close.is_empty() {
            return Err(ConfigError::EmptyDelimiter);
        }

        Ok(Self {
            delimiters,
            search_paths: parsed.paths,
            max_loop_iterations: parsed
                .limits
                .max_loop_iterations
                .unwrap_or(defaults.max_loop_iterations),
            max_depth: parsed.limits.max_depth.unwrap_or(defaults.max_depth),
            strict_includes: parsed.includes.strict.unwrap_or(defaults.strict_includes),
            bubble_events: parsed.events.bubble.unwrap_or(defaults.bubble_events),
        })
    }

    pub fn with_delimiters(mut self, open: impl Into<String>, close: impl Into<String>) -> Self {
        self.delimiters = Delimiters::new(open, close);
        self
    }

    /// Append a directory to a named search root
    pub fn with_search_path(mut self, root: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        self.search_paths.entry(root.into()).or_default().push(dir.into());
        self
    }

    /// Append a directory to the `templates` root
    pub fn with_templates_dir(self, dir: impl Into<PathBuf>) -> Self {
        self.with_search_path(TEMPLATES, dir)
    }

    /// Append a directory to the `modules` root
    pub fn with_modules_dir(self, dir: impl Into<PathBuf>) -> Self {
        self.with_search_path(MODULES, dir)
    }

    pub fn with_max_loop_iterations(mut self, max: usize) -> Self {
        self.max_loop_iterations = max;
        self
    }

    pub fn with_max_depth(mut self, max: usize) -> Self {
        self.max_depth = max;
        self
    }

    pub fn with_strict_includes(mut self, strict: bool) -> Self {
        self.strict_includes = strict;
        self
    }

    pub fn with_bubble_events(mut self, bubble: bool) -> Self {
        self.bubble_events = bubble;
        self
    }

    /// Directories of one search root
    pub fn paths(&self, root: &str) -> &[PathBuf] {
        self.search_paths.get(root).map(Vec::as_slice).unwrap_or(&[])
    }
}

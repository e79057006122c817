//! Tagsmith - a tag-based text templating engine
//!
//! Templates mix literal text with delimited tags (`{$name}`, `{#each ...}`,
//! `{=upper(name)}`) and `@name(...)` directives for layouts, macros,
//! includes and imports. Every tag is registered in a [`TagRegistry`] and
//! located through one unified regex; the rest of the engine (functions,
//! validators, generators, datatypes, custom renderers, preparers) is
//! pluggable through the [`Registry`].
//!
//! # Example
//!
//! ```rust
//! use tagsmith::render;
//!
//! let out = render(r#"{#let who="World"}Hello {$who}!"#).unwrap();
//! assert_eq!(out, "Hello World!");
//! ```

pub mod config;
pub mod error;
pub mod eval;
pub mod events;
pub mod loader;
pub mod parser;
pub mod prepare;
pub mod registry;
pub mod render;
pub mod tags;
pub mod template;
pub mod value;

pub use config::{ConfigError, RenderConfig};
pub use error::ParseError;
pub use eval::{EvalError, Evaluator, FunctionError};
pub use events::{CollectingSink, EventKind, EventSink, RenderEvent, TracingSink};
pub use loader::{FileLoader, LoadError, MemoryLoader, SourceLoader};
pub use parser::{Document, Element, NodeId, Parser};
pub use registry::Registry;
pub use render::{RendererRegistry, TagContext};
pub use tags::{Delimiters, RegistryError, TagDefinition, TagRegistry};
pub use template::Template;
pub use value::{Scope, Value};

use thiserror::Error;

/// Errors that can occur during the render pipeline
#[derive(Debug, Error)]
pub enum RenderError {
    /// Error during parsing
    #[error("parse errors: {}", format_parse_errors(.0))]
    Parse(Vec<ParseError>),

    /// The tag registry could not compile its pattern
    #[error("tag registry error: {0}")]
    Registry(#[from] RegistryError),

    /// An expression with `silent=false` failed
    #[error("evaluation error: {0}")]
    Eval(#[from] EvalError),

    /// A layout, include or import could not be loaded in strict mode
    #[error("load error: {0}")]
    Load(#[from] LoadError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Raised by a custom renderer or executor
    #[error("tag '{tag}' failed: {message}")]
    Custom { tag: String, message: String },
}

impl RenderError {
    pub fn custom(tag: impl Into<String>, message: impl Into<String>) -> Self {
        RenderError::Custom {
            tag: tag.into(),
            message: message.into(),
        }
    }
}

impl From<Vec<ParseError>> for RenderError {
    fn from(errors: Vec<ParseError>) -> Self {
        RenderError::Parse(errors)
    }
}

fn format_parse_errors(errors: &[ParseError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Render template text with the built-in registry and default configuration
///
/// Layouts, includes and imports resolve against the current directory.
///
/// # Example
///
/// ```rust
/// use tagsmith::render;
///
/// let out = render(r#"{#each items=[a,b,c] glue=", "}{@current}{/each}"#).unwrap();
/// assert_eq!(out, "a, b, c");
/// ```
pub fn render(source: &str) -> Result<String, RenderError> {
    render_with_config(source, &RenderConfig::default())
}

/// Render template text with the built-in registry and a custom configuration
///
/// # Example
///
/// ```rust
/// use tagsmith::{render_with_config, RenderConfig};
///
/// let config = RenderConfig::new().with_delimiters("{{", "}}");
/// let out = render_with_config(r#"{{#let n=3}}{{=add(n, 4)}}"#, &config).unwrap();
/// assert_eq!(out, "7");
/// ```
pub fn render_with_config(source: &str, config: &RenderConfig) -> Result<String, RenderError> {
    let registry = Registry::with_defaults();
    let mut template = Template::new(&registry, config.clone());
    template.render(source)
}

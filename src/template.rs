//! Template orchestrator: owns the variable bag, the section outputs, the
//! loader and the event sink, and runs the layout protocol per render

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::config::RenderConfig;
use crate::events::{EventSink, TracingSink};
use crate::loader::{FileLoader, SourceLoader, TEMPLATES};
use crate::parser::{Document, Parser};
use crate::registry::Registry;
use crate::render::RenderContext;
use crate::value::{Scope, Value};
use crate::RenderError;

/// One configured template
///
/// Variables set with `global=true` persist across renders of the same
/// template.
pub struct Template<'r> {
    registry: &'r Registry,
    config: RenderConfig,
    loader: Box<dyn SourceLoader>,
    sink: Box<dyn EventSink>,
    variables: Scope,
    outputs: BTreeMap<String, String>,
}

impl<'r> Template<'r> {
    /// File-backed template reporting events to `tracing`
    pub fn new(registry: &'r Registry, config: RenderConfig) -> Self {
        Self {
            registry,
            config,
            loader: Box::new(FileLoader::new()),
            sink: Box::new(TracingSink),
            variables: Scope::new(),
            outputs: BTreeMap::new(),
        }
    }

    pub fn with_loader(mut self, loader: impl SourceLoader + 'static) -> Self {
        self.loader = Box::new(loader);
        self
    }

    pub fn with_sink(mut self, sink: impl EventSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    /// Replace the variable bag
    pub fn with_variables(mut self, variables: Scope) -> Self {
        self.variables = variables;
        self
    }

    pub fn set_variable(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.variables.insert(name, value);
    }

    pub fn variables(&self) -> &Scope {
        &self.variables
    }

    /// Section slots of the last render
    pub fn outputs(&self) -> &BTreeMap<String, String> {
        &self.outputs
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Render template text
    pub fn render(&mut self, source: &str) -> Result<String, RenderError> {
        let parser = Parser::new(&self.registry.tags, &self.config.delimiters)?;
        let mut doc = Document::new();
        let mut ctx = RenderContext::new(
            self.registry,
            &parser,
            &self.config,
            self.loader.as_ref(),
            self.sink.as_ref(),
            &mut self.variables,
        );

        let (output, outputs) = ctx.render_document(&mut doc, source)?;
        debug!(
            elements = doc.len(),
            macros = ctx.macros().len(),
            sections = outputs.slots.len(),
            "render finished"
        );
        self.outputs = outputs.slots;
        Ok(output)
    }

    /// Load `name` from the `templates` root and render it
    pub fn render_named(&mut self, name: &str) -> Result<String, RenderError> {
        let source = self.loader.load(name, self.config.paths(TEMPLATES))?;
        info!(name, "rendering named template");
        self.render(&source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::MemoryLoader;

    #[test]
    fn test_variables_visible() {
        let registry = Registry::with_defaults();
        let mut template = Template::new(&registry, RenderConfig::default());
        template.set_variable("who", "World");
        assert_eq!(template.render("Hello {$who}").unwrap(), "Hello World");
    }

    #[test]
    fn test_globals_persist_across_renders() {
        let registry = Registry::with_defaults();
        let mut template = Template::new(&registry, RenderConfig::default());
        template.render("{#let seen=yes global=true}").unwrap();
        assert_eq!(template.variables().get("seen"), Some(&Value::from("yes")));
        assert_eq!(template.render("{$seen}").unwrap(), "yes");
    }

    #[test]
    fn test_local_let_does_not_leak() {
        let registry = Registry::with_defaults();
        let mut template = Template::new(&registry, RenderConfig::default());
        template.render("{#let local=1}").unwrap();
        assert!(template.variables().is_empty());
    }

    #[test]
    fn test_outputs_recorded() {
        let registry = Registry::with_defaults();
        let mut template = Template::new(&registry, RenderConfig::default());
        let out = template.render("@section(title)Home@endsection").unwrap();
        assert_eq!(out, "Home");
        assert_eq!(template.outputs().get("title").map(String::as_str), Some("Home"));
    }

    #[test]
    fn test_render_named() {
        let registry = Registry::with_defaults();
        let loader = MemoryLoader::new().with_source("page.tpl", "named {$n}");
        let mut template = Template::new(&registry, RenderConfig::default()).with_loader(loader);
        template.set_variable("n", 1);
        assert_eq!(template.render_named("page").unwrap(), "named 1");
    }
}

//! Render state shared by every element of one template render

use std::collections::HashMap;

use tracing::debug;

use crate::config::RenderConfig;
use crate::events::{EventKind, EventSink, RenderEvent};
use crate::loader::{SearchPaths, SourceLoader};
use crate::parser::{Document, NodeId, Parser};
use crate::prepare::PrepareContext;
use crate::registry::Registry;
use crate::tags::ElementKind;
use crate::value::{Scope, Value};
use crate::RenderError;

use super::dispatch::{Dispatch, ExecutorKind, Handler, RendererKind, TagContext};

/// A macro registered by `@macro`
#[derive(Debug, Clone, PartialEq)]
pub struct MacroDef {
    /// Parameter defaults
    pub params: Scope,
    pub body: String,
}

/// Everything rendering needs besides the document itself
pub struct RenderContext<'a> {
    pub(super) registry: &'a Registry,
    pub(super) parser: &'a Parser<'a>,
    pub(super) config: &'a RenderConfig,
    pub(super) loader: &'a dyn SourceLoader,
    sink: &'a dyn EventSink,
    globals: &'a mut Scope,
    pub(super) macros: HashMap<String, MacroDef>,
    pub(super) depth: usize,
}

impl<'a> RenderContext<'a> {
    pub fn new(
        registry: &'a Registry,
        parser: &'a Parser<'a>,
        config: &'a RenderConfig,
        loader: &'a dyn SourceLoader,
        sink: &'a dyn EventSink,
        globals: &'a mut Scope,
    ) -> Self {
        Self {
            registry,
            parser,
            config,
            loader,
            sink,
            globals,
            macros: HashMap::new(),
            depth: 0,
        }
    }

    pub fn registry(&self) -> &'a Registry {
        self.registry
    }

    pub fn config(&self) -> &'a RenderConfig {
        self.config
    }

    pub fn globals(&self) -> &Scope {
        &*self.globals
    }

    pub fn macros(&self) -> &HashMap<String, MacroDef> {
        &self.macros
    }

    /// Resolve `name` from `id` up through its ancestors, then the globals
    pub fn lookup(&self, doc: &Document, id: NodeId, name: &str) -> Option<Value> {
        doc.lookup(id, name)
            .or_else(|| self.globals.get(name))
            .cloned()
    }

    /// Bind `name` in the scope of the element's parent, or in the globals
    pub fn assign(&mut self, doc: &mut Document, id: NodeId, name: &str, value: Value, global: bool) {
        if global {
            self.globals.insert(name, value);
            return;
        }
        let target = doc.get(id).parent().unwrap_or(id);
        doc.get_mut(target).scope.insert(name, value);
    }

    /// Report an event for a subscribed element
    pub fn emit(&self, doc: &Document, id: NodeId, kind: EventKind, detail: &str) {
        let element = doc.get(id);
        if !element.subscribed {
            return;
        }
        let tag = if element.tag.is_empty() {
            element.kind.name()
        } else {
            element.tag.as_str()
        };
        self.sink.emit(&RenderEvent::new(kind, tag, detail));
    }

    /// Report an event that belongs to no element
    pub(super) fn emit_template(&self, kind: EventKind, detail: &str) {
        if self.config.bubble_events {
            self.sink.emit(&RenderEvent::new(kind, "template", detail));
        }
    }

    /// Parse and prepare a fragment
    pub fn build_fragment(
        &mut self,
        doc: &mut Document,
        source: &str,
        parent: Option<NodeId>,
        inherited: Scope,
        paths: SearchPaths,
    ) -> Result<NodeId, RenderError> {
        let ctx = PrepareContext {
            parent,
            inherited,
            paths,
            bubble_events: self.config.bubble_events,
        };
        self.parser
            .build(doc, source, &self.registry.pipeline, &ctx)
            .map_err(RenderError::Parse)
    }

    /// Render one element
    pub fn render_node(&mut self, doc: &mut Document, id: NodeId) -> Result<String, RenderError> {
        let kind = doc.get(id).kind.clone();
        let lifecycle = !matches!(kind, ElementKind::Text | ElementKind::Root);
        if lifecycle {
            self.emit(doc, id, EventKind::Started, "");
        }

        let output = match Dispatch::for_kind(&kind) {
            Dispatch::Render(renderer) => self.render_builtin(renderer, doc, id)?,
            Dispatch::Execute(executor) => self.execute_builtin(executor, doc, id)?.to_string(),
            Dispatch::Custom => self.render_custom(doc, id)?,
        };

        if lifecycle {
            self.emit(doc, id, EventKind::Complete, "");
        }
        Ok(output)
    }

    /// Render the children of `id` in order and concatenate them
    pub fn render_children(&mut self, doc: &mut Document, id: NodeId) -> Result<String, RenderError> {
        let children = doc.get(id).children().to_vec();
        let mut output = String::new();
        for child in children {
            output.push_str(&self.render_node(doc, child)?);
        }
        Ok(output)
    }

    fn render_builtin(
        &mut self,
        renderer: RendererKind,
        doc: &mut Document,
        id: NodeId,
    ) -> Result<String, RenderError> {
        match renderer {
            RendererKind::Default => self.render_own(doc, id),
            RendererKind::Template => self.render_template(doc, id),
            RendererKind::Section => self.render_section(doc, id),
            RendererKind::Output => Ok(self.render_output(doc, id)),
        }
    }

    /// The element's own behaviour
    fn render_own(&mut self, doc: &mut Document, id: NodeId) -> Result<String, RenderError> {
        let kind = doc.get(id).kind.clone();
        match kind {
            ElementKind::Text => Ok(doc.get(id).text_content().unwrap_or_default().to_string()),
            ElementKind::Variable => Ok(self.render_variable(doc, id)),
            ElementKind::If => self.render_if(doc, id),
            ElementKind::While => self.render_while(doc, id),
            ElementKind::Each => self.render_each(doc, id),
            ElementKind::Until => self.render_until(doc, id),
            ElementKind::Await => self.render_await(doc, id),
            ElementKind::Comment => Ok(String::new()),
            _ => self.render_children(doc, id),
        }
    }

    fn execute_builtin(
        &mut self,
        executor: ExecutorKind,
        doc: &mut Document,
        id: NodeId,
    ) -> Result<Value, RenderError> {
        match executor {
            ExecutorKind::Let => Ok(self.execute_let(doc, id)),
            ExecutorKind::Expression => self.execute_expression(doc, id),
            ExecutorKind::Macro => Ok(self.execute_macro(doc, id)),
            ExecutorKind::Invoke => self.execute_invoke(doc, id),
            ExecutorKind::Include => self.execute_include(doc, id),
            ExecutorKind::Import => self.execute_import(doc, id),
        }
    }

    fn render_custom(&mut self, doc: &mut Document, id: NodeId) -> Result<String, RenderError> {
        let registry = self.registry;
        match registry.renderers.get(&doc.get(id).tag) {
            Some(Handler::Render(renderer)) => renderer.render(&mut TagContext::new(self, doc, id)),
            Some(Handler::Execute(executor)) => executor
                .execute(&mut TagContext::new(self, doc, id))
                .map(|value| value.to_string()),
            None => {
                debug!(tag = %doc.get(id).tag, "no renderer registered, rendering passively");
                self.render_children(doc, id)
            }
        }
    }
}

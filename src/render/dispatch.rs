//! Renderer / executor dispatch
//!
//! Built-in element kinds go through an exhaustive match; custom tags are
//! looked up by name in the [`RendererRegistry`], then under the `*`
//! wildcard, and otherwise render passively.

use std::collections::BTreeMap;
use std::fmt;

use crate::eval::Bindings;
use crate::events::EventKind;
use crate::parser::{Document, Element, NodeId};
use crate::tags::ElementKind;
use crate::value::Value;
use crate::RenderError;

use super::context::RenderContext;

/// Registry key matching any custom tag without its own handler
pub const WILDCARD: &str = "*";

/// Text-producing behaviours
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RendererKind {
    /// The element's own behaviour
    Default,
    Template,
    Section,
    Output,
}

/// Side-effecting or value-producing behaviours
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorKind {
    Let,
    Expression,
    Macro,
    Invoke,
    Include,
    Import,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Render(RendererKind),
    Execute(ExecutorKind),
    /// Resolved through the renderer registry
    Custom,
}

impl Dispatch {
    pub fn for_kind(kind: &ElementKind) -> Self {
        match kind {
            ElementKind::Root
            | ElementKind::Text
            | ElementKind::Variable
            | ElementKind::If
            | ElementKind::While
            | ElementKind::Each
            | ElementKind::Until
            | ElementKind::Await
            | ElementKind::Comment => Dispatch::Render(RendererKind::Default),
            ElementKind::Template => Dispatch::Render(RendererKind::Template),
            ElementKind::Section => Dispatch::Render(RendererKind::Section),
            ElementKind::Output => Dispatch::Render(RendererKind::Output),
            ElementKind::Let => Dispatch::Execute(ExecutorKind::Let),
            ElementKind::Expression => Dispatch::Execute(ExecutorKind::Expression),
            ElementKind::Macro => Dispatch::Execute(ExecutorKind::Macro),
            ElementKind::Invoke => Dispatch::Execute(ExecutorKind::Invoke),
            ElementKind::Include => Dispatch::Execute(ExecutorKind::Include),
            ElementKind::Import => Dispatch::Execute(ExecutorKind::Import),
            ElementKind::Custom => Dispatch::Custom,
        }
    }
}

/// View of one element handed to custom renderers and executors
pub struct TagContext<'c, 'a> {
    ctx: &'c mut RenderContext<'a>,
    doc: &'c mut Document,
    id: NodeId,
}

impl<'c, 'a> TagContext<'c, 'a> {
    pub(crate) fn new(ctx: &'c mut RenderContext<'a>, doc: &'c mut Document, id: NodeId) -> Self {
        Self { ctx, doc, id }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn element(&self) -> &Element {
        self.doc.get(self.id)
    }

    /// Resolve a variable as seen from this element
    pub fn lookup(&self, name: &str) -> Option<Value> {
        self.ctx.lookup(self.doc, self.id, name)
    }

    /// Bind a variable in the enclosing block
    pub fn set(&mut self, name: &str, value: impl Into<Value>) {
        self.ctx.assign(self.doc, self.id, name, value.into(), false);
    }

    pub fn render_children(&mut self) -> Result<String, RenderError> {
        self.ctx.render_children(self.doc, self.id)
    }

    pub fn emit_event(&self, kind: EventKind, detail: &str) {
        self.ctx.emit(self.doc, self.id, kind, detail);
    }
}

impl Bindings for TagContext<'_, '_> {
    fn lookup(&self, name: &str) -> Option<Value> {
        TagContext::lookup(self, name)
    }

    fn assign(&mut self, name: &str, value: Value, global: bool) {
        self.ctx.assign(self.doc, self.id, name, value, global);
    }

    fn emit(&self, kind: EventKind, detail: &str) {
        self.emit_event(kind, detail);
    }
}

/// Produces text for a custom tag
pub trait Renderer: Send + Sync {
    fn render(&self, tag: &mut TagContext<'_, '_>) -> Result<String, RenderError>;
}

/// Performs a side effect or produces a value for a custom tag
pub trait Executor: Send + Sync {
    fn execute(&self, tag: &mut TagContext<'_, '_>) -> Result<Value, RenderError>;
}

struct FnRenderer<F>(F);

impl<F> Renderer for FnRenderer<F>
where
    F: Fn(&mut TagContext<'_, '_>) -> Result<String, RenderError> + Send + Sync,
{
    fn render(&self, tag: &mut TagContext<'_, '_>) -> Result<String, RenderError> {
        (self.0)(tag)
    }
}

struct FnExecutor<F>(F);

impl<F> Executor for FnExecutor<F>
where
    F: Fn(&mut TagContext<'_, '_>) -> Result<Value, RenderError> + Send + Sync,
{
    fn execute(&self, tag: &mut TagContext<'_, '_>) -> Result<Value, RenderError> {
        (self.0)(tag)
    }
}

pub enum Handler {
    Render(Box<dyn Renderer>),
    Execute(Box<dyn Executor>),
}

/// Handlers for custom tags, keyed by tag name
#[derive(Default)]
pub struct RendererRegistry {
    handlers: BTreeMap<String, Handler>,
}

impl fmt::Debug for RendererRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.handlers.keys()).finish()
    }
}

impl RendererRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_renderer(&mut self, tag: impl Into<String>, renderer: Box<dyn Renderer>) {
        self.handlers.insert(tag.into(), Handler::Render(renderer));
    }

    pub fn register_executor(&mut self, tag: impl Into<String>, executor: Box<dyn Executor>) {
        self.handlers.insert(tag.into(), Handler::Execute(executor));
    }

    pub fn renderer_fn<F>(&mut self, tag: impl Into<String>, render: F)
    where
        F: Fn(&mut TagContext<'_, '_>) -> Result<String, RenderError> + Send + Sync + 'static,
    {
        self.register_renderer(tag, Box::new(FnRenderer(render)));
    }

    pub fn executor_fn<F>(&mut self, tag: impl Into<String>, execute: F)
    where
        F: Fn(&mut TagContext<'_, '_>) -> Result<Value, RenderError> + Send + Sync + 'static,
    {
        self.register_executor(tag, Box::new(FnExecutor(execute)));
    }

    /// Handler for `tag`, falling back to the wildcard
    pub fn get(&self, tag: &str) -> Option<&Handler> {
        self.handlers.get(tag).or_else(|| self.handlers.get(WILDCARD))
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.handlers.contains_key(tag)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(|k| k.as_str())
    }
}

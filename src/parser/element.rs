//! Parse-tree nodes stored in an arena

use std::cell::OnceCell;
use std::collections::BTreeMap;

use tracing::warn;

use crate::loader::SearchPaths;
use crate::parser::attributes::{parse_attributes, Attributes};
use crate::tags::{AttributeSpec, Capability, ElementKind, TagDefinition};
use crate::value::{Scope, Value};

use super::lexer::Span;

/// Handle to an element inside a [`Document`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Leaf text or an ordered list of children
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    Text(String),
    Children(Vec<NodeId>),
}

/// Named slots of a layout container plus the layout it asked for
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Outputs {
    pub slots: BTreeMap<String, String>,
    pub layout: Option<String>,
}

/// One node of the parse tree
#[derive(Debug, Clone)]
pub struct Element {
    /// Tag name; empty for literal runs and fragment roots
    pub tag: String,
    pub kind: ElementKind,
    pub capability: Capability,
    /// Tag body with delimiters, lead and parentheses stripped
    pub raw_attributes: String,
    spec: AttributeSpec,
    attributes: OnceCell<Attributes>,
    pub content: Content,
    /// Raw inner text of a block
    pub source: Option<String>,
    pub span: Span,
    parent: Option<NodeId>,
    pub scope: Scope,
    closed: bool,
    pub outputs: Option<Outputs>,
    pub paths: SearchPaths,
    pub subscribed: bool,
}

impl Element {
    fn bare(tag: String, kind: ElementKind, content: Content, span: Span) -> Self {
        Self {
            tag,
            capability: kind.capability(),
            kind,
            raw_attributes: String::new(),
            spec: AttributeSpec::default(),
            attributes: OnceCell::new(),
            content,
            source: None,
            span,
            parent: None,
            scope: Scope::new(),
            closed: false,
            outputs: None,
            paths: SearchPaths::new(),
            subscribed: false,
        }
    }

    /// Literal text run
    pub fn text(text: impl Into<String>, span: Span) -> Self {
        Self::bare(String::new(), ElementKind::Text, Content::Text(text.into()), span)
    }

    /// Fragment root holding a parsed sequence
    pub fn root(children: Vec<NodeId>, span: Span) -> Self {
        Self::bare(String::new(), ElementKind::Root, Content::Children(children), span)
    }

    /// Element for a matched tag
    pub fn tag(def: &TagDefinition, raw_attributes: &str, content: Content, span: Span) -> Self {
        let mut element = Self::bare(def.name().to_string(), def.kind().clone(), content, span);
        element.capability = def.capability();
        element.raw_attributes = raw_attributes.to_string();
        element.spec = def.attributes().clone();
        element
    }

    /// Attributes, parsed on first access
    pub fn attributes(&self) -> &Attributes {
        self.attributes.get_or_init(|| {
            parse_attributes(&self.raw_attributes, &self.spec).unwrap_or_else(|errors| {
                warn!(
                    tag = %self.tag,
                    body = %self.raw_attributes,
                    errors = errors.len(),
                    "malformed tag attributes ignored"
                );
                Attributes::default()
            })
        })
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn close(&mut self) {
        self.closed = true;
    }

    /// Child ids (empty for leaves)
    pub fn children(&self) -> &[NodeId] {
        match &self.content {
            Content::Children(children) => children,
            Content::Text(_) => &[],
        }
    }

    /// Leaf text (or the raw body of a raw block)
    pub fn text_content(&self) -> Option<&str> {
        match &self.content {
            Content::Text(text) => Some(text),
            Content::Children(_) => None,
        }
    }

    pub fn is_container(&self) -> bool {
        self.outputs.is_some()
    }
}

/// Arena owning every element of one render
#[derive(Debug, Clone, Default)]
pub struct Document {
    nodes: Vec<Element>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, element: Element) -> NodeId {
        self.nodes.push(element);
        NodeId(self.nodes.len() - 1)
    }

    pub fn get(&self, id: NodeId) -> &Element {
        &self.nodes[id.0]
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut Element {
        &mut self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Attach `id` to `parent`; a parent once set is never replaced
    pub fn set_parent(&mut self, id: NodeId, parent: NodeId) -> bool {
        let element = self.get_mut(id);
        if element.parent.is_some() {
            return false;
        }
        element.parent = Some(parent);
        true
    }

    /// `id` followed by its ancestors, nearest first
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(Some(id), move |&current| self.get(current).parent)
    }

    /// Resolve a name through the scopes of `id` and its ancestors
    pub fn lookup(&self, id: NodeId, name: &str) -> Option<&Value> {
        self.ancestors(id)
            .find_map(|ancestor| self.get(ancestor).scope.get(name))
    }

    /// Nearest layout container at or above `id`
    pub fn nearest_container(&self, id: NodeId) -> Option<NodeId> {
        self.ancestors(id)
            .find(|&ancestor| self.get(ancestor).is_container())
    }

    /// Pre-order traversal of the subtree rooted at `id`
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            order.push(current);
            stack.extend(self.get(current).children().iter().rev());
        }
        order
    }
}

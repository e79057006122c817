//! Preparer pipeline run over every element after parsing
//!
//! Preparers run in a fixed order, pre-order over a fragment:
//! variables, search paths, hierarchy, event subscription. Every element is
//! marked closed afterwards so a second pass leaves it unchanged.

use std::fmt;

use tracing::debug;

use crate::loader::SearchPaths;
use crate::parser::{Document, Element, NodeId};
use crate::value::Scope;

/// What a fragment inherits from the place it is attached
#[derive(Debug, Clone, Default)]
pub struct PrepareContext {
    /// Element the fragment root hangs under (invoke, include, container)
    pub parent: Option<NodeId>,
    /// Bindings visible at the fragment's entry point
    pub inherited: Scope,
    pub paths: SearchPaths,
    pub bubble_events: bool,
}

/// One preparation pass
pub trait Preparer: Send + Sync {
    fn name(&self) -> &str;

    /// Tag or kind names handled; empty means every element
    fn supported(&self) -> &[&'static str] {
        &[]
    }

    fn supports(&self, element: &Element) -> bool {
        let supported = self.supported();
        supported.is_empty()
            || supported
                .iter()
                .any(|name| *name == element.tag || *name == element.kind.name())
    }

    fn prepare(&self, doc: &mut Document, id: NodeId, parent: Option<NodeId>, ctx: &PrepareContext);
}

/// Seeds fragment roots with the inherited bindings
#[derive(Debug, Clone, Copy, Default)]
pub struct VariablePreparer;

impl Preparer for VariablePreparer {
    fn name(&self) -> &str {
        "variables"
    }

    fn supported(&self) -> &[&'static str] {
        &["root"]
    }

    fn prepare(&self, doc: &mut Document, id: NodeId, _parent: Option<NodeId>, ctx: &PrepareContext) {
        doc.get_mut(id).scope.extend(&ctx.inherited);
    }
}

/// Copies the active search roots into each element
#[derive(Debug, Clone, Copy, Default)]
pub struct PathPreparer;

impl Preparer for PathPreparer {
    fn name(&self) -> &str {
        "paths"
    }

    fn prepare(&self, doc: &mut Document, id: NodeId, _parent: Option<NodeId>, ctx: &PrepareContext) {
        let element = doc.get_mut(id);
        if element.paths.is_empty() {
            element.paths = ctx.paths.clone();
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HierarchyPreparer;

impl Preparer for HierarchyPreparer {
    fn name(&self) -> &str {
        "hierarchy"
    }

    fn prepare(&self, doc: &mut Document, id: NodeId, parent: Option<NodeId>, _ctx: &PrepareContext) {
        if let Some(parent) = parent {
            doc.set_parent(id, parent);
        }
    }
}

/// Routes the element's events to the template sink
#[derive(Debug, Clone, Copy, Default)]
pub struct EventBubblePreparer;

impl Preparer for EventBubblePreparer {
    fn name(&self) -> &str {
        "events"
    }

    fn prepare(&self, doc: &mut Document, id: NodeId, _parent: Option<NodeId>, ctx: &PrepareContext) {
        doc.get_mut(id).subscribed = ctx.bubble_events;
    }
}

/// Ordered preparer list
pub struct Pipeline {
    preparers: Vec<Box<dyn Preparer>>,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

impl Pipeline {
    /// Pipeline without any preparer
    pub fn empty() -> Self {
        Self {
            preparers: Vec::new(),
        }
    }

    pub fn with_defaults() -> Self {
        Self {
            preparers: vec![
                Box::new(VariablePreparer),
                Box::new(PathPreparer),
                Box::new(HierarchyPreparer),
                Box::new(EventBubblePreparer),
            ],
        }
    }

    /// Append a preparer after the built-in ones
    pub fn push(&mut self, preparer: Box<dyn Preparer>) {
        self.preparers.push(preparer);
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.preparers.iter().map(|p| p.name())
    }

    /// Prepare the subtree rooted at `root`, parents before children
    pub fn run(&self, doc: &mut Document, root: NodeId, ctx: &PrepareContext) {
        let mut stack = vec![(root, ctx.parent)];
        let mut prepared = 0usize;

        while let Some((id, parent)) = stack.pop() {
            if !doc.get(id).is_closed() {
                for preparer in &self.preparers {
                    if preparer.supports(doc.get(id)) {
                        preparer.prepare(doc, id, parent, ctx);
                    }
                }
                doc.get_mut(id).close();
                prepared += 1;
            }

            let children = doc.get(id).children().to_vec();
            stack.extend(children.into_iter().rev().map(|child| (child, Some(id))));
        }

        debug!(root = root.index(), prepared, "pipeline finished");
    }
}

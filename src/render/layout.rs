//! Two-pass layout protocol: template, section and output

use std::collections::{BTreeMap, HashSet};

use tracing::{debug, warn};

use crate::events::EventKind;
use crate::loader::TEMPLATES;
use crate::parser::{Document, NodeId, Outputs};
use crate::value::Scope;
use crate::RenderError;

use super::context::RenderContext;

/// Slot receiving the rendered page when a layout wraps it
pub const CONTENT_SLOT: &str = "content";

impl<'a> RenderContext<'a> {
    /// Record the requested layout on the nearest container
    pub(super) fn render_template(&mut self, doc: &mut Document, id: NodeId) -> Result<String, RenderError> {
        let Some(layout) = doc.get(id).attributes().text("name") else {
            warn!("template directive without a layout name");
            return Ok(String::new());
        };
        let content = if doc.get(id).children().is_empty() {
            None
        } else {
            Some(self.render_children(doc, id)?)
        };

        let Some(container) = doc.nearest_container(id) else {
            warn!(layout = %layout, "template directive outside a layout container");
            return Ok(String::new());
        };
        debug!(layout = %layout, "layout requested");
        let outputs = doc.get_mut(container).outputs.get_or_insert_with(Outputs::default);
        outputs.layout = Some(layout);
        if let Some(content) = content {
            outputs.slots.insert(CONTENT_SLOT.to_string(), content);
        }
        Ok(String::new())
    }

    /// Render the section, register it in the nearest container and
    /// return it inline
    pub(super) fn render_section(&mut self, doc: &mut Document, id: NodeId) -> Result<String, RenderError> {
        let content = self.render_children(doc, id)?;
        let Some(name) = doc.get(id).attributes().text("name") else {
            return Ok(content);
        };
        if let Some(container) = doc.nearest_container(id) {
            if let Some(outputs) = doc.get_mut(container).outputs.as_mut() {
                outputs.slots.insert(name, content.clone());
            }
        }
        Ok(content)
    }

    pub(super) fn render_output(&self, doc: &Document, id: NodeId) -> String {
        let Some(name) = doc.get(id).attributes().text("name") else {
            return String::new();
        };
        doc.nearest_container(id)
            .and_then(|container| doc.get(container).outputs.as_ref())
            .and_then(|outputs| outputs.slots.get(&name))
            .cloned()
            .unwrap_or_default()
    }

    /// Parse `source` into a new layout container seeded with `slots`
    fn build_container(
        &mut self,
        doc: &mut Document,
        source: &str,
        slots: BTreeMap<String, String>,
    ) -> Result<NodeId, RenderError> {
        let paths = self.config.search_paths.clone();
        let root = self.build_fragment(doc, source, None, Scope::new(), paths)?;
        doc.get_mut(root).outputs = Some(Outputs {
            slots,
            layout: None,
        });
        Ok(root)
    }

    /// Render a page and every layout it (transitively) asks for
    ///
    /// Returns the final text and the slots of the outermost container.
    pub fn render_document(
        &mut self,
        doc: &mut Document,
        source: &str,
    ) -> Result<(String, Outputs), RenderError> {
        let mut root = self.build_container(doc, source, BTreeMap::new())?;
        let mut output = self.render_node(doc, root)?;
        let mut visited = HashSet::new();

        loop {
            let outputs = doc.get(root).outputs.clone().unwrap_or_default();
            let Some(layout) = outputs.layout.clone() else {
                return Ok((output, outputs));
            };
            if !visited.insert(layout.clone()) {
                warn!(layout = %layout, "layout cycle stopped");
                self.emit_template(EventKind::Error, &format!("layout cycle at '{}'", layout));
                return Ok((output, outputs));
            }
            if visited.len() > self.config.max_depth {
                warn!(layout = %layout, "layout chain too deep");
                self.emit_template(EventKind::Error, "layout chain too deep");
                return Ok((output, outputs));
            }

            let source = match self.loader.load(&layout, self.config.paths(TEMPLATES)) {
                Ok(source) => source,
                Err(err) if self.config.strict_includes => return Err(err.into()),
                Err(err) => {
                    warn!(layout = %layout, error = %err, "layout not found, keeping page output");
                    self.emit_template(EventKind::Error, &err.to_string());
                    return Ok((output, outputs));
                }
            };

            debug!(layout = %layout, "rendering layout");
            let mut slots = outputs.slots;
            slots.insert(CONTENT_SLOT.to_string(), output);
            root = self.build_container(doc, &source, slots)?;
            output = self.render_node(doc, root)?;
        }
    }
}

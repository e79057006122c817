//! Executors: let, expressions, macros, includes and imports

use tracing::{debug, warn};

use crate::eval::Evaluator;
use crate::events::EventKind;
use crate::loader::{LoadError, SearchPaths, MODULES, TEMPLATES};
use crate::parser::{Document, NodeId};
use crate::value::{Scope, Value};
use crate::RenderError;

use super::context::{MacroDef, RenderContext};
use super::dispatch::TagContext;

/// `let` keys that configure the binding instead of naming a variable
const LET_OPTIONS: [&str; 2] = ["global", "type"];

impl<'a> RenderContext<'a> {
    pub(super) fn execute_let(&mut self, doc: &mut Document, id: NodeId) -> Value {
        let attributes = doc.get(id).attributes().clone();
        let global = attributes
            .get("global")
            .map(|g| g.to_value().is_truthy())
            .unwrap_or(false);
        let registry = self.registry;
        let datatype = attributes.text("type").and_then(|name| {
            let found = registry.datatypes.get(&name);
            if found.is_none() {
                warn!(datatype = %name, "unknown datatype, binding uncoerced");
            }
            found
        });

        for (key, raw) in attributes.pairs() {
            if LET_OPTIONS.contains(&key) {
                continue;
            }
            let mut value = self.attr_value(doc, id, raw);
            if let Some(datatype) = datatype {
                match datatype.coerce(&value) {
                    Some(coerced) => value = coerced,
                    None => {
                        warn!(variable = key, datatype = datatype.name(), "coercion failed");
                        self.emit(doc, id, EventKind::Error, &format!("cannot coerce '{}'", key));
                    }
                }
            }
            self.assign(doc, id, key, value, global);
        }
        Value::Null
    }

    pub(super) fn execute_expression(&mut self, doc: &mut Document, id: NodeId) -> Result<Value, RenderError> {
        let source = doc.get(id).attributes().expression().unwrap_or_default().to_string();
        let registry = self.registry;
        let evaluator = Evaluator::new(&registry.functions);
        let evaluation = evaluator.evaluate(&source, &mut TagContext::new(self, doc, id))?;
        if evaluation.assigned.is_some() {
            return Ok(Value::Null);
        }
        Ok(evaluation.value)
    }

    /// Register the raw body; nothing renders here
    pub(super) fn execute_macro(&mut self, doc: &mut Document, id: NodeId) -> Value {
        let element = doc.get(id);
        let attributes = element.attributes();
        let Some(name) = attributes.name() else {
            warn!("macro without a name");
            return Value::Null;
        };
        let params = attributes
            .pairs()
            .map(|(key, value)| (key.to_string(), value.to_value()))
            .collect();
        let body = element.text_content().unwrap_or_default().to_string();
        debug!(name, "macro registered");
        self.macros.insert(name.to_string(), MacroDef { params, body });
        Value::Null
    }

    /// Attribute pairs of `id` resolved against its scope
    fn arguments(&self, doc: &Document, id: NodeId) -> Scope {
        doc.get(id)
            .attributes()
            .pairs()
            .map(|(key, value)| (key, self.attr_value(doc, id, value)))
            .collect()
    }

    pub(super) fn execute_invoke(&mut self, doc: &mut Document, id: NodeId) -> Result<Value, RenderError> {
        let name = doc.get(id).attributes().name().unwrap_or_default().to_string();
        let Some(definition) = self.macros.get(&name).cloned() else {
            warn!(name = %name, "invoke of unknown macro");
            self.emit(doc, id, EventKind::Error, &format!("unknown macro '{}'", name));
            return Ok(Value::Null);
        };

        let mut params = definition.params;
        params.extend(&self.arguments(doc, id));
        let paths = doc.get(id).paths.clone();
        self.render_nested(doc, id, &definition.body, params, paths)
    }

    pub(super) fn execute_include(&mut self, doc: &mut Document, id: NodeId) -> Result<Value, RenderError> {
        let name = doc.get(id).attributes().name().unwrap_or_default().to_string();
        let paths = doc.get(id).paths.clone();
        let roots = paths.get(TEMPLATES).map(Vec::as_slice).unwrap_or(&[]);
        let source = match self.loader.load(&name, roots) {
            Ok(source) => source,
            Err(err) => return self.missing_source(doc, id, err),
        };

        let params = self.arguments(doc, id);
        self.render_nested(doc, id, &source, params, paths)
    }

    /// Render a module for its bindings and macros only
    pub(super) fn execute_import(&mut self, doc: &mut Document, id: NodeId) -> Result<Value, RenderError> {
        let name = doc.get(id).attributes().name().unwrap_or_default().to_string();
        let paths = doc.get(id).paths.clone();
        let roots = paths.get(MODULES).map(Vec::as_slice).unwrap_or(&[]);
        let source = match self.loader.load(&name, roots) {
            Ok(source) => source,
            Err(err) => return self.missing_source(doc, id, err),
        };

        if self.depth >= self.config.max_depth {
            return Ok(self.too_deep(doc, id));
        }
        let root = self.build_fragment(doc, &source, None, Scope::new(), paths)?;
        self.depth += 1;
        let rendered = self.render_node(doc, root);
        self.depth -= 1;
        rendered?;

        let exported = doc.get(root).scope.clone();
        debug!(module = %name, bindings = exported.len(), "module imported");
        let target = doc.get(id).parent().unwrap_or(id);
        doc.get_mut(target).scope.extend(&exported);
        Ok(Value::Null)
    }

    /// Parse `source` under `id` and render it with `inherited` in scope
    fn render_nested(
        &mut self,
        doc: &mut Document,
        id: NodeId,
        source: &str,
        inherited: Scope,
        paths: SearchPaths,
    ) -> Result<Value, RenderError> {
        if self.depth >= self.config.max_depth {
            return Ok(self.too_deep(doc, id));
        }
        let root = self.build_fragment(doc, source, Some(id), inherited, paths)?;
        self.depth += 1;
        let rendered = self.render_node(doc, root);
        self.depth -= 1;
        rendered.map(Value::String)
    }

    fn too_deep(&self, doc: &Document, id: NodeId) -> Value {
        warn!(max_depth = self.config.max_depth, tag = %doc.get(id).tag, "nesting too deep");
        self.emit(doc, id, EventKind::Error, "maximum nesting depth exceeded");
        Value::Null
    }

    fn missing_source(&self, doc: &Document, id: NodeId, err: LoadError) -> Result<Value, RenderError> {
        if self.config.strict_includes {
            return Err(err.into());
        }
        warn!(error = %err, "missing source renders empty");
        self.emit(doc, id, EventKind::Error, &err.to_string());
        Ok(Value::Null)
    }
}

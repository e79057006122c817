//! Variables, conditionals, loops and await

use std::cmp::Ordering;

use tracing::warn;

use crate::events::EventKind;
use crate::parser::{AttrValue, Document, NodeId};
use crate::value::{Scope, Value};
use crate::RenderError;

use super::context::RenderContext;

/// Comparison attributes understood by `if` and `while`
const OPERATORS: [&str; 6] = ["equals", "not_equals", "gt", "lt", "gte", "lte"];

const DEFAULT_ATTEMPTS: usize = 3;

/// Compare numerically when both sides are numbers, textually otherwise
fn compare(left: &Value, op: &str, right: &Value) -> bool {
    let number = |v: &Value| match v {
        Value::Number(_) | Value::String(_) => v.as_number(),
        _ => None,
    };
    let ordering = match (number(left), number(right)) {
        (Some(a), Some(b)) => a.partial_cmp(&b),
        _ => Some(left.to_string().cmp(&right.to_string())),
    };
    match op {
        "equals" => ordering == Some(Ordering::Equal),
        "not_equals" => ordering != Some(Ordering::Equal),
        "gt" => ordering == Some(Ordering::Greater),
        "lt" => ordering == Some(Ordering::Less),
        "gte" => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
        "lte" => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
        _ => false,
    }
}

impl<'a> RenderContext<'a> {
    /// Attribute value with `$name` references resolved
    pub(super) fn attr_value(&self, doc: &Document, id: NodeId, value: &AttrValue) -> Value {
        match value.variable_ref() {
            Some(name) => self.lookup(doc, id, name).unwrap_or_default(),
            None => value.to_value(),
        }
    }

    pub(super) fn render_variable(&self, doc: &Document, id: NodeId) -> String {
        let element = doc.get(id);
        let attributes = element.attributes();
        let Some(name) = attributes.name() else {
            return String::new();
        };

        match self.lookup(doc, id, name) {
            Some(value) if !value.is_null() => return value.to_string(),
            _ => {}
        }
        if let Some(default) = attributes.text("default") {
            return default;
        }
        if let Some(generator) = attributes.text("generator") {
            match self.registry.generators.get(&generator) {
                Some(generator) => return generator.generate(element),
                None => warn!(generator = %generator, "unknown generator"),
            }
        }
        String::new()
    }

    /// Evaluate the comparison of an `if` or `while` element
    fn condition(&self, doc: &Document, id: NodeId) -> bool {
        let attributes = doc.get(id).attributes();
        let Some(var) = attributes.text("var") else {
            warn!(tag = %doc.get(id).tag, "condition without var attribute");
            return false;
        };
        let var = var.strip_prefix('$').unwrap_or(&var);
        let value = self.lookup(doc, id, var).unwrap_or_default();

        for op in OPERATORS {
            if let Some(expected) = attributes.get(op) {
                return compare(&value, op, &self.attr_value(doc, id, expected));
            }
        }
        value.is_truthy()
    }

    pub(super) fn render_if(&mut self, doc: &mut Document, id: NodeId) -> Result<String, RenderError> {
        if self.condition(doc, id) {
            self.render_children(doc, id)
        } else {
            Ok(String::new())
        }
    }

    pub(super) fn render_while(&mut self, doc: &mut Document, id: NodeId) -> Result<String, RenderError> {
        let limit = self.config.max_loop_iterations;
        let mut output = String::new();
        let mut iterations = 0;

        while self.condition(doc, id) {
            if iterations >= limit {
                warn!(limit, "while loop stopped at iteration limit");
                self.emit(doc, id, EventKind::Error, "iteration limit reached");
                break;
            }
            output.push_str(&self.render_children(doc, id)?);
            iterations += 1;
        }
        Ok(output)
    }

    /// Entries of an `each` block as (key, value)
    fn each_items(&self, doc: &Document, id: NodeId) -> Vec<(Option<String>, Value)> {
        let Some(items) = doc.get(id).attributes().get("items") else {
            warn!("each without items attribute");
            return Vec::new();
        };
        if let AttrValue::List(items) = items {
            return items
                .iter()
                .map(|item| (None, item.to_value()))
                .collect();
        }

        let name = items.variable_ref().map(str::to_string).unwrap_or_else(|| items.as_text());
        match self.lookup(doc, id, &name) {
            Some(Value::List(values)) => values.into_iter().map(|v| (None, v)).collect(),
            Some(Value::Map(entries)) => entries.into_iter().map(|(k, v)| (Some(k), v)).collect(),
            Some(Value::Null) | None => Vec::new(),
            Some(other) => vec![(None, other)],
        }
    }

    pub(super) fn render_each(&mut self, doc: &mut Document, id: NodeId) -> Result<String, RenderError> {
        let items = self.each_items(doc, id);
        let glue = doc.get(id).attributes().text("glue").unwrap_or_default();

        let saved = std::mem::take(&mut doc.get_mut(id).scope);
        let mut parts = Vec::with_capacity(items.len());
        let mut result = Ok(());

        for (index, (key, value)) in items.into_iter().enumerate() {
            let mut scope = Scope::new();
            scope.insert("@current", value);
            scope.insert("@index", index as i64);
            if let Some(key) = key {
                scope.insert("@key", key);
            }
            doc.get_mut(id).scope = scope;

            match self.render_children(doc, id) {
                Ok(part) => parts.push(part),
                Err(err) => {
                    result = Err(err);
                    break;
                }
            }
        }

        doc.get_mut(id).scope = saved;
        result.map(|()| parts.join(&glue))
    }

    pub(super) fn render_until(&mut self, doc: &mut Document, id: NodeId) -> Result<String, RenderError> {
        let attributes = doc.get(id).attributes();
        let attempts = attributes
            .text("attempts")
            .and_then(|a| a.parse::<usize>().ok())
            .unwrap_or(DEFAULT_ATTEMPTS)
            .max(1);
        let name = attributes.text("validator");

        let registry = self.registry;
        let validator = match name.as_deref() {
            Some(name) => {
                let found = registry.validators.get(name);
                if found.is_none() {
                    warn!(validator = name, "unknown validator, rendering once");
                }
                found
            }
            None => None,
        };
        let Some(validator) = validator else {
            return self.render_children(doc, id);
        };

        let mut output = String::new();
        for attempt in 1..=attempts {
            doc.get_mut(id).scope.insert("@attempt", attempt as i64);
            output = self.render_children(doc, id)?;
            if validator.validate(&output) {
                return Ok(output);
            }
        }

        warn!(validator = validator.name(), attempts, "until exhausted its attempts");
        self.emit(doc, id, EventKind::Error, "attempts exhausted");
        Ok(output)
    }

    /// Already-resolved await: report the event and render the body
    pub(super) fn render_await(&mut self, doc: &mut Document, id: NodeId) -> Result<String, RenderError> {
        let event = doc
            .get(id)
            .attributes()
            .text("event")
            .unwrap_or_else(|| "await".to_string());
        self.emit(doc, id, EventKind::Started, &event);
        self.emit(doc, id, EventKind::Received, &event);
        let output = self.render_children(doc, id)?;
        self.emit(doc, id, EventKind::Complete, &event);
        Ok(output)
    }
}

//! Value types that `let ... type=` can coerce into

use std::collections::BTreeMap;

use crate::value::Value;

/// A named value type
pub trait Datatype: Send + Sync {
    fn name(&self) -> &str;
    /// Convert a value, or `None` when it has no representation in this type
    fn coerce(&self, value: &Value) -> Option<Value>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StringType;

impl Datatype for StringType {
    fn name(&self) -> &str {
        "string"
    }

    fn coerce(&self, value: &Value) -> Option<Value> {
        Some(Value::String(value.to_string()))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NumberType;

impl Datatype for NumberType {
    fn name(&self) -> &str {
        "number"
    }

    fn coerce(&self, value: &Value) -> Option<Value> {
        value.as_number().map(Value::Number)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BoolType;

impl Datatype for BoolType {
    fn name(&self) -> &str {
        "bool"
    }

    fn coerce(&self, value: &Value) -> Option<Value> {
        let b = match value {
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0,
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => true,
                "false" | "no" | "off" | "0" | "" => false,
                _ => return None,
            },
            Value::Null => false,
            Value::List(_) | Value::Map(_) => return None,
        };
        Some(Value::Bool(b))
    }
}

/// Lists stay lists; text splits on commas
#[derive(Debug, Clone, Copy, Default)]
pub struct ListType;

impl Datatype for ListType {
    fn name(&self) -> &str {
        "list"
    }

    fn coerce(&self, value: &Value) -> Option<Value> {
        let items = match value {
            Value::List(items) => items.clone(),
            Value::Null => Vec::new(),
            Value::String(s) => s
                .split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(Value::from_bare)
                .collect(),
            Value::Map(entries) => entries.values().cloned().collect(),
            other => vec![other.clone()],
        };
        Some(Value::List(items))
    }
}

#[derive(Default)]
pub struct DatatypeRegistry {
    types: BTreeMap<String, Box<dyn Datatype>>,
}

impl std::fmt::Debug for DatatypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.types.keys()).finish()
    }
}

impl DatatypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(StringType));
        registry.register(Box::new(NumberType));
        registry.register(Box::new(BoolType));
        registry.register(Box::new(ListType));
        registry
    }

    pub fn register(&mut self, datatype: Box<dyn Datatype>) {
        self.types.insert(datatype.name().to_string(), datatype);
    }

    pub fn get(&self, name: &str) -> Option<&dyn Datatype> {
        self.types.get(name).map(|t| t.as_ref())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(|k| k.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coercions() {
        let types = DatatypeRegistry::with_defaults();
        let coerce = |name: &str, v: Value| types.get(name).unwrap().coerce(&v);

        assert_eq!(coerce("number", "4".into()), Some(Value::Number(4.0)));
        assert_eq!(coerce("number", "four".into()), None);
        assert_eq!(coerce("bool", "yes".into()), Some(Value::Bool(true)));
        assert_eq!(coerce("string", Value::Number(2.0)), Some(Value::from("2")));
        assert_eq!(
            coerce("list", "a, 1".into()),
            Some(Value::List(vec!["a".into(), Value::Number(1.0)]))
        );
    }
}

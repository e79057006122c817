//! Tool functions callable from expressions

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use thiserror::Error;

use crate::value::Value;

/// Largest list `range` will build; also caps lorem words
pub(crate) const MAX_RANGE: usize = 10_000;

/// Errors raised by a tool function
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FunctionError {
    #[error("{function} expects {expected} argument(s), got {found}")]
    Arity {
        function: String,
        expected: String,
        found: usize,
    },

    #[error("{function}: {message}")]
    InvalidArgument { function: String, message: String },
}

impl FunctionError {
    pub fn invalid(function: &str, message: impl Into<String>) -> Self {
        FunctionError::InvalidArgument {
            function: function.to_string(),
            message: message.into(),
        }
    }
}

/// A named function the evaluator can invoke
pub trait ToolFunction: Send + Sync {
    fn name(&self) -> &str;
    fn execute(&self, args: &[Value]) -> Result<Value, FunctionError>;
}

type FunctionBody = dyn Fn(&[Value]) -> Result<Value, FunctionError> + Send + Sync;

/// Tool function backed by a closure
pub struct ClosureFunction {
    name: String,
    body: Box<FunctionBody>,
}

impl ClosureFunction {
    pub fn new<F>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, FunctionError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            body: Box::new(body),
        }
    }
}

impl ToolFunction for ClosureFunction {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&self, args: &[Value]) -> Result<Value, FunctionError> {
        (self.body)(args)
    }
}

/// Named lookup table of tool functions
#[derive(Default)]
pub struct FunctionRegistry {
    functions: BTreeMap<String, Box<dyn ToolFunction>>,
}

impl std::fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.functions.keys()).finish()
    }
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in functions
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        let builtins: [(&str, fn(&[Value]) -> Result<Value, FunctionError>); 15] = [
            ("upper", upper),
            ("lower", lower),
            ("trim", trim),
            ("length", length),
            ("concat", concat),
            ("join", join),
            ("split", split),
            ("replace", replace),
            ("default", default),
            ("add", add),
            ("sub", sub),
            ("mul", mul),
            ("range", range),
            ("base64_encode", base64_encode),
            ("base64_decode", base64_decode),
        ];
        for (name, body) in builtins {
            registry.register_fn(name, body);
        }
        registry
    }

    /// Register a function, replacing one of the same name
    pub fn register(&mut self, function: Box<dyn ToolFunction>) {
        self.functions.insert(function.name().to_string(), function);
    }

    pub fn register_fn<F>(&mut self, name: &str, body: F)
    where
        F: Fn(&[Value]) -> Result<Value, FunctionError> + Send + Sync + 'static,
    {
        self.register(Box::new(ClosureFunction::new(name, body)));
    }

    pub fn get(&self, name: &str) -> Option<&dyn ToolFunction> {
        self.functions.get(name).map(|f| f.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(|k| k.as_str())
    }
}

fn arity(function: &str, args: &[Value], min: usize, max: usize) -> Result<(), FunctionError> {
    if args.len() < min || args.len() > max {
        let expected = if min == max {
            min.to_string()
        } else if max == usize::MAX {
            format!("at least {}", min)
        } else {
            format!("{}-{}", min, max)
        };
        return Err(FunctionError::Arity {
            function: function.to_string(),
            expected,
            found: args.len(),
        });
    }
    Ok(())
}

fn number(function: &str, value: &Value) -> Result<f64, FunctionError> {
    value
        .as_number()
        .ok_or_else(|| FunctionError::invalid(function, format!("'{}' is not a number", value)))
}

fn upper(args: &[Value]) -> Result<Value, FunctionError> {
    arity("upper", args, 1, 1)?;
    Ok(args[0].to_string().to_uppercase().into())
}

fn lower(args: &[Value]) -> Result<Value, FunctionError> {
    arity("lower", args, 1, 1)?;
    Ok(args[0].to_string().to_lowercase().into())
}

fn trim(args: &[Value]) -> Result<Value, FunctionError> {
    arity("trim", args, 1, 1)?;
    Ok(args[0].to_string().trim().into())
}

fn length(args: &[Value]) -> Result<Value, FunctionError> {
    arity("length", args, 1, 1)?;
    let len = match &args[0] {
        Value::Null => 0,
        Value::List(items) => items.len(),
        Value::Map(entries) => entries.len(),
        other => other.to_string().chars().count(),
    };
    Ok(Value::Number(len as f64))
}

fn concat(args: &[Value]) -> Result<Value, FunctionError> {
    Ok(args.iter().map(|a| a.to_string()).collect::<String>().into())
}

fn join(args: &[Value]) -> Result<Value, FunctionError> {
    arity("join", args, 1, 2)?;
    let glue = args.get(1).map(|g| g.to_string()).unwrap_or_default();
    let parts: Vec<String> = match &args[0] {
        Value::List(items) => items.iter().map(|i| i.to_string()).collect(),
        other => vec![other.to_string()],
    };
    Ok(parts.join(&glue).into())
}

fn split(args: &[Value]) -> Result<Value, FunctionError> {
    arity("split", args, 1, 2)?;
    let text = args[0].to_string();
    let separator = args.get(1).map(|s| s.to_string()).unwrap_or_else(|| ",".to_string());
    if separator.is_empty() {
        return Err(FunctionError::invalid("split", "separator must not be empty"));
    }
    Ok(Value::List(
        text.split(separator.as_str()).map(Value::from).collect(),
    ))
}

fn replace(args: &[Value]) -> Result<Value, FunctionError> {
    arity("replace", args, 3, 3)?;
    let from = args[1].to_string();
    if from.is_empty() {
        return Err(FunctionError::invalid("replace", "pattern must not be empty"));
    }
    Ok(args[0].to_string().replace(&from, &args[2].to_string()).into())
}

fn default(args: &[Value]) -> Result<Value, FunctionError> {
    arity("default", args, 2, 2)?;
    if args[0].is_null() || args[0].to_string().is_empty() {
        Ok(args[1].clone())
    } else {
        Ok(args[0].clone())
    }
}

fn add(args: &[Value]) -> Result<Value, FunctionError> {
    arity("add", args, 1, usize::MAX)?;
    let mut total = 0.0;
    for arg in args {
        total += number("add", arg)?;
    }
    Ok(Value::Number(total))
}

fn sub(args: &[Value]) -> Result<Value, FunctionError> {
    arity("sub", args, 2, 2)?;
    Ok(Value::Number(number("sub", &args[0])? - number("sub", &args[1])?))
}

fn mul(args: &[Value]) -> Result<Value, FunctionError> {
    arity("mul", args, 1, usize::MAX)?;
    let mut product = 1.0;
    for arg in args {
        product *= number("mul", arg)?;
    }
    Ok(Value::Number(product))
}

/// `range(n)` is 0..n, `range(a, b)` is a..b
fn range(args: &[Value]) -> Result<Value, FunctionError> {
    arity("range", args, 1, 2)?;
    let (start, end) = if args.len() == 2 {
        (number("range", &args[0])? as i64, number("range", &args[1])? as i64)
    } else {
        (0, number("range", &args[0])? as i64)
    };
    let count = end.saturating_sub(start).max(0) as usize;
    if count > MAX_RANGE {
        return Err(FunctionError::invalid(
            "range",
            format!("{} items exceeds the limit of {}", count, MAX_RANGE),
        ));
    }
    Ok(Value::List((start..end).map(Value::from).collect()))
}

fn base64_encode(args: &[Value]) -> Result<Value, FunctionError> {
    arity("base64_encode", args, 1, 1)?;
    Ok(STANDARD.encode(args[0].to_string()).into())
}

fn base64_decode(args: &[Value]) -> Result<Value, FunctionError> {
    arity("base64_decode", args, 1, 1)?;
    let bytes = STANDARD
        .decode(args[0].to_string().trim())
        .map_err(|e| FunctionError::invalid("base64_decode", e.to_string()))?;
    String::from_utf8(bytes)
        .map(Value::from)
        .map_err(|_| FunctionError::invalid("base64_decode", "decoded bytes are not UTF-8"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, args: &[Value]) -> Result<Value, FunctionError> {
        FunctionRegistry::with_defaults()
            .get(name)
            .expect("built-in exists")
            .execute(args)
    }

    #[test]
    fn test_text_functions() {
        assert_eq!(call("upper", &["abc".into()]).unwrap(), Value::from("ABC"));
        assert_eq!(call("trim", &["  x ".into()]).unwrap(), Value::from("x"));
        assert_eq!(
            call("replace", &["a-b".into(), "-".into(), "+".into()]).unwrap(),
            Value::from("a+b")
        );
        assert_eq!(
            call("join", &[Value::from(vec!["a", "b"]), "/".into()]).unwrap(),
            Value::from("a/b")
        );
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(call("add", &[1i64.into(), 2i64.into()]).unwrap().to_string(), "3");
        assert_eq!(call("sub", &[5i64.into(), "2".into()]).unwrap().to_string(), "3");
        assert!(matches!(
            call("add", &["x".into()]),
            Err(FunctionError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_range() {
        assert_eq!(call("range", &[3i64.into()]).unwrap().to_string(), "0,1,2");
        assert_eq!(call("range", &[2i64.into(), 4i64.into()]).unwrap().to_string(), "2,3");
        assert!(call("range", &[1_000_000i64.into()]).is_err());
    }

    #[test]
    fn test_base64_round_trip() {
        let encoded = call("base64_encode", &["hello".into()]).unwrap();
        assert_eq!(encoded, Value::from("aGVsbG8="));
        assert_eq!(call("base64_decode", &[encoded]).unwrap(), Value::from("hello"));
        assert!(call("base64_decode", &["***".into()]).is_err());
    }

    #[test]
    fn test_arity_errors() {
        assert!(matches!(call("upper", &[]), Err(FunctionError::Arity { .. })));
    }

    #[test]
    fn test_custom_function() {
        let mut registry = FunctionRegistry::new();
        registry.register_fn("answer", |_| Ok(Value::Number(42.0)));
        assert!(registry.contains("answer"));
        assert_eq!(registry.get("answer").unwrap().execute(&[]).unwrap().to_string(), "42");
    }
}

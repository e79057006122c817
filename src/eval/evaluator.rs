//! Runs parsed expressions against the function registry

use thiserror::Error;
use tracing::{debug, warn};

use crate::events::EventKind;
use crate::value::Value;
use crate::ParseError;

use super::expression::{parse_expression, Arg, Expression};
use super::functions::{FunctionError, FunctionRegistry};

/// Errors surfaced by expressions that set `silent=false`
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("unknown function: {name}")]
    UnknownFunction { name: String },

    #[error("function '{name}' failed: {source}")]
    Function {
        name: String,
        #[source]
        source: FunctionError,
    },

    #[error("malformed expression '{expression}'")]
    Syntax {
        expression: String,
        errors: Vec<ParseError>,
    },
}

/// Variable access and event reporting for one evaluation site
pub trait Bindings {
    fn lookup(&self, name: &str) -> Option<Value>;
    fn assign(&mut self, name: &str, value: Value, global: bool);
    fn emit(&self, kind: EventKind, detail: &str);
}

/// Outcome of one expression
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub value: Value,
    /// Variable the value was written to
    pub assigned: Option<String>,
}

impl Evaluation {
    fn empty() -> Self {
        Self {
            value: Value::Null,
            assigned: None,
        }
    }

    /// Stringified result
    pub fn text(&self) -> String {
        self.value.to_string()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Evaluator<'r> {
    functions: &'r FunctionRegistry,
}

impl<'r> Evaluator<'r> {
    pub fn new(functions: &'r FunctionRegistry) -> Self {
        Self { functions }
    }

    /// Parse and run `source`
    ///
    /// Syntax errors are logged and produce an empty result.
    pub fn evaluate(&self, source: &str, bindings: &mut dyn Bindings) -> Result<Evaluation, EvalError> {
        match parse_expression(source) {
            Ok(expr) => self.run(&expr, bindings),
            Err(errors) => {
                warn!(expression = source, errors = errors.len(), "malformed expression ignored");
                bindings.emit(EventKind::Error, &format!("malformed expression '{}'", source));
                Ok(Evaluation::empty())
            }
        }
    }

    /// Parse `source`, surfacing syntax errors
    pub fn evaluate_strict(&self, source: &str, bindings: &mut dyn Bindings) -> Result<Evaluation, EvalError> {
        let expr = parse_expression(source).map_err(|errors| EvalError::Syntax {
            expression: source.to_string(),
            errors,
        })?;
        self.run(&expr, bindings)
    }

    pub fn run(&self, expr: &Expression, bindings: &mut dyn Bindings) -> Result<Evaluation, EvalError> {
        let args: Vec<Value> = expr
            .args
            .iter()
            .map(|arg| match arg {
                Arg::Literal(value) => value.clone(),
                Arg::Variable(name) => bindings.lookup(name).unwrap_or_default(),
            })
            .collect();

        let value = match &expr.function {
            None => args.into_iter().next().unwrap_or_default(),
            Some(name) => match self.call(name, &args, bindings) {
                Ok(value) => value,
                Err(err) => {
                    bindings.emit(EventKind::Error, &err.to_string());
                    if expr.silent() {
                        warn!(error = %err, "expression failure swallowed");
                        return Ok(Evaluation::empty());
                    }
                    return Err(err);
                }
            },
        };

        if let Some(target) = &expr.target {
            debug!(target = %target, global = expr.global(), "assigning expression result");
            bindings.assign(target, value.clone(), expr.global());
        }

        Ok(Evaluation {
            value,
            assigned: expr.target.clone(),
        })
    }

    fn call(&self, name: &str, args: &[Value], bindings: &mut dyn Bindings) -> Result<Value, EvalError> {
        let function = self
            .functions
            .get(name)
            .ok_or_else(|| EvalError::UnknownFunction {
                name: name.to_string(),
            })?;

        bindings.emit(EventKind::Sent, name);
        let value = function.execute(args).map_err(|source| EvalError::Function {
            name: name.to_string(),
            source,
        })?;
        bindings.emit(EventKind::Received, name);
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Scope;
    use std::cell::RefCell;

    #[derive(Default)]
    struct TestBindings {
        local: Scope,
        global: Scope,
        events: RefCell<Vec<EventKind>>,
    }

    impl Bindings for TestBindings {
        fn lookup(&self, name: &str) -> Option<Value> {
            self.local.get(name).or_else(|| self.global.get(name)).cloned()
        }

        fn assign(&mut self, name: &str, value: Value, global: bool) {
            if global {
                self.global.insert(name, value);
            } else {
                self.local.insert(name, value);
            }
        }

        fn emit(&self, kind: EventKind, _detail: &str) {
            self.events.borrow_mut().push(kind);
        }
    }

    #[test]
    fn test_call_and_assign() {
        let functions = FunctionRegistry::with_defaults();
        let mut bindings = TestBindings::default();
        bindings.local.insert("name", "ada");

        let result = Evaluator::new(&functions)
            .evaluate("upper(name) -> shout", &mut bindings)
            .expect("Should evaluate");
        assert_eq!(result.text(), "ADA");
        assert_eq!(result.assigned.as_deref(), Some("shout"));
        assert_eq!(bindings.local.get("shout"), Some(&Value::from("ADA")));
        assert_eq!(*bindings.events.borrow(), vec![EventKind::Sent, EventKind::Received]);
    }

    #[test]
    fn test_global_assignment() {
        let functions = FunctionRegistry::with_defaults();
        let mut bindings = TestBindings::default();
        Evaluator::new(&functions)
            .evaluate("('x') -> flag global", &mut bindings)
            .unwrap();
        assert!(bindings.global.contains("flag"));
        assert!(!bindings.local.contains("flag"));
    }

    #[test]
    fn test_unknown_function_silent_by_default() {
        let functions = FunctionRegistry::with_defaults();
        let mut bindings = TestBindings::default();
        let result = Evaluator::new(&functions)
            .evaluate("nope(1)", &mut bindings)
            .expect("Should be swallowed");
        assert_eq!(result.text(), "");
        assert_eq!(*bindings.events.borrow(), vec![EventKind::Error]);
    }

    #[test]
    fn test_unknown_function_surfaces_when_not_silent() {
        let functions = FunctionRegistry::with_defaults();
        let mut bindings = TestBindings::default();
        let result = Evaluator::new(&functions).evaluate("nope(1) silent=false", &mut bindings);
        assert!(matches!(result, Err(EvalError::UnknownFunction { .. })));
    }

    #[test]
    fn test_failed_call_surfaces_when_not_silent() {
        let functions = FunctionRegistry::with_defaults();
        let mut bindings = TestBindings::default();
        let result = Evaluator::new(&functions).evaluate("add('x') silent=false", &mut bindings);
        assert!(matches!(result, Err(EvalError::Function { .. })));
    }

    #[test]
    fn test_syntax_error_yields_empty() {
        let functions = FunctionRegistry::with_defaults();
        let mut bindings = TestBindings::default();
        let evaluator = Evaluator::new(&functions);
        assert_eq!(evaluator.evaluate("upper(", &mut bindings).unwrap().text(), "");
        assert!(matches!(
            evaluator.evaluate_strict("upper(", &mut bindings),
            Err(EvalError::Syntax { .. })
        ));
    }

    #[test]
    fn test_unbound_variable_is_null() {
        let functions = FunctionRegistry::with_defaults();
        let mut bindings = TestBindings::default();
        let result = Evaluator::new(&functions)
            .evaluate("default(missing, 'fallback')", &mut bindings)
            .unwrap();
        assert_eq!(result.text(), "fallback");
    }
}

//! Expression evaluation and the pluggable registries it draws on

pub mod datatypes;
pub mod evaluator;
pub mod expression;
pub mod functions;
pub mod generators;
pub mod validators;

pub use datatypes::{Datatype, DatatypeRegistry};
pub use evaluator::{Bindings, EvalError, Evaluation, Evaluator};
pub use expression::{parse_expression, Arg, Expression};
pub use functions::{ClosureFunction, FunctionError, FunctionRegistry, ToolFunction};
pub use generators::{Generator, GeneratorRegistry};
pub use validators::{ClosureValidator, Validator, ValidatorRegistry};

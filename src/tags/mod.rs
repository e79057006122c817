//! Tag definitions, the tag registry and the built-in tag set

pub mod builtin;
pub mod definition;
pub mod registry;

pub use definition::{
    AllowedAttributes, AttributeForm, AttributeSpec, Capability, ElementKind, TagDefinition,
};
pub use registry::{
    tag_body, CompiledPattern, Delimiters, RegistryError, TagMatch, TagMatcher, TagRegistry,
};

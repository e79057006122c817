//! The explicit plugin handle passed to every render

use crate::eval::{DatatypeRegistry, FunctionRegistry, GeneratorRegistry, ValidatorRegistry};
use crate::prepare::Pipeline;
use crate::render::RendererRegistry;
use crate::tags::TagRegistry;

/// Tags, functions, validators, generators, datatypes, custom renderers and
/// the preparer pipeline
///
/// Extend it before rendering; a render only borrows it.
#[derive(Debug)]
pub struct Registry {
    pub tags: TagRegistry,
    pub functions: FunctionRegistry,
    pub validators: ValidatorRegistry,
    pub generators: GeneratorRegistry,
    pub datatypes: DatatypeRegistry,
    pub renderers: RendererRegistry,
    pub pipeline: Pipeline,
}

impl Default for Registry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl Registry {
    /// Registries with nothing registered and the default pipeline
    pub fn empty() -> Self {
        Self {
            tags: TagRegistry::new(),
            functions: FunctionRegistry::new(),
            validators: ValidatorRegistry::new(),
            generators: GeneratorRegistry::new(),
            datatypes: DatatypeRegistry::new(),
            renderers: RendererRegistry::new(),
            pipeline: Pipeline::with_defaults(),
        }
    }

    /// Every built-in tag, function, validator, generator and datatype
    pub fn with_defaults() -> Self {
        Self {
            tags: TagRegistry::with_defaults(),
            functions: FunctionRegistry::with_defaults(),
            validators: ValidatorRegistry::with_defaults(),
            generators: GeneratorRegistry::with_defaults(),
            datatypes: DatatypeRegistry::with_defaults(),
            renderers: RendererRegistry::new(),
            pipeline: Pipeline::with_defaults(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_populated() {
        let registry = Registry::with_defaults();
        assert!(registry.tags.contains("each"));
        assert!(registry.functions.contains("upper"));
        assert!(registry.validators.contains("email"));
        assert!(registry.generators.get("lorem").is_some());
        assert!(registry.datatypes.get("number").is_some());
        assert_eq!(registry.pipeline.names().count(), 4);
    }

    #[test]
    fn test_empty_registry() {
        let registry = Registry::empty();
        assert!(registry.tags.is_empty());
        assert!(!registry.functions.contains("upper"));
    }
}

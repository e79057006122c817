//! Placeholder-content generators for unbound variables

use std::collections::BTreeMap;

use super::functions::MAX_RANGE;
use crate::parser::Element;

const LOREM: &[&str] = &[
    "lorem", "ipsum", "dolor", "sit", "amet", "consectetur", "adipiscing", "elit", "sed", "do",
    "eiusmod", "tempor", "incididunt", "ut", "labore", "et", "dolore", "magna", "aliqua",
];

const DEFAULT_WORDS: usize = 8;

/// Produces stand-in text for an element
pub trait Generator: Send + Sync {
    fn name(&self) -> &str;
    fn generate(&self, element: &Element) -> String;
}

/// Lorem ipsum text; `words=` sets the length, capped like `range`
#[derive(Debug, Clone, Copy, Default)]
pub struct LoremGenerator;

impl Generator for LoremGenerator {
    fn name(&self) -> &str {
        "lorem"
    }

    fn generate(&self, element: &Element) -> String {
        let words = element
            .attributes()
            .text("words")
            .and_then(|w| w.parse::<usize>().ok())
            .unwrap_or(DEFAULT_WORDS)
            .min(MAX_RANGE);
        LOREM
            .iter()
            .cycle()
            .take(words)
            .copied()
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// `[name]` marker naming the missing binding
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderGenerator;

impl Generator for PlaceholderGenerator {
    fn name(&self) -> &str {
        "placeholder"
    }

    fn generate(&self, element: &Element) -> String {
        let name = element.attributes().name().unwrap_or(&element.tag);
        format!("[{}]", name)
    }
}

#[derive(Default)]
pub struct GeneratorRegistry {
    generators: BTreeMap<String, Box<dyn Generator>>,
}

impl std::fmt::Debug for GeneratorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.generators.keys()).finish()
    }
}

impl GeneratorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(LoremGenerator));
        registry.register(Box::new(PlaceholderGenerator));
        registry
    }

    pub fn register(&mut self, generator: Box<dyn Generator>) {
        self.generators.insert(generator.name().to_string(), generator);
    }

    pub fn get(&self, name: &str) -> Option<&dyn Generator> {
        self.generators.get(name).map(|g| g.as_ref())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.generators.keys().map(|k| k.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tags::TagRegistry;

    fn variable(body: &str) -> Element {
        let tags = TagRegistry::with_defaults();
        let def = tags.get("var").unwrap();
        Element::tag(def, body, crate::parser::Content::Text(String::new()), 0..0)
    }

    #[test]
    fn test_lorem_word_count() {
        let text = LoremGenerator.generate(&variable("title words=3"));
        assert_eq!(text, "lorem ipsum dolor");
        assert_eq!(LoremGenerator.generate(&variable("title")).split(' ').count(), 8);
    }

    #[test]
    fn test_lorem_word_count_is_capped() {
        let text = LoremGenerator.generate(&variable("title words=999999999"));
        assert_eq!(text.split(' ').count(), MAX_RANGE);
    }

    #[test]
    fn test_placeholder_uses_name() {
        assert_eq!(PlaceholderGenerator.generate(&variable("user.name")), "[user.name]");
    }
}

//! Tag registry: stores tag definitions and compiles the unified pattern

use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};

use regex::Regex;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::parser::attributes::{parse_attributes, Attributes};
use crate::ParseError;

use super::definition::{substitute, TagDefinition};

/// Errors that can occur during tag registration and compilation
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Pattern fragment does not compile on its own
    #[error("invalid pattern for tag '{tag}': {source}")]
    InvalidPattern {
        tag: String,
        #[source]
        source: regex::Error,
    },

    /// Named groups would clash with the generated group names
    #[error("pattern for tag '{tag}' declares named group '{group}'")]
    NamedGroup { tag: String, group: String },

    /// A fragment matching the empty string would never advance the scanner
    #[error("pattern for tag '{tag}' matches the empty string")]
    EmptyMatch { tag: String },

    /// Tag not found in registry
    #[error("tag not found: {name}")]
    NotFound { name: String },

    /// Open or close delimiter is empty
    #[error("delimiters must not be empty")]
    EmptyDelimiter,

    /// Tag body could not be parsed into attributes
    #[error("malformed attributes for tag '{tag}'")]
    Attributes { tag: String, errors: Vec<ParseError> },
}

/// Open/close delimiter pair used by the delimited tag families
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Delimiters {
    pub open: String,
    pub close: String,
}

impl Default for Delimiters {
    fn default() -> Self {
        Self {
            open: "{".to_string(),
            close: "}".to_string(),
        }
    }
}

impl Delimiters {
    pub fn new(open: impl Into<String>, close: impl Into<String>) -> Self {
        Self {
            open: open.into(),
            close: close.into(),
        }
    }
}

/// Isolated opener/closer regexes for one tag, used for block matching
#[derive(Debug, Clone)]
pub struct TagMatcher {
    pub opener: Regex,
    pub closer: Option<Regex>,
}

/// A tag located by the unified pattern
#[derive(Debug, Clone, PartialEq)]
pub struct TagMatch<'p> {
    pub tag: &'p str,
    pub range: std::ops::Range<usize>,
}

/// Result of one `unified_pattern` call
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    regex: Regex,
    /// (group, tag) in registration order
    groups: Vec<(String, String)>,
    group_to_tag: HashMap<String, String>,
    tag_to_group: HashMap<String, String>,
    matchers: HashMap<String, TagMatcher>,
    delimiters: Delimiters,
}

impl CompiledPattern {
    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    pub fn delimiters(&self) -> &Delimiters {
        &self.delimiters
    }

    pub fn tag_for_group(&self, group: &str) -> Option<&str> {
        self.group_to_tag.get(group).map(|s| s.as_str())
    }

    pub fn group_for_tag(&self, tag: &str) -> Option<&str> {
        self.tag_to_group.get(tag).map(|s| s.as_str())
    }

    /// (group, tag) pairs in registration order
    pub fn groups(&self) -> impl Iterator<Item = (&str, &str)> {
        self.groups.iter().map(|(g, t)| (g.as_str(), t.as_str()))
    }

    pub fn matcher(&self, tag: &str) -> Option<&TagMatcher> {
        self.matchers.get(tag)
    }

    /// Find the first tag at or after `start`
    pub fn find_at(&self, text: &str, start: usize) -> Option<TagMatch<'_>> {
        let caps = self.regex.captures_at(text, start)?;
        self.groups.iter().find_map(|(group, tag)| {
            caps.name(group).map(|m| TagMatch {
                tag: tag.as_str(),
                range: m.range(),
            })
        })
    }
}

/// Registry for storing tag definitions in registration order
#[derive(Debug, Default, Clone)]
pub struct TagRegistry {
    definitions: Vec<TagDefinition>,
    index: HashMap<String, usize>,
}

impl TagRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the built-in tag set
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for def in super::builtin::default_tags() {
            registry
                .register(def)
                .expect("built-in tag patterns should compile");
        }
        registry
    }

    /// Register a tag definition, replacing any previous one of the same name
    pub fn register(&mut self, def: TagDefinition) -> Result<(), RegistryError> {
        let defaults = Delimiters::default();
        compile_fragment(def.name(), def.pattern(), &defaults)?;
        if let Some(closing) = def.closing() {
            compile_fragment(def.name(), closing, &defaults)?;
        }

        debug!(tag = def.name(), kind = %def.kind(), "registering tag");
        match self.index.get(def.name()) {
            Some(&i) => self.definitions[i] = def,
            None => {
                self.index.insert(def.name().to_string(), self.definitions.len());
                self.definitions.push(def);
            }
        }
        Ok(())
    }

    /// Get a definition by tag name
    pub fn get(&self, name: &str) -> Option<&TagDefinition> {
        self.index.get(name).map(|&i| &self.definitions[i])
    }

    /// Check if a tag exists
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Tag names in registration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.definitions.iter().map(|d| d.name())
    }

    pub fn definitions(&self) -> impl Iterator<Item = &TagDefinition> {
        self.definitions.iter()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Compile every definition into one alternation of named groups
    pub fn unified_pattern(&self, delimiters: &Delimiters) -> Result<CompiledPattern, RegistryError> {
        if delimiters.open.is_empty() || delimiters.close.is_empty() {
            return Err(RegistryError::EmptyDelimiter);
        }

        let mut taken = HashSet::new();
        let mut groups = Vec::with_capacity(self.definitions.len());
        let mut fragments = Vec::with_capacity(self.definitions.len());
        let mut matchers = HashMap::new();

        for def in &self.definitions {
            let opener = compile_fragment(def.name(), def.pattern(), delimiters)?;
            let closer = def
                .closing()
                .map(|c| compile_fragment(def.name(), c, delimiters))
                .transpose()?;

            let group = group_name(def.name(), &taken);
            taken.insert(group.clone());
            fragments.push(format!("(?P<{}>{})", group, opener.as_str()));
            groups.push((group, def.name().to_string()));
            matchers.insert(def.name().to_string(), TagMatcher { opener, closer });
        }

        // An empty alternation would match everywhere
        let source = if fragments.is_empty() {
            r"[^\s\S]".to_string()
        } else {
            fragments.join("|")
        };
        let regex = Regex::new(&source).map_err(|source| RegistryError::InvalidPattern {
            tag: "<unified>".to_string(),
            source,
        })?;

        let group_to_tag = groups.iter().cloned().collect();
        let tag_to_group = groups.iter().map(|(g, t)| (t.clone(), g.clone())).collect();

        Ok(CompiledPattern {
            regex,
            groups,
            group_to_tag,
            tag_to_group,
            matchers,
            delimiters: delimiters.clone(),
        })
    }

    /// Extract attributes from the full matched text of a tag
    pub fn extract_attributes(
        &self,
        tag: &str,
        matched: &str,
        delimiters: &Delimiters,
    ) -> Result<Attributes, RegistryError> {
        let def = self.get(tag).ok_or_else(|| RegistryError::NotFound {
            name: tag.to_string(),
        })?;
        parse_attributes(tag_body(def, matched, delimiters), def.attributes()).map_err(|errors| {
            RegistryError::Attributes {
                tag: tag.to_string(),
                errors,
            }
        })
    }
}

/// Strip delimiters, lead text and wrapping parentheses from a matched tag
pub fn tag_body<'t>(def: &TagDefinition, matched: &'t str, delimiters: &Delimiters) -> &'t str {
    let mut body = matched;
    if let Some(inner) = body
        .strip_prefix(delimiters.open.as_str())
        .and_then(|rest| rest.strip_suffix(delimiters.close.as_str()))
    {
        body = inner;
    }
    body = body.strip_prefix(def.lead()).unwrap_or(body).trim();
    if body.len() >= 2 && body.starts_with('(') && body.ends_with(')') {
        body = body[1..body.len() - 1].trim();
    }
    body
}

fn compile_fragment(tag: &str, template: &str, delimiters: &Delimiters) -> Result<Regex, RegistryError> {
    let source = substitute(
        template,
        &regex::escape(&delimiters.open),
        &regex::escape(&delimiters.close),
    );
    let regex = Regex::new(&source).map_err(|source| RegistryError::InvalidPattern {
        tag: tag.to_string(),
        source,
    })?;
    if let Some(group) = regex.capture_names().flatten().next() {
        return Err(RegistryError::NamedGroup {
            tag: tag.to_string(),
            group: group.to_string(),
        });
    }
    if regex.is_match("") {
        return Err(RegistryError::EmptyMatch {
            tag: tag.to_string(),
        });
    }
    Ok(regex)
}

/// Turn a tag name into a capture-group name not yet in `taken`
fn group_name(tag: &str, taken: &HashSet<String>) -> String {
    let mut base: String = tag
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if !base.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_') {
        base.insert_str(0, "t_");
    }
    if !taken.contains(&base) {
        return base;
    }

    let hashed = format!("{}_{:06x}", base, short_hash(tag));
    let mut candidate = hashed.clone();
    let mut n = 1;
    while taken.contains(&candidate) {
        candidate = format!("{}_{}", hashed, n);
        n += 1;
    }
    candidate
}

fn short_hash(tag: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    tag.hash(&mut hasher);
    hasher.finish() & 0xff_ffff
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tags::ElementKind;

    fn leaf(name: &str, pattern: &str) -> TagDefinition {
        TagDefinition::new(name, pattern, ElementKind::Custom)
    }

    #[test]
    fn test_register_and_get() {
        let mut registry = TagRegistry::new();
        registry
            .register(leaf("shout", r"{open}!shout{close}"))
            .expect("Should register");
        assert!(registry.contains("shout"));
        assert!(registry.get("shout").is_some());
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let mut registry = TagRegistry::new();
        let result = registry.register(leaf("broken", r"{open}(unclosed{close}"));
        assert!(matches!(result, Err(RegistryError::InvalidPattern { .. })));
        assert!(!registry.contains("broken"));
    }

    #[test]
    fn test_named_group_rejected() {
        let mut registry = TagRegistry::new();
        let result = registry.register(leaf("named", r"{open}(?P<x>a){close}"));
        assert!(matches!(result, Err(RegistryError::NamedGroup { .. })));
    }

    #[test]
    fn test_empty_match_rejected() {
        let mut registry = TagRegistry::new();
        let result = registry.register(leaf("empty", r"a*"));
        assert!(matches!(result, Err(RegistryError::EmptyMatch { .. })));
    }

    #[test]
    fn test_reregister_overwrites_in_place() {
        let mut registry = TagRegistry::new();
        registry.register(leaf("a", "{open}a{close}")).unwrap();
        registry.register(leaf("b", "{open}b{close}")).unwrap();
        registry.register(leaf("a", "{open}aa{close}")).unwrap();
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(registry.get("a").unwrap().pattern(), "{open}aa{close}");
    }

    #[test]
    fn test_group_bijection_with_special_names() {
        let mut registry = TagRegistry::new();
        let names = ["my-tag", "my_tag", "my.tag", "9lives", "t_9lives", "ü", "_", ""];
        for (i, name) in names.iter().enumerate() {
            registry
                .register(leaf(name, &format!("{{open}}x{}{{close}}", i)))
                .expect("Should register");
        }

        let compiled = registry
            .unified_pattern(&Delimiters::default())
            .expect("Should compile");
        let groups: Vec<_> = compiled.groups().collect();
        assert_eq!(groups.len(), names.len());

        let unique: HashSet<_> = groups.iter().map(|(g, _)| *g).collect();
        assert_eq!(unique.len(), names.len());

        for name in names {
            let group = compiled.group_for_tag(name).expect("every tag has a group");
            assert_eq!(compiled.tag_for_group(group), Some(name));
        }
    }

    #[test]
    fn test_first_registered_wins_at_same_position() {
        let mut registry = TagRegistry::new();
        registry.register(leaf("long", r"{open}ab{close}")).unwrap();
        registry.register(leaf("wild", r"{open}\w+{close}")).unwrap();
        let compiled = registry.unified_pattern(&Delimiters::default()).unwrap();

        let found = compiled.find_at("x {ab}", 0).expect("Should match");
        assert_eq!(found.tag, "long");
        assert_eq!(found.range, 2..6);

        let found = compiled.find_at("{cd}", 0).expect("Should match");
        assert_eq!(found.tag, "wild");
    }

    #[test]
    fn test_custom_delimiters_are_escaped() {
        let mut registry = TagRegistry::new();
        registry.register(leaf("v", r"{open}\$\w+{close}")).unwrap();
        let compiled = registry
            .unified_pattern(&Delimiters::new("[[", "]]"))
            .expect("Should compile");
        assert!(compiled.find_at("{$x}", 0).is_none());
        assert_eq!(compiled.find_at("a [[$x]]", 0).unwrap().range, 2..8);
    }

    #[test]
    fn test_empty_registry_never_matches() {
        let compiled = TagRegistry::new()
            .unified_pattern(&Delimiters::default())
            .unwrap();
        assert!(compiled.find_at("{$x} @template(a)", 0).is_none());
    }

    #[test]
    fn test_extract_attributes_strips_lead_and_parens() {
        let registry = TagRegistry::with_defaults();
        let delims = Delimiters::default();

        let attrs = registry
            .extract_attributes("if", r#"{#if var=status equals="ok"}"#, &delims)
            .expect("Should extract");
        assert_eq!(attrs.text("var"), Some("status".to_string()));
        assert_eq!(attrs.text("equals"), Some("ok".to_string()));

        let attrs = registry
            .extract_attributes("template", "@template(layout)", &delims)
            .expect("Should extract");
        assert_eq!(attrs.text("name"), Some("layout".to_string()));

        let attrs = registry
            .extract_attributes("invoke", "@invoke(greet name=World)", &delims)
            .expect("Should extract");
        assert_eq!(attrs.name(), Some("greet"));
        assert_eq!(attrs.text("name"), Some("World".to_string()));
    }

    #[test]
    fn test_extract_attributes_unknown_tag() {
        let registry = TagRegistry::new();
        let result = registry.extract_attributes("nope", "{nope}", &Delimiters::default());
        assert!(matches!(result, Err(RegistryError::NotFound { .. })));
    }
}

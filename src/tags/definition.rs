//! Tag definitions: the immutable descriptors the registry compiles

use std::fmt;

/// Placeholder replaced by the escaped open delimiter
pub const OPEN: &str = "{open}";
/// Placeholder replaced by the escaped close delimiter
pub const CLOSE: &str = "{close}";

/// The structural role an element plays
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Produces text
    Renderable,
    /// Performs a side effect or produces a value
    Executable,
    /// Renders its body repeatedly
    Loop,
    /// Renders its body at most once, guarded by a comparison
    Condition,
}

/// Closed set of element kinds known to the renderer
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ElementKind {
    /// Fragment root holding a parsed sequence
    Root,
    /// Literal text run
    Text,
    Variable,
    Expression,
    Let,
    If,
    While,
    Each,
    Until,
    Await,
    Comment,
    Template,
    Section,
    Output,
    Include,
    Import,
    Macro,
    Invoke,
    /// User-registered tag rendered through the renderer table
    Custom,
}

impl ElementKind {
    pub fn name(&self) -> &'static str {
        match self {
            ElementKind::Root => "root",
            ElementKind::Text => "text",
            ElementKind::Variable => "variable",
            ElementKind::Expression => "expression",
            ElementKind::Let => "let",
            ElementKind::If => "if",
            ElementKind::While => "while",
            ElementKind::Each => "each",
            ElementKind::Until => "until",
            ElementKind::Await => "await",
            ElementKind::Comment => "comment",
            ElementKind::Template => "template",
            ElementKind::Section => "section",
            ElementKind::Output => "output",
            ElementKind::Include => "include",
            ElementKind::Import => "import",
            ElementKind::Macro => "macro",
            ElementKind::Invoke => "invoke",
            ElementKind::Custom => "custom",
        }
    }

    /// Default capability for elements of this kind
    pub fn capability(&self) -> Capability {
        match self {
            ElementKind::If => Capability::Condition,
            ElementKind::While | ElementKind::Each | ElementKind::Until => Capability::Loop,
            ElementKind::Expression
            | ElementKind::Let
            | ElementKind::Include
            | ElementKind::Import
            | ElementKind::Macro
            | ElementKind::Invoke => Capability::Executable,
            _ => Capability::Renderable,
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which attribute keys a tag accepts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowedAttributes {
    Keys(Vec<String>),
    Any,
}

impl AllowedAttributes {
    pub fn allows(&self, key: &str) -> bool {
        match self {
            AllowedAttributes::Keys(keys) => keys.iter().any(|k| k == key),
            AllowedAttributes::Any => true,
        }
    }

    /// The declared key when exactly one is declared
    pub fn single(&self) -> Option<&str> {
        match self {
            AllowedAttributes::Keys(keys) if keys.len() == 1 => Some(keys[0].as_str()),
            _ => None,
        }
    }
}

/// How the body of a tag is turned into attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeForm {
    /// `key=value` pairs (a lone positional value is accepted when exactly
    /// one key is declared)
    Pairs,
    /// The first positional value names the element; pairs follow
    Name,
    /// The whole body is one expression
    Expression,
}

/// Everything element construction needs to parse attributes lazily
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeSpec {
    pub form: AttributeForm,
    pub allowed: AllowedAttributes,
}

impl Default for AttributeSpec {
    fn default() -> Self {
        Self {
            form: AttributeForm::Pairs,
            allowed: AllowedAttributes::Any,
        }
    }
}

/// Immutable descriptor of one tag
#[derive(Debug, Clone, PartialEq)]
pub struct TagDefinition {
    name: String,
    pattern: String,
    closing: Option<String>,
    lead: String,
    attributes: AttributeSpec,
    capability: Capability,
    kind: ElementKind,
    raw_body: bool,
}

impl TagDefinition {
    /// Create a definition from a pattern fragment using the `{open}` and
    /// `{close}` placeholders
    pub fn new(name: impl Into<String>, pattern: impl Into<String>, kind: ElementKind) -> Self {
        Self {
            name: name.into(),
            pattern: pattern.into(),
            closing: None,
            lead: String::new(),
            attributes: AttributeSpec::default(),
            capability: kind.capability(),
            kind,
            raw_body: false,
        }
    }

    /// Pattern fragment matching the block closer
    pub fn with_closing(mut self, closing: impl Into<String>) -> Self {
        self.closing = Some(closing.into());
        self
    }

    /// Literal text following the open delimiter that precedes the body
    pub fn with_lead(mut self, lead: impl Into<String>) -> Self {
        self.lead = lead.into();
        self
    }

    pub fn with_attributes<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes.allowed = AllowedAttributes::Keys(keys.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_any_attributes(mut self) -> Self {
        self.attributes.allowed = AllowedAttributes::Any;
        self
    }

    pub fn with_form(mut self, form: AttributeForm) -> Self {
        self.attributes.form = form;
        self
    }

    pub fn with_capability(mut self, capability: Capability) -> Self {
        self.capability = capability;
        self
    }

    /// Keep the block body as unparsed text
    pub fn with_raw_body(mut self) -> Self {
        self.raw_body = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn closing(&self) -> Option<&str> {
        self.closing.as_deref()
    }

    pub fn lead(&self) -> &str {
        &self.lead
    }

    pub fn attributes(&self) -> &AttributeSpec {
        &self.attributes
    }

    pub fn capability(&self) -> Capability {
        self.capability
    }

    pub fn kind(&self) -> &ElementKind {
        &self.kind
    }

    pub fn raw_body(&self) -> bool {
        self.raw_body
    }

    pub fn is_block(&self) -> bool {
        self.closing.is_some()
    }
}

/// Substitute delimiter placeholders in a pattern template
pub fn substitute(template: &str, open: &str, close: &str) -> String {
    template.replace(OPEN, open).replace(CLOSE, close)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults_capability_from_kind() {
        let def = TagDefinition::new("each", r"{open}#each\s.*?{close}", ElementKind::Each)
            .with_closing("{open}/each{close}")
            .with_attributes(["items", "glue"]);
        assert_eq!(def.capability(), Capability::Loop);
        assert!(def.is_block());
        assert!(def.attributes().allowed.allows("glue"));
        assert!(!def.attributes().allowed.allows("other"));
    }

    #[test]
    fn test_single_declared_key() {
        let allowed = AllowedAttributes::Keys(vec!["name".to_string()]);
        assert_eq!(allowed.single(), Some("name"));
        assert_eq!(AllowedAttributes::Any.single(), None);
    }

    #[test]
    fn test_substitute() {
        assert_eq!(substitute(r"{open}\$x{close}", r"\{\{", r"\}\}"), r"\{\{\$x\}\}");
    }
}

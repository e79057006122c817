//! Content validators used by `until` blocks

use std::collections::BTreeMap;

use regex::Regex;

/// Accepts or rejects rendered content
pub trait Validator: Send + Sync {
    fn name(&self) -> &str;
    fn validate(&self, content: &str) -> bool;
}

type Check = dyn Fn(&str) -> bool + Send + Sync;

/// Validator backed by a closure
pub struct ClosureValidator {
    name: String,
    check: Box<Check>,
}

impl ClosureValidator {
    pub fn new<F>(name: impl Into<String>, check: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            check: Box::new(check),
        }
    }
}

impl Validator for ClosureValidator {
    fn name(&self) -> &str {
        &self.name
    }

    fn validate(&self, content: &str) -> bool {
        (self.check)(content)
    }
}

/// Loose `local@domain.tld` check
pub struct EmailValidator {
    pattern: Regex,
}

impl EmailValidator {
    pub fn new() -> Self {
        Self {
            pattern: Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern should compile"),
        }
    }
}

impl Default for EmailValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl Validator for EmailValidator {
    fn name(&self) -> &str {
        "email"
    }

    fn validate(&self, content: &str) -> bool {
        self.pattern.is_match(content.trim())
    }
}

#[derive(Default)]
pub struct ValidatorRegistry {
    validators: BTreeMap<String, Box<dyn Validator>>,
}

impl std::fmt::Debug for ValidatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.validators.keys()).finish()
    }
}

impl ValidatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register_fn("non_empty", |s| !s.trim().is_empty());
        registry.register_fn("numeric", |s| {
            let s = s.trim();
            s.chars().any(|c| c.is_ascii_digit()) && s.parse::<f64>().is_ok()
        });
        registry.register_fn("alphabetic", |s| {
            let s = s.trim();
            !s.is_empty() && s.chars().all(char::is_alphabetic)
        });
        registry.register_fn("alphanumeric", |s| {
            let s = s.trim();
            !s.is_empty() && s.chars().all(char::is_alphanumeric)
        });
        registry.register(Box::new(EmailValidator::new()));
        registry
    }

    pub fn register(&mut self, validator: Box<dyn Validator>) {
        self.validators.insert(validator.name().to_string(), validator);
    }

    pub fn register_fn<F>(&mut self, name: &str, check: F)
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.register(Box::new(ClosureValidator::new(name, check)));
    }

    pub fn get(&self, name: &str) -> Option<&dyn Validator> {
        self.validators.get(name).map(|v| v.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.validators.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.validators.keys().map(|k| k.as_str())
    }
}

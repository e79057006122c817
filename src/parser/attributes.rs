//! Attribute grammar for tag bodies, parsed with chumsky over logos tokens

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;

use crate::parser::lexer::{self, Token};
use crate::tags::{AttributeForm, AttributeSpec};
use crate::value::Value;

/// A single attribute value as written in the source
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    /// `"text"` or `'text'`
    Quoted(String),
    /// Unquoted token
    Bare(String),
    /// `[a, "b"]`
    List(Vec<AttrValue>),
}

impl AttrValue {
    /// The value as plain text (lists comma-joined)
    pub fn as_text(&self) -> String {
        match self {
            AttrValue::Quoted(s) | AttrValue::Bare(s) => s.clone(),
            AttrValue::List(items) => items
                .iter()
                .map(AttrValue::as_text)
                .collect::<Vec<_>>()
                .join(","),
        }
    }

    /// The value as a literal (bare numbers and booleans are typed)
    pub fn to_value(&self) -> Value {
        match self {
            AttrValue::Quoted(s) => Value::String(s.clone()),
            AttrValue::Bare(s) => Value::from_bare(s),
            AttrValue::List(items) => Value::List(items.iter().map(AttrValue::to_value).collect()),
        }
    }

    /// Variable name when the value is a bare `$name` reference
    pub fn variable_ref(&self) -> Option<&str> {
        match self {
            AttrValue::Bare(s) => s.strip_prefix('$'),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum AttrItem {
    Pair(String, AttrValue),
    Positional(AttrValue),
}

/// Attributes extracted from one tag body
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes {
    name: Option<String>,
    expression: Option<String>,
    pairs: Vec<(String, AttrValue)>,
}

impl Attributes {
    /// Element name for name-form tags (`{$name}`, `@invoke(name ...)`)
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Raw expression for expression-form tags
    pub fn expression(&self) -> Option<&str> {
        self.expression.as_deref()
    }

    pub fn get(&self, key: &str) -> Option<&AttrValue> {
        self.pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Text of an attribute value
    pub fn text(&self, key: &str) -> Option<String> {
        self.get(key).map(AttrValue::as_text)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Attribute pairs in source order
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &AttrValue)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.expression.is_none() && self.pairs.is_empty()
    }
}

/// Parse a tag body (delimiters, lead and parentheses already stripped)
pub fn parse_attributes(
    body: &str,
    spec: &AttributeSpec,
) -> Result<Attributes, Vec<crate::ParseError>> {
    let body = body.trim();
    if spec.form == AttributeForm::Expression {
        return Ok(Attributes {
            expression: (!body.is_empty()).then(|| body.to_string()),
            ..Attributes::default()
        });
    }

    let items = parse_items(body)?;
    let mut attributes = Attributes::default();
    let mut positional = Vec::new();

    for item in items {
        match item {
            AttrItem::Pair(key, value) => {
                if spec.allowed.allows(&key) {
                    attributes.pairs.push((key, value));
                }
            }
            AttrItem::Positional(value) => positional.push(value),
        }
    }

    let mut positional = positional.into_iter();
    match spec.form {
        AttributeForm::Name => {
            attributes.name = positional.next().map(|v| v.as_text());
        }
        AttributeForm::Pairs => {
            if let Some(key) = spec.allowed.single() {
                if !attributes.contains(key) {
                    if let Some(value) = positional.next() {
                        attributes.pairs.insert(0, (key.to_string(), value));
                    }
                }
            }
        }
        AttributeForm::Expression => {}
    }

    Ok(attributes)
}

fn parse_items(body: &str) -> Result<Vec<AttrItem>, Vec<crate::ParseError>> {
    let len = body.len();
    let tokens = lexer::lex(body)?;
    let token_iter = tokens.into_iter().map(|(tok, span)| (tok, span.into()));
    let token_stream = Stream::from_iter(token_iter)
        .map((len..len).into(), |(t, s): (_, _)| (t, s));

    attributes_parser()
        .parse(token_stream)
        .into_result()
        .map_err(|errs| errs.into_iter().map(|e| e.into()).collect())
}

fn attributes_parser<'a, I>() -> impl Parser<'a, I, Vec<AttrItem>, extra::Err<Rich<'a, Token>>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    let key = select! {
        Token::Word(s) => s,
    };

    let value = select! {
        Token::DoubleQuoted(s) => AttrValue::Quoted(s),
        Token::SingleQuoted(s) => AttrValue::Quoted(s),
        Token::Bracketed(s) => AttrValue::List(lexer::split_list(&s)),
        Token::Word(s) => AttrValue::Bare(s),
    };

    let pair = key
        .then_ignore(just(Token::Equals))
        .then(value.clone())
        .map(|(k, v)| AttrItem::Pair(k, v));

    let item = choice((pair, value.map(AttrItem::Positional)))
        .then_ignore(just(Token::Comma).or_not());

    item.repeated().collect::<Vec<_>>().then_ignore(end())
}

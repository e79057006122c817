//! Expression grammar: `[name] ( args ) [-> target] options`

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;

use crate::parser::lexer::{self, Token};
use crate::parser::AttrValue;
use crate::value::Value;

/// One call argument
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Literal(Value),
    /// Bare identifier resolved against the scope at evaluation time
    Variable(String),
}

/// A parsed expression
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Expression {
    pub function: Option<String>,
    pub args: Vec<Arg>,
    pub target: Option<String>,
    pub options: Vec<(String, Option<Value>)>,
}

impl Expression {
    fn option(&self, name: &str) -> Option<&Option<Value>> {
        self.options.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    /// Failures are swallowed unless `silent=false` is given
    pub fn silent(&self) -> bool {
        match self.option("silent") {
            Some(Some(value)) => value.is_truthy(),
            _ => true,
        }
    }

    /// Assign into the template variable bag rather than the local scope
    pub fn global(&self) -> bool {
        match self.option("global") {
            Some(Some(value)) => value.is_truthy(),
            Some(None) => true,
            None => false,
        }
    }
}

/// Parse an expression body
pub fn parse_expression(source: &str) -> Result<Expression, Vec<crate::ParseError>> {
    let len = source.len();
    let tokens = lexer::lex(source)?;
    let token_iter = tokens.into_iter().map(|(tok, span)| (tok, span.into()));
    let token_stream = Stream::from_iter(token_iter)
        .map((len..len).into(), |(t, s): (_, _)| (t, s));

    expression_parser()
        .parse(token_stream)
        .into_result()
        .map_err(|errs| errs.into_iter().map(|e| e.into()).collect())
}

fn bare_arg(word: String) -> Arg {
    if let Some(name) = word.strip_prefix('$') {
        return Arg::Variable(name.to_string());
    }
    match Value::from_bare(&word) {
        Value::String(_) => Arg::Variable(word),
        literal => Arg::Literal(literal),
    }
}

fn expression_parser<'a, I>() -> impl Parser<'a, I, Expression, extra::Err<Rich<'a, Token>>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    let word = select! {
        Token::Word(s) => s,
    };

    let arg = select! {
        Token::DoubleQuoted(s) => Arg::Literal(Value::String(s)),
        Token::SingleQuoted(s) => Arg::Literal(Value::String(s)),
        Token::Bracketed(s) => Arg::Literal(Value::List(
            lexer::split_list(&s).iter().map(AttrValue::to_value).collect(),
        )),
        Token::Word(s) => bare_arg(s),
    }
    .labelled("argument");

    let args = arg
        .separated_by(just(Token::Comma))
        .allow_trailing()
        .collect::<Vec<_>>()
        .delimited_by(just(Token::ParenOpen), just(Token::ParenClose));

    let call = word.clone().or_not().then(args);

    let target = just(Token::Arrow)
        .ignore_then(word.clone().labelled("assignment target"))
        .or_not();

    let option_value = select! {
        Token::DoubleQuoted(s) => Value::String(s),
        Token::SingleQuoted(s) => Value::String(s),
        Token::Word(s) => Value::from_bare(&s),
    };

    let option = word.then(just(Token::Equals).ignore_then(option_value).or_not());

    call.then(target)
        .then(option.repeated().collect::<Vec<_>>())
        .then_ignore(end())
        .map(|(((function, args), target), options)| Expression {
            function,
            args,
            target,
            options,
        })
}

//! Lexer for tag bodies (attributes and evaluator expressions) using logos

use logos::Logos;

use super::attributes::AttrValue;
use crate::error::ParseError;

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

fn unquote(slice: &str) -> String {
    let quote = &slice[..1];
    slice[1..slice.len() - 1]
        .replace(&format!("\\{}", quote), quote)
        .replace("\\\\", "\\")
}

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r]+")]
pub enum Token {
    // Operators (longer patterns first)
    #[token("->")]
    Arrow,
    #[token("=")]
    Equals,

    // Delimiters
    #[token("(")]
    ParenOpen,
    #[token(")")]
    ParenClose,
    #[token(",")]
    Comma,

    #[regex(r#""([^"\\]|\\.)*""#, |lex| unquote(lex.slice()))]
    DoubleQuoted(String),

    #[regex(r#"'([^'\\]|\\.)*'"#, |lex| unquote(lex.slice()))]
    SingleQuoted(String),

    /// Inner text of a `[...]` list literal
    #[regex(r"\[[^\]]*\]", |lex| {
        let s = lex.slice();
        s[1..s.len()-1].to_string()
    })]
    Bracketed(String),

    /// Any other run of non-space characters: names, numbers, bare values
    #[regex(r#"[^ \t\n\r=(),\[\]'">]+"#, |lex| lex.slice().to_string(), priority = 1)]
    Word(String),
}

/// Lex a tag body into tokens with spans
pub fn lex(input: &str) -> Result<Vec<(Token, Span)>, Vec<ParseError>> {
    let mut tokens = Vec::new();
    let mut errors = Vec::new();
    for (token, span) in Token::lexer(input).spanned() {
        match token {
            Ok(token) => tokens.push((token, span)),
            Err(()) => errors.push(ParseError::Syntax {
                message: format!("unrecognized input '{}'", &input[span.clone()]),
                span,
                expected: Vec::new(),
            }),
        }
    }
    if errors.is_empty() {
        Ok(tokens)
    } else {
        Err(errors)
    }
}

/// Split the inner text of a bracketed list into its items
///
/// Commas inside quoted items do not separate.
pub fn split_list(inner: &str) -> Vec<AttrValue> {
    let mut items = Vec::new();
    let mut start = 0;
    let mut quote = None;
    let mut escaped = false;

    for (i, c) in inner.char_indices() {
        match quote {
            Some(_) if escaped => escaped = false,
            Some(_) if c == '\\' => escaped = true,
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if (c == '"' || c == '\'') && inner[start..i].trim().is_empty() => quote = Some(c),
            None if c == ',' => {
                items.extend(list_item(&inner[start..i]));
                start = i + 1;
            }
            None => {}
        }
    }
    items.extend(list_item(&inner[start..]));
    items
}

fn list_item(item: &str) -> Option<AttrValue> {
    let item = item.trim();
    if item.is_empty() {
        return None;
    }
    let quoted = item.len() >= 2
        && ((item.starts_with('"') && item.ends_with('"'))
            || (item.starts_with('\'') && item.ends_with('\'')));
    Some(if quoted {
        AttrValue::Quoted(unquote(item))
    } else {
        AttrValue::Bare(item.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pairs() {
        let tokens: Vec<_> = lex(r#"var=status equals="ok""#)
            .unwrap()
            .into_iter()
            .map(|(t, _)| t)
            .collect();
        assert_eq!(
            tokens,
            vec![
                Token::Word("var".to_string()),
                Token::Equals,
                Token::Word("status".to_string()),
                Token::Word("equals".to_string()),
                Token::Equals,
                Token::DoubleQuoted("ok".to_string()),
            ]
        );
    }

    #[test]
    fn test_quotes_and_lists() {
        let tokens: Vec<_> = lex(r#"a='x y' b=[1, 2] c="say \"hi\"""#)
            .unwrap()
            .into_iter()
            .map(|(t, _)| t)
            .collect();
        assert_eq!(
            tokens,
            vec![
                Token::Word("a".to_string()),
                Token::Equals,
                Token::SingleQuoted("x y".to_string()),
                Token::Word("b".to_string()),
                Token::Equals,
                Token::Bracketed("1, 2".to_string()),
                Token::Word("c".to_string()),
                Token::Equals,
                Token::DoubleQuoted("say \"hi\"".to_string()),
            ]
        );
    }

    #[test]
    fn test_expression_tokens() {
        let tokens: Vec<_> = lex("upper(name, 'x') -> shout silent=false")
            .unwrap()
            .into_iter()
            .map(|(t, _)| t)
            .collect();
        assert_eq!(
            tokens,
            vec![
                Token::Word("upper".to_string()),
                Token::ParenOpen,
                Token::Word("name".to_string()),
                Token::Comma,
                Token::SingleQuoted("x".to_string()),
                Token::ParenClose,
                Token::Arrow,
                Token::Word("shout".to_string()),
                Token::Word("silent".to_string()),
                Token::Equals,
                Token::Word("false".to_string()),
            ]
        );
    }

    #[test]
    fn test_arrow_without_spaces() {
        let tokens: Vec<_> = lex("f(x)->y").unwrap().into_iter().map(|(t, _)| t).collect();
        assert_eq!(tokens[4], Token::Arrow);
        assert_eq!(tokens[5], Token::Word("y".to_string()));
    }

    #[test]
    fn test_split_list() {
        assert_eq!(
            split_list("a, 'b', \"c\""),
            vec![
                AttrValue::Bare("a".to_string()),
                AttrValue::Quoted("b".to_string()),
                AttrValue::Quoted("c".to_string()),
            ]
        );
        assert!(split_list(" ").is_empty());
    }

    #[test]
    fn test_split_list_keeps_quoted_commas() {
        assert_eq!(
            split_list(r#""a,b", c, 'x, \'y\'', O'Neil"#),
            vec![
                AttrValue::Quoted("a,b".to_string()),
                AttrValue::Bare("c".to_string()),
                AttrValue::Quoted("x, 'y'".to_string()),
                AttrValue::Bare("O'Neil".to_string()),
            ]
        );
    }

    #[test]
    fn test_unterminated_quote_is_an_error() {
        let errors = lex(r#"var=s equals="ok"#).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            &errors[0],
            ParseError::Syntax { span, .. } if span.start == 13
        ));
    }
}

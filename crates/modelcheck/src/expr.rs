//! The validator expression language.
//!
//! ```text
//! expression := '@' name ( '(' ( arg ( ',' arg )* )? ')' )?
//! arg        := number | string | 'true' | 'false' | 'null' | 'undefined'
//!             | '$value' | '$key' | '[' ( arg ( ',' arg )* )? ']'
//! ```
//!
//! Strings use single or double quotes with backslash escapes. `$value` and
//! `$key` stand for the field value and the field path.

use std::iter::Peekable;
use std::str::CharIndices;

use modelcheck_core::{Path, Value};
use thiserror::Error;
use tracing::trace;

use crate::registry::{Outcome, Registry};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExpressionError {
    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("unexpected '{found}' at offset {offset}")]
    UnexpectedChar { found: char, offset: usize },

    #[error("unterminated string starting at offset {0}")]
    UnterminatedString(usize),

    #[error("invalid number '{0}'")]
    InvalidNumber(String),

    #[error("unknown identifier '{0}'")]
    UnknownIdentifier(String),

    #[error("unknown validator '@{0}'")]
    UnknownValidator(String),
}

/// One argument of an invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Literal(Value),
    /// `$value`
    Value,
    /// `$key`
    Key,
    List(Vec<Arg>),
}

impl Arg {
    fn resolve(&self, value: &Value, key: &Path) -> Value {
        match self {
            Arg::Literal(literal) => literal.clone(),
            Arg::Value => value.clone(),
            Arg::Key => Value::String(key.to_string()),
            Arg::List(items) => Value::Array(items.iter().map(|item| item.resolve(value, key)).collect()),
        }
    }
}

/// A parsed `@name` or `@name(args)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub name: String,
    /// `None` for the bare form.
    pub args: Option<Vec<Arg>>,
}

impl Invocation {
    /// Call the named entry and settle a deferred result against the field.
    pub fn evaluate(&self, registry: &Registry, value: &Value, key: &Path) -> Result<Outcome, ExpressionError> {
        let entry = registry
            .get(&self.name)
            .ok_or_else(|| ExpressionError::UnknownValidator(self.name.clone()))?;
        let args = match &self.args {
            Some(args) => args.iter().map(|arg| arg.resolve(value, key)).collect(),
            None => vec![value.clone(), Value::String(key.to_string())],
        };
        trace!(name = %self.name, args = args.len(), "dispatching validator");
        Ok(entry(&args).settle(value, key))
    }
}

/// True when `source` mentions a validator, i.e. contains `@` followed by a
/// word character.
pub fn mentions_validator(source: &str) -> bool {
    source
        .split('@')
        .skip(1)
        .any(|rest| rest.chars().next().is_some_and(is_word_char))
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Parse a validator expression. Strings that do not mention a validator
/// yield `Ok(None)`; a check treats them as a failing validator.
pub fn parse(source: &str) -> Result<Option<Invocation>, ExpressionError> {
    if !mentions_validator(source) {
        return Ok(None);
    }
    let mut parser = Parser {
        source,
        chars: source.char_indices().peekable(),
    };
    let invocation = parser.invocation()?;
    parser.skip_whitespace();
    match parser.chars.next() {
        None => Ok(Some(invocation)),
        Some((offset, found)) => Err(ExpressionError::UnexpectedChar { found, offset }),
    }
}

struct Parser<'a> {
    source: &'a str,
    chars: Peekable<CharIndices<'a>>,
}

impl<'a> Parser<'a> {
    fn skip_whitespace(&mut self) {
        while self.chars.next_if(|(_, c)| c.is_whitespace()).is_some() {}
    }

    fn expect(&mut self, expected: char) -> Result<(), ExpressionError> {
        self.skip_whitespace();
        match self.chars.next() {
            Some((_, c)) if c == expected => Ok(()),
            Some((offset, found)) => Err(ExpressionError::UnexpectedChar { found, offset }),
            None => Err(ExpressionError::UnexpectedEnd),
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.skip_whitespace();
        self.chars.peek().map(|(_, c)| *c)
    }

    fn word(&mut self) -> &'a str {
        let start = self.chars.peek().map_or(self.source.len(), |(i, _)| *i);
        let mut end = start;
        while let Some((i, c)) = self.chars.next_if(|(_, c)| is_word_char(*c)) {
            end = i + c.len_utf8();
        }
        &self.source[start..end]
    }

    fn invocation(&mut self) -> Result<Invocation, ExpressionError> {
        self.expect('@')?;
        let name = self.word();
        if name.is_empty() {
            return Err(match self.chars.next() {
                Some((offset, found)) => ExpressionError::UnexpectedChar { found, offset },
                None => ExpressionError::UnexpectedEnd,
            });
        }
        let args = if self.peek() == Some('(') {
            self.expect('(')?;
            Some(self.args(')')?)
        } else {
            None
        };
        Ok(Invocation {
            name: name.to_string(),
            args,
        })
    }

    /// Comma-separated arguments up to and including `close`.
    fn args(&mut self, close: char) -> Result<Vec<Arg>, ExpressionError> {
        let mut args = Vec::new();
        if self.peek() == Some(close) {
            self.expect(close)?;
            return Ok(args);
        }
        loop {
            args.push(self.arg()?);
            match self.peek() {
                Some(',') => self.expect(',')?,
                Some(c) if c == close => {
                    self.expect(close)?;
                    return Ok(args);
                }
                _ => {
                    return Err(match self.chars.next() {
                        Some((offset, found)) => ExpressionError::UnexpectedChar { found, offset },
                        None => ExpressionError::UnexpectedEnd,
                    })
                }
            }
        }
    }

    fn arg(&mut self) -> Result<Arg, ExpressionError> {
        match self.peek() {
            None => Err(ExpressionError::UnexpectedEnd),
            Some('[') => {
                self.expect('[')?;
                Ok(Arg::List(self.args(']')?))
            }
            Some(quote @ ('"' | '\'')) => self.string(quote).map(|s| Arg::Literal(Value::String(s))),
            Some('$') => {
                self.chars.next();
                match self.word() {
                    "value" => Ok(Arg::Value),
                    "key" => Ok(Arg::Key),
                    other => Err(ExpressionError::UnknownIdentifier(format!("${}", other))),
                }
            }
            Some(c) if c == '-' || c == '+' || c == '.' || c.is_ascii_digit() => self.number(),
            Some(c) if is_word_char(c) => match self.word() {
                "true" => Ok(Arg::Literal(Value::Bool(true))),
                "false" => Ok(Arg::Literal(Value::Bool(false))),
                "null" => Ok(Arg::Literal(Value::Null)),
                "undefined" => Ok(Arg::Literal(Value::Undefined)),
                other => Err(ExpressionError::UnknownIdentifier(other.to_string())),
            },
            Some(_) => match self.chars.next() {
                Some((offset, found)) => Err(ExpressionError::UnexpectedChar { found, offset }),
                None => Err(ExpressionError::UnexpectedEnd),
            },
        }
    }

    fn number(&mut self) -> Result<Arg, ExpressionError> {
        let mut text = String::new();
        while let Some((_, c)) = self
            .chars
            .next_if(|(_, c)| c.is_ascii_alphanumeric() || matches!(*c, '.' | '-' | '+'))
        {
            text.push(c);
        }
        text.parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .map(|n| Arg::Literal(Value::Number(n)))
            .ok_or(ExpressionError::InvalidNumber(text))
    }

    fn string(&mut self, quote: char) -> Result<String, ExpressionError> {
        let start = match self.chars.next() {
            Some((offset, _)) => offset,
            None => return Err(ExpressionError::UnexpectedEnd),
        };
        let mut text = String::new();
        while let Some((_, c)) = self.chars.next() {
            match c {
                '\\' => match self.chars.next() {
                    Some((_, 'n')) => text.push('\n'),
                    Some((_, 't')) => text.push('\t'),
                    Some((_, 'r')) => text.push('\r'),
                    Some((_, escaped)) => text.push(escaped),
                    None => break,
                },
                c if c == quote => return Ok(text),
                c => text.push(c),
            }
        }
        Err(ExpressionError::UnterminatedString(start))
    }
}

//! Restricted expression evaluator for embedded document expressions.
//!
//! A deliberately closed grammar: integer/float literals, single-quoted
//! strings, `+ - * / %` with standard precedence, unary minus, parentheses,
//! and named bindings supplied by the caller (bulk-create templates bind
//! exactly `index`). No calls, no field access, no host code.

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

use crate::value::ResolvedValue;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EvalError {
    #[error("unexpected character '{found}' at position {position}")]
    UnexpectedCharacter { found: char, position: usize },

    #[error("unexpected token '{found}'")]
    UnexpectedToken { found: String },

    #[error("expression ended unexpectedly")]
    UnexpectedEnd,

    #[error("unclosed string literal")]
    UnclosedString,

    #[error("invalid number '{raw}'")]
    InvalidNumber { raw: String },

    #[error("unknown identifier '{name}'")]
    UnknownIdentifier { name: String },

    #[error("operator '{op}' is not defined for these operand types")]
    InvalidOperands { op: char },

    #[error("division by zero")]
    DivisionByZero,
}

/// Named bindings visible to an expression. Empty everywhere except the
/// bulk-create template scope, which binds `index`.
#[derive(Debug, Default, Clone)]
pub struct Scope {
    bindings: HashMap<String, i64>,
}

impl Scope {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_index(index: i64) -> Self {
        let mut bindings = HashMap::new();
        bindings.insert("index".to_string(), index);
        Self { bindings }
    }

    fn get(&self, name: &str) -> Option<i64> {
        self.bindings.get(name).copied()
    }
}

/// Evaluate `source` against `scope`, returning the computed value.
pub fn evaluate(source: &str, scope: &Scope) -> Result<ResolvedValue, EvalError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser {
        tokens: &tokens,
        position: 0,
        scope,
    };
    let value = parser.expression()?;
    match parser.peek() {
        None => Ok(value.into_resolved()),
        Some(token) => Err(EvalError::UnexpectedToken {
            found: token.to_string(),
        }),
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Integer(i64),
    Float(f64),
    Str(String),
    Ident(String),
    Op(char),
    LParen,
    RParen,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Integer(i) => write!(f, "{i}"),
            Token::Float(v) => write!(f, "{v}"),
            Token::Str(s) => write!(f, "'{s}'"),
            Token::Ident(name) => write!(f, "{name}"),
            Token::Op(op) => write!(f, "{op}"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
        }
    }
}

fn tokenize(source: &str) -> Result<Vec<Token>, EvalError> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = source.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' => i += 1,
            '+' | '-' | '*' | '/' | '%' => {
                tokens.push(Token::Op(c));
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '\'' => {
                let start = i + 1;
                let mut end = start;
                while end < chars.len() && chars[end] != '\'' {
                    end += 1;
                }
                if end >= chars.len() {
                    return Err(EvalError::UnclosedString);
                }
                tokens.push(Token::Str(chars[start..end].iter().collect()));
                i = end + 1;
            }
            c if c.is_ascii_digit() => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let raw: String = chars[start..i].iter().collect();
                if raw.contains('.') {
                    let value = raw
                        .parse::<f64>()
                        .map_err(|_| EvalError::InvalidNumber { raw: raw.clone() })?;
                    tokens.push(Token::Float(value));
                } else {
                    let value = raw
                        .parse::<i64>()
                        .map_err(|_| EvalError::InvalidNumber { raw: raw.clone() })?;
                    tokens.push(Token::Integer(value));
                }
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            other => {
                return Err(EvalError::UnexpectedCharacter {
                    found: other,
                    position: i,
                })
            }
        }
    }

    Ok(tokens)
}

/// Intermediate value during evaluation.
#[derive(Debug, Clone, PartialEq)]
enum Computed {
    Int(i64),
    Float(f64),
    Str(String),
}

impl Computed {
    fn into_resolved(self) -> ResolvedValue {
        match self {
            Computed::Int(i) => ResolvedValue::Integer(i),
            Computed::Float(f) => ResolvedValue::Float(f),
            Computed::Str(s) => ResolvedValue::String(s),
        }
    }

    fn render(&self) -> String {
        match self {
            Computed::Int(i) => i.to_string(),
            Computed::Float(f) => f.to_string(),
            Computed::Str(s) => s.clone(),
        }
    }
}

struct Parser<'a> {
    tokens: &'a [Token],
    position: usize,
    scope: &'a Scope,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.position).cloned();
        if token.is_some() {
            self.position += 1;
        }
        token
    }

    fn expression(&mut self) -> Result<Computed, EvalError> {
        let mut left = self.term()?;
        while let Some(Token::Op(op @ ('+' | '-'))) = self.peek() {
            let op = *op;
            self.position += 1;
            let right = self.term()?;
            left = apply(op, left, right)?;
        }
        Ok(left)
    }

    fn term(&mut self) -> Result<Computed, EvalError> {
        let mut left = self.factor()?;
        while let Some(Token::Op(op @ ('*' | '/' | '%'))) = self.peek() {
            let op = *op;
            self.position += 1;
            let right = self.factor()?;
            left = apply(op, left, right)?;
        }
        Ok(left)
    }

    fn factor(&mut self) -> Result<Computed, EvalError> {
        if let Some(Token::Op('-')) = self.peek() {
            self.position += 1;
            return match self.factor()? {
                Computed::Int(i) => Ok(Computed::Int(-i)),
                Computed::Float(f) => Ok(Computed::Float(-f)),
                Computed::Str(_) => Err(EvalError::InvalidOperands { op: '-' }),
            };
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Computed, EvalError> {
        match self.advance() {
            Some(Token::Integer(i)) => Ok(Computed::Int(i)),
            Some(Token::Float(f)) => Ok(Computed::Float(f)),
            Some(Token::Str(s)) => Ok(Computed::Str(s)),
            Some(Token::Ident(name)) => match self.scope.get(&name) {
                Some(value) => Ok(Computed::Int(value)),
                None => Err(EvalError::UnknownIdentifier { name }),
            },
            Some(Token::LParen) => {
                let inner = self.expression()?;
                match self.advance() {
                    Some(Token::RParen) => Ok(inner),
                    Some(token) => Err(EvalError::UnexpectedToken {
                        found: token.to_string(),
                    }),
                    None => Err(EvalError::UnexpectedEnd),
                }
            }
            Some(token) => Err(EvalError::UnexpectedToken {
                found: token.to_string(),
            }),
            None => Err(EvalError::UnexpectedEnd),
        }
    }
}

fn apply(op: char, left: Computed, right: Computed) -> Result<Computed, EvalError> {
    use Computed::*;

    // String concatenation is the only string operation.
    if matches!(left, Str(_)) || matches!(right, Str(_)) {
        if op == '+' {
            return Ok(Str(format!("{}{}", left.render(), right.render())));
        }
        return Err(EvalError::InvalidOperands { op });
    }

    match (left, right) {
        (Int(a), Int(b)) => match op {
            '+' => Ok(Int(a.wrapping_add(b))),
            '-' => Ok(Int(a.wrapping_sub(b))),
            '*' => Ok(Int(a.wrapping_mul(b))),
            '/' => {
                if b == 0 {
                    Err(EvalError::DivisionByZero)
                } else {
                    Ok(Int(a / b))
                }
            }
            '%' => {
                if b == 0 {
                    Err(EvalError::DivisionByZero)
                } else {
                    Ok(Int(a % b))
                }
            }
            _ => Err(EvalError::InvalidOperands { op }),
        },
        (left, right) => {
            let a = match left {
                Int(i) => i as f64,
                Float(f) => f,
                Str(_) => unreachable!("string operands handled above"),
            };
            let b = match right {
                Int(i) => i as f64,
                Float(f) => f,
                Str(_) => unreachable!("string operands handled above"),
            };
            match op {
                '+' => Ok(Float(a + b)),
                '-' => Ok(Float(a - b)),
                '*' => Ok(Float(a * b)),
                '/' => {
                    if b == 0.0 {
                        Err(EvalError::DivisionByZero)
                    } else {
                        Ok(Float(a / b))
                    }
                }
                '%' => {
                    if b == 0.0 {
                        Err(EvalError::DivisionByZero)
                    } else {
                        Ok(Float(a % b))
                    }
                }
                _ => Err(EvalError::InvalidOperands { op }),
            }
        }
    }
}

//! Arithmetic evaluator for `calc`.
//!
//! Accepts numerals, `+ - * /` and parentheses only. Anything else is rejected
//! before parsing starts, so no input ever reaches a general evaluator.

use std::iter::Peekable;
use std::str::Chars;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

static FORBIDDEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^0-9+\-*/().]").expect("calc charset regex"));

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalcError {
    #[error("Invalid characters")]
    InvalidCharacters,
    #[error("Empty expression")]
    Empty,
    #[error("Unexpected end of expression")]
    UnexpectedEnd,
    #[error("Unexpected token '{0}'")]
    UnexpectedToken(char),
    #[error("Malformed number '{0}'")]
    MalformedNumber(String),
    #[error("Division by zero")]
    DivisionByZero,
    #[error("Expression nested too deeply")]
    TooDeep,
}

/// Deepest run of parentheses or unary signs the parser will follow.
const MAX_DEPTH: usize = 64;

/// Evaluate `expr` with the usual precedence. Whitespace is not allowed;
/// callers join arguments first.
pub fn evaluate(expr: &str) -> Result<f64, CalcError> {
    if FORBIDDEN.is_match(expr) {
        return Err(CalcError::InvalidCharacters);
    }
    if expr.is_empty() {
        return Err(CalcError::Empty);
    }
    let mut parser = Parser {
        chars: expr.chars().peekable(),
        depth: 0,
    };
    let value = parser.expression()?;
    match parser.chars.next() {
        Some(ch) => Err(CalcError::UnexpectedToken(ch)),
        None => Ok(value),
    }
}

/// Render a result the way a person would type it: `10`, not `10.0`.
pub fn format_result(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

struct Parser<'a> {
    chars: Peekable<Chars<'a>>,
    depth: usize,
}

impl Parser<'_> {
    // expression := term (('+' | '-') term)*
    fn expression(&mut self) -> Result<f64, CalcError> {
        let mut value = self.term()?;
        while let Some(&op) = self.chars.peek() {
            match op {
                '+' => {
                    self.chars.next();
                    value += self.term()?;
                }
                '-' => {
                    self.chars.next();
                    value -= self.term()?;
                }
                _ => break,
            }
        }
        Ok(value)
    }

    // term := factor (('*' | '/') factor)*
    fn term(&mut self) -> Result<f64, CalcError> {
        let mut value = self.factor()?;
        while let Some(&op) = self.chars.peek() {
            match op {
                '*' => {
                    self.chars.next();
                    value *= self.factor()?;
                }
                '/' => {
                    self.chars.next();
                    let divisor = self.factor()?;
                    if divisor == 0.0 {
                        return Err(CalcError::DivisionByZero);
                    }
                    value /= divisor;
                }
                _ => break,
            }
        }
        Ok(value)
    }

    // factor := ('+' | '-') factor | '(' expression ')' | number
    fn factor(&mut self) -> Result<f64, CalcError> {
        if self.depth >= MAX_DEPTH {
            return Err(CalcError::TooDeep);
        }
        self.depth += 1;
        let value = self.nested_factor();
        self.depth -= 1;
        value
    }

    fn nested_factor(&mut self) -> Result<f64, CalcError> {
        match self.chars.peek().copied() {
            None => Err(CalcError::UnexpectedEnd),
            Some('+') => {
                self.chars.next();
                self.factor()
            }
            Some('-') => {
                self.chars.next();
                Ok(-self.factor()?)
            }
            Some('(') => {
                self.chars.next();
                let value = self.expression()?;
                match self.chars.next() {
                    Some(')') => Ok(value),
                    Some(other) => Err(CalcError::UnexpectedToken(other)),
                    None => Err(CalcError::UnexpectedEnd),
                }
            }
            Some(ch) if ch.is_ascii_digit() || ch == '.' => self.number(),
            Some(other) => Err(CalcError::UnexpectedToken(other)),
        }
    }

    fn number(&mut self) -> Result<f64, CalcError> {
        let mut literal = String::new();
        while let Some(&ch) = self.chars.peek() {
            if ch.is_ascii_digit() || ch == '.' {
                literal.push(ch);
                self.chars.next();
            } else {
                break;
            }
        }
        literal
            .parse::<f64>()
            .map_err(|_| CalcError::MalformedNumber(literal))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn respects_precedence_and_parentheses() {
        assert_eq!(evaluate("5+5"), Ok(10.0));
        assert_eq!(evaluate("2+3*4"), Ok(14.0));
        assert_eq!(evaluate("(2+3)*4"), Ok(20.0));
        assert_eq!(evaluate("10/4"), Ok(2.5));
        assert_eq!(evaluate("-3*-(2+1)"), Ok(9.0));
    }

    #[test]
    fn rejects_foreign_characters_before_parsing() {
        assert_eq!(evaluate("5+rm-rf"), Err(CalcError::InvalidCharacters));
        assert_eq!(evaluate("2**x"), Err(CalcError::InvalidCharacters));
    }

    #[test]
    fn reports_structural_errors() {
        assert_eq!(evaluate(""), Err(CalcError::Empty));
        assert_eq!(evaluate("5+"), Err(CalcError::UnexpectedEnd));
        assert_eq!(evaluate("(5+5"), Err(CalcError::UnexpectedEnd));
        assert_eq!(evaluate("5)"), Err(CalcError::UnexpectedToken(')')));
        assert_eq!(
            evaluate("1.2.3"),
            Err(CalcError::MalformedNumber("1.2.3".to_string()))
        );
        assert_eq!(evaluate("1/0"), Err(CalcError::DivisionByZero));
    }

    #[test]
    fn deep_nesting_is_an_error_not_a_crash() {
        let parens = "(".repeat(100_000) + "1";
        assert_eq!(evaluate(&parens), Err(CalcError::TooDeep));
        let signs = "-".repeat(200_000) + "1";
        assert_eq!(evaluate(&signs), Err(CalcError::TooDeep));
        let shallow = format!("{}1{}", "(".repeat(20), ")".repeat(20));
        assert_eq!(evaluate(&shallow), Ok(1.0));
        assert_eq!(evaluate("--2"), Ok(2.0));
    }

    #[test]
    fn formats_integral_results_without_fraction() {
        assert_eq!(format_result(10.0), "10");
        assert_eq!(format_result(-4.0), "-4");
        assert_eq!(format_result(2.5), "2.5");
    }
}

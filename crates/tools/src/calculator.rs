//! Calculator tool: evaluates arithmetic expressions.
//!
//! Grammar (lowest to highest precedence):
//!
//! ```text
//! expr    = term (('+' | '-') term)*
//! term    = power (('*' | '/' | '%') power)*
//! power   = unary ('^' power)?
//! unary   = '-' unary | primary
//! primary = NUMBER | '(' expr ')'
//! ```
//!
//! Evaluation errors are returned as tool output so the model can see
//! and correct them.

use std::iter::Peekable;
use std::str::Chars;

use assemble_core::error::ToolError;
use assemble_core::tool::Tool;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CalculatorInput {
    /// The expression to evaluate, e.g. "(2 + 3) * 4".
    pub expression: String,
}

pub struct CalculatorTool;

#[async_trait]
impl Tool for CalculatorTool {
    type Input = CalculatorInput;
    type Output = String;

    fn name(&self) -> &str {
        "calculator"
    }

    fn description(&self) -> &str {
        "Evaluate an arithmetic expression. Supports +, -, *, /, % (remainder), ^ (power), \
         parentheses and decimal numbers."
    }

    async fn run(&self, input: CalculatorInput) -> Result<String, ToolError> {
        match evaluate(&input.expression) {
            Ok(value) => {
                debug!(expression = %input.expression, value, "Evaluated expression");
                Ok(format_number(value))
            }
            Err(err) => Ok(format!("Error: {err}")),
        }
    }
}

/// Integers print without a trailing `.0`.
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalcError {
    #[error("unexpected character '{0}'")]
    UnexpectedChar(char),

    #[error("invalid number '{0}'")]
    InvalidNumber(String),

    #[error("expected {expected}, found {found}")]
    Unexpected { expected: &'static str, found: String },

    #[error("division by zero")]
    DivisionByZero,

    #[error("result is not a finite number")]
    NotFinite,

    #[error("expression is nested too deeply")]
    TooDeep,
}

/// Nesting allowed for parentheses, unary minus and `^` chains.
pub const MAX_DEPTH: usize = 256;

/// Evaluate an arithmetic expression.
pub fn evaluate(expression: &str) -> Result<f64, CalcError> {
    let mut parser = Parser {
        chars: expression.chars().peekable(),
        depth: 0,
    };
    let value = parser.expr()?;
    parser.skip_whitespace();
    if let Some(c) = parser.chars.next() {
        return Err(CalcError::Unexpected {
            expected: "end of expression",
            found: format!("'{c}'"),
        });
    }
    if value.is_finite() {
        Ok(value)
    } else {
        Err(CalcError::NotFinite)
    }
}

/// Scans and evaluates in a single pass over the characters.
struct Parser<'a> {
    chars: Peekable<Chars<'a>>,
    depth: usize,
}

impl Parser<'_> {
    fn skip_whitespace(&mut self) {
        while self.chars.next_if(|c| c.is_whitespace()).is_some() {}
    }

    /// Consume `op` if it is the next non-blank character.
    fn eat(&mut self, op: char) -> bool {
        self.skip_whitespace();
        self.chars.next_if_eq(&op).is_some()
    }

    /// Run `f` one nesting level deeper, failing past [`MAX_DEPTH`].
    fn nested(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<f64, CalcError>,
    ) -> Result<f64, CalcError> {
        if self.depth >= MAX_DEPTH {
            return Err(CalcError::TooDeep);
        }
        self.depth += 1;
        let value = f(self);
        self.depth -= 1;
        value
    }

    fn expr(&mut self) -> Result<f64, CalcError> {
        let mut value = self.term()?;
        loop {
            if self.eat('+') {
                value += self.term()?;
            } else if self.eat('-') {
                value -= self.term()?;
            } else {
                return Ok(value);
            }
        }
    }

    fn term(&mut self) -> Result<f64, CalcError> {
        let mut value = self.power()?;
        loop {
            if self.eat('*') {
                value *= self.power()?;
            } else if self.eat('/') {
                let divisor = self.power()?;
                if divisor == 0.0 {
                    return Err(CalcError::DivisionByZero);
                }
                value /= divisor;
            } else if self.eat('%') {
                let divisor = self.power()?;
                if divisor == 0.0 {
                    return Err(CalcError::DivisionByZero);
                }
                value %= divisor;
            } else {
                return Ok(value);
            }
        }
    }

    // Right-associative: 2^3^2 = 2^9.
    fn power(&mut self) -> Result<f64, CalcError> {
        let base = self.unary()?;
        if self.eat('^') {
            let exponent = self.nested(Self::power)?;
            return Ok(base.powf(exponent));
        }
        Ok(base)
    }

    fn unary(&mut self) -> Result<f64, CalcError> {
        if self.eat('-') {
            return Ok(-self.nested(Self::unary)?);
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<f64, CalcError> {
        self.skip_whitespace();
        match self.chars.peek().copied() {
            Some('(') => {
                self.chars.next();
                let value = self.nested(Self::expr)?;
                if self.eat(')') {
                    Ok(value)
                } else {
                    Err(CalcError::Unexpected {
                        expected: "')'",
                        found: self.describe_next(),
                    })
                }
            }
            Some(c) if c.is_ascii_digit() || c == '.' => self.number(),
            Some(c) if "+*/%^)".contains(c) => Err(CalcError::Unexpected {
                expected: "a number",
                found: format!("'{c}'"),
            }),
            Some(c) => Err(CalcError::UnexpectedChar(c)),
            None => Err(CalcError::Unexpected {
                expected: "a number",
                found: "end of expression".into(),
            }),
        }
    }

    fn number(&mut self) -> Result<f64, CalcError> {
        let mut literal = String::new();
        while let Some(c) = self.chars.next_if(|c| c.is_ascii_digit() || *c == '.') {
            literal.push(c);
        }
        literal
            .parse()
            .map_err(|_| CalcError::InvalidNumber(literal))
    }

    fn describe_next(&mut self) -> String {
        match self.chars.peek() {
            Some(c) => format!("'{c}'"),
            None => "end of expression".into(),
        }
    }
}

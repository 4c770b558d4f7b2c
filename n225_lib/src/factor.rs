//! Adjustment-factor (みなし額面) expressions.
//!
//! An expression is either a bare integer ("50") or a ratio of two integers
//! ("500/10"). Nothing else is accepted.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::disambiguate::normalize_width;

/// Error types for adjustment-factor parsing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FactorError {
    #[error("Adjustment factor is empty")]
    Empty,
    #[error("Malformed adjustment factor '{0}': expected integer or integer/integer")]
    Malformed(String),
    #[error("Adjustment factor '{0}' evaluates to zero")]
    Zero(String),
}

/// A parsed adjustment-factor expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FactorExpr {
    numerator: u64,
    denominator: u64,
}

impl FactorExpr {
    pub fn parse(input: &str) -> Result<Self, FactorError> {
        let normalized = normalize_width(input);
        let trimmed = normalized.trim();
        if trimmed.is_empty() {
            return Err(FactorError::Empty);
        }

        let (num, den) = match trimmed.split_once('/') {
            Some((num, den)) => (num.trim(), Some(den.trim())),
            None => (trimmed, None),
        };
        let numerator = parse_integer(num, input)?;
        let denominator = match den {
            Some(den) => parse_integer(den, input)?,
            None => 1,
        };
        if numerator == 0 || denominator == 0 {
            return Err(FactorError::Zero(input.to_string()));
        }
        Ok(Self {
            numerator,
            denominator,
        })
    }

    pub fn value(&self) -> f64 {
        self.numerator as f64 / self.denominator as f64
    }
}

fn parse_integer(part: &str, input: &str) -> Result<u64, FactorError> {
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(FactorError::Malformed(input.to_string()));
    }
    part.parse()
        .map_err(|_| FactorError::Malformed(input.to_string()))
}

impl FromStr for FactorExpr {
    type Err = FactorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for FactorExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.denominator == 1 {
            write!(f, "{}", self.numerator)
        } else {
            write!(f, "{}/{}", self.numerator, self.denominator)
        }
    }
}

/// Evaluate an expression string to its numeric value.
pub fn evaluate_factor(expr: &str) -> Result<f64, FactorError> {
    FactorExpr::parse(expr).map(|f| f.value())
}

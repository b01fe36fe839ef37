use serde::Serialize;

use super::validate::{finite, finite_output, non_negative};
use crate::error::{CalcError, NoSolution};

const MAX_DECIMAL_PLACES: i32 = 6;
/// Largest integer an f64 holds exactly.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimplifiedRatio {
    pub left: u64,
    pub right: u64,
    pub divisor: u64,
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

fn is_whole(value: f64) -> bool {
    (value - value.round()).abs() <= 1e-9 * value.abs().max(1.0)
}

/// Reduces `a:b` to lowest whole terms. Decimal terms are scaled by the
/// smallest power of ten (up to six places) that makes both whole.
pub fn simplify_ratio(a: f64, b: f64) -> Result<SimplifiedRatio, CalcError> {
    let a = non_negative("a", a)?;
    let b = non_negative("b", b)?;
    if a == 0.0 && b == 0.0 {
        return Err(CalcError::invalid("a", "at least one term must be non-zero"));
    }

    let scale = (0..=MAX_DECIMAL_PLACES)
        .map(|places| 10f64.powi(places))
        .find(|scale| is_whole(a * scale) && is_whole(b * scale))
        .unwrap_or(10f64.powi(MAX_DECIMAL_PLACES));
    let (scaled_a, scaled_b) = ((a * scale).round(), (b * scale).round());
    if scaled_a > MAX_EXACT_INTEGER || scaled_b > MAX_EXACT_INTEGER {
        return Err(NoSolution::Overflow.into());
    }

    let (left, right) = (scaled_a as u64, scaled_b as u64);
    if left == 0 && right == 0 {
        return Err(CalcError::invalid("a", "terms vanish at six decimal places"));
    }
    let divisor = gcd(left, right);
    Ok(SimplifiedRatio {
        left: left / divisor,
        right: right / divisor,
        divisor,
    })
}

/// `a : b = c : d` with exactly one unknown term.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProportionQuery {
    SolveForA { b: f64, c: f64, d: f64 },
    SolveForB { a: f64, c: f64, d: f64 },
    SolveForC { a: f64, b: f64, d: f64 },
    SolveForD { a: f64, b: f64, c: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Proportion {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
}

impl ProportionQuery {
    pub fn from_terms(
        a: Option<f64>,
        b: Option<f64>,
        c: Option<f64>,
        d: Option<f64>,
    ) -> Result<Self, CalcError> {
        match (a, b, c, d) {
            (None, Some(b), Some(c), Some(d)) => Ok(Self::SolveForA { b, c, d }),
            (Some(a), None, Some(c), Some(d)) => Ok(Self::SolveForB { a, c, d }),
            (Some(a), Some(b), None, Some(d)) => Ok(Self::SolveForC { a, b, d }),
            (Some(a), Some(b), Some(c), None) => Ok(Self::SolveForD { a, b, c }),
            _ => Err(CalcError::invalid("d", "leave exactly one of a, b, c, d blank")),
        }
    }

    pub fn solve(self) -> Result<Proportion, CalcError> {
        let quotient = |numerator: f64, denominator: f64| -> Result<f64, CalcError> {
            if denominator == 0.0 {
                return Err(NoSolution::DivisionByZero.into());
            }
            finite_output(numerator / denominator)
        };

        let solved = match self {
            Self::SolveForA { b, c, d } => {
                let (b, c, d) = (finite("b", b)?, finite("c", c)?, finite("d", d)?);
                Proportion { a: quotient(b * c, d)?, b, c, d }
            }
            Self::SolveForB { a, c, d } => {
                let (a, c, d) = (finite("a", a)?, finite("c", c)?, finite("d", d)?);
                Proportion { a, b: quotient(a * d, c)?, c, d }
            }
            Self::SolveForC { a, b, d } => {
                let (a, b, d) = (finite("a", a)?, finite("b", b)?, finite("d", d)?);
                Proportion { a, b, c: quotient(a * d, b)?, d }
            }
            Self::SolveForD { a, b, c } => {
                let (a, b, c) = (finite("a", a)?, finite("b", b)?, finite("c", c)?);
                Proportion { a, b, c, d: quotient(b * c, a)? }
            }
        };
        Ok(solved)
    }
}

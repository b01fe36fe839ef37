use serde::Serialize;

use super::validate::{finite, finite_output};
use crate::error::{CalcError, NoSolution};

/// Three-variable percentage problem with the unknown chosen explicitly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PercentageQuery {
    /// `result` is what percent of `base`?
    SolveForPercentage { base: f64, result: f64 },
    /// `result` is `percentage`% of what?
    SolveForBase { percentage: f64, result: f64 },
    /// What is `percentage`% of `base`?
    SolveForResult { percentage: f64, base: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PercentageAnswer {
    pub percentage: f64,
    pub base: f64,
    pub result: f64,
}

impl PercentageQuery {
    /// Picks the solve mode from whichever field was left blank.
    pub fn from_fields(
        percentage: Option<f64>,
        base: Option<f64>,
        result: Option<f64>,
    ) -> Result<Self, CalcError> {
        match (percentage, base, result) {
            (None, Some(base), Some(result)) => Ok(Self::SolveForPercentage { base, result }),
            (Some(percentage), None, Some(result)) => Ok(Self::SolveForBase { percentage, result }),
            (Some(percentage), Some(base), None) => Ok(Self::SolveForResult { percentage, base }),
            (Some(_), Some(_), Some(_)) => Err(CalcError::invalid(
                "percentage",
                "leave exactly one of percentage, base, result blank",
            )),
            (None, _, _) => Err(CalcError::invalid(
                if base.is_none() { "base" } else { "result" },
                "only one field may be blank",
            )),
            (Some(_), None, None) => {
                Err(CalcError::invalid("result", "only one field may be blank"))
            }
        }
    }

    pub fn solve(self) -> Result<PercentageAnswer, CalcError> {
        let answer = match self {
            Self::SolveForPercentage { base, result } => {
                let base = finite("base", base)?;
                let result = finite("result", result)?;
                if base == 0.0 {
                    return Err(NoSolution::DivisionByZero.into());
                }
                PercentageAnswer {
                    percentage: result / base * 100.0,
                    base,
                    result,
                }
            }
            Self::SolveForBase { percentage, result } => {
                let percentage = finite("percentage", percentage)?;
                let result = finite("result", result)?;
                if percentage == 0.0 {
                    return Err(NoSolution::DivisionByZero.into());
                }
                PercentageAnswer {
                    percentage,
                    base: result / (percentage / 100.0),
                    result,
                }
            }
            Self::SolveForResult { percentage, base } => {
                let percentage = finite("percentage", percentage)?;
                let base = finite("base", base)?;
                PercentageAnswer {
                    percentage,
                    base,
                    result: base * percentage / 100.0,
                }
            }
        };
        finite_output(answer.percentage)?;
        finite_output(answer.base)?;
        finite_output(answer.result)?;
        Ok(answer)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChangeDirection {
    Increase,
    Decrease,
    NoChange,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PercentageChange {
    /// Signed: negative for a decrease.
    pub percent: f64,
    pub absolute_change: f64,
    pub direction: ChangeDirection,
}

/// `(new - original) / original * 100`, relative to the original value.
pub fn percentage_change(original: f64, new: f64) -> Result<PercentageChange, CalcError> {
    let original = finite("original", original)?;
    let new = finite("new", new)?;
    if original <= 0.0 {
        return Err(NoSolution::ZeroReference.into());
    }

    let absolute_change = new - original;
    let direction = if absolute_change > 0.0 {
        ChangeDirection::Increase
    } else if absolute_change < 0.0 {
        ChangeDirection::Decrease
    } else {
        ChangeDirection::NoChange
    };
    Ok(PercentageChange {
        percent: finite_output(absolute_change / original * 100.0)?,
        absolute_change,
        direction,
    })
}

/// `|a - b| / mean(a, b) * 100`. Unsigned and symmetric in its arguments.
pub fn percentage_difference(a: f64, b: f64) -> Result<f64, CalcError> {
    let a = finite("a", a)?;
    let b = finite("b", b)?;
    let mean = (a + b) / 2.0;
    if mean <= 0.0 {
        return Err(NoSolution::ZeroReference.into());
    }
    finite_output((a - b).abs() / mean * 100.0)
}

use serde::Serialize;

use super::validate::{finite, finite_output};
use crate::error::CalcError;

pub const MAX_SIGNIFICANT_DIGITS: u32 = 17;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScientificNotation {
    pub coefficient: f64,
    pub exponent: i32,
    pub e_notation: String,
    pub display: String,
}

/// Normalizes `value` to a coefficient in [1, 10) rounded to `significant_digits`.
pub fn to_scientific(value: f64, significant_digits: u32) -> Result<ScientificNotation, CalcError> {
    let value = finite("value", value)?;
    if !(1..=MAX_SIGNIFICANT_DIGITS).contains(&significant_digits) {
        return Err(CalcError::invalid(
            "significantDigits",
            format!("must be between 1 and {MAX_SIGNIFICANT_DIGITS}"),
        ));
    }

    // `{:e}` rounds the mantissa, so 9.996 at 3 digits becomes 1.00e1, not 10.0e0.
    let precision = (significant_digits - 1) as usize;
    let rendered = format!("{value:.precision$e}");
    let (mantissa, exponent) = rendered
        .split_once('e')
        .ok_or_else(|| CalcError::invalid("value", "could not be normalized"))?;
    let coefficient = mantissa
        .parse::<f64>()
        .map_err(|_| CalcError::invalid("value", "could not be normalized"))?;
    let exponent = exponent
        .parse::<i32>()
        .map_err(|_| CalcError::invalid("value", "could not be normalized"))?;

    Ok(ScientificNotation {
        coefficient,
        exponent,
        e_notation: format!("{mantissa}e{exponent}"),
        display: format!("{mantissa} × 10^{exponent}"),
    })
}

pub fn from_scientific(coefficient: f64, exponent: i32) -> Result<f64, CalcError> {
    let coefficient = finite("coefficient", coefficient)?;
    // Let the float parser do the scaling so the result is correctly rounded.
    let value = format!("{coefficient}e{exponent}")
        .parse::<f64>()
        .map_err(|_| CalcError::invalid("exponent", "is out of range"))?;
    finite_output(value)
}

use crate::error::{CalcError, NoSolution};

pub(crate) fn finite(field: &'static str, value: f64) -> Result<f64, CalcError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(CalcError::invalid(field, "must be a finite number"))
    }
}

pub(crate) fn non_negative(field: &'static str, value: f64) -> Result<f64, CalcError> {
    if finite(field, value)? < 0.0 {
        return Err(CalcError::invalid(field, "must be >= 0"));
    }
    Ok(value)
}

pub(crate) fn positive(field: &'static str, value: f64) -> Result<f64, CalcError> {
    if finite(field, value)? <= 0.0 {
        return Err(CalcError::invalid(field, "must be > 0"));
    }
    Ok(value)
}

pub(crate) fn percent(field: &'static str, value: f64) -> Result<f64, CalcError> {
    if !(0.0..=100.0).contains(&finite(field, value)?) {
        return Err(CalcError::invalid(field, "must be between 0 and 100"));
    }
    Ok(value)
}

pub(crate) fn non_zero_count(field: &'static str, value: u32) -> Result<u32, CalcError> {
    if value == 0 {
        return Err(CalcError::invalid(field, "must be > 0"));
    }
    Ok(value)
}

/// A count in `1..=max`.
pub(crate) fn bounded_count(field: &'static str, value: u32, max: u32) -> Result<u32, CalcError> {
    if !(1..=max).contains(&non_zero_count(field, value)?) {
        return Err(CalcError::invalid(field, format!("must be <= {max}")));
    }
    Ok(value)
}

/// Rejects results that escaped the finite range (huge exponents, etc).
pub(crate) fn finite_output(value: f64) -> Result<f64, CalcError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(NoSolution::Overflow.into())
    }
}

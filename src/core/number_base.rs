use num_bigint::{BigInt, Sign};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CalcError, NoSolution};

/// Longest operand accepted, in digits of its own radix.
pub const MAX_OPERAND_DIGITS: usize = 4096;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Radix {
    Binary,
    Octal,
    Decimal,
    Hexadecimal,
}

impl Radix {
    pub fn value(self) -> u32 {
        match self {
            Self::Binary => 2,
            Self::Octal => 8,
            Self::Decimal => 10,
            Self::Hexadecimal => 16,
        }
    }

    fn prefix(self) -> Option<&'static str> {
        match self {
            Self::Binary => Some("0b"),
            Self::Octal => Some("0o"),
            Self::Decimal => None,
            Self::Hexadecimal => Some("0x"),
        }
    }

    /// Parses an optionally signed, optionally prefixed literal in this radix.
    pub fn parse(self, field: &'static str, text: &str) -> Result<BigInt, CalcError> {
        let trimmed = text.trim().replace('_', "");
        let (negative, unsigned) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed.strip_prefix('+').unwrap_or(&trimmed)),
        };
        let digits = self
            .prefix()
            .and_then(|prefix| {
                unsigned
                    .get(..prefix.len())
                    .filter(|head| head.eq_ignore_ascii_case(prefix))
                    .map(|_| &unsigned[prefix.len()..])
            })
            .unwrap_or(unsigned);

        if digits.is_empty() {
            return Err(CalcError::invalid(field, "must contain at least one digit"));
        }
        if digits.len() > MAX_OPERAND_DIGITS {
            return Err(CalcError::invalid(
                field,
                format!("must have at most {MAX_OPERAND_DIGITS} digits"),
            ));
        }
        if let Some(bad) = digits.chars().find(|c| !c.is_digit(self.value())) {
            return Err(CalcError::invalid(
                field,
                format!("'{bad}' is not a base-{} digit", self.value()),
            ));
        }

        let magnitude = BigInt::parse_bytes(digits.as_bytes(), self.value())
            .ok_or_else(|| CalcError::invalid(field, "is not a valid integer"))?;
        Ok(if negative { -magnitude } else { magnitude })
    }

    /// Uppercase digits, a leading '-' for negatives, no prefix.
    pub fn format(self, value: &BigInt) -> String {
        value.to_str_radix(self.value()).to_ascii_uppercase()
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BaseOperation {
    Add,
    Subtract,
    Multiply,
    Divide,
    Remainder,
    And,
    Or,
    Xor,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BaseCalcInput {
    pub lhs: String,
    pub rhs: String,
    pub operation: BaseOperation,
    pub radix: Radix,
    pub output_radix: Option<Radix>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseCalcResult {
    pub result: String,
    pub decimal: String,
    /// Set for integer division, which truncates toward zero.
    pub remainder: Option<String>,
}

/// Converts both operands to arbitrary-precision integers, applies the
/// operation, and renders the result back in the requested base.
pub fn calculate(input: &BaseCalcInput) -> Result<BaseCalcResult, CalcError> {
    let lhs = input.radix.parse("lhs", &input.lhs)?;
    let rhs = input.radix.parse("rhs", &input.rhs)?;
    let output = input.output_radix.unwrap_or(input.radix);

    let mut remainder = None;
    let value = match input.operation {
        BaseOperation::Add => &lhs + &rhs,
        BaseOperation::Subtract => &lhs - &rhs,
        BaseOperation::Multiply => &lhs * &rhs,
        BaseOperation::Divide | BaseOperation::Remainder if rhs.sign() == Sign::NoSign => {
            debug!(lhs = %input.lhs, "rejecting division by zero");
            return Err(NoSolution::DivisionByZero.into());
        }
        BaseOperation::Divide => {
            remainder = Some(output.format(&(&lhs % &rhs)));
            &lhs / &rhs
        }
        BaseOperation::Remainder => &lhs % &rhs,
        // Two's-complement semantics for negative operands.
        BaseOperation::And => &lhs & &rhs,
        BaseOperation::Or => &lhs | &rhs,
        BaseOperation::Xor => &lhs ^ &rhs,
    };

    Ok(BaseCalcResult {
        result: output.format(&value),
        decimal: value.to_string(),
        remainder,
    })
}

pub fn convert_base(text: &str, from: Radix, to: Radix) -> Result<String, CalcError> {
    let value = from.parse("value", text)?;
    Ok(to.format(&value))
}

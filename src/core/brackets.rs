use serde::{Deserialize, Serialize};

use super::validate::{finite_output, non_negative, non_zero_count, percent};
use crate::error::CalcError;

pub const ESTATE_EXEMPTION_2024: f64 = 13_610_000.0;
pub const ESTATE_TOP_RATE_PCT: f64 = 40.0;

pub const STANDARD_DEDUCTION_SINGLE_2024: f64 = 14_600.0;
pub const SOCIAL_SECURITY_RATE_PCT: f64 = 6.2;
pub const SOCIAL_SECURITY_WAGE_BASE_2024: f64 = 168_600.0;
pub const MEDICARE_RATE_PCT: f64 = 1.45;
pub const ADDITIONAL_MEDICARE_RATE_PCT: f64 = 0.9;
pub const ADDITIONAL_MEDICARE_THRESHOLD: f64 = 200_000.0;

/// One band of a tiered schedule. `upper` is exclusive; `None` is unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bracket {
    pub lower: f64,
    pub upper: Option<f64>,
    pub rate_pct: f64,
}

/// Contiguous, increasing, non-overlapping brackets. Only the last may be open.
#[derive(Debug, Clone, PartialEq)]
pub struct BracketTable {
    brackets: Vec<Bracket>,
}

impl BracketTable {
    pub fn new(brackets: Vec<Bracket>) -> Result<Self, CalcError> {
        let Some(first) = brackets.first() else {
            return Err(CalcError::invalid("brackets", "at least one bracket is required"));
        };
        non_negative("brackets", first.lower)?;

        for (index, bracket) in brackets.iter().enumerate() {
            percent("brackets", bracket.rate_pct)?;
            let is_last = index + 1 == brackets.len();
            match (bracket.upper, is_last) {
                (None, false) => {
                    return Err(CalcError::invalid(
                        "brackets",
                        "only the last bracket may be unbounded",
                    ));
                }
                (Some(upper), _) if !(upper.is_finite() && upper > bracket.lower) => {
                    return Err(CalcError::invalid(
                        "brackets",
                        format!("bracket {index} must have upper > lower"),
                    ));
                }
                _ => {}
            }
            if let Some(next) = brackets.get(index + 1) {
                if bracket.upper != Some(next.lower) {
                    return Err(CalcError::invalid(
                        "brackets",
                        format!("bracket {} must start where bracket {index} ends", index + 1),
                    ));
                }
            }
        }
        Ok(Self { brackets })
    }

    /// US federal ordinary income brackets, single filer, tax year 2024.
    pub fn federal_single_2024() -> Self {
        const BANDS: [(f64, Option<f64>, f64); 7] = [
            (0.0, Some(11_600.0), 10.0),
            (11_600.0, Some(47_150.0), 12.0),
            (47_150.0, Some(100_525.0), 22.0),
            (100_525.0, Some(191_950.0), 24.0),
            (191_950.0, Some(243_725.0), 32.0),
            (243_725.0, Some(609_350.0), 35.0),
            (609_350.0, None, 37.0),
        ];
        Self {
            brackets: BANDS
                .iter()
                .map(|&(lower, upper, rate_pct)| Bracket {
                    lower,
                    upper,
                    rate_pct,
                })
                .collect(),
        }
    }

    pub fn brackets(&self) -> &[Bracket] {
        &self.brackets
    }

    /// Bracket whose `[lower, upper)` range contains `amount`.
    pub fn bracket_for(&self, amount: f64) -> Option<&Bracket> {
        self.brackets.iter().find(|bracket| {
            amount >= bracket.lower && bracket.upper.is_none_or(|upper| amount < upper)
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BracketLine {
    pub lower: f64,
    pub upper: Option<f64>,
    pub rate_pct: f64,
    pub taxed_amount: f64,
    pub tax: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxBreakdown {
    pub taxable_amount: f64,
    pub tax: f64,
    pub effective_rate_pct: f64,
    /// Rate applied to the last dollar taxed; zero when nothing is taxed.
    pub marginal_rate_pct: f64,
    pub lines: Vec<BracketLine>,
}

pub fn apply_brackets(taxable_amount: f64, table: &BracketTable) -> Result<f64, CalcError> {
    progressive_tax(taxable_amount, table).map(|breakdown| breakdown.tax)
}

/// Tiered tax: each bracket taxes only the slice of the amount that falls inside it.
pub fn progressive_tax(taxable_amount: f64, table: &BracketTable) -> Result<TaxBreakdown, CalcError> {
    let amount = non_negative("taxableAmount", taxable_amount)?;

    let mut lines = Vec::new();
    let mut tax = 0.0;
    let mut marginal_rate_pct = 0.0;
    for bracket in table.brackets() {
        if amount <= bracket.lower {
            break;
        }
        let top = bracket.upper.map_or(amount, |upper| amount.min(upper));
        let taxed_amount = top - bracket.lower;
        let line_tax = taxed_amount * bracket.rate_pct / 100.0;
        tax += line_tax;
        marginal_rate_pct = bracket.rate_pct;
        lines.push(BracketLine {
            lower: bracket.lower,
            upper: bracket.upper,
            rate_pct: bracket.rate_pct,
            taxed_amount,
            tax: line_tax,
        });
    }

    let effective_rate_pct = if amount > 0.0 {
        tax / amount * 100.0
    } else {
        0.0
    };
    Ok(TaxBreakdown {
        taxable_amount: amount,
        tax: finite_output(tax)?,
        effective_rate_pct,
        marginal_rate_pct,
        lines,
    })
}

/// `max(0, amount - threshold) * rate`.
pub fn flat_excess_tax(amount: f64, threshold: f64, rate_pct: f64) -> Result<f64, CalcError> {
    let amount = non_negative("taxableAmount", amount)?;
    let threshold = non_negative("exemption", threshold)?;
    let rate_pct = percent("ratePct", rate_pct)?;
    Ok((amount - threshold).max(0.0) * rate_pct / 100.0)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EstateTaxInput {
    pub gross_estate: f64,
    pub debts_and_expenses: f64,
    pub charitable_deductions: f64,
    pub lifetime_gifts: f64,
    pub exemption: f64,
    pub rate_pct: f64,
}

impl Default for EstateTaxInput {
    fn default() -> Self {
        Self {
            gross_estate: 0.0,
            debts_and_expenses: 0.0,
            charitable_deductions: 0.0,
            lifetime_gifts: 0.0,
            exemption: ESTATE_EXEMPTION_2024,
            rate_pct: ESTATE_TOP_RATE_PCT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EstateTaxResult {
    pub taxable_estate: f64,
    pub exemption: f64,
    pub amount_over_exemption: f64,
    pub tax: f64,
    pub net_to_heirs: f64,
}

pub fn estate_tax(input: &EstateTaxInput) -> Result<EstateTaxResult, CalcError> {
    let gross = non_negative("grossEstate", input.gross_estate)?;
    let debts = non_negative("debtsAndExpenses", input.debts_and_expenses)?;
    let charitable = non_negative("charitableDeductions", input.charitable_deductions)?;
    let gifts = non_negative("lifetimeGifts", input.lifetime_gifts)?;

    let taxable_estate = (gross - debts - charitable + gifts).max(0.0);
    let tax = flat_excess_tax(taxable_estate, input.exemption, input.rate_pct)?;

    Ok(EstateTaxResult {
        taxable_estate,
        exemption: input.exemption,
        amount_over_exemption: (taxable_estate - input.exemption).max(0.0),
        tax,
        net_to_heirs: (gross - debts - charitable - tax).max(0.0),
    })
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaycheckInput {
    pub gross_annual: f64,
    pub pre_tax_deductions: f64,
    pub pay_periods_per_year: u32,
    pub state_rate_pct: f64,
    pub standard_deduction: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaycheckResult {
    pub federal_taxable_income: f64,
    pub federal: TaxBreakdown,
    pub social_security: f64,
    pub medicare: f64,
    pub state_tax: f64,
    pub total_tax: f64,
    pub net_annual: f64,
    pub gross_per_paycheck: f64,
    pub net_per_paycheck: f64,
}

/// Annual take-home pay after federal, FICA and a flat state tax.
pub fn take_home_pay(input: &PaycheckInput, federal: &BracketTable) -> Result<PaycheckResult, CalcError> {
    let gross = non_negative("grossAnnual", input.gross_annual)?;
    let pre_tax = non_negative("preTaxDeductions", input.pre_tax_deductions)?;
    if pre_tax > gross {
        return Err(CalcError::invalid("preTaxDeductions", "must not exceed grossAnnual"));
    }
    let periods = non_zero_count("payPeriodsPerYear", input.pay_periods_per_year)?;
    let state_rate_pct = percent("stateRatePct", input.state_rate_pct)?;
    let standard_deduction = non_negative("standardDeduction", input.standard_deduction)?;

    let adjusted_gross = gross - pre_tax;
    let federal_taxable_income = (adjusted_gross - standard_deduction).max(0.0);
    let federal_breakdown = progressive_tax(federal_taxable_income, federal)?;

    let social_security = gross.min(SOCIAL_SECURITY_WAGE_BASE_2024) * SOCIAL_SECURITY_RATE_PCT / 100.0;
    let medicare = gross * MEDICARE_RATE_PCT / 100.0
        + (gross - ADDITIONAL_MEDICARE_THRESHOLD).max(0.0) * ADDITIONAL_MEDICARE_RATE_PCT / 100.0;
    let state_tax = adjusted_gross * state_rate_pct / 100.0;

    let total_tax = federal_breakdown.tax + social_security + medicare + state_tax;
    let net_annual = gross - pre_tax - total_tax;
    let periods = f64::from(periods);

    Ok(PaycheckResult {
        federal_taxable_income,
        federal: federal_breakdown,
        social_security,
        medicare,
        state_tax,
        total_tax,
        net_annual,
        gross_per_paycheck: gross / periods,
        net_per_paycheck: net_annual / periods,
    })
}

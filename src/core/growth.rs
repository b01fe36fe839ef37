use tracing::debug;

use super::amortization::level_payment;
use super::types::{
    AnnuityInput, AnnuityResult, CollegeCostInput, CollegeCostResult, CollegeCostYear,
    CompoundingFrequency, GrowthInput, GrowthResult, GrowthYearRow, SavingsGoalInput,
    SavingsGoalResult,
};
use super::validate::{bounded_count, finite_output, non_negative, percent, positive};
use crate::error::{CalcError, NoSolution};

/// Longest horizon accepted by the growth engines.
pub const MAX_YEARS: f64 = 200.0;
pub const MAX_YEARS_ENROLLED: u32 = 10;

/// Per-period rate after tax drag: `(rate/100) * (1 - tax/100) / periods`.
pub fn per_period_rate(
    annual_rate_pct: f64,
    tax_rate_pct: f64,
    frequency: CompoundingFrequency,
) -> f64 {
    let net_rate = (annual_rate_pct / 100.0) * (1.0 - tax_rate_pct / 100.0);
    net_rate / frequency.periods_per_year() as f64
}

/// Balance after `periods` of compounding with an ordinary-annuity contribution.
fn balance_after(present_value: f64, rate: f64, contribution: f64, periods: f64) -> f64 {
    if rate == 0.0 {
        return present_value + contribution * periods;
    }
    let factor = (1.0 + rate).powf(periods);
    present_value * factor + contribution * ((factor - 1.0) / rate)
}

fn validate_years(years: f64) -> Result<f64, CalcError> {
    non_negative("years", years)?;
    if years > MAX_YEARS {
        return Err(CalcError::invalid("years", format!("must be <= {MAX_YEARS}")));
    }
    Ok(years)
}

pub fn grow_future(input: &GrowthInput) -> Result<GrowthResult, CalcError> {
    non_negative("presentValue", input.present_value)?;
    non_negative("annualRatePct", input.annual_rate_pct)?;
    validate_years(input.years)?;
    non_negative("contributionPerPeriod", input.contribution_per_period)?;
    percent("taxRatePct", input.tax_rate_pct)?;

    let rate = per_period_rate(input.annual_rate_pct, input.tax_rate_pct, input.frequency);
    let periods_per_year = input.frequency.periods_per_year() as f64;
    let periods = periods_per_year * input.years;

    let ending_balance = finite_output(balance_after(
        input.present_value,
        rate,
        input.contribution_per_period,
        periods,
    ))?;
    let total_contributions = input.contribution_per_period * periods;

    let mut schedule = Vec::with_capacity(input.years.ceil() as usize);
    let mut previous_years = 0.0;
    let mut previous_balance = input.present_value;
    let mut year = 0u32;
    while previous_years < input.years {
        year += 1;
        let elapsed = (year as f64).min(input.years);
        let balance = if elapsed == input.years {
            ending_balance
        } else {
            balance_after(
                input.present_value,
                rate,
                input.contribution_per_period,
                periods_per_year * elapsed,
            )
        };
        let contributions =
            input.contribution_per_period * periods_per_year * (elapsed - previous_years);
        schedule.push(GrowthYearRow {
            year,
            contributions,
            interest: balance - previous_balance - contributions,
            ending_balance: balance,
        });
        previous_years = elapsed;
        previous_balance = balance;
    }

    Ok(GrowthResult {
        ending_balance,
        total_contributions,
        total_growth: ending_balance - input.present_value - total_contributions,
        schedule,
    })
}

/// Per-period contribution that lifts `present_value` to `target_balance`.
pub fn required_contribution(input: &SavingsGoalInput) -> Result<SavingsGoalResult, CalcError> {
    non_negative("targetBalance", input.target_balance)?;
    non_negative("presentValue", input.present_value)?;
    non_negative("annualRatePct", input.annual_rate_pct)?;
    validate_years(input.years)?;
    percent("taxRatePct", input.tax_rate_pct)?;

    let rate = per_period_rate(input.annual_rate_pct, input.tax_rate_pct, input.frequency);
    let periods = input.frequency.periods_per_year() as f64 * input.years;
    let projected_present_value =
        finite_output(balance_after(input.present_value, rate, 0.0, periods))?;
    let shortfall = (input.target_balance - projected_present_value).max(0.0);

    let contribution_per_period = if shortfall == 0.0 {
        0.0
    } else if periods <= 0.0 {
        debug!(shortfall, "no periods left to close the shortfall");
        return Err(NoSolution::NoPeriods.into());
    } else if rate == 0.0 {
        shortfall / periods
    } else {
        shortfall * rate / ((1.0 + rate).powf(periods) - 1.0)
    };
    let contribution_per_period = finite_output(contribution_per_period)?;

    Ok(SavingsGoalResult {
        contribution_per_period,
        periods,
        projected_present_value,
        shortfall,
        total_contributions: contribution_per_period * periods,
    })
}

/// Level withdrawal that exhausts `balance` over the term.
pub fn annuity_payout(input: &AnnuityInput) -> Result<AnnuityResult, CalcError> {
    non_negative("balance", input.balance)?;
    non_negative("annualRatePct", input.annual_rate_pct)?;
    positive("years", input.years)?;
    validate_years(input.years)?;

    let rate = per_period_rate(input.annual_rate_pct, 0.0, input.frequency);
    let periods = input.frequency.periods_per_year() as f64 * input.years;
    let payment_per_period = finite_output(level_payment(input.balance, rate, periods))?;
    let total_paid = payment_per_period * periods;

    Ok(AnnuityResult {
        payment_per_period,
        periods,
        total_paid,
        total_interest: total_paid - input.balance,
    })
}

pub fn college_cost_projection(input: &CollegeCostInput) -> Result<CollegeCostResult, CalcError> {
    non_negative("currentAnnualCost", input.current_annual_cost)?;
    non_negative("costInflationPct", input.cost_inflation_pct)?;
    bounded_count("yearsEnrolled", input.years_enrolled, MAX_YEARS_ENROLLED)?;
    non_negative("currentSavings", input.current_savings)?;
    non_negative("annualReturnPct", input.annual_return_pct)?;
    if f64::from(input.years_until_enrollment) > MAX_YEARS {
        return Err(CalcError::invalid(
            "yearsUntilEnrollment",
            format!("must be <= {MAX_YEARS}"),
        ));
    }

    let inflation = input.cost_inflation_pct / 100.0;
    let yearly_costs: Vec<CollegeCostYear> = (0..input.years_enrolled)
        .map(|k| {
            let years_from_now = input.years_until_enrollment + k;
            CollegeCostYear {
                years_from_now,
                annual_cost: input.current_annual_cost
                    * (1.0 + inflation).powf(f64::from(years_from_now)),
            }
        })
        .collect();
    let total_future_cost = finite_output(yearly_costs.iter().map(|y| y.annual_cost).sum())?;

    let goal = SavingsGoalInput {
        target_balance: total_future_cost,
        present_value: input.current_savings,
        annual_rate_pct: input.annual_return_pct,
        frequency: CompoundingFrequency::Monthly,
        years: f64::from(input.years_until_enrollment),
        tax_rate_pct: 0.0,
    };
    let (projected_savings, shortfall, monthly_contribution) = match required_contribution(&goal) {
        Ok(solved) => (
            solved.projected_present_value,
            solved.shortfall,
            Some(solved.contribution_per_period),
        ),
        Err(CalcError::NoSolution(NoSolution::NoPeriods)) => (
            input.current_savings,
            (total_future_cost - input.current_savings).max(0.0),
            None,
        ),
        Err(err) => return Err(err),
    };

    Ok(CollegeCostResult {
        yearly_costs,
        total_future_cost,
        projected_savings,
        shortfall,
        monthly_contribution,
    })
}

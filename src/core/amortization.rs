use tracing::debug;

use super::types::{
    AffordabilityInput, AffordabilityResult, AmortizationResult, AmortizationRow,
    FixedPaymentInput, LoanInput, RefinanceInput, RefinanceResult,
};
use super::validate::{bounded_count, finite_output, non_negative, percent, positive};
use crate::config::DEFAULT_SCHEDULE_MULTIPLIER;
use crate::error::{CalcError, NoSolution};

// Balances below this (or a billionth of the principal) count as paid off.
const BALANCE_EPSILON: f64 = 1e-6;
const RATE_EPSILON: f64 = 1e-12;

/// Longest loan term and payoff horizon accepted, in months.
pub const MAX_TERM_MONTHS: u32 = 1_200;

pub fn monthly_rate(annual_rate_pct: f64) -> f64 {
    annual_rate_pct / 100.0 / 12.0
}

/// Level payment that retires `principal` over `periods` at `rate` per period.
pub fn level_payment(principal: f64, rate: f64, periods: f64) -> f64 {
    if rate.abs() < RATE_EPSILON {
        return principal / periods;
    }
    principal * rate / (1.0 - (1.0 + rate).powf(-periods))
}

/// Inverse of [`level_payment`]: the principal a payment stream can retire.
pub fn principal_for_payment(payment: f64, rate: f64, periods: f64) -> f64 {
    if rate.abs() < RATE_EPSILON {
        return payment * periods;
    }
    payment * (1.0 - (1.0 + rate).powf(-periods)) / rate
}

pub fn amortize(input: &LoanInput) -> Result<AmortizationResult, CalcError> {
    amortize_capped(input, DEFAULT_SCHEDULE_MULTIPLIER)
}

/// Like [`amortize`], with the period cap expressed as a multiple of the term.
pub fn amortize_capped(
    input: &LoanInput,
    schedule_multiplier: u32,
) -> Result<AmortizationResult, CalcError> {
    positive("principal", input.principal)?;
    non_negative("annualRatePct", input.annual_rate_pct)?;
    bounded_count("termMonths", input.term_months, MAX_TERM_MONTHS)?;
    non_negative("extraPayment", input.extra_payment)?;

    let rate = monthly_rate(input.annual_rate_pct);
    let payment = finite_output(level_payment(
        input.principal,
        rate,
        input.term_months as f64,
    ))?;
    let max_periods = input.term_months.saturating_mul(schedule_multiplier.max(1));
    let schedule = build_schedule(
        input.principal,
        rate,
        payment,
        input.extra_payment,
        max_periods,
    )?;
    Ok(summarize(payment, schedule))
}

pub fn amortize_with_payment(input: &FixedPaymentInput) -> Result<AmortizationResult, CalcError> {
    positive("principal", input.principal)?;
    non_negative("annualRatePct", input.annual_rate_pct)?;
    positive("monthlyPayment", input.monthly_payment)?;
    non_negative("extraPayment", input.extra_payment)?;
    bounded_count("maxPeriods", input.max_periods, MAX_TERM_MONTHS)?;

    let schedule = build_schedule(
        input.principal,
        monthly_rate(input.annual_rate_pct),
        input.monthly_payment,
        input.extra_payment,
        input.max_periods,
    )?;
    Ok(summarize(input.monthly_payment, schedule))
}

fn build_schedule(
    principal: f64,
    rate: f64,
    payment: f64,
    extra: f64,
    max_periods: u32,
) -> Result<Vec<AmortizationRow>, CalcError> {
    let first_interest = principal * rate;
    if payment + extra <= first_interest {
        debug!(
            payment,
            extra, first_interest, "payment does not cover the first month's interest"
        );
        return Err(NoSolution::NonAmortizing.into());
    }

    let paid_off = (principal * 1e-9).max(BALANCE_EPSILON);
    let mut rows = Vec::with_capacity(max_periods.min(1_200) as usize);
    let mut balance = principal;
    for period in 1..=max_periods {
        let interest = balance * rate;
        let principal_portion = payment + extra - interest;
        let ending = balance - principal_portion;
        if ending <= paid_off {
            rows.push(AmortizationRow {
                period,
                payment: interest + balance,
                principal_portion: balance,
                interest_portion: interest,
                ending_balance: 0.0,
            });
            return Ok(rows);
        }
        rows.push(AmortizationRow {
            period,
            payment: payment + extra,
            principal_portion,
            interest_portion: interest,
            ending_balance: ending,
        });
        balance = ending;
    }

    debug!(max_periods, balance, "schedule hit the period cap");
    Err(NoSolution::NonAmortizing.into())
}

fn summarize(monthly_payment: f64, schedule: Vec<AmortizationRow>) -> AmortizationResult {
    let total_interest = schedule.iter().map(|row| row.interest_portion).sum();
    let total_paid = schedule.iter().map(|row| row.payment).sum();
    AmortizationResult {
        monthly_payment,
        payoff_months: schedule.len() as u32,
        schedule,
        total_interest,
        total_paid,
    }
}

/// Months left on a loan, from `n = -ln(1 - B*r/P) / ln(1 + r)`.
pub fn remaining_term_months(
    balance: f64,
    annual_rate_pct: f64,
    payment: f64,
) -> Result<f64, CalcError> {
    positive("currentBalance", balance)?;
    non_negative("currentRatePct", annual_rate_pct)?;
    positive("currentMonthlyPayment", payment)?;

    let rate = monthly_rate(annual_rate_pct);
    if rate.abs() < RATE_EPSILON {
        return Ok(balance / payment);
    }
    let interest = balance * rate;
    if payment <= interest {
        debug!(payment, interest, "current payment never retires the balance");
        return Err(NoSolution::NonAmortizing.into());
    }
    finite_output(-(1.0 - interest / payment).ln() / (1.0 + rate).ln())
}

pub fn compare_refinance(input: &RefinanceInput) -> Result<RefinanceResult, CalcError> {
    non_negative("newRatePct", input.new_rate_pct)?;
    bounded_count("newTermMonths", input.new_term_months, MAX_TERM_MONTHS)?;
    non_negative("cashOut", input.cash_out)?;
    percent("pointsPct", input.points_pct)?;
    if input.points_pct >= 100.0 {
        return Err(CalcError::invalid("pointsPct", "must be < 100"));
    }
    non_negative("fixedFees", input.fixed_fees)?;

    let remaining = remaining_term_months(
        input.current_balance,
        input.current_rate_pct,
        input.current_monthly_payment,
    )?;

    let base = input.current_balance + input.cash_out;
    let points = input.points_pct / 100.0;
    // Points are charged on the final loan amount, so financing them is solved
    // algebraically: L = base + points * L + fees.
    let (new_loan_amount, closing_costs) = if input.finance_closing_costs {
        let loan = (base + input.fixed_fees) / (1.0 - points);
        (loan, loan - base)
    } else {
        (base, base * points + input.fixed_fees)
    };

    let term = input.new_term_months as f64;
    let new_monthly_payment = finite_output(level_payment(
        new_loan_amount,
        monthly_rate(input.new_rate_pct),
        term,
    ))?;
    let monthly_savings = input.current_monthly_payment - new_monthly_payment;
    let break_even_months = if monthly_savings > 0.0 {
        Some(closing_costs / monthly_savings)
    } else {
        debug!(monthly_savings, "refinance never recoups its closing costs");
        None
    };

    let current_remaining_cost = input.current_monthly_payment * remaining;
    let upfront = if input.finance_closing_costs {
        0.0
    } else {
        closing_costs
    };
    let new_total_cost = new_monthly_payment * term + upfront;

    Ok(RefinanceResult {
        current_remaining_months: remaining,
        current_remaining_interest: current_remaining_cost - input.current_balance,
        new_loan_amount,
        closing_costs,
        new_monthly_payment,
        new_total_interest: new_monthly_payment * term - new_loan_amount,
        monthly_savings,
        break_even_months,
        lifetime_savings: current_remaining_cost - new_total_cost,
    })
}

pub fn house_affordability(input: &AffordabilityInput) -> Result<AffordabilityResult, CalcError> {
    positive("annualIncome", input.annual_income)?;
    non_negative("monthlyDebts", input.monthly_debts)?;
    non_negative("downPayment", input.down_payment)?;
    non_negative("annualRatePct", input.annual_rate_pct)?;
    bounded_count("termMonths", input.term_months, MAX_TERM_MONTHS)?;
    non_negative("annualPropertyTax", input.annual_property_tax)?;
    non_negative("annualInsurance", input.annual_insurance)?;
    positive("frontEndRatioPct", input.front_end_ratio_pct)?;
    percent("frontEndRatioPct", input.front_end_ratio_pct)?;
    positive("backEndRatioPct", input.back_end_ratio_pct)?;
    percent("backEndRatioPct", input.back_end_ratio_pct)?;

    let monthly_income = input.annual_income / 12.0;
    let front = monthly_income * input.front_end_ratio_pct / 100.0;
    let back = monthly_income * input.back_end_ratio_pct / 100.0 - input.monthly_debts;
    let max_housing_payment = front.min(back);
    let monthly_tax_and_insurance = (input.annual_property_tax + input.annual_insurance) / 12.0;
    let principal_and_interest = max_housing_payment - monthly_tax_and_insurance;
    if principal_and_interest <= 0.0 {
        debug!(
            max_housing_payment,
            monthly_tax_and_insurance, "no budget left for principal and interest"
        );
        return Err(NoSolution::InsufficientIncome.into());
    }

    let max_loan = finite_output(principal_for_payment(
        principal_and_interest,
        monthly_rate(input.annual_rate_pct),
        input.term_months as f64,
    ))?;

    Ok(AffordabilityResult {
        max_housing_payment,
        monthly_tax_and_insurance,
        principal_and_interest,
        max_loan,
        max_home_price: max_loan + input.down_payment,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::{prop_assert, prop_assert_eq, proptest};

    fn assert_approx_tol(actual: f64, expected: f64, tol: f64) {
        assert!(
            (actual - expected).abs() <= tol,
            "expected {expected}, got {actual}, tolerance {tol}"
        );
    }

    fn loan(principal: f64, rate: f64, term: u32) -> LoanInput {
        LoanInput {
            principal,
            annual_rate_pct: rate,
            term_months: term,
            extra_payment: 0.0,
        }
    }

    fn sample_refinance() -> RefinanceInput {
        RefinanceInput {
            current_balance: 200_000.0,
            current_rate_pct: 7.0,
            current_monthly_payment: 1_600.0,
            new_rate_pct: 5.0,
            new_term_months: 360,
            cash_out: 0.0,
            points_pct: 1.0,
            fixed_fees: 3_000.0,
            finance_closing_costs: false,
        }
    }

    #[test]
    fn thirty_year_mortgage_matches_reference_figures() {
        let result = amortize(&loan(250_000.0, 6.0, 360)).expect("valid loan");
        assert_approx_tol(result.monthly_payment, 1_498.88, 0.01);
        assert_approx_tol(result.total_interest, 289_595.0, 5.0);
        assert_eq!(result.payoff_months, 360);
        assert_eq!(result.schedule.len(), 360);
        assert_eq!(result.schedule.last().map(|r| r.ending_balance), Some(0.0));
    }

    #[test]
    fn zero_rate_splits_principal_evenly() {
        let result = amortize(&loan(12_000.0, 0.0, 12)).expect("valid loan");
        assert_approx_tol(result.monthly_payment, 1_000.0, 1e-9);
        assert_approx_tol(result.total_interest, 0.0, 1e-9);
        assert_eq!(result.payoff_months, 12);
    }

    #[test]
    fn extra_payment_shortens_payoff_and_clamps_final_row() {
        let mut input = loan(100_000.0, 5.0, 360);
        input.extra_payment = 200.0;
        let with_extra = amortize(&input).expect("valid loan");
        let base = amortize(&loan(100_000.0, 5.0, 360)).expect("valid loan");

        assert!(with_extra.payoff_months < base.payoff_months);
        assert!(with_extra.total_interest < base.total_interest);
        let last = with_extra.schedule.last().expect("rows");
        assert_eq!(last.ending_balance, 0.0);
        assert!(last.payment <= with_extra.monthly_payment + 200.0 + 1e-9);
    }

    #[test]
    fn rejects_invalid_loan_fields() {
        let err = amortize(&loan(0.0, 5.0, 360)).expect_err("zero principal");
        assert_eq!(err.field(), Some("principal"));
        let err = amortize(&loan(1_000.0, -1.0, 360)).expect_err("negative rate");
        assert_eq!(err.field(), Some("annualRatePct"));
        let err = amortize(&loan(1_000.0, 5.0, 0)).expect_err("zero term");
        assert_eq!(err.field(), Some("termMonths"));
    }

    #[test]
    fn terms_past_the_cap_are_rejected_before_scheduling() {
        let err = amortize(&loan(1_000.0, 0.0, 5_000_000)).expect_err("term too long");
        assert_eq!(err.field(), Some("termMonths"));
        let err = amortize(&loan(1_000.0, 0.0, u32::MAX)).expect_err("term too long");
        assert_eq!(err.field(), Some("termMonths"));

        let longest = amortize(&loan(1_000.0, 0.0, MAX_TERM_MONTHS)).expect("valid loan");
        assert_eq!(longest.schedule.len(), MAX_TERM_MONTHS as usize);

        let input = FixedPaymentInput {
            principal: 1_000.0,
            annual_rate_pct: 0.0,
            monthly_payment: 1.0,
            extra_payment: 0.0,
            max_periods: MAX_TERM_MONTHS + 1,
        };
        let err = amortize_with_payment(&input).expect_err("cap too long");
        assert_eq!(err.field(), Some("maxPeriods"));

        let mut refinance = sample_refinance();
        refinance.new_term_months = MAX_TERM_MONTHS + 1;
        let err = compare_refinance(&refinance).expect_err("term too long");
        assert_eq!(err.field(), Some("newTermMonths"));
    }

    #[test]
    fn payment_below_interest_is_non_amortizing() {
        let input = FixedPaymentInput {
            principal: 100_000.0,
            annual_rate_pct: 12.0,
            monthly_payment: 1_000.0,
            extra_payment: 0.0,
            max_periods: 600,
        };
        assert_eq!(
            amortize_with_payment(&input),
            Err(CalcError::NoSolution(NoSolution::NonAmortizing))
        );
    }

    #[test]
    fn slow_payment_hitting_the_cap_is_non_amortizing() {
        let input = FixedPaymentInput {
            principal: 100_000.0,
            annual_rate_pct: 12.0,
            monthly_payment: 1_001.0,
            extra_payment: 0.0,
            max_periods: 120,
        };
        assert_eq!(
            amortize_with_payment(&input),
            Err(CalcError::NoSolution(NoSolution::NonAmortizing))
        );
    }

    #[test]
    fn fixed_payment_schedule_pays_off() {
        let input = FixedPaymentInput {
            principal: 10_000.0,
            annual_rate_pct: 6.0,
            monthly_payment: 500.0,
            extra_payment: 0.0,
            max_periods: 120,
        };
        let result = amortize_with_payment(&input).expect("pays off");
        assert_eq!(result.payoff_months, 22);
        assert_approx_tol(result.monthly_payment, 500.0, 1e-12);
    }

    #[test]
    fn remaining_term_inverts_level_payment() {
        let payment = level_payment(150_000.0, monthly_rate(4.5), 240.0);
        let months = remaining_term_months(150_000.0, 4.5, payment).expect("amortizes");
        assert_approx_tol(months, 240.0, 1e-6);
    }

    #[test]
    fn remaining_term_rejects_interest_only_payment() {
        let interest_only = 200_000.0 * monthly_rate(6.0);
        assert_eq!(
            remaining_term_months(200_000.0, 6.0, interest_only),
            Err(CalcError::NoSolution(NoSolution::NonAmortizing))
        );
    }

    #[test]
    fn refinance_reports_break_even_from_savings() {
        let result = compare_refinance(&sample_refinance()).expect("valid refinance");
        assert_approx_tol(result.closing_costs, 5_000.0, 1e-9);
        assert_approx_tol(result.new_loan_amount, 200_000.0, 1e-9);
        assert_approx_tol(result.new_monthly_payment, 1_073.64, 0.01);
        let savings = 1_600.0 - result.new_monthly_payment;
        assert_approx_tol(result.monthly_savings, savings, 1e-9);
        assert_approx_tol(
            result.break_even_months.expect("recoups"),
            5_000.0 / savings,
            1e-9,
        );
    }

    #[test]
    fn financed_points_are_charged_on_the_final_loan_amount() {
        let mut input = sample_refinance();
        input.finance_closing_costs = true;
        input.cash_out = 10_000.0;
        let result = compare_refinance(&input).expect("valid refinance");
        let loan = result.new_loan_amount;
        assert_approx_tol(loan, 213_000.0 / 0.99, 1e-6);
        assert_approx_tol(result.closing_costs, loan * 0.01 + 3_000.0, 1e-6);
    }

    #[test]
    fn refinance_without_savings_never_recoups() {
        let mut input = sample_refinance();
        input.new_rate_pct = 9.0;
        let result = compare_refinance(&input).expect("valid refinance");
        assert!(result.monthly_savings <= 0.0);
        assert_eq!(result.break_even_months, None);
    }

    #[test]
    fn refinance_rejects_current_payment_below_interest() {
        let mut input = sample_refinance();
        input.current_monthly_payment = 1_000.0;
        assert_eq!(
            compare_refinance(&input),
            Err(CalcError::NoSolution(NoSolution::NonAmortizing))
        );
    }

    #[test]
    fn affordability_uses_tighter_ratio() {
        let input = AffordabilityInput {
            annual_income: 120_000.0,
            monthly_debts: 1_000.0,
            down_payment: 60_000.0,
            annual_rate_pct: 6.0,
            term_months: 360,
            annual_property_tax: 3_600.0,
            annual_insurance: 1_200.0,
            front_end_ratio_pct: 28.0,
            back_end_ratio_pct: 36.0,
        };
        let result = house_affordability(&input).expect("affordable");
        // front: 2,800; back: 3,600 - 1,000 = 2,600.
        assert_approx_tol(result.max_housing_payment, 2_600.0, 1e-9);
        assert_approx_tol(result.principal_and_interest, 2_200.0, 1e-9);
        let payment = level_payment(result.max_loan, monthly_rate(6.0), 360.0);
        assert_approx_tol(payment, 2_200.0, 1e-6);
        assert_approx_tol(result.max_home_price, result.max_loan + 60_000.0, 1e-9);
    }

    #[test]
    fn affordability_reports_insufficient_income() {
        let input = AffordabilityInput {
            annual_income: 30_000.0,
            monthly_debts: 900.0,
            down_payment: 0.0,
            annual_rate_pct: 6.0,
            term_months: 360,
            annual_property_tax: 2_400.0,
            annual_insurance: 1_200.0,
            front_end_ratio_pct: 28.0,
            back_end_ratio_pct: 36.0,
        };
        assert_eq!(
            house_affordability(&input),
            Err(CalcError::NoSolution(NoSolution::InsufficientIncome))
        );
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]

        #[test]
        fn prop_schedule_retires_exact_principal(
            principal in 1_000u32..2_000_000,
            rate_bp in 1u32..1_500,
            term in 12u32..420,
            extra in 0u32..2_000
        ) {
            let input = LoanInput {
                principal: principal as f64,
                annual_rate_pct: rate_bp as f64 / 100.0,
                term_months: term,
                extra_payment: extra as f64,
            };
            let result = amortize(&input).expect("valid loan amortizes");
            let retired: f64 = result.schedule.iter().map(|r| r.principal_portion).sum();
            prop_assert!((retired - input.principal).abs() <= 1e-6 * input.principal.max(1.0));
            prop_assert_eq!(result.schedule.last().map(|r| r.ending_balance), Some(0.0));
            prop_assert!(result.payoff_months <= term);
            for row in &result.schedule {
                prop_assert!(row.ending_balance >= 0.0);
                prop_assert!(row.interest_portion >= 0.0);
            }
        }

        #[test]
        fn prop_amortize_is_idempotent(
            principal in 1_000u32..500_000,
            rate_bp in 0u32..1_500,
            term in 1u32..360
        ) {
            let input = loan(principal as f64, rate_bp as f64 / 100.0, term);
            let first = amortize(&input).expect("valid loan");
            let second = amortize(&input).expect("valid loan");
            prop_assert_eq!(first, second);
        }
    }
}

use tracing::debug;

use super::types::{
    BenefitClaim, BreakEvenResult, ClaimingInput, ClaimingResult, PaymentScenario, ScenarioLabel,
    ScenarioTotal,
};
use super::validate::{finite, non_negative};
use crate::error::CalcError;

const MAX_CLAIM_AGE_YEARS: f64 = 120.0;

fn validate_scenario(
    amount_field: &'static str,
    upfront_field: &'static str,
    scenario: &PaymentScenario,
) -> Result<(), CalcError> {
    non_negative(amount_field, scenario.periodic_amount)?;
    non_negative(upfront_field, scenario.upfront_cost)?;
    Ok(())
}

/// Sum of a scenario's payments once `horizon` periods have elapsed.
pub fn total_at(scenario: &PaymentScenario, horizon: u32) -> ScenarioTotal {
    let elapsed = horizon.saturating_sub(scenario.start_period);
    let gross = scenario.periodic_amount * f64::from(elapsed);
    ScenarioTotal {
        gross,
        net_of_upfront: gross - scenario.upfront_cost,
    }
}

/// Period where the later (larger) stream's cumulative total catches the earlier one.
pub fn break_even(
    scenario_a: &PaymentScenario,
    scenario_b: &PaymentScenario,
    horizon_period: u32,
) -> Result<BreakEvenResult, CalcError> {
    validate_scenario("scenarioA.periodicAmount", "scenarioA.upfrontCost", scenario_a)?;
    validate_scenario("scenarioB.periodicAmount", "scenarioB.upfrontCost", scenario_b)?;

    let a_is_early = (scenario_a.start_period, scenario_a.periodic_amount)
        <= (scenario_b.start_period, scenario_b.periodic_amount);
    let (early_label, early, late) = if a_is_early {
        (ScenarioLabel::A, scenario_a, scenario_b)
    } else {
        (ScenarioLabel::B, scenario_b, scenario_a)
    };

    let break_even_period = if late.periodic_amount > early.periodic_amount {
        let late_start = f64::from(late.start_period);
        let banked = early.periodic_amount * f64::from(late.start_period - early.start_period)
            + late.upfront_cost
            - early.upfront_cost;
        let past_late_start = banked / (late.periodic_amount - early.periodic_amount);
        Some(late_start + past_late_start.max(0.0))
    } else {
        debug!(
            early = early.periodic_amount,
            late = late.periodic_amount,
            "later stream is not larger; no break-even"
        );
        None
    };

    Ok(BreakEvenResult {
        early: early_label,
        break_even_period,
        horizon_period,
        total_a: total_at(scenario_a, horizon_period),
        total_b: total_at(scenario_b, horizon_period),
    })
}

fn claim_months(field: &'static str, claim: &BenefitClaim) -> Result<u32, CalcError> {
    let age = non_negative(field, claim.claim_age_years)?;
    if age > MAX_CLAIM_AGE_YEARS {
        return Err(CalcError::invalid(
            field,
            format!("must be <= {MAX_CLAIM_AGE_YEARS}"),
        ));
    }
    Ok((age * 12.0).round() as u32)
}

/// Social-Security-style claiming comparison, with ages in years and monthly benefits.
pub fn claiming_age_break_even(input: &ClaimingInput) -> Result<ClaimingResult, CalcError> {
    let first_start = claim_months("first.claimAgeYears", &input.first)?;
    let second_start = claim_months("second.claimAgeYears", &input.second)?;
    let horizon = non_negative("horizonAgeYears", finite("horizonAgeYears", input.horizon_age_years)?)?;
    if horizon > MAX_CLAIM_AGE_YEARS {
        return Err(CalcError::invalid(
            "horizonAgeYears",
            format!("must be <= {MAX_CLAIM_AGE_YEARS}"),
        ));
    }
    let horizon_months = (horizon * 12.0).round() as u32;

    let first = PaymentScenario {
        start_period: first_start,
        periodic_amount: input.first.monthly_benefit,
        upfront_cost: 0.0,
    };
    let second = PaymentScenario {
        start_period: second_start,
        periodic_amount: input.second.monthly_benefit,
        upfront_cost: 0.0,
    };
    let result = break_even(&first, &second, horizon_months).map_err(|err| match err {
        CalcError::InvalidField { field, reason } => CalcError::InvalidField {
            field: if field.starts_with("scenarioA") {
                "first.monthlyBenefit"
            } else {
                "second.monthlyBenefit"
            },
            reason,
        },
        other => other,
    })?;

    Ok(ClaimingResult {
        earlier_claim: result.early,
        break_even_age_years: result.break_even_period.map(|months| months / 12.0),
        total_first_at_horizon: result.total_a.gross,
        total_second_at_horizon: result.total_b.gross,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::{prop_assert, prop_assume, proptest};

    const EPS: f64 = 1e-9;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn scenario(start: u32, amount: f64) -> PaymentScenario {
        PaymentScenario {
            start_period: start,
            periodic_amount: amount,
            upfront_cost: 0.0,
        }
    }

    #[test]
    fn crossover_follows_banked_amount_over_difference() {
        // Early: 1,000/month from month 0. Late: 1,500/month from month 36.
        let result = break_even(&scenario(0, 1_000.0), &scenario(36, 1_500.0), 240).expect("ok");
        assert_eq!(result.early, ScenarioLabel::A);
        // banked 36,000 / 500 = 72 months past the late start.
        assert_approx(result.break_even_period.expect("crossover"), 108.0);
        assert_approx(result.total_a.gross, 240_000.0);
        assert_approx(result.total_b.gross, 1_500.0 * 204.0);
    }

    #[test]
    fn early_scenario_is_identified_regardless_of_argument_order() {
        let result = break_even(&scenario(36, 1_500.0), &scenario(0, 1_000.0), 12).expect("ok");
        assert_eq!(result.early, ScenarioLabel::B);
        assert_approx(result.break_even_period.expect("crossover"), 108.0);
        assert_approx(result.total_a.gross, 0.0);
        assert_approx(result.total_b.gross, 12_000.0);
    }

    #[test]
    fn equal_amounts_have_no_break_even() {
        let result = break_even(&scenario(0, 1_000.0), &scenario(36, 1_000.0), 120).expect("ok");
        assert_eq!(result.break_even_period, None);
    }

    #[test]
    fn smaller_later_stream_has_no_break_even() {
        let result = break_even(&scenario(0, 1_000.0), &scenario(36, 900.0), 120).expect("ok");
        assert_eq!(result.break_even_period, None);
    }

    #[test]
    fn upfront_costs_shift_the_crossover() {
        let early = scenario(0, 100.0);
        let late = PaymentScenario {
            start_period: 0,
            periodic_amount: 150.0,
            upfront_cost: 1_000.0,
        };
        let result = break_even(&early, &late, 24).expect("ok");
        assert_approx(result.break_even_period.expect("crossover"), 20.0);
        assert_approx(result.total_b.net_of_upfront, 150.0 * 24.0 - 1_000.0);
    }

    #[test]
    fn rejects_negative_amounts() {
        let err = break_even(&scenario(0, -1.0), &scenario(12, 10.0), 24).expect_err("negative");
        assert_eq!(err.field(), Some("scenarioA.periodicAmount"));
    }

    #[test]
    fn claiming_at_62_versus_70() {
        let input = ClaimingInput {
            first: BenefitClaim {
                claim_age_years: 62.0,
                monthly_benefit: 1_400.0,
            },
            second: BenefitClaim {
                claim_age_years: 70.0,
                monthly_benefit: 2_480.0,
            },
            horizon_age_years: 90.0,
        };
        let result = claiming_age_break_even(&input).expect("ok");
        assert_eq!(result.earlier_claim, ScenarioLabel::A);
        // 96 months * 1,400 = 134,400 banked; 134,400 / 1,080 = 124.44 months.
        let expected_months = 840.0 + 134_400.0 / 1_080.0;
        assert_approx(
            result.break_even_age_years.expect("crossover"),
            expected_months / 12.0,
        );
        assert_approx(result.total_first_at_horizon, 1_400.0 * 336.0);
        assert_approx(result.total_second_at_horizon, 2_480.0 * 240.0);
    }

    #[test]
    fn claiming_rejects_implausible_ages() {
        let input = ClaimingInput {
            first: BenefitClaim {
                claim_age_years: 62.0,
                monthly_benefit: 1_000.0,
            },
            second: BenefitClaim {
                claim_age_years: 170.0,
                monthly_benefit: 2_000.0,
            },
            horizon_age_years: 90.0,
        };
        let err = claiming_age_break_even(&input).expect_err("bad age");
        assert_eq!(err.field(), Some("second.claimAgeYears"));
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]

        #[test]
        fn prop_cumulative_totals_meet_at_break_even(
            early_start in 0u32..400,
            gap in 1u32..200,
            early_amount in 1u32..5_000,
            extra in 1u32..5_000
        ) {
            let early = scenario(early_start, early_amount as f64);
            let late = scenario(early_start + gap, (early_amount + extra) as f64);
            let result = break_even(&early, &late, 0).expect("ok");
            let t = result.break_even_period.expect("late stream is larger");
            prop_assert!(t.is_finite());
            prop_assert!(t >= f64::from(late.start_period));
            let early_total = early.periodic_amount * (t - f64::from(early.start_period));
            let late_total = late.periodic_amount * (t - f64::from(late.start_period));
            prop_assert!((early_total - late_total).abs() <= 1e-6 * early_total.max(1.0));
        }

        #[test]
        fn prop_non_increasing_late_amount_is_undefined(
            early_amount in 1u32..5_000,
            cut in 0u32..1_000,
            gap in 0u32..200
        ) {
            prop_assume!(cut <= early_amount);
            let early = scenario(0, early_amount as f64);
            let late = scenario(gap, (early_amount - cut) as f64);
            let result = break_even(&early, &late, 100).expect("ok");
            prop_assert!(result.break_even_period.is_none());
        }
    }
}

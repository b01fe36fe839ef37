mod age;
mod amortization;
mod biological_age;
mod brackets;
mod breakeven;
mod growth;
mod notation;
mod number_base;
mod percentage;
mod ratio;
mod rmd;
mod types;
mod validate;

pub use age::{AgeBreakdown, age_on};
pub use amortization::{
    MAX_TERM_MONTHS, amortize, amortize_capped, amortize_with_payment, compare_refinance, house_affordability,
    level_payment, monthly_rate, principal_for_payment, remaining_term_months,
};
pub use biological_age::{
    BiologicalAgeEstimator, BiologicalAgeRequest, BiologicalAgeResponse, BiomarkerValue,
    EstimatorError, estimate_biological_age, missing_biomarkers_note,
};
pub use brackets::{
    ADDITIONAL_MEDICARE_RATE_PCT, ADDITIONAL_MEDICARE_THRESHOLD, Bracket, BracketLine,
    BracketTable, ESTATE_EXEMPTION_2024, ESTATE_TOP_RATE_PCT, EstateTaxInput, EstateTaxResult,
    MEDICARE_RATE_PCT, PaycheckInput, PaycheckResult, SOCIAL_SECURITY_RATE_PCT,
    SOCIAL_SECURITY_WAGE_BASE_2024, STANDARD_DEDUCTION_SINGLE_2024, TaxBreakdown, apply_brackets,
    estate_tax, flat_excess_tax, progressive_tax, take_home_pay,
};
pub use breakeven::{break_even, claiming_age_break_even, total_at};
pub use growth::{
    MAX_YEARS, MAX_YEARS_ENROLLED, annuity_payout, college_cost_projection, grow_future, per_period_rate,
    required_contribution,
};
pub use notation::{MAX_SIGNIFICANT_DIGITS, ScientificNotation, from_scientific, to_scientific};
pub use number_base::{BaseCalcInput, BaseCalcResult, BaseOperation, Radix, calculate, convert_base};
pub use percentage::{
    ChangeDirection, PercentageAnswer, PercentageChange, PercentageQuery, percentage_change,
    percentage_difference,
};
pub use ratio::{Proportion, ProportionQuery, SimplifiedRatio, simplify_ratio};
pub use rmd::{
    DistributionTables, JOINT_TABLE_MIN_GAP, JointLifeTable, MAX_PLAUSIBLE_AGE, TABLE_MAX_AGE,
    TableLoadError, UNIFORM_FIRST_AGE, UniformLifetimeTable, project_schedule, required_minimum_distribution,
};
pub use types::{
    AffordabilityInput, AffordabilityResult, AmortizationResult, AmortizationRow, AnnuityInput,
    AnnuityResult, BenefitClaim, BreakEvenResult, ClaimingInput, ClaimingResult,
    CollegeCostInput, CollegeCostResult, CollegeCostYear, CompoundingFrequency,
    DistributionTable, FixedPaymentInput, GrowthInput, GrowthResult, GrowthYearRow, LoanInput,
    PaymentScenario, RefinanceInput, RefinanceResult, RmdInput, RmdProjectionRow, RmdResult,
    SavingsGoalInput, SavingsGoalResult, ScenarioLabel, ScenarioTotal,
};

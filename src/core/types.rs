use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoanInput {
    pub principal: f64,
    pub annual_rate_pct: f64,
    pub term_months: u32,
    pub extra_payment: f64,
}

/// A loan paid down by a caller-chosen payment instead of the level payment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedPaymentInput {
    pub principal: f64,
    pub annual_rate_pct: f64,
    pub monthly_payment: f64,
    pub extra_payment: f64,
    pub max_periods: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AmortizationRow {
    pub period: u32,
    pub payment: f64,
    pub principal_portion: f64,
    pub interest_portion: f64,
    pub ending_balance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AmortizationResult {
    pub monthly_payment: f64,
    pub schedule: Vec<AmortizationRow>,
    pub total_interest: f64,
    pub total_paid: f64,
    pub payoff_months: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RefinanceInput {
    pub current_balance: f64,
    pub current_rate_pct: f64,
    pub current_monthly_payment: f64,
    pub new_rate_pct: f64,
    pub new_term_months: u32,
    pub cash_out: f64,
    pub points_pct: f64,
    pub fixed_fees: f64,
    pub finance_closing_costs: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefinanceResult {
    pub current_remaining_months: f64,
    pub current_remaining_interest: f64,
    pub new_loan_amount: f64,
    pub closing_costs: f64,
    pub new_monthly_payment: f64,
    pub new_total_interest: f64,
    pub monthly_savings: f64,
    /// `None` when the new payment is not lower: closing costs are never recouped.
    pub break_even_months: Option<f64>,
    pub lifetime_savings: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffordabilityInput {
    pub annual_income: f64,
    pub monthly_debts: f64,
    pub down_payment: f64,
    pub annual_rate_pct: f64,
    pub term_months: u32,
    pub annual_property_tax: f64,
    pub annual_insurance: f64,
    pub front_end_ratio_pct: f64,
    pub back_end_ratio_pct: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AffordabilityResult {
    pub max_housing_payment: f64,
    pub monthly_tax_and_insurance: f64,
    pub principal_and_interest: f64,
    pub max_loan: f64,
    pub max_home_price: f64,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CompoundingFrequency {
    Annually,
    SemiAnnually,
    Quarterly,
    Monthly,
    Daily,
}

impl CompoundingFrequency {
    pub fn periods_per_year(self) -> u32 {
        match self {
            Self::Annually => 1,
            Self::SemiAnnually => 2,
            Self::Quarterly => 4,
            Self::Monthly => 12,
            Self::Daily => 365,
        }
    }
}

impl TryFrom<u32> for CompoundingFrequency {
    type Error = u32;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Annually),
            2 => Ok(Self::SemiAnnually),
            4 => Ok(Self::Quarterly),
            12 => Ok(Self::Monthly),
            365 => Ok(Self::Daily),
            other => Err(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrowthInput {
    pub present_value: f64,
    pub annual_rate_pct: f64,
    pub frequency: CompoundingFrequency,
    pub years: f64,
    pub contribution_per_period: f64,
    pub tax_rate_pct: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GrowthYearRow {
    pub year: u32,
    pub contributions: f64,
    pub interest: f64,
    pub ending_balance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GrowthResult {
    pub ending_balance: f64,
    pub total_contributions: f64,
    pub total_growth: f64,
    pub schedule: Vec<GrowthYearRow>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SavingsGoalInput {
    pub target_balance: f64,
    pub present_value: f64,
    pub annual_rate_pct: f64,
    pub frequency: CompoundingFrequency,
    pub years: f64,
    pub tax_rate_pct: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavingsGoalResult {
    pub contribution_per_period: f64,
    pub periods: f64,
    pub projected_present_value: f64,
    pub shortfall: f64,
    pub total_contributions: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnnuityInput {
    pub balance: f64,
    pub annual_rate_pct: f64,
    pub frequency: CompoundingFrequency,
    pub years: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnuityResult {
    pub payment_per_period: f64,
    pub periods: f64,
    pub total_paid: f64,
    pub total_interest: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollegeCostInput {
    pub current_annual_cost: f64,
    pub cost_inflation_pct: f64,
    pub years_until_enrollment: u32,
    pub years_enrolled: u32,
    pub current_savings: f64,
    pub annual_return_pct: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollegeCostYear {
    pub years_from_now: u32,
    pub annual_cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollegeCostResult {
    pub yearly_costs: Vec<CollegeCostYear>,
    pub total_future_cost: f64,
    pub projected_savings: f64,
    pub shortfall: f64,
    /// `None` when enrolment starts now and there is no time left to save.
    pub monthly_contribution: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RmdInput {
    pub owner_age: u32,
    pub balance: f64,
    pub spouse_age: Option<u32>,
    pub spouse_is_sole_beneficiary: bool,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DistributionTable {
    UniformLifetime,
    JointLife,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RmdResult {
    pub table: DistributionTable,
    pub divisor: f64,
    /// True when the divisor came from the modelled joint table rather than published data.
    pub modelled_divisor: bool,
    pub rmd: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RmdProjectionRow {
    pub year: u32,
    pub owner_age: u32,
    pub spouse_age: Option<u32>,
    pub table: DistributionTable,
    pub divisor: f64,
    pub modelled_divisor: bool,
    pub starting_balance: f64,
    pub rmd: f64,
    pub growth: f64,
    pub ending_balance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaymentScenario {
    pub start_period: u32,
    pub periodic_amount: f64,
    pub upfront_cost: f64,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScenarioLabel {
    A,
    B,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioTotal {
    pub gross: f64,
    pub net_of_upfront: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakEvenResult {
    pub early: ScenarioLabel,
    /// `None` when the later stream is not larger: there is no crossover.
    pub break_even_period: Option<f64>,
    pub horizon_period: u32,
    pub total_a: ScenarioTotal,
    pub total_b: ScenarioTotal,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BenefitClaim {
    pub claim_age_years: f64,
    pub monthly_benefit: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClaimingInput {
    pub first: BenefitClaim,
    pub second: BenefitClaim,
    pub horizon_age_years: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimingResult {
    pub earlier_claim: ScenarioLabel,
    pub break_even_age_years: Option<f64>,
    pub total_first_at_horizon: f64,
    pub total_second_at_horizon: f64,
}

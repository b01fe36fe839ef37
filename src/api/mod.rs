use axum::{
    Router,
    extract::{Json, State, rejection::JsonRejection},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::config::LimitsConfig;
use crate::core::{
    AffordabilityInput, AnnuityInput, BaseCalcInput, BaseOperation, BenefitClaim,
    BiologicalAgeEstimator, BiologicalAgeRequest, Bracket, BracketTable, ClaimingInput,
    CollegeCostInput, CompoundingFrequency, DistributionTables, EstateTaxInput, EstimatorError,
    FixedPaymentInput, GrowthInput, LoanInput, MAX_TERM_MONTHS, PaycheckInput, PaymentScenario, PercentageQuery,
    ProportionQuery, Radix, RefinanceInput, RmdInput, STANDARD_DEDUCTION_SINGLE_2024,
    SavingsGoalInput, age_on, amortize_capped, amortize_with_payment, annuity_payout, break_even,
    calculate, claiming_age_break_even, college_cost_projection, compare_refinance, convert_base,
    estate_tax, estimate_biological_age, from_scientific, grow_future, house_affordability,
    percentage_change, percentage_difference, progressive_tax, project_schedule,
    required_contribution, required_minimum_distribution, simplify_ratio, take_home_pay,
    to_scientific,
};
use crate::error::CalcError;

const DEFAULT_PERIODS_PER_YEAR: u32 = 12;
const DEFAULT_PAYOFF_CAP_MONTHS: u32 = MAX_TERM_MONTHS;
const DEFAULT_FRONT_END_RATIO_PCT: f64 = 28.0;
const DEFAULT_BACK_END_RATIO_PCT: f64 = 36.0;
const DEFAULT_MORTGAGE_TERM_MONTHS: u32 = 360;
const DEFAULT_YEARS_ENROLLED: u32 = 4;
const DEFAULT_PAY_PERIODS: u32 = 26;
const DEFAULT_CLAIM_HORIZON_AGE: f64 = 90.0;
const DEFAULT_SIGNIFICANT_DIGITS: u32 = 3;

/// Shared, read-only state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub tables: Arc<DistributionTables>,
    pub limits: LimitsConfig,
    pub estimator: Option<Arc<dyn BiologicalAgeEstimator>>,
}

impl AppState {
    pub fn new(tables: DistributionTables, limits: LimitsConfig) -> Self {
        Self {
            tables: Arc::new(tables),
            limits,
            estimator: None,
        }
    }

    pub fn with_estimator(mut self, estimator: Arc<dyn BiologicalAgeEstimator>) -> Self {
        self.estimator = Some(estimator);
        self
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(DistributionTables::builtin().clone(), LimitsConfig::default())
    }
}

type JsonPayload<T> = Result<Json<T>, JsonRejection>;

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn required<T>(field: &'static str, value: Option<T>) -> Result<T, CalcError> {
    value.ok_or_else(|| CalcError::invalid(field, "is required"))
}

fn frequency(field: &'static str, periods: Option<u32>) -> Result<CompoundingFrequency, CalcError> {
    CompoundingFrequency::try_from(periods.unwrap_or(DEFAULT_PERIODS_PER_YEAR))
        .map_err(|got| CalcError::invalid(field, format!("must be 1, 2, 4, 12 or 365, got {got}")))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct LoanPayload {
    principal: Option<f64>,
    annual_rate_pct: Option<f64>,
    term_months: Option<u32>,
    extra_payment: Option<f64>,
}

impl LoanPayload {
    fn into_input(self) -> Result<LoanInput, CalcError> {
        Ok(LoanInput {
            principal: required("principal", self.principal)?,
            annual_rate_pct: required("annualRatePct", self.annual_rate_pct)?,
            term_months: required("termMonths", self.term_months)?,
            extra_payment: self.extra_payment.unwrap_or(0.0),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct PayoffPayload {
    principal: Option<f64>,
    annual_rate_pct: Option<f64>,
    monthly_payment: Option<f64>,
    extra_payment: Option<f64>,
    max_periods: Option<u32>,
}

impl PayoffPayload {
    fn into_input(self) -> Result<FixedPaymentInput, CalcError> {
        Ok(FixedPaymentInput {
            principal: required("principal", self.principal)?,
            annual_rate_pct: required("annualRatePct", self.annual_rate_pct)?,
            monthly_payment: required("monthlyPayment", self.monthly_payment)?,
            extra_payment: self.extra_payment.unwrap_or(0.0),
            max_periods: self.max_periods.unwrap_or(DEFAULT_PAYOFF_CAP_MONTHS),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RefinancePayload {
    current_balance: Option<f64>,
    current_rate_pct: Option<f64>,
    current_monthly_payment: Option<f64>,
    new_rate_pct: Option<f64>,
    new_term_months: Option<u32>,
    cash_out: Option<f64>,
    points_pct: Option<f64>,
    fixed_fees: Option<f64>,
    finance_closing_costs: Option<bool>,
}

impl RefinancePayload {
    fn into_input(self) -> Result<RefinanceInput, CalcError> {
        Ok(RefinanceInput {
            current_balance: required("currentBalance", self.current_balance)?,
            current_rate_pct: required("currentRatePct", self.current_rate_pct)?,
            current_monthly_payment: required(
                "currentMonthlyPayment",
                self.current_monthly_payment,
            )?,
            new_rate_pct: required("newRatePct", self.new_rate_pct)?,
            new_term_months: required("newTermMonths", self.new_term_months)?,
            cash_out: self.cash_out.unwrap_or(0.0),
            points_pct: self.points_pct.unwrap_or(0.0),
            fixed_fees: self.fixed_fees.unwrap_or(0.0),
            finance_closing_costs: self.finance_closing_costs.unwrap_or(false),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct AffordabilityPayload {
    annual_income: Option<f64>,
    monthly_debts: Option<f64>,
    down_payment: Option<f64>,
    annual_rate_pct: Option<f64>,
    term_months: Option<u32>,
    annual_property_tax: Option<f64>,
    annual_insurance: Option<f64>,
    front_end_ratio_pct: Option<f64>,
    back_end_ratio_pct: Option<f64>,
}

impl AffordabilityPayload {
    fn into_input(self) -> Result<AffordabilityInput, CalcError> {
        Ok(AffordabilityInput {
            annual_income: required("annualIncome", self.annual_income)?,
            monthly_debts: self.monthly_debts.unwrap_or(0.0),
            down_payment: self.down_payment.unwrap_or(0.0),
            annual_rate_pct: required("annualRatePct", self.annual_rate_pct)?,
            term_months: self.term_months.unwrap_or(DEFAULT_MORTGAGE_TERM_MONTHS),
            annual_property_tax: self.annual_property_tax.unwrap_or(0.0),
            annual_insurance: self.annual_insurance.unwrap_or(0.0),
            front_end_ratio_pct: self
                .front_end_ratio_pct
                .unwrap_or(DEFAULT_FRONT_END_RATIO_PCT),
            back_end_ratio_pct: self.back_end_ratio_pct.unwrap_or(DEFAULT_BACK_END_RATIO_PCT),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct GrowthPayload {
    present_value: Option<f64>,
    annual_rate_pct: Option<f64>,
    compounding_periods_per_year: Option<u32>,
    years: Option<f64>,
    contribution_per_period: Option<f64>,
    tax_rate_pct: Option<f64>,
}

impl GrowthPayload {
    fn into_input(self) -> Result<GrowthInput, CalcError> {
        Ok(GrowthInput {
            present_value: self.present_value.unwrap_or(0.0),
            annual_rate_pct: required("annualRatePct", self.annual_rate_pct)?,
            frequency: frequency(
                "compoundingPeriodsPerYear",
                self.compounding_periods_per_year,
            )?,
            years: required("years", self.years)?,
            contribution_per_period: self.contribution_per_period.unwrap_or(0.0),
            tax_rate_pct: self.tax_rate_pct.unwrap_or(0.0),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SavingsGoalPayload {
    target_balance: Option<f64>,
    present_value: Option<f64>,
    annual_rate_pct: Option<f64>,
    compounding_periods_per_year: Option<u32>,
    years: Option<f64>,
    tax_rate_pct: Option<f64>,
}

impl SavingsGoalPayload {
    fn into_input(self) -> Result<SavingsGoalInput, CalcError> {
        Ok(SavingsGoalInput {
            target_balance: required("targetBalance", self.target_balance)?,
            present_value: self.present_value.unwrap_or(0.0),
            annual_rate_pct: required("annualRatePct", self.annual_rate_pct)?,
            frequency: frequency(
                "compoundingPeriodsPerYear",
                self.compounding_periods_per_year,
            )?,
            years: required("years", self.years)?,
            tax_rate_pct: self.tax_rate_pct.unwrap_or(0.0),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct AnnuityPayload {
    balance: Option<f64>,
    annual_rate_pct: Option<f64>,
    compounding_periods_per_year: Option<u32>,
    years: Option<f64>,
}

impl AnnuityPayload {
    fn into_input(self) -> Result<AnnuityInput, CalcError> {
        Ok(AnnuityInput {
            balance: required("balance", self.balance)?,
            annual_rate_pct: required("annualRatePct", self.annual_rate_pct)?,
            frequency: frequency(
                "compoundingPeriodsPerYear",
                self.compounding_periods_per_year,
            )?,
            years: required("years", self.years)?,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct CollegeCostPayload {
    current_annual_cost: Option<f64>,
    cost_inflation_pct: Option<f64>,
    years_until_enrollment: Option<u32>,
    years_enrolled: Option<u32>,
    current_savings: Option<f64>,
    annual_return_pct: Option<f64>,
}

impl CollegeCostPayload {
    fn into_input(self) -> Result<CollegeCostInput, CalcError> {
        Ok(CollegeCostInput {
            current_annual_cost: required("currentAnnualCost", self.current_annual_cost)?,
            cost_inflation_pct: required("costInflationPct", self.cost_inflation_pct)?,
            years_until_enrollment: required("yearsUntilEnrollment", self.years_until_enrollment)?,
            years_enrolled: self.years_enrolled.unwrap_or(DEFAULT_YEARS_ENROLLED),
            current_savings: self.current_savings.unwrap_or(0.0),
            annual_return_pct: required("annualReturnPct", self.annual_return_pct)?,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RmdPayload {
    owner_age: Option<u32>,
    account_balance: Option<f64>,
    spouse_age: Option<u32>,
    spouse_is_sole_beneficiary: Option<bool>,
    growth_rate_pct: Option<f64>,
}

impl RmdPayload {
    fn input(&self) -> Result<RmdInput, CalcError> {
        Ok(RmdInput {
            owner_age: required("ownerAge", self.owner_age)?,
            balance: required("accountBalance", self.account_balance)?,
            spouse_age: self.spouse_age,
            spouse_is_sole_beneficiary: self.spouse_is_sole_beneficiary.unwrap_or(false),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ScenarioPayload {
    start_period: Option<u32>,
    periodic_amount: Option<f64>,
    upfront_cost: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct BreakEvenPayload {
    scenario_a: Option<ScenarioPayload>,
    scenario_b: Option<ScenarioPayload>,
    horizon_period: Option<u32>,
}

impl BreakEvenPayload {
    fn into_scenarios(self) -> Result<(PaymentScenario, PaymentScenario, u32), CalcError> {
        let a = required("scenarioA", self.scenario_a)?;
        let b = required("scenarioB", self.scenario_b)?;
        let scenario_a = PaymentScenario {
            start_period: required("scenarioA.startPeriod", a.start_period)?,
            periodic_amount: required("scenarioA.periodicAmount", a.periodic_amount)?,
            upfront_cost: a.upfront_cost.unwrap_or(0.0),
        };
        let scenario_b = PaymentScenario {
            start_period: required("scenarioB.startPeriod", b.start_period)?,
            periodic_amount: required("scenarioB.periodicAmount", b.periodic_amount)?,
            upfront_cost: b.upfront_cost.unwrap_or(0.0),
        };
        Ok((
            scenario_a,
            scenario_b,
            required("horizonPeriod", self.horizon_period)?,
        ))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ClaimPayload {
    claim_age_years: Option<f64>,
    monthly_benefit: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ClaimingPayload {
    first: Option<ClaimPayload>,
    second: Option<ClaimPayload>,
    horizon_age_years: Option<f64>,
}

impl ClaimingPayload {
    fn into_input(self) -> Result<ClaimingInput, CalcError> {
        let first = required("first", self.first)?;
        let second = required("second", self.second)?;
        Ok(ClaimingInput {
            first: BenefitClaim {
                claim_age_years: required("first.claimAgeYears", first.claim_age_years)?,
                monthly_benefit: required("first.monthlyBenefit", first.monthly_benefit)?,
            },
            second: BenefitClaim {
                claim_age_years: required("second.claimAgeYears", second.claim_age_years)?,
                monthly_benefit: required("second.monthlyBenefit", second.monthly_benefit)?,
            },
            horizon_age_years: self.horizon_age_years.unwrap_or(DEFAULT_CLAIM_HORIZON_AGE),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct EstateTaxPayload {
    gross_estate: Option<f64>,
    debts_and_expenses: Option<f64>,
    charitable_deductions: Option<f64>,
    lifetime_gifts: Option<f64>,
    exemption: Option<f64>,
    rate_pct: Option<f64>,
}

impl EstateTaxPayload {
    fn into_input(self) -> Result<EstateTaxInput, CalcError> {
        let defaults = EstateTaxInput::default();
        Ok(EstateTaxInput {
            gross_estate: required("grossEstate", self.gross_estate)?,
            debts_and_expenses: self.debts_and_expenses.unwrap_or(0.0),
            charitable_deductions: self.charitable_deductions.unwrap_or(0.0),
            lifetime_gifts: self.lifetime_gifts.unwrap_or(0.0),
            exemption: self.exemption.unwrap_or(defaults.exemption),
            rate_pct: self.rate_pct.unwrap_or(defaults.rate_pct),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ProgressiveTaxPayload {
    taxable_amount: Option<f64>,
    brackets: Option<Vec<Bracket>>,
}

fn bracket_table(brackets: Option<Vec<Bracket>>) -> Result<BracketTable, CalcError> {
    match brackets {
        Some(brackets) => BracketTable::new(brackets),
        None => Ok(BracketTable::federal_single_2024()),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct TakeHomePayload {
    gross_annual: Option<f64>,
    pre_tax_deductions: Option<f64>,
    pay_periods_per_year: Option<u32>,
    state_rate_pct: Option<f64>,
    standard_deduction: Option<f64>,
    brackets: Option<Vec<Bracket>>,
}

impl TakeHomePayload {
    fn into_input(self) -> Result<(PaycheckInput, BracketTable), CalcError> {
        let input = PaycheckInput {
            gross_annual: required("grossAnnual", self.gross_annual)?,
            pre_tax_deductions: self.pre_tax_deductions.unwrap_or(0.0),
            pay_periods_per_year: self.pay_periods_per_year.unwrap_or(DEFAULT_PAY_PERIODS),
            state_rate_pct: self.state_rate_pct.unwrap_or(0.0),
            standard_deduction: self
                .standard_deduction
                .unwrap_or(STANDARD_DEDUCTION_SINGLE_2024),
        };
        Ok((input, bracket_table(self.brackets)?))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct PercentagePayload {
    percentage: Option<f64>,
    base: Option<f64>,
    result: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct PercentageChangePayload {
    original: Option<f64>,
    new: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct PairPayload {
    a: Option<f64>,
    b: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BaseCalcPayload {
    lhs: String,
    rhs: String,
    operation: BaseOperation,
    #[serde(default = "default_radix")]
    radix: Radix,
    #[serde(default)]
    output_radix: Option<Radix>,
}

fn default_radix() -> Radix {
    Radix::Decimal
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BaseConvertPayload {
    value: String,
    from: Radix,
    to: Radix,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ScientificPayload {
    value: Option<f64>,
    significant_digits: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ExpandPayload {
    coefficient: Option<f64>,
    exponent: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ProportionPayload {
    a: Option<f64>,
    b: Option<f64>,
    c: Option<f64>,
    d: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct AgePayload {
    birth_date: Option<NaiveDate>,
    as_of: Option<NaiveDate>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/amortize", post(amortize_handler))
        .route("/api/payoff", post(payoff_handler))
        .route("/api/refinance", post(refinance_handler))
        .route("/api/affordability", post(affordability_handler))
        .route("/api/growth", post(growth_handler))
        .route("/api/savings-goal", post(savings_goal_handler))
        .route("/api/annuity", post(annuity_handler))
        .route("/api/college-cost", post(college_cost_handler))
        .route("/api/rmd", post(rmd_handler))
        .route("/api/rmd/schedule", post(rmd_schedule_handler))
        .route("/api/break-even", post(break_even_handler))
        .route("/api/social-security", post(social_security_handler))
        .route("/api/tax/estate", post(estate_tax_handler))
        .route("/api/tax/progressive", post(progressive_tax_handler))
        .route("/api/take-home-pay", post(take_home_pay_handler))
        .route("/api/percentage", post(percentage_handler))
        .route("/api/percentage-change", post(percentage_change_handler))
        .route("/api/percentage-difference", post(percentage_difference_handler))
        .route("/api/base", post(base_handler))
        .route("/api/base/convert", post(base_convert_handler))
        .route("/api/scientific", post(scientific_handler))
        .route("/api/scientific/expand", post(expand_handler))
        .route("/api/ratio", post(ratio_handler))
        .route("/api/proportion", post(proportion_handler))
        .route("/api/age", post(age_handler))
        .route("/api/biological-age", post(biological_age_handler))
        .fallback(not_found_handler)
        .with_state(state)
}

pub async fn run_http_server(addr: SocketAddr, state: AppState) -> std::io::Result<()> {
    let app = router(state);
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "fincalc HTTP API listening");
    axum::serve(listener, app).await
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

/// Unwraps the JSON body, runs a pure calculation, and renders the result or error.
fn respond<P, T>(
    payload: JsonPayload<P>,
    calculation: impl FnOnce(P) -> Result<T, CalcError>,
) -> Response
where
    T: Serialize,
{
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return error_response(StatusCode::BAD_REQUEST, &rejection.body_text()),
    };
    match calculation(payload) {
        Ok(body) => json_response(StatusCode::OK, body),
        Err(err) => with_cache_control(err),
    }
}

async fn amortize_handler(
    State(state): State<AppState>,
    payload: JsonPayload<LoanPayload>,
) -> Response {
    respond(payload, |p| {
        amortize_capped(&p.into_input()?, state.limits.schedule_multiplier)
    })
}

async fn payoff_handler(payload: JsonPayload<PayoffPayload>) -> Response {
    respond(payload, |p| amortize_with_payment(&p.into_input()?))
}

async fn refinance_handler(payload: JsonPayload<RefinancePayload>) -> Response {
    respond(payload, |p| compare_refinance(&p.into_input()?))
}

async fn affordability_handler(payload: JsonPayload<AffordabilityPayload>) -> Response {
    respond(payload, |p| house_affordability(&p.into_input()?))
}

async fn growth_handler(payload: JsonPayload<GrowthPayload>) -> Response {
    respond(payload, |p| grow_future(&p.into_input()?))
}

async fn savings_goal_handler(payload: JsonPayload<SavingsGoalPayload>) -> Response {
    respond(payload, |p| required_contribution(&p.into_input()?))
}

async fn annuity_handler(payload: JsonPayload<AnnuityPayload>) -> Response {
    respond(payload, |p| annuity_payout(&p.into_input()?))
}

async fn college_cost_handler(payload: JsonPayload<CollegeCostPayload>) -> Response {
    respond(payload, |p| college_cost_projection(&p.into_input()?))
}

async fn rmd_handler(State(state): State<AppState>, payload: JsonPayload<RmdPayload>) -> Response {
    respond(payload, |p| {
        required_minimum_distribution(&state.tables, &p.input()?)
    })
}

async fn rmd_schedule_handler(
    State(state): State<AppState>,
    payload: JsonPayload<RmdPayload>,
) -> Response {
    respond(payload, |p| {
        let schedule =
            project_schedule(&state.tables, &p.input()?, p.growth_rate_pct.unwrap_or(0.0))?;
        Ok(json!({ "schedule": schedule }))
    })
}

async fn break_even_handler(payload: JsonPayload<BreakEvenPayload>) -> Response {
    respond(payload, |p| {
        let (a, b, horizon) = p.into_scenarios()?;
        break_even(&a, &b, horizon)
    })
}

async fn social_security_handler(payload: JsonPayload<ClaimingPayload>) -> Response {
    respond(payload, |p| claiming_age_break_even(&p.into_input()?))
}

async fn estate_tax_handler(payload: JsonPayload<EstateTaxPayload>) -> Response {
    respond(payload, |p| estate_tax(&p.into_input()?))
}

async fn progressive_tax_handler(payload: JsonPayload<ProgressiveTaxPayload>) -> Response {
    respond(payload, |p| {
        let amount = required("taxableAmount", p.taxable_amount)?;
        progressive_tax(amount, &bracket_table(p.brackets)?)
    })
}

async fn take_home_pay_handler(payload: JsonPayload<TakeHomePayload>) -> Response {
    respond(payload, |p| {
        let (input, table) = p.into_input()?;
        take_home_pay(&input, &table)
    })
}

async fn percentage_handler(payload: JsonPayload<PercentagePayload>) -> Response {
    respond(payload, |p| {
        PercentageQuery::from_fields(p.percentage, p.base, p.result)?.solve()
    })
}

async fn percentage_change_handler(payload: JsonPayload<PercentageChangePayload>) -> Response {
    respond(payload, |p| {
        percentage_change(
            required("original", p.original)?,
            required("new", p.new)?,
        )
    })
}

async fn percentage_difference_handler(payload: JsonPayload<PairPayload>) -> Response {
    respond(payload, |p| {
        let difference = percentage_difference(required("a", p.a)?, required("b", p.b)?)?;
        Ok(json!({ "percentDifference": difference }))
    })
}

async fn base_handler(payload: JsonPayload<BaseCalcPayload>) -> Response {
    respond(payload, |p| {
        calculate(&BaseCalcInput {
            lhs: p.lhs,
            rhs: p.rhs,
            operation: p.operation,
            radix: p.radix,
            output_radix: p.output_radix,
        })
    })
}

async fn base_convert_handler(payload: JsonPayload<BaseConvertPayload>) -> Response {
    respond(payload, |p| {
        let value = convert_base(&p.value, p.from, p.to)?;
        Ok(json!({ "value": value }))
    })
}

async fn scientific_handler(payload: JsonPayload<ScientificPayload>) -> Response {
    respond(payload, |p| {
        to_scientific(
            required("value", p.value)?,
            p.significant_digits.unwrap_or(DEFAULT_SIGNIFICANT_DIGITS),
        )
    })
}

async fn expand_handler(payload: JsonPayload<ExpandPayload>) -> Response {
    respond(payload, |p| {
        let value = from_scientific(
            required("coefficient", p.coefficient)?,
            required("exponent", p.exponent)?,
        )?;
        Ok(json!({ "value": value }))
    })
}

async fn ratio_handler(payload: JsonPayload<PairPayload>) -> Response {
    respond(payload, |p| simplify_ratio(required("a", p.a)?, required("b", p.b)?))
}

async fn proportion_handler(payload: JsonPayload<ProportionPayload>) -> Response {
    respond(payload, |p| {
        ProportionQuery::from_terms(p.a, p.b, p.c, p.d)?.solve()
    })
}

async fn age_handler(payload: JsonPayload<AgePayload>) -> Response {
    respond(payload, |p| {
        age_on(
            required("birthDate", p.birth_date)?,
            required("asOf", p.as_of)?,
        )
    })
}

async fn biological_age_handler(
    State(state): State<AppState>,
    payload: JsonPayload<BiologicalAgeRequest>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return error_response(StatusCode::BAD_REQUEST, &rejection.body_text()),
    };
    let Some(estimator) = state.estimator.as_deref() else {
        return error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            &EstimatorError::Unavailable.to_string(),
        );
    };

    match estimate_biological_age(estimator, &request).await {
        Ok(response) => json_response(StatusCode::OK, response),
        Err(EstimatorError::Invalid(err)) => with_cache_control(err),
        Err(err @ EstimatorError::Unavailable) => {
            error_response(StatusCode::SERVICE_UNAVAILABLE, &err.to_string())
        }
        Err(err) => {
            warn!(error = %err, "biological age estimator failed");
            error_response(StatusCode::BAD_GATEWAY, &err.to_string())
        }
    }
}

fn with_cache_control<R: IntoResponse>(response: R) -> Response {
    let mut response = response.into_response();
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    with_cache_control((status, Json(body)))
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{BiologicalAgeResponse, EstimatorError};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;

    const EPS: f64 = 1e-6;

    fn assert_approx_tol(actual: f64, expected: f64, tol: f64) {
        assert!(
            (actual - expected).abs() <= tol,
            "expected {expected}, got {actual}, tolerance {tol}"
        );
    }

    fn assert_approx(actual: f64, expected: f64) {
        assert_approx_tol(actual, expected, EPS);
    }

    struct StubEstimator;

    #[async_trait]
    impl BiologicalAgeEstimator for StubEstimator {
        async fn estimate(
            &self,
            request: &BiologicalAgeRequest,
        ) -> Result<BiologicalAgeResponse, EstimatorError> {
            Ok(BiologicalAgeResponse {
                estimated_age: 38.0,
                insights: vec![format!("{} biomarkers considered", request.provided().len())],
                missing_biomarkers_note: None,
            })
        }
    }

    async fn post_json(state: AppState, uri: &str, body: &str) -> (StatusCode, Option<String>, Value) {
        let response = router(state)
            .oneshot(
                Request::post(uri)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .expect("request"),
            )
            .await
            .expect("route executes");
        let status = response.status();
        let cache_control = response
            .headers()
            .get(header::CACHE_CONTROL)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("body");
        let json = serde_json::from_slice(&bytes).expect("json body");
        (status, cache_control, json)
    }

    #[test]
    fn loan_payload_parses_camel_case_keys() {
        let payload: LoanPayload = serde_json::from_str(
            r#"{"principal": 250000, "annualRatePct": 6, "termMonths": 360}"#,
        )
        .expect("json should parse");
        let input = payload.into_input().expect("complete payload");
        assert_approx(input.principal, 250_000.0);
        assert_approx(input.annual_rate_pct, 6.0);
        assert_eq!(input.term_months, 360);
        assert_approx(input.extra_payment, 0.0);
    }

    #[test]
    fn missing_required_field_names_the_field() {
        let payload: GrowthPayload =
            serde_json::from_str(r#"{"presentValue": 100}"#).expect("json should parse");
        let err = payload.into_input().expect_err("rate missing");
        assert_eq!(err.field(), Some("annualRatePct"));
    }

    #[test]
    fn unsupported_compounding_frequency_is_rejected() {
        let payload: GrowthPayload = serde_json::from_str(
            r#"{"annualRatePct": 5, "years": 3, "compoundingPeriodsPerYear": 3}"#,
        )
        .expect("json should parse");
        let err = payload.into_input().expect_err("frequency");
        assert_eq!(err.field(), Some("compoundingPeriodsPerYear"));
    }

    #[test]
    fn affordability_payload_applies_default_ratios() {
        let payload: AffordabilityPayload =
            serde_json::from_str(r#"{"annualIncome": 120000, "annualRatePct": 6.5}"#)
                .expect("json should parse");
        let input = payload.into_input().expect("complete payload");
        assert_approx(input.front_end_ratio_pct, 28.0);
        assert_approx(input.back_end_ratio_pct, 36.0);
        assert_eq!(input.term_months, 360);
    }

    #[tokio::test]
    async fn amortize_route_returns_schedule_summary() {
        let (status, cache_control, body) = post_json(
            AppState::default(),
            "/api/amortize",
            r#"{"principal": 250000, "annualRatePct": 6, "termMonths": 360}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(cache_control.as_deref(), Some("no-store"));
        assert_approx_tol(body["monthlyPayment"].as_f64().expect("payment"), 1_498.88, 0.01);
        assert_approx_tol(body["totalInterest"].as_f64().expect("interest"), 289_595.0, 5.0);
        assert_eq!(body["schedule"].as_array().expect("rows").len(), 360);
    }

    #[tokio::test]
    async fn validation_errors_are_bad_request_with_field() {
        let (status, _, body) = post_json(
            AppState::default(),
            "/api/amortize",
            r#"{"principal": -5, "annualRatePct": 6, "termMonths": 360}"#,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["field"], "principal");
    }

    #[tokio::test]
    async fn oversized_terms_are_bad_request() {
        let (status, _, body) = post_json(
            AppState::default(),
            "/api/amortize",
            r#"{"principal": 1000, "annualRatePct": 0, "termMonths": 4294967295}"#,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["field"], "termMonths");

        let (status, _, body) = post_json(
            AppState::default(),
            "/api/payoff",
            r#"{"principal": 1000, "annualRatePct": 0, "monthlyPayment": 1, "maxPeriods": 4294967295}"#,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["field"], "maxPeriods");
    }

    #[tokio::test]
    async fn non_amortizing_payoff_is_unprocessable() {
        let (status, _, body) = post_json(
            AppState::default(),
            "/api/payoff",
            r#"{"principal": 100000, "annualRatePct": 12, "monthlyPayment": 500}"#,
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["kind"], "non-amortizing");
    }

    #[tokio::test]
    async fn growth_route_matches_closed_form() {
        let (status, _, body) = post_json(
            AppState::default(),
            "/api/growth",
            r#"{"presentValue": 10000, "annualRatePct": 5, "compoundingPeriodsPerYear": 1, "years": 3}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_approx_tol(body["endingBalance"].as_f64().expect("balance"), 11_576.25, 0.01);
    }

    #[tokio::test]
    async fn rmd_route_selects_joint_table_for_large_gap() {
        let (status, _, body) = post_json(
            AppState::default(),
            "/api/rmd",
            r#"{"ownerAge": 75, "accountBalance": 500000, "spouseAge": 60, "spouseIsSoleBeneficiary": true}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["table"], "joint-life");
        assert_eq!(body["modelledDivisor"], true);

        let (_, _, body) = post_json(
            AppState::default(),
            "/api/rmd",
            r#"{"ownerAge": 75, "accountBalance": 500000, "spouseAge": 67, "spouseIsSoleBeneficiary": true}"#,
        )
        .await;
        assert_eq!(body["table"], "uniform-lifetime");
        assert_approx(body["divisor"].as_f64().expect("divisor"), 24.6);
        assert_eq!(body["modelledDivisor"], false);
    }

    #[tokio::test]
    async fn rmd_schedule_rejects_implausible_spouse_age() {
        let (status, _, body) = post_json(
            AppState::default(),
            "/api/rmd/schedule",
            r#"{"ownerAge": 72, "accountBalance": 500000, "spouseAge": 4294967295, "spouseIsSoleBeneficiary": true, "growthRatePct": 5}"#,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["field"], "spouseAge");
    }

    #[tokio::test]
    async fn break_even_with_equal_amounts_is_null() {
        let (status, _, body) = post_json(
            AppState::default(),
            "/api/break-even",
            r#"{
              "scenarioA": {"startPeriod": 0, "periodicAmount": 1000},
              "scenarioB": {"startPeriod": 36, "periodicAmount": 1000},
              "horizonPeriod": 120
            }"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["breakEvenPeriod"].is_null());
    }

    #[tokio::test]
    async fn base_route_adds_binary_operands() {
        let (status, _, body) = post_json(
            AppState::default(),
            "/api/base",
            r#"{"lhs": "1010", "rhs": "0101", "operation": "add", "radix": "binary"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"], "1111");
        assert_eq!(body["decimal"], "15");
    }

    #[tokio::test]
    async fn base_division_by_zero_is_unprocessable() {
        let (status, _, body) = post_json(
            AppState::default(),
            "/api/base",
            r#"{"lhs": "FF", "rhs": "0", "operation": "divide", "radix": "hexadecimal"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["kind"], "division-by-zero");
    }

    #[tokio::test]
    async fn percentage_route_solves_the_blank_field() {
        let (status, _, body) = post_json(
            AppState::default(),
            "/api/percentage",
            r#"{"base": 200, "result": 50}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_approx(body["percentage"].as_f64().expect("percentage"), 25.0);
    }

    #[tokio::test]
    async fn age_route_parses_iso_dates() {
        let (status, _, body) = post_json(
            AppState::default(),
            "/api/age",
            r#"{"birthDate": "1990-05-15", "asOf": "2024-03-10"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["years"], 33);
        assert_eq!(body["months"], 9);
    }

    #[tokio::test]
    async fn malformed_json_is_bad_request() {
        let (status, _, body) =
            post_json(AppState::default(), "/api/amortize", r#"{"principal": "#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let (status, _, body) = post_json(AppState::default(), "/api/unknown", "{}").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Not found");
    }

    #[tokio::test]
    async fn biological_age_without_estimator_is_unavailable() {
        let (status, _, _) = post_json(
            AppState::default(),
            "/api/biological-age",
            r#"{"chronologicalAge": 45}"#,
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn biological_age_uses_configured_estimator() {
        let state = AppState::default().with_estimator(Arc::new(StubEstimator));
        let (status, _, body) = post_json(
            state.clone(),
            "/api/biological-age",
            r#"{"chronologicalAge": 45, "bloodPressure": "120/80"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_approx(body["estimatedAge"].as_f64().expect("age"), 38.0);
        assert_eq!(body["insights"][0], "2 biomarkers considered");
        assert!(body["missingBiomarkersNote"].is_string());

        let (status, _, body) = post_json(state, "/api/biological-age", "{}").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["field"], "biomarkers");
    }
}

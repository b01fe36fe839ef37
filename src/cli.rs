use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::{info, warn};

use crate::api::{AppState, run_http_server};
use crate::config::{AppConfig, TableConfig};
use crate::core::{
    BaseCalcInput, BaseOperation, CompoundingFrequency, DistributionTables, GrowthInput,
    JointLifeTable, LoanInput, Radix, RmdInput, UniformLifetimeTable, amortize_capped, calculate,
    grow_future, project_schedule, required_minimum_distribution,
};
use crate::error::{AppError, CalcError};
use crate::telemetry;

#[derive(Parser, Debug)]
#[command(
    name = "fincalc",
    about = "Loan, growth, RMD, tax and number utilities as a JSON service or one-shot CLI",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Print a loan amortization schedule
    Amortize(AmortizeArgs),
    /// Project compound growth with optional contributions
    Grow(GrowArgs),
    /// Compute this year's required minimum distribution, or a projection
    Rmd(RmdArgs),
    /// Binary/octal/decimal/hex arithmetic
    Base(BaseArgs),
}

#[derive(Args, Debug, Default)]
pub struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub port: Option<u16>,
}

#[derive(Args, Debug)]
struct AmortizeArgs {
    #[arg(long)]
    principal: f64,
    /// Annual rate in percent
    #[arg(long)]
    rate: f64,
    #[arg(long)]
    term_months: u32,
    #[arg(long, default_value_t = 0.0)]
    extra: f64,
    /// Print only the summary, without schedule rows
    #[arg(long)]
    summary: bool,
}

#[derive(Args, Debug)]
struct GrowArgs {
    #[arg(long, default_value_t = 0.0)]
    present_value: f64,
    /// Annual rate in percent
    #[arg(long)]
    rate: f64,
    #[arg(long)]
    years: f64,
    /// 1, 2, 4, 12 or 365
    #[arg(long, default_value_t = 12)]
    periods_per_year: u32,
    #[arg(long, default_value_t = 0.0)]
    contribution: f64,
    /// Tax drag on returns, in percent
    #[arg(long, default_value_t = 0.0)]
    tax_rate: f64,
}

#[derive(Args, Debug)]
struct RmdArgs {
    #[arg(long)]
    owner_age: u32,
    #[arg(long)]
    balance: f64,
    #[arg(long)]
    spouse_age: Option<u32>,
    #[arg(long)]
    spouse_sole_beneficiary: bool,
    /// Project the schedule to the end of the table at this annual growth rate (percent)
    #[arg(long)]
    growth_rate: Option<f64>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliRadix {
    Bin,
    Oct,
    Dec,
    Hex,
}

impl From<CliRadix> for Radix {
    fn from(value: CliRadix) -> Self {
        match value {
            CliRadix::Bin => Radix::Binary,
            CliRadix::Oct => Radix::Octal,
            CliRadix::Dec => Radix::Decimal,
            CliRadix::Hex => Radix::Hexadecimal,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliOperation {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    And,
    Or,
    Xor,
}

impl From<CliOperation> for BaseOperation {
    fn from(value: CliOperation) -> Self {
        match value {
            CliOperation::Add => BaseOperation::Add,
            CliOperation::Sub => BaseOperation::Subtract,
            CliOperation::Mul => BaseOperation::Multiply,
            CliOperation::Div => BaseOperation::Divide,
            CliOperation::Rem => BaseOperation::Remainder,
            CliOperation::And => BaseOperation::And,
            CliOperation::Or => BaseOperation::Or,
            CliOperation::Xor => BaseOperation::Xor,
        }
    }
}

#[derive(Args, Debug)]
struct BaseArgs {
    lhs: String,
    rhs: String,
    #[arg(long, value_enum, default_value_t = CliOperation::Add)]
    op: CliOperation,
    #[arg(long, value_enum, default_value_t = CliRadix::Dec)]
    radix: CliRadix,
    #[arg(long, value_enum)]
    output_radix: Option<CliRadix>,
}

pub async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => serve(args).await,
        Command::Amortize(args) => {
            let config = AppConfig::load()?;
            let input = LoanInput {
                principal: args.principal,
                annual_rate_pct: args.rate,
                term_months: args.term_months,
                extra_payment: args.extra,
            };
            let mut result = amortize_capped(&input, config.limits.schedule_multiplier)?;
            if args.summary {
                result.schedule.clear();
            }
            print_json(&result)
        }
        Command::Grow(args) => {
            let frequency = CompoundingFrequency::try_from(args.periods_per_year).map_err(|got| {
                CalcError::invalid(
                    "compoundingPeriodsPerYear",
                    format!("must be 1, 2, 4, 12 or 365, got {got}"),
                )
            })?;
            let result = grow_future(&GrowthInput {
                present_value: args.present_value,
                annual_rate_pct: args.rate,
                frequency,
                years: args.years,
                contribution_per_period: args.contribution,
                tax_rate_pct: args.tax_rate,
            })?;
            print_json(&result)
        }
        Command::Rmd(args) => {
            let config = AppConfig::load()?;
            let tables = load_tables(&config.tables);
            let input = RmdInput {
                owner_age: args.owner_age,
                balance: args.balance,
                spouse_age: args.spouse_age,
                spouse_is_sole_beneficiary: args.spouse_sole_beneficiary,
            };
            match args.growth_rate {
                Some(rate) => print_json(&project_schedule(&tables, &input, rate)?),
                None => print_json(&required_minimum_distribution(&tables, &input)?),
            }
        }
        Command::Base(args) => {
            let result = calculate(&BaseCalcInput {
                lhs: args.lhs,
                rhs: args.rhs,
                operation: args.op.into(),
                radix: args.radix.into(),
                output_radix: args.output_radix.map(Radix::from),
            })?;
            print_json(&result)
        }
    }
}

async fn serve(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;
    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let tables = load_tables(&config.tables);
    let state = AppState::new(tables, config.limits);
    let addr = config.server.socket_addr()?;
    info!(
        joint_entries = state.tables.joint.len(),
        schedule_multiplier = config.limits.schedule_multiplier,
        "distribution tables ready"
    );

    run_http_server(addr, state).await?;
    Ok(())
}

/// Built-in tables, with the joint table replaced from CSV when one is configured.
/// A table that fails to load is logged and the built-in one is kept.
pub fn load_tables(config: &TableConfig) -> DistributionTables {
    let Some(path) = config.joint_table_path.as_deref() else {
        return DistributionTables::builtin().clone();
    };
    match JointLifeTable::from_path(path) {
        Ok(joint) => {
            info!(path = %path.display(), entries = joint.len(), "loaded joint life table");
            DistributionTables::new(UniformLifetimeTable::irs_2022(), joint)
        }
        Err(err) => {
            warn!(path = %path.display(), error = %err, "joint life table not loaded; using modelled table");
            DistributionTables::builtin().clone()
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

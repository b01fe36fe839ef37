//! Required minimum distributions.
//!
//! The Uniform Lifetime table is the IRS 2022 revision. The Joint Life table is
//! either loaded from a CSV export of the published table or generated from a
//! Gompertz last-survivor model calibrated so that `joint(x, x - 10)` tracks
//! `uniform(x)`.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::OnceLock;

use serde::Deserialize;
use thiserror::Error;

use super::types::{DistributionTable, RmdInput, RmdProjectionRow, RmdResult};
use super::validate::{finite, finite_output, non_negative};
use crate::error::CalcError;

pub const UNIFORM_FIRST_AGE: u32 = 72;
pub const TABLE_MAX_AGE: u32 = 120;
/// The joint table only applies when the spouse is more than this many years younger.
pub const JOINT_TABLE_MIN_GAP: u32 = 10;
/// Upper bound for owner and spouse ages on input.
pub const MAX_PLAUSIBLE_AGE: u32 = TABLE_MAX_AGE + 30;

const JOINT_MIN_SPOUSE_AGE: u32 = 20;
const GOMPERTZ_MODAL_AGE: f64 = 91.0;
const GOMPERTZ_DISPERSION: f64 = 0.095;
const SURVIVAL_HORIZON: u32 = 130;

const UNIFORM_LIFETIME_2022: [f64; 49] = [
    27.4, 26.5, 25.5, 24.6, 23.7, 22.9, 22.0, 21.1, 20.2, 19.4, // 72-81
    18.5, 17.7, 16.8, 16.0, 15.2, 14.4, 13.7, 12.9, 12.2, 11.5, // 82-91
    10.8, 10.1, 9.5, 8.9, 8.4, 7.8, 7.3, 6.8, 6.4, 6.0, // 92-101
    5.6, 5.2, 4.9, 4.6, 4.3, 4.1, 3.9, 3.7, 3.5, 3.4, // 102-111
    3.3, 3.1, 3.0, 2.9, 2.8, 2.7, 2.5, 2.3, 2.0, // 112-120+
];

#[derive(Debug, Error)]
pub enum TableLoadError {
    #[error("failed to read joint life table: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed joint life table: {0}")]
    Csv(#[from] csv::Error),
    #[error("joint life table has no rows")]
    Empty,
    #[error("joint life table divisor for ({owner_age}, {spouse_age}) must be > 0")]
    InvalidDivisor { owner_age: u32, spouse_age: u32 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct UniformLifetimeTable {
    first_age: u32,
    divisors: Vec<f64>,
}

impl UniformLifetimeTable {
    pub fn irs_2022() -> Self {
        Self {
            first_age: UNIFORM_FIRST_AGE,
            divisors: UNIFORM_LIFETIME_2022.to_vec(),
        }
    }

    pub fn first_age(&self) -> u32 {
        self.first_age
    }

    pub fn last_age(&self) -> u32 {
        self.first_age + self.divisors.len() as u32 - 1
    }

    /// Ages past the end of the table use the terminal divisor.
    pub fn divisor(&self, age: u32) -> f64 {
        let index = age.saturating_sub(self.first_age) as usize;
        self.divisors
            .get(index)
            .or_else(|| self.divisors.last())
            .copied()
            .unwrap_or(1.0)
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct JointLifeRecord {
    owner_age: u32,
    spouse_age: u32,
    divisor: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JointLifeTable {
    entries: BTreeMap<(u32, u32), f64>,
    modelled: bool,
}

impl JointLifeTable {
    pub fn modelled() -> Self {
        let mut entries = BTreeMap::new();
        for owner in UNIFORM_FIRST_AGE..=TABLE_MAX_AGE {
            for spouse in JOINT_MIN_SPOUSE_AGE..owner - JOINT_TABLE_MIN_GAP {
                entries.insert((owner, spouse), last_survivor_expectancy(owner, spouse));
            }
        }
        Self {
            entries,
            modelled: true,
        }
    }

    /// Reads `owner_age,spouse_age,divisor` rows with a header line.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self, TableLoadError> {
        let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let mut entries = BTreeMap::new();
        for record in csv_reader.deserialize::<JointLifeRecord>() {
            let record = record?;
            if !record.divisor.is_finite() || record.divisor <= 0.0 {
                return Err(TableLoadError::InvalidDivisor {
                    owner_age: record.owner_age,
                    spouse_age: record.spouse_age,
                });
            }
            entries.insert((record.owner_age, record.spouse_age), record.divisor);
        }
        if entries.is_empty() {
            return Err(TableLoadError::Empty);
        }
        Ok(Self {
            entries,
            modelled: false,
        })
    }

    pub fn from_path(path: &Path) -> Result<Self, TableLoadError> {
        Self::from_csv_reader(File::open(path)?)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// False once the table has been replaced from a file.
    pub fn is_modelled(&self) -> bool {
        self.modelled
    }

    /// Exact match, then ages clamped into the table's range, then the terminal divisor.
    pub fn divisor(&self, owner_age: u32, spouse_age: u32) -> f64 {
        if let Some(divisor) = self.entries.get(&(owner_age, spouse_age)) {
            return *divisor;
        }
        let (min_owner, max_owner) = self.owner_range();
        let owner = owner_age.clamp(min_owner, max_owner);
        let spouse_ages = self
            .entries
            .range((owner, u32::MIN)..=(owner, u32::MAX))
            .map(|(&(_, spouse), _)| spouse);
        let (min_spouse, max_spouse) = spouse_ages.fold((u32::MAX, u32::MIN), |(lo, hi), s| {
            (lo.min(s), hi.max(s))
        });
        if min_spouse <= max_spouse {
            let spouse = spouse_age.clamp(min_spouse, max_spouse);
            if let Some(divisor) = self.entries.get(&(owner, spouse)) {
                return *divisor;
            }
        }
        self.terminal_divisor()
    }

    fn owner_range(&self) -> (u32, u32) {
        let min = self.entries.keys().next().map(|k| k.0).unwrap_or(0);
        let max = self.entries.keys().next_back().map(|k| k.0).unwrap_or(0);
        (min, max)
    }

    fn terminal_divisor(&self) -> f64 {
        self.entries.values().next_back().copied().unwrap_or(1.0)
    }
}

fn gompertz_survival(age: f64, years: f64) -> f64 {
    let hazard_scale = (GOMPERTZ_DISPERSION * (age - GOMPERTZ_MODAL_AGE)).exp();
    (-hazard_scale * ((GOMPERTZ_DISPERSION * years).exp() - 1.0)).exp()
}

/// Expected years until the second of two lives ends, rounded to 0.1.
fn last_survivor_expectancy(owner_age: u32, spouse_age: u32) -> f64 {
    let (x, y) = (f64::from(owner_age), f64::from(spouse_age));
    let mut total = 0.5;
    for t in 1..=SURVIVAL_HORIZON {
        let t = f64::from(t);
        let px = gompertz_survival(x, t);
        let py = gompertz_survival(y, t);
        total += px + py - px * py;
    }
    (total * 10.0).round() / 10.0
}

#[derive(Debug, Clone, PartialEq)]
pub struct DistributionTables {
    pub uniform: UniformLifetimeTable,
    pub joint: JointLifeTable,
}

impl DistributionTables {
    pub fn new(uniform: UniformLifetimeTable, joint: JointLifeTable) -> Self {
        Self { uniform, joint }
    }

    pub fn builtin() -> &'static DistributionTables {
        static TABLES: OnceLock<DistributionTables> = OnceLock::new();
        TABLES.get_or_init(DistributionTables::default)
    }

    pub fn select(&self, input: &RmdInput) -> (DistributionTable, f64) {
        match input.spouse_age {
            Some(spouse_age)
                if input.spouse_is_sole_beneficiary
                    && input.owner_age > spouse_age
                    && input.owner_age - spouse_age > JOINT_TABLE_MIN_GAP =>
            {
                (
                    DistributionTable::JointLife,
                    self.joint.divisor(input.owner_age, spouse_age),
                )
            }
            _ => (
                DistributionTable::UniformLifetime,
                self.uniform.divisor(input.owner_age),
            ),
        }
    }

    pub fn is_modelled(&self, table: DistributionTable) -> bool {
        table == DistributionTable::JointLife && self.joint.is_modelled()
    }
}

impl Default for DistributionTables {
    fn default() -> Self {
        Self::new(UniformLifetimeTable::irs_2022(), JointLifeTable::modelled())
    }
}

fn validate_rmd_input(tables: &DistributionTables, input: &RmdInput) -> Result<(), CalcError> {
    if input.owner_age < tables.uniform.first_age() {
        return Err(CalcError::invalid(
            "ownerAge",
            format!("must be at least {}", tables.uniform.first_age()),
        ));
    }
    if input.owner_age > MAX_PLAUSIBLE_AGE {
        return Err(CalcError::invalid("ownerAge", "is not a plausible age"));
    }
    if input.spouse_age.is_some_and(|age| age > MAX_PLAUSIBLE_AGE) {
        return Err(CalcError::invalid("spouseAge", "is not a plausible age"));
    }
    non_negative("accountBalance", input.balance)?;
    Ok(())
}

pub fn required_minimum_distribution(
    tables: &DistributionTables,
    input: &RmdInput,
) -> Result<RmdResult, CalcError> {
    validate_rmd_input(tables, input)?;
    let (table, divisor) = tables.select(input);
    Ok(RmdResult {
        table,
        divisor,
        modelled_divisor: tables.is_modelled(table),
        rmd: input.balance / divisor,
    })
}

/// Repeats the single-year calculation each year until the owner passes the table's
/// last age, withdrawing the RMD before applying `growth_rate_pct` to the remainder.
pub fn project_schedule(
    tables: &DistributionTables,
    input: &RmdInput,
    growth_rate_pct: f64,
) -> Result<Vec<RmdProjectionRow>, CalcError> {
    validate_rmd_input(tables, input)?;
    finite("growthRatePct", growth_rate_pct)?;
    if growth_rate_pct <= -100.0 {
        return Err(CalcError::invalid("growthRatePct", "must be > -100"));
    }

    let last_age = tables.uniform.last_age().max(TABLE_MAX_AGE);
    let growth_rate = growth_rate_pct / 100.0;
    let mut rows = Vec::new();
    let mut balance = input.balance;
    for (year, owner_age) in (input.owner_age..=last_age.max(input.owner_age)).enumerate() {
        let years_elapsed = year as u32;
        let year_input = RmdInput {
            owner_age,
            balance,
            spouse_age: input.spouse_age.map(|age| age.saturating_add(years_elapsed)),
            spouse_is_sole_beneficiary: input.spouse_is_sole_beneficiary,
        };
        let (table, divisor) = tables.select(&year_input);
        let rmd = balance / divisor;
        let remaining = balance - rmd;
        let growth = remaining * growth_rate;
        let ending_balance = finite_output(remaining + growth)?;
        rows.push(RmdProjectionRow {
            year: years_elapsed + 1,
            owner_age,
            spouse_age: year_input.spouse_age,
            table,
            divisor,
            modelled_divisor: tables.is_modelled(table),
            starting_balance: balance,
            rmd,
            growth,
            ending_balance,
        });
        balance = ending_balance;
    }
    Ok(rows)
}

use chrono::{Datelike, Months, NaiveDate};
use serde::Serialize;

use crate::error::{CalcError, NoSolution};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgeBreakdown {
    pub years: u32,
    pub months: u32,
    pub days: u32,
    pub total_days: i64,
    /// Zero on the birthday itself.
    pub days_until_next_birthday: i64,
}

fn add_months(date: NaiveDate, months: u32) -> Result<NaiveDate, CalcError> {
    date.checked_add_months(Months::new(months))
        .ok_or(CalcError::NoSolution(NoSolution::Overflow))
}

/// Calendar age of someone born on `birth`, as of `as_of`.
///
/// Month arithmetic clamps to the end of shorter months, so a Feb 29 birthday
/// is observed on Feb 28 in common years.
pub fn age_on(birth: NaiveDate, as_of: NaiveDate) -> Result<AgeBreakdown, CalcError> {
    if as_of < birth {
        return Err(CalcError::invalid("asOf", "must not be before the birth date"));
    }

    let month_span = (as_of.year() - birth.year()) * 12 + as_of.month() as i32 - birth.month() as i32;
    let mut whole_months = u32::try_from(month_span).map_err(|_| NoSolution::Overflow)?;
    let mut anchor = add_months(birth, whole_months)?;
    if anchor > as_of {
        whole_months -= 1;
        anchor = add_months(birth, whole_months)?;
    }

    let years = whole_months / 12;
    let this_year_birthday = add_months(birth, years * 12)?;
    let next_birthday = if this_year_birthday == as_of {
        as_of
    } else {
        add_months(birth, (years + 1) * 12)?
    };

    Ok(AgeBreakdown {
        years,
        months: whole_months % 12,
        days: (as_of - anchor).num_days() as u32,
        total_days: (as_of - birth).num_days(),
        days_until_next_birthday: (next_birthday - as_of).num_days(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    #[test]
    fn splits_into_years_months_days() {
        let age = age_on(date(1990, 5, 15), date(2024, 3, 10)).expect("ok");
        assert_eq!((age.years, age.months, age.days), (33, 9, 24));
        assert_eq!(age.days_until_next_birthday, 66);
    }

    #[test]
    fn leap_day_birthday_is_observed_on_feb_28() {
        let on_the_day = age_on(date(2000, 2, 29), date(2023, 2, 28)).expect("ok");
        assert_eq!((on_the_day.years, on_the_day.months, on_the_day.days), (23, 0, 0));
        assert_eq!(on_the_day.days_until_next_birthday, 0);

        let day_before = age_on(date(2000, 2, 29), date(2023, 2, 27)).expect("ok");
        assert_eq!((day_before.years, day_before.months, day_before.days), (22, 11, 29));
        assert_eq!(day_before.days_until_next_birthday, 1);
    }

    #[test]
    fn counts_total_days_lived() {
        let age = age_on(date(2000, 1, 1), date(2000, 12, 31)).expect("ok");
        assert_eq!(age.total_days, 365);
        assert_eq!(age.years, 0);
        assert_eq!(age.days_until_next_birthday, 1);
    }

    #[test]
    fn as_of_before_birth_is_rejected() {
        let err = age_on(date(2000, 1, 2), date(2000, 1, 1)).expect_err("invalid");
        assert_eq!(err.field(), Some("asOf"));
    }
}

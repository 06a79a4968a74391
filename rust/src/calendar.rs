//! Mapping between whole time units and calendar dates.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
#[cfg(feature = "python")]
use pyo3::prelude::*;

use crate::ids::Id;
use crate::models::CompilationResult;

/// Converts time-unit offsets to dates and back.
pub trait DateTimeCalculator {
    /// Date `units` time units after (or, when negative, before) `start`.
    fn add_time(&self, start: NaiveDate, units: i32) -> NaiveDate;
    /// Time units from `from` to `to`; negative when `to` is earlier.
    fn time_between(&self, from: NaiveDate, to: NaiveDate) -> i32;
}

/// One time unit per day, optionally skipping weekends.
#[cfg_attr(feature = "python", pyclass(get_all, set_all))]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CalendarCalculator {
    pub business_days_only: bool,
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

impl DateTimeCalculator for CalendarCalculator {
    fn add_time(&self, start: NaiveDate, units: i32) -> NaiveDate {
        if !self.business_days_only {
            return start + Duration::days(units as i64);
        }
        let step = Duration::days(if units < 0 { -1 } else { 1 });
        let mut date = start;
        let mut remaining = units.abs();
        while remaining > 0 {
            date += step;
            if !is_weekend(date) {
                remaining -= 1;
            }
        }
        date
    }

    fn time_between(&self, from: NaiveDate, to: NaiveDate) -> i32 {
        if !self.business_days_only {
            return (to - from).num_days() as i32;
        }
        let (low, high, sign) = if to >= from { (from, to, 1) } else { (to, from, -1) };
        let mut count = 0;
        let mut date = low;
        while date < high {
            date += Duration::days(1);
            if !is_weekend(date) {
                count += 1;
            }
        }
        sign * count
    }
}

/// Calendar dates of one activity's earliest schedule.
#[cfg_attr(feature = "python", pyclass(get_all, set_all))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActivityDates {
    pub activity_id: Id,
    pub start: NaiveDate,
    pub finish: NaiveDate,
}

impl CompilationResult {
    /// Dates for every activity with computed earliest times, in input order.
    pub fn activity_dates(
        &self,
        project_start: NaiveDate,
        calculator: &dyn DateTimeCalculator,
    ) -> Vec<ActivityDates> {
        self.dependent_activities
            .iter()
            .map(|da| &da.activity)
            .filter_map(|a| {
                let start = a.earliest_start_time?;
                let finish = a.earliest_finish_time?;
                Some(ActivityDates {
                    activity_id: a.id,
                    start: calculator.add_time(project_start, start),
                    finish: calculator.add_time(project_start, finish),
                })
            })
            .collect()
    }
}

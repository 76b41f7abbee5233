//! Per-day calendar status, derived from the check-in log.

use chrono::{Datelike, NaiveDate};
use std::collections::BTreeMap;

use crate::models::check_in::CheckIn;
use crate::models::stats::{CalendarDay, CalendarMonth, CalendarStatus};

#[derive(Debug, Default, Clone, Copy)]
struct DayMarks {
    check_ins: u32,
    verified: bool,
}

/// Check-ins grouped by date, built once per request.
#[derive(Debug, Default)]
pub struct CalendarIndex {
    days: BTreeMap<NaiveDate, DayMarks>,
    start_date: Option<NaiveDate>,
}

impl CalendarIndex {
    pub fn new(check_ins: &[CheckIn], start_date: Option<NaiveDate>) -> Self {
        let mut days: BTreeMap<NaiveDate, DayMarks> = BTreeMap::new();
        for c in check_ins {
            let marks = days.entry(c.check_in_date).or_default();
            marks.check_ins += 1;
            marks.verified |= c.verified_with_token;
        }
        Self { days, start_date }
    }

    pub fn check_ins_on(&self, date: NaiveDate) -> u32 {
        self.days.get(&date).map_or(0, |m| m.check_ins)
    }

    /// First matching rule wins; the order is part of the contract.
    pub fn status_of(&self, date: NaiveDate, as_of: NaiveDate) -> CalendarStatus {
        if date > as_of {
            return CalendarStatus::Future;
        }
        if let Some(start) = self.start_date {
            if date < start {
                return CalendarStatus::BeforeChallenge;
            }
        }
        match self.days.get(&date) {
            Some(marks) if marks.verified => return CalendarStatus::Verified,
            Some(marks) if marks.check_ins > 0 => return CalendarStatus::CheckedIn,
            _ => {}
        }
        if date == as_of {
            return CalendarStatus::Pending;
        }
        match self.start_date {
            Some(start) if date >= start && date < as_of => CalendarStatus::Missed,
            _ => CalendarStatus::None,
        }
    }

    pub fn day(&self, date: NaiveDate, as_of: NaiveDate) -> CalendarDay {
        CalendarDay {
            date,
            status: self.status_of(date, as_of),
            check_ins: self.check_ins_on(date),
        }
    }

    /// Every day of the given month. `None` when year/month is not a real month.
    pub fn month(&self, year: i32, month: u32, as_of: NaiveDate) -> Option<CalendarMonth> {
        let first = NaiveDate::from_ymd_opt(year, month, 1)?;
        let days: Vec<CalendarDay> = first
            .iter_days()
            .take_while(|d| d.month() == month)
            .map(|d| self.day(d, as_of))
            .collect();

        let count = |wanted: &[CalendarStatus]| {
            days.iter().filter(|d| wanted.contains(&d.status)).count() as u32
        };

        Some(CalendarMonth {
            year,
            month,
            checked_in_days: count(&[CalendarStatus::CheckedIn, CalendarStatus::Verified]),
            verified_days: count(&[CalendarStatus::Verified]),
            missed_days: count(&[CalendarStatus::Missed]),
            days,
        })
    }
}

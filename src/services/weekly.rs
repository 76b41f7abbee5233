//! Weekly aggregation of the check-in log.
//!
//! Week 1 runs from the enrollment start date to the following Sunday; every
//! later week is a Monday-to-Sunday calendar week.

use chrono::{Datelike, Duration, NaiveDate};
use std::collections::BTreeMap;

use crate::models::check_in::CheckIn;
use crate::models::stats::{DailyBreakdown, WeeklySummary};

const WEEKDAYS: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

fn monday_of(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// Inclusive bounds of `week_number` (1-indexed). Week 0 is not a week.
pub fn week_bounds(start: NaiveDate, week_number: u32) -> Option<(NaiveDate, NaiveDate)> {
    if week_number == 0 {
        return None;
    }
    // `None` once the week lies past the last representable date
    let offset = Duration::weeks(i64::from(week_number) - 1);
    let monday = monday_of(start).checked_add_signed(offset)?;
    let week_end = monday.checked_add_signed(Duration::days(6))?;
    let week_start = if week_number == 1 { start } else { monday };
    Some((week_start, week_end))
}

/// Which week `date` falls in, or `None` before the start.
pub fn week_number_of(start: NaiveDate, date: NaiveDate) -> Option<u32> {
    if date < start {
        return None;
    }
    let offset = (date - monday_of(start)).num_days();
    Some((offset / 7) as u32 + 1)
}

/// Most frequent value; ties go to whichever value appeared first.
fn mode<'a>(values: impl Iterator<Item = &'a str>) -> Option<String> {
    let mut counts: Vec<(&str, u32)> = Vec::new();
    for value in values {
        match counts.iter_mut().find(|(v, _)| *v == value) {
            Some((_, n)) => *n += 1,
            None => counts.push((value, 1)),
        }
    }

    let mut best: Option<(&str, u32)> = None;
    for (value, n) in counts {
        if best.map_or(true, |(_, top)| n > top) {
            best = Some((value, n));
        }
    }
    best.map(|(v, _)| v.to_string())
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

fn average(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        round2(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Summary for one week. Weeks without check-ins come back zeroed.
pub fn summarize_week(
    check_ins: &[CheckIn],
    start: NaiveDate,
    week_number: u32,
) -> Option<WeeklySummary> {
    let (week_start, week_end) = week_bounds(start, week_number)?;

    // Chronological order fixes the tie-break for the mode fields
    let mut in_week: Vec<&CheckIn> = check_ins
        .iter()
        .filter(|c| c.check_in_date >= week_start && c.check_in_date <= week_end)
        .collect();
    in_week.sort_by_key(|c| (c.check_in_date, c.created_at, c.id));

    let total_oil_ml: f64 = in_week.iter().map(|c| c.oil_quantity_ml).sum();
    let meals_logged = in_week.len() as u32;

    // Null scores are excluded, not counted as zero
    let scores: Vec<f64> = in_week
        .iter()
        .filter_map(|c| c.verification_score.map(f64::from))
        .collect();
    let energy: Vec<f64> = in_week
        .iter()
        .filter_map(|c| c.energy_level.map(f64::from))
        .collect();

    let mut mood_distribution: BTreeMap<String, u32> = BTreeMap::new();
    for mood in in_week.iter().filter_map(|c| c.mood.as_deref()) {
        *mood_distribution.entry(mood.to_string()).or_insert(0) += 1;
    }

    let monday = monday_of(week_end);
    let daily_breakdown = WEEKDAYS
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let date = monday + Duration::days(i as i64);
            let day: Vec<&&CheckIn> = in_week.iter().filter(|c| c.check_in_date == date).collect();
            DailyBreakdown {
                weekday: (*name).to_string(),
                date,
                meals: day.len() as u32,
                oil_ml: round2(day.iter().map(|c| c.oil_quantity_ml).sum()),
            }
        })
        .collect::<Vec<_>>();

    let days_logged = daily_breakdown.iter().filter(|d| d.meals > 0).count() as u32;

    Some(WeeklySummary {
        week_number,
        week_start,
        week_end,
        meals_logged,
        days_logged,
        total_oil_ml: round2(total_oil_ml),
        avg_oil_per_meal: if meals_logged > 0 {
            round2(total_oil_ml / f64::from(meals_logged))
        } else {
            0.0
        },
        avg_verification_score: average(&scores),
        verified_meals: in_week.iter().filter(|c| c.verified_with_token).count() as u32,
        photos_uploaded: in_week.iter().filter(|c| c.photo_url.is_some()).count() as u32,
        top_cooking_method: mode(in_week.iter().map(|c| c.cooking_method.as_str())),
        top_oil_type: mode(in_week.iter().map(|c| c.oil_type.as_str())),
        mood_distribution,
        avg_energy_level: average(&energy),
        daily_breakdown,
    })
}

/// Weeks 1 through the one containing `as_of`, the unfinished current week
/// included.
pub fn summarize_weeks(check_ins: &[CheckIn], start: NaiveDate, as_of: NaiveDate) -> Vec<WeeklySummary> {
    let Some(current) = week_number_of(start, as_of) else {
        return Vec::new();
    };
    (1..=current)
        .filter_map(|week| summarize_week(check_ins, start, week))
        .collect()
}

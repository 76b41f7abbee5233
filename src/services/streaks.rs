//! Streak engine: a pure function over the check-in log.
//!
//! `as_of` is the day the summary is computed for and `today` is the
//! participant's current day. The same log, `as_of` and `today` always yield
//! the same summary.

use chrono::NaiveDate;
use std::collections::BTreeSet;

use crate::models::stats::StreakSummary;

/// `check_in_dates` holds one entry per check-in row (duplicates per day are
/// expected: every meal counts toward `total_check_ins`).
pub fn summarize(
    check_in_dates: &[NaiveDate],
    start_date: Option<NaiveDate>,
    as_of: NaiveDate,
    today: NaiveDate,
) -> StreakSummary {
    let days: BTreeSet<NaiveDate> = check_in_dates.iter().copied().collect();

    let (current_streak, streak_start_date) = current_run(&days, as_of, today);

    StreakSummary {
        as_of,
        current_streak,
        best_streak: best_run(&days),
        last_check_in_date: days.iter().next_back().copied(),
        streak_start_date,
        total_check_ins: check_in_dates.len() as u32,
        missed_days: start_date.map_or(0, |start| missed_days(&days, start, as_of)),
    }
}

/// Consecutive days ending at `as_of`. An empty `as_of` that is today ends the
/// run at zero; an empty `as_of` on any other day walks back from the latest
/// check-in on or before it instead.
fn current_run(
    days: &BTreeSet<NaiveDate>,
    as_of: NaiveDate,
    today: NaiveDate,
) -> (u32, Option<NaiveDate>) {
    let anchor = if days.contains(&as_of) {
        Some(as_of)
    } else if as_of != today {
        days.range(..=as_of).next_back().copied()
    } else {
        None
    };

    let mut streak = 0u32;
    let mut run_start = None;
    let mut cursor = anchor;

    while let Some(day) = cursor.filter(|d| days.contains(d)) {
        streak += 1;
        run_start = Some(day);
        cursor = day.pred_opt();
    }

    (streak, run_start)
}

fn best_run(days: &BTreeSet<NaiveDate>) -> u32 {
    let mut best = 0u32;
    let mut run = 0u32;
    let mut prev: Option<NaiveDate> = None;

    for day in days {
        run = match prev {
            Some(p) if p.succ_opt() == Some(*day) => run + 1,
            _ => 1,
        };
        best = best.max(run);
        prev = Some(*day);
    }

    best
}

/// Days in `[start, as_of]` without any check-in. `as_of` counts once it is
/// empty; days before the start never do.
fn missed_days(days: &BTreeSet<NaiveDate>, start: NaiveDate, as_of: NaiveDate) -> u32 {
    if as_of < start {
        return 0;
    }
    start
        .iter_days()
        .take_while(|d| *d <= as_of)
        .filter(|d| !days.contains(d))
        .count() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_consecutive_days_then_gap() {
        let dates = [d("2024-03-01"), d("2024-03-02"), d("2024-03-03")];
        let start = Some(d("2024-03-01"));

        let on_day_three = summarize(&dates, start, d("2024-03-03"), d("2024-03-03"));
        assert_eq!(on_day_three.current_streak, 3);
        assert_eq!(on_day_three.streak_start_date, Some(d("2024-03-01")));

        let on_day_five = summarize(&dates, start, d("2024-03-05"), d("2024-03-05"));
        assert_eq!(on_day_five.current_streak, 0);
        assert_eq!(on_day_five.streak_start_date, None);
        assert_eq!(on_day_five.best_streak, 3);
    }

    #[test]
    fn test_empty_past_day_walks_back_from_latest_check_in() {
        let dates = [d("2024-01-01"), d("2024-01-02"), d("2024-01-03")];
        let summary = summarize(&dates, Some(d("2024-01-01")), d("2024-01-04"), d("2024-01-06"));
        assert_eq!(summary.current_streak, 3);
        assert_eq!(summary.streak_start_date, Some(d("2024-01-01")));
        assert_eq!(summary.missed_days, 1);
    }

    #[test]
    fn test_empty_today_breaks_the_run() {
        let dates = [d("2024-01-01"), d("2024-01-02"), d("2024-01-03")];
        let summary = summarize(&dates, Some(d("2024-01-01")), d("2024-01-04"), d("2024-01-04"));
        assert_eq!(summary.current_streak, 0);
    }

    #[test]
    fn test_best_streak_survives_a_break() {
        let dates = [
            d("2024-01-01"),
            d("2024-01-02"),
            d("2024-01-03"),
            d("2024-01-04"),
            d("2024-01-07"),
            d("2024-01-08"),
        ];
        let summary = summarize(&dates, Some(d("2024-01-01")), d("2024-01-08"), d("2024-01-08"));
        assert_eq!(summary.current_streak, 2);
        assert_eq!(summary.best_streak, 4);
    }

    #[test]
    fn test_reference_scenario() {
        // lunch 01-01, lunch 01-02, dinner 01-04; today is 01-05 with nothing logged
        let dates = [d("2024-01-01"), d("2024-01-02"), d("2024-01-04")];
        let today = d("2024-01-05");
        let summary = summarize(&dates, Some(d("2024-01-01")), today, today);

        assert_eq!(summary.current_streak, 0);
        assert_eq!(summary.best_streak, 2);
        assert_eq!(summary.missed_days, 2); // 01-03 and 01-05
        assert_eq!(summary.total_check_ins, 3);
        assert_eq!(summary.last_check_in_date, Some(d("2024-01-04")));
    }

    #[test]
    fn test_multiple_meals_count_rows_not_days() {
        let dates = [d("2024-01-01"), d("2024-01-01"), d("2024-01-01"), d("2024-01-02")];
        let summary = summarize(&dates, Some(d("2024-01-01")), d("2024-01-02"), d("2024-01-02"));
        assert_eq!(summary.total_check_ins, 4);
        assert_eq!(summary.current_streak, 2);
        assert_eq!(summary.missed_days, 0);
    }

    #[test]
    fn test_check_in_dated_tomorrow_still_counts() {
        // Participants ahead of UTC may log "tomorrow"
        let dates = [d("2024-01-01"), d("2024-01-02"), d("2024-01-03")];
        let today = d("2024-01-02");
        let summary = summarize(&dates, Some(d("2024-01-01")), today, today);
        assert_eq!(summary.total_check_ins, 3);
        assert_eq!(summary.best_streak, 3);
        assert_eq!(summary.current_streak, 2);
        assert_eq!(summary.last_check_in_date, Some(d("2024-01-03")));
    }

    #[test]
    fn test_empty_history() {
        let summary = summarize(&[], Some(d("2024-01-01")), d("2024-01-03"), d("2024-01-03"));
        assert_eq!(summary.current_streak, 0);
        assert_eq!(summary.best_streak, 0);
        assert_eq!(summary.missed_days, 3);
        assert_eq!(summary.last_check_in_date, None);
    }

    #[test]
    fn test_as_of_before_start_has_no_missed_days() {
        let summary = summarize(&[], Some(d("2024-01-10")), d("2024-01-05"), d("2024-01-05"));
        assert_eq!(summary.missed_days, 0);
    }

    #[test]
    fn test_is_deterministic() {
        let dates = [d("2024-01-02"), d("2024-01-01"), d("2024-01-04")];
        let (as_of, today) = (d("2024-01-04"), d("2024-01-05"));
        let a = summarize(&dates, Some(d("2024-01-01")), as_of, today);
        let b = summarize(&dates, Some(d("2024-01-01")), as_of, today);
        assert_eq!(a, b);
    }
}

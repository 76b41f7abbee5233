use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

/// Derived from the check-in log on every read; never persisted.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StreakSummary {
    pub as_of: NaiveDate,
    pub current_streak: u32,
    pub best_streak: u32,
    pub last_check_in_date: Option<NaiveDate>,
    pub streak_start_date: Option<NaiveDate>,
    pub total_check_ins: u32,
    pub missed_days: u32,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CalendarStatus {
    Future,
    BeforeChallenge,
    Verified,
    CheckedIn,
    Pending,
    Missed,
    None,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub status: CalendarStatus,
    pub check_ins: u32,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CalendarMonth {
    pub year: i32,
    pub month: u32,
    pub days: Vec<CalendarDay>,
    pub checked_in_days: u32,
    pub verified_days: u32,
    pub missed_days: u32,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DailyBreakdown {
    pub weekday: String,
    pub date: NaiveDate,
    pub meals: u32,
    pub oil_ml: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WeeklySummary {
    pub week_number: u32,
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
    pub meals_logged: u32,
    pub days_logged: u32,
    pub total_oil_ml: f64,
    pub avg_oil_per_meal: f64,
    pub avg_verification_score: f64,
    pub verified_meals: u32,
    pub photos_uploaded: u32,
    pub top_cooking_method: Option<String>,
    pub top_oil_type: Option<String>,
    pub mood_distribution: BTreeMap<String, u32>,
    pub avg_energy_level: f64,
    /// Monday through Sunday of the calendar week containing `week_start`.
    pub daily_breakdown: Vec<DailyBreakdown>,
}

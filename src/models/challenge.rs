use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Static challenge definition. Authored outside this service and never mutated here.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Challenge {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub duration_days: i32,
    pub reward_points: i32,
    pub challenge_type: String,
    pub created_at: DateTime<Utc>,
}

impl Challenge {
    /// Last calendar day of the challenge for an enrollment starting on `start`.
    pub fn end_date(&self, start: NaiveDate) -> NaiveDate {
        start + Duration::days(i64::from(self.duration_days.max(1)) - 1)
    }
}

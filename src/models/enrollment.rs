use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Enrollment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub challenge_id: Uuid,
    pub status: EnrollmentStatus,
    /// Participant-local calendar date the challenge started on.
    pub start_date: Option<NaiveDate>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "enrollment_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentStatus {
    NotStarted,
    InProgress,
    Completed,
}

impl Default for EnrollmentStatus {
    fn default() -> Self {
        Self::NotStarted
    }
}

impl Enrollment {
    /// Writes (tokens, check-ins, completion) are only accepted while in progress.
    pub fn ensure_active(&self) -> AppResult<NaiveDate> {
        match (self.status, self.start_date) {
            (EnrollmentStatus::InProgress, Some(start)) => Ok(start),
            _ => Err(AppError::EnrollmentNotActive),
        }
    }
}

//! # OilCheck: Request/Response DTOs
//!
//! API contract types for the check-in engine in one module.
//!
//! Conventions:
//! - `*Request`  → deserialized from client JSON body
//! - `*Query`    → deserialized from query params
//! - `*Response` → serialized to client JSON
//! - Field validation is expressed via `validator` derive macros

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::enrollment::Enrollment;

// ============================================================================
// Enrollments
// ============================================================================

/// POST /api/challenges/{id}/start
#[derive(Debug, Default, Deserialize)]
pub struct StartChallengeRequest {
    /// Participant-local start date. Default: server today.
    pub start_date: Option<NaiveDate>,
}

/// GET /api/enrollments/{id}
#[derive(Debug, Serialize)]
pub struct EnrollmentProgressResponse {
    #[serde(flatten)]
    pub enrollment: Enrollment,
    pub challenge_title: String,
    pub duration_days: i32,
    pub reward_points: i32,
    /// 1-based day of the challenge, clamped to the duration
    pub day_number: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    pub progress_percent: f64,
    pub can_complete: bool,
}

// ============================================================================
// Verification tokens
// ============================================================================

/// POST /api/enrollments/{id}/token
#[derive(Debug, Default, Deserialize)]
pub struct IssueTokenRequest {
    /// Participant's UTC offset, used only to render `display_time`.
    pub utc_offset_minutes: Option<i32>,
}

/// The plaintext code is only ever returned here.
#[derive(Debug, Serialize)]
pub struct IssueTokenResponse {
    pub code: String,
    /// "HH:MM" for the participant to write next to the code
    pub display_time: String,
    pub expires_at: DateTime<Utc>,
    pub expires_in_secs: i64,
}

/// POST /api/enrollments/{id}/token/validate
#[derive(Debug, Deserialize, Validate)]
pub struct ValidateTokenRequest {
    #[validate(length(min = 1, max = 32, message = "Code must be 1-32 characters"))]
    pub code: String,
}

/// Rejections are reported in-band with HTTP 200.
#[derive(Debug, Serialize)]
pub struct ValidateTokenResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bonus_points: Option<i32>,
}

// ============================================================================
// Check-ins
// ============================================================================

/// POST /api/enrollments/{id}/check-ins
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CheckInRequest {
    /// Participant-local calendar date; never inferred server-side.
    pub check_in_date: NaiveDate,

    /// breakfast | lunch | dinner | snack
    pub meal_type: String,

    #[validate(length(min = 1, max = 50, message = "oil_type must be 1-50 characters"))]
    pub oil_type: String,

    #[validate(range(min = 0.0, max = 2000.0, message = "oil_quantity_ml must be 0-2000"))]
    pub oil_quantity_ml: f64,

    #[validate(length(min = 1, max = 50, message = "cooking_method must be 1-50 characters"))]
    pub cooking_method: String,

    #[validate(length(max = 2000, message = "Notes must be under 2000 characters"))]
    pub notes: Option<String>,

    #[validate(range(min = 1, max = 5, message = "energy_level must be 1-5"))]
    pub energy_level: Option<i16>,

    #[validate(length(max = 50))]
    pub mood: Option<String>,

    /// Reference returned by the photo upload collaborator
    #[validate(length(min = 1, max = 1024))]
    pub photo_url: Option<String>,

    #[validate(range(min = 0, max = 100, message = "verification_score must be 0-100"))]
    pub verification_score: Option<i16>,

    /// Validate and consume the current token together with this check-in
    pub verification_code: Option<String>,

    /// Claim a token already validated through the validate endpoint
    #[serde(default)]
    pub verified_with_token: bool,

    /// Explicitly abandon a started token flow and store the photo unverified
    #[serde(default)]
    pub skip_verification: bool,
}

// ============================================================================
// Derived views
// ============================================================================

/// `as_of` is the participant's "today"; defaults to server today.
#[derive(Debug, Default, Deserialize)]
pub struct AsOfQuery {
    pub as_of: Option<NaiveDate>,
}

/// GET /api/enrollments/{id}/calendar
#[derive(Debug, Deserialize)]
pub struct CalendarMonthQuery {
    pub year: i32,
    pub month: u32,
    pub as_of: Option<NaiveDate>,
}

/// GET /api/enrollments/{id}/calendar/{date}
#[derive(Debug, Serialize)]
pub struct CalendarStatusResponse {
    #[serde(flatten)]
    pub day: crate::models::stats::CalendarDay,
    pub as_of: NaiveDate,
}

//! Read-side views. Every call recomputes from the check-in log.

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::NaiveDate;
use uuid::Uuid;

use crate::auth::middleware::AuthUser;
use crate::dto::{AsOfQuery, CalendarMonthQuery, CalendarStatusResponse};
use crate::error::{AppError, AppResult};
use crate::models::check_in::CheckIn;
use crate::models::enrollment::Enrollment;
use crate::models::stats::{CalendarMonth, StreakSummary, WeeklySummary};
use crate::services::calendar::CalendarIndex;
use crate::services::{enrollments, streaks, weekly};
use crate::AppState;

async fn load_log(
    state: &AppState,
    auth_user: &AuthUser,
    enrollment_id: Uuid,
) -> AppResult<(Enrollment, Vec<CheckIn>)> {
    let enrollment = enrollments::load_owned(state, auth_user, enrollment_id).await?;
    let check_ins = state.store.list_check_ins(enrollment_id).await?;
    Ok((enrollment, check_ins))
}

fn started(enrollment: &Enrollment) -> AppResult<NaiveDate> {
    enrollment
        .start_date
        .ok_or_else(|| AppError::Validation("Challenge has not been started".into()))
}

/// Aggregates never run past the challenge's last day.
async fn clamp_to_challenge(
    state: &AppState,
    enrollment: &Enrollment,
    as_of: NaiveDate,
) -> AppResult<NaiveDate> {
    let Some(start) = enrollment.start_date else {
        return Ok(as_of);
    };
    let challenge = enrollments::load_challenge(state, enrollment.challenge_id).await?;
    Ok(as_of.min(challenge.end_date(start)))
}

pub async fn get_streak(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(enrollment_id): Path<Uuid>,
    Query(query): Query<AsOfQuery>,
) -> AppResult<Json<StreakSummary>> {
    let (enrollment, check_ins) = load_log(&state, &auth_user, enrollment_id).await?;
    let today = state.clock.today();
    let as_of = clamp_to_challenge(&state, &enrollment, query.as_of.unwrap_or(today)).await?;

    let dates: Vec<NaiveDate> = check_ins.iter().map(|c| c.check_in_date).collect();
    Ok(Json(streaks::summarize(
        &dates,
        enrollment.start_date,
        as_of,
        today,
    )))
}

pub async fn get_calendar_status(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path((enrollment_id, date)): Path<(Uuid, NaiveDate)>,
    Query(query): Query<AsOfQuery>,
) -> AppResult<Json<CalendarStatusResponse>> {
    let (enrollment, check_ins) = load_log(&state, &auth_user, enrollment_id).await?;
    let as_of = query.as_of.unwrap_or_else(|| state.clock.today());

    let index = CalendarIndex::new(&check_ins, enrollment.start_date);
    Ok(Json(CalendarStatusResponse {
        day: index.day(date, as_of),
        as_of,
    }))
}

pub async fn get_calendar_month(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(enrollment_id): Path<Uuid>,
    Query(query): Query<CalendarMonthQuery>,
) -> AppResult<Json<CalendarMonth>> {
    let (enrollment, check_ins) = load_log(&state, &auth_user, enrollment_id).await?;
    let as_of = query.as_of.unwrap_or_else(|| state.clock.today());

    let index = CalendarIndex::new(&check_ins, enrollment.start_date);
    let month = index
        .month(query.year, query.month, as_of)
        .ok_or_else(|| AppError::Validation("Invalid year/month".into()))?;
    Ok(Json(month))
}

pub async fn get_weekly_summary(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path((enrollment_id, week)): Path<(Uuid, u32)>,
) -> AppResult<Json<WeeklySummary>> {
    let (enrollment, check_ins) = load_log(&state, &auth_user, enrollment_id).await?;
    let start = started(&enrollment)?;

    let summary = weekly::summarize_week(&check_ins, start, week)
        .ok_or_else(|| AppError::Validation(format!("Week {} is out of range", week)))?;
    Ok(Json(summary))
}

pub async fn list_weekly_summaries(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(enrollment_id): Path<Uuid>,
    Query(query): Query<AsOfQuery>,
) -> AppResult<Json<Vec<WeeklySummary>>> {
    let (enrollment, check_ins) = load_log(&state, &auth_user, enrollment_id).await?;
    let start = started(&enrollment)?;
    let requested = query.as_of.unwrap_or_else(|| state.clock.today());
    let as_of = clamp_to_challenge(&state, &enrollment, requested).await?;

    Ok(Json(weekly::summarize_weeks(&check_ins, start, as_of)))
}

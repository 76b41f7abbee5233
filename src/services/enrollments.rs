use chrono::NaiveDate;
use uuid::Uuid;

use crate::auth::middleware::AuthUser;
use crate::dto::EnrollmentProgressResponse;
use crate::error::{AppError, AppResult};
use crate::models::challenge::Challenge;
use crate::models::enrollment::{Enrollment, EnrollmentStatus};
use crate::services::events::{self, EngineEvent};
use crate::AppState;

/// Resolve an enrollment owned by the caller. Someone else's enrollment is
/// reported as missing.
pub async fn load_owned(
    state: &AppState,
    auth_user: &AuthUser,
    enrollment_id: Uuid,
) -> AppResult<Enrollment> {
    state
        .store
        .get_enrollment(enrollment_id)
        .await?
        .filter(|e| e.user_id == auth_user.id)
        .ok_or_else(|| AppError::NotFound("Enrollment not found".into()))
}

pub async fn load_challenge(state: &AppState, challenge_id: Uuid) -> AppResult<Challenge> {
    state
        .store
        .get_challenge(challenge_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Challenge not found".into()))
}

pub async fn start(
    state: &AppState,
    auth_user: &AuthUser,
    challenge_id: Uuid,
    start_date: Option<NaiveDate>,
) -> AppResult<Enrollment> {
    let challenge = load_challenge(state, challenge_id).await?;

    let now = state.clock.now();
    let today = now.date_naive();
    let start_date = start_date.unwrap_or(today);

    // Local dates may differ from server UTC by up to a day
    if (start_date - today).num_days().abs() > 1 {
        return Err(AppError::Validation(
            "start_date must be within ±1 day of today".into(),
        ));
    }

    let enrollment = Enrollment {
        id: Uuid::new_v4(),
        user_id: auth_user.id,
        challenge_id: challenge.id,
        status: EnrollmentStatus::InProgress,
        start_date: Some(start_date),
        started_at: Some(now),
        completed_at: None,
        created_at: now,
    };
    let enrollment = state.store.insert_enrollment(&enrollment).await?;

    tracing::info!(
        user_id = %auth_user.id,
        enrollment_id = %enrollment.id,
        challenge_id = %challenge.id,
        start_date = %start_date,
        "Challenge started"
    );

    Ok(enrollment)
}

pub fn progress(
    enrollment: Enrollment,
    challenge: &Challenge,
    as_of: NaiveDate,
) -> EnrollmentProgressResponse {
    let duration = challenge.duration_days.max(1);
    let (day_number, end_date) = match enrollment.start_date {
        Some(start) => {
            let elapsed = (as_of - start).num_days() + 1;
            (
                elapsed.clamp(0, i64::from(duration)) as i32,
                Some(challenge.end_date(start)),
            )
        }
        None => (0, None),
    };

    let progress_percent = (f64::from(day_number) / f64::from(duration) * 100.0).round();
    let can_complete =
        enrollment.status == EnrollmentStatus::InProgress && day_number >= duration;

    EnrollmentProgressResponse {
        challenge_title: challenge.title.clone(),
        duration_days: challenge.duration_days,
        reward_points: challenge.reward_points,
        day_number,
        end_date,
        progress_percent,
        can_complete,
        enrollment,
    }
}

/// Participant-triggered completion once every day of the challenge has elapsed.
pub async fn complete(
    state: &AppState,
    auth_user: &AuthUser,
    enrollment_id: Uuid,
) -> AppResult<Enrollment> {
    let enrollment = load_owned(state, auth_user, enrollment_id).await?;
    enrollment.ensure_active()?;
    let challenge = load_challenge(state, enrollment.challenge_id).await?;

    let now = state.clock.now();
    let view = progress(enrollment, &challenge, now.date_naive());
    if !view.can_complete {
        return Err(AppError::Validation(format!(
            "Challenge can be completed after all {} days have elapsed",
            challenge.duration_days
        )));
    }

    // Status is compare-and-set; a concurrent completion loses here
    let completed = state
        .store
        .complete_enrollment(enrollment_id, now)
        .await?
        .ok_or(AppError::EnrollmentNotActive)?;

    tracing::info!(
        user_id = %auth_user.id,
        enrollment_id = %enrollment_id,
        reward_points = challenge.reward_points,
        "Challenge completed"
    );

    events::publish(
        state,
        EngineEvent::ChallengeCompleted {
            user_id: auth_user.id,
            enrollment_id,
            challenge_id: challenge.id,
            reward_points: challenge.reward_points,
        },
    );

    Ok(completed)
}

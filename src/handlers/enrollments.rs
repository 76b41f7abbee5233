use axum::{
    extract::{Path, State},
    Extension, Json,
};
use uuid::Uuid;

use crate::auth::middleware::AuthUser;
use crate::dto::{EnrollmentProgressResponse, StartChallengeRequest};
use crate::error::AppResult;
use crate::models::enrollment::Enrollment;
use crate::services::enrollments;
use crate::AppState;

pub async fn start_challenge(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(challenge_id): Path<Uuid>,
    body: Option<Json<StartChallengeRequest>>,
) -> AppResult<Json<Enrollment>> {
    let start_date = body.and_then(|Json(b)| b.start_date);
    let enrollment = enrollments::start(&state, &auth_user, challenge_id, start_date).await?;
    Ok(Json(enrollment))
}

pub async fn get_enrollment(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(enrollment_id): Path<Uuid>,
) -> AppResult<Json<EnrollmentProgressResponse>> {
    let enrollment = enrollments::load_owned(&state, &auth_user, enrollment_id).await?;
    let challenge = enrollments::load_challenge(&state, enrollment.challenge_id).await?;
    Ok(Json(enrollments::progress(
        enrollment,
        &challenge,
        state.clock.today(),
    )))
}

pub async fn complete_challenge(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(enrollment_id): Path<Uuid>,
) -> AppResult<Json<Enrollment>> {
    let enrollment = enrollments::complete(&state, &auth_user, enrollment_id).await?;
    Ok(Json(enrollment))
}

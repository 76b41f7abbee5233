use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use uuid::Uuid;

use crate::auth::middleware::AuthUser;
use crate::dto::CheckInRequest;
use crate::error::AppResult;
use crate::models::check_in::CheckIn;
use crate::services::{check_ins, enrollments};
use crate::AppState;

pub async fn create_check_in(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(enrollment_id): Path<Uuid>,
    Json(body): Json<CheckInRequest>,
) -> AppResult<(StatusCode, Json<CheckIn>)> {
    let check_in = check_ins::record(&state, &auth_user, enrollment_id, body).await?;
    Ok((StatusCode::CREATED, Json(check_in)))
}

pub async fn list_check_ins(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(enrollment_id): Path<Uuid>,
) -> AppResult<Json<Vec<CheckIn>>> {
    enrollments::load_owned(&state, &auth_user, enrollment_id).await?;
    let check_ins = state.store.list_check_ins(enrollment_id).await?;
    Ok(Json(check_ins))
}

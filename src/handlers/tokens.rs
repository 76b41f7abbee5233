use axum::{
    extract::{Path, State},
    Extension, Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::auth::middleware::AuthUser;
use crate::dto::{IssueTokenRequest, IssueTokenResponse, ValidateTokenRequest, ValidateTokenResponse};
use crate::error::{AppError, AppResult};
use crate::services::tokens;
use crate::AppState;

pub async fn issue_token(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(enrollment_id): Path<Uuid>,
    body: Option<Json<IssueTokenRequest>>,
) -> AppResult<Json<IssueTokenResponse>> {
    let offset = body.and_then(|Json(b)| b.utc_offset_minutes);
    let issued = tokens::issue(&state, &auth_user, enrollment_id, offset).await?;
    Ok(Json(issued))
}

pub async fn validate_token(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(enrollment_id): Path<Uuid>,
    Json(body): Json<ValidateTokenRequest>,
) -> AppResult<Json<ValidateTokenResponse>> {
    body.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let response = match tokens::validate(&state, &auth_user, enrollment_id, &body.code).await? {
        Ok(_) => ValidateTokenResponse {
            valid: true,
            reason: None,
            bonus_points: Some(state.config.verification_bonus_points),
        },
        Err(rejection) => ValidateTokenResponse {
            valid: false,
            reason: Some(rejection.reason().to_string()),
            bonus_points: None,
        },
    };

    Ok(Json(response))
}

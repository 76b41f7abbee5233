use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::auth::jwt::verify_access_token;
use crate::error::AppError;
use crate::AppState;

/// The authenticated participant, injected into request extensions.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
}

pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AppError::Unauthorized)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(AppError::Unauthorized)?;

    let user_id = verify_access_token(token, &state.config)?;

    req.extensions_mut().insert(AuthUser { id: user_id });
    Ok(next.run(req).await)
}

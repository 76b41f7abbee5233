use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::db::StoreError;
use crate::services::tokens::TokenRejection;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Rate limited")]
    RateLimited,

    // Check-in flow
    #[error("A check-in for this meal already exists on that date")]
    DuplicateMealType,

    #[error("Unknown meal type: {0}")]
    InvalidMealType(String),

    #[error("Photo verification required: {0}")]
    VerificationRequired(String),

    #[error("Enrollment is not active")]
    EnrollmentNotActive,

    #[error("Storage temporarily unavailable")]
    Transient(#[source] sqlx::Error),

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Stable machine-readable code for the error envelope.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Unauthorized => "unauthorized",
            AppError::NotFound(_) => "not_found",
            AppError::Validation(_) => "validation_error",
            AppError::Conflict(_) => "conflict",
            AppError::RateLimited => "rate_limited",
            AppError::DuplicateMealType => "duplicate_meal_type",
            AppError::InvalidMealType(_) => "invalid_meal_type",
            AppError::VerificationRequired(_) => "verification_required",
            AppError::EnrollmentNotActive => "enrollment_not_active",
            AppError::Transient(_) => "transient",
            AppError::Database(_) | AppError::Internal(_) => "internal_error",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) | AppError::InvalidMealType(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::Conflict(_) | AppError::DuplicateMealType | AppError::EnrollmentNotActive => {
                StatusCode::CONFLICT
            }
            AppError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AppError::VerificationRequired(_) => StatusCode::BAD_REQUEST,
            AppError::Transient(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                AppError::Transient(e)
            }
            other => AppError::Database(other),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DuplicateCheckIn => AppError::DuplicateMealType,
            StoreError::TokenUnavailable => {
                AppError::VerificationRequired(TokenRejection::NoActiveToken.reason().into())
            }
            StoreError::Conflict(msg) => AppError::Conflict(msg),
            StoreError::Database(e) => e.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Transient(e) => {
                tracing::warn!(error = %e, "Transient storage failure");
                self.to_string()
            }
            AppError::Database(e) => {
                tracing::error!(error = %e, "Database error");
                "Internal server error".into()
            }
            AppError::Internal(e) => {
                tracing::error!(error = %e, "Internal error");
                "Internal server error".into()
            }
            AppError::NotFound(msg) | AppError::Validation(msg) | AppError::Conflict(msg) => {
                msg.clone()
            }
            _ => self.to_string(),
        };

        let body = json!({
            "error": {
                "code": self.code(),
                "message": message,
                "status": status.as_u16(),
            }
        });

        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

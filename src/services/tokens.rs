//! Verification token issue and validation.

use chrono::{DateTime, Duration, FixedOffset, Offset, Utc};
use rand::Rng;
use uuid::Uuid;

use crate::auth::middleware::AuthUser;
use crate::dto::IssueTokenResponse;
use crate::error::{AppError, AppResult};
use crate::models::token::{hash_code, TokenState, VerificationToken};
use crate::services::enrollments;
use crate::services::events::{self, EngineEvent};
use crate::AppState;

/// No 0/O or 1/I: the code is copied onto paper and read back from a photo.
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Why a token did not validate. Every variant is retryable by issuing a new token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenRejection {
    #[error("No active verification token; request a new one")]
    NoActiveToken,

    #[error("Verification token has expired; request a new one")]
    Expired,

    #[error("Verification code does not match")]
    CodeMismatch,
}

impl TokenRejection {
    pub fn reason(&self) -> &'static str {
        match self {
            TokenRejection::NoActiveToken => "no_active_token",
            TokenRejection::Expired => "expired",
            TokenRejection::CodeMismatch => "code_mismatch",
        }
    }
}

/// Uppercase alphanumeric code drawn from `rng`. Issuance passes
/// `rand::thread_rng()`, a cryptographically secure generator.
pub fn generate_code<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    (0..len)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

/// Checks against the newest token only. Consumed or superseded tokens are
/// never active again.
pub fn check_token<'a>(
    latest: Option<&'a VerificationToken>,
    entered: &str,
    now: DateTime<Utc>,
) -> Result<&'a VerificationToken, TokenRejection> {
    let token = latest
        .filter(|t| t.state == TokenState::Issued)
        .ok_or(TokenRejection::NoActiveToken)?;
    if token.is_expired(now) {
        return Err(TokenRejection::Expired);
    }
    if !token.matches(entered) {
        return Err(TokenRejection::CodeMismatch);
    }
    Ok(token)
}

pub async fn issue(
    state: &AppState,
    auth_user: &AuthUser,
    enrollment_id: Uuid,
    utc_offset_minutes: Option<i32>,
) -> AppResult<IssueTokenResponse> {
    let enrollment = enrollments::load_owned(state, auth_user, enrollment_id).await?;
    enrollment.ensure_active()?;

    let key = format!("token:{}", enrollment_id);
    if let Err(retry_after) = state
        .rate_limiter
        .check_with_limits(
            &key,
            state.config.token_issue_max,
            state.config.token_issue_window_secs,
        )
        .await
    {
        tracing::warn!(
            enrollment_id = %enrollment_id,
            retry_after_secs = retry_after.as_secs(),
            "Token issue rate limit exceeded"
        );
        return Err(AppError::RateLimited);
    }

    let now = state.clock.now();
    let code = generate_code(&mut rand::thread_rng(), state.config.token_code_length);

    let offset = utc_offset_minutes
        .and_then(|m| FixedOffset::east_opt(m * 60))
        .unwrap_or_else(|| Utc.fix());
    let display_time = now.with_timezone(&offset).format("%H:%M").to_string();

    let token = VerificationToken {
        id: Uuid::new_v4(),
        enrollment_id,
        code_hash: hash_code(&code),
        display_time: display_time.clone(),
        issued_at: now,
        expires_at: now + Duration::seconds(state.config.token_window_secs),
        state: TokenState::Issued,
        consumed_at: None,
        check_in_id: None,
    };
    // Becoming the newest row supersedes any earlier token
    state.store.insert_token(&token).await?;

    tracing::info!(
        enrollment_id = %enrollment_id,
        token_id = %token.id,
        expires_at = %token.expires_at,
        "Verification token issued"
    );

    Ok(IssueTokenResponse {
        code,
        display_time,
        expires_at: token.expires_at,
        expires_in_secs: state.config.token_window_secs,
    })
}

/// Outer error is a failed call; inner is the in-band verdict.
pub async fn validate(
    state: &AppState,
    auth_user: &AuthUser,
    enrollment_id: Uuid,
    entered: &str,
) -> AppResult<Result<VerificationToken, TokenRejection>> {
    enrollments::load_owned(state, auth_user, enrollment_id).await?;

    let now = state.clock.now();
    let latest = state.store.latest_token(enrollment_id).await?;

    let token = match check_token(latest.as_ref(), entered, now) {
        Ok(token) => token.clone(),
        Err(rejection) => {
            tracing::info!(
                enrollment_id = %enrollment_id,
                reason = rejection.reason(),
                "Verification token rejected"
            );
            return Ok(Err(rejection));
        }
    };

    // Losing the compare-and-set means a concurrent call consumed it first
    if !state.store.consume_token(token.id, now).await? {
        tracing::info!(
            enrollment_id = %enrollment_id,
            token_id = %token.id,
            "Verification token already consumed"
        );
        return Ok(Err(TokenRejection::NoActiveToken));
    }

    tracing::info!(
        enrollment_id = %enrollment_id,
        token_id = %token.id,
        "Verification token consumed"
    );

    events::publish(
        state,
        EngineEvent::TokenValidated {
            user_id: auth_user.id,
            enrollment_id,
            token_id: token.id,
            bonus_points: state.config.verification_bonus_points,
        },
    );

    Ok(Ok(VerificationToken {
        state: TokenState::Consumed,
        consumed_at: Some(now),
        ..token
    }))
}

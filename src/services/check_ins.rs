//! Check-in recorder.
//!
//! One entry per (enrollment, date, meal type). A photo submission that
//! started the token flow is only accepted once the token validates, or when
//! the participant explicitly abandons verification.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use uuid::Uuid;
use validator::Validate;

use crate::auth::middleware::AuthUser;
use crate::db::TokenClaim;
use crate::dto::CheckInRequest;
use crate::error::{AppError, AppResult};
use crate::models::check_in::{CheckIn, MealType};
use crate::models::token::{TokenState, VerificationToken};
use crate::services::enrollments;
use crate::services::events::{self, EngineEvent};
use crate::services::tokens::{check_token, TokenRejection};
use crate::AppState;

/// Outcome of the verification gate for one submission.
#[derive(Debug, PartialEq, Eq)]
pub enum Verification {
    Unverified,
    Verified(TokenClaim),
}

/// Decides whether a submission is verified and which token it claims.
/// Pure over the latest token so the gate can be tested without a store.
pub fn verification_gate(
    request: &CheckInRequest,
    latest: Option<&VerificationToken>,
    now: DateTime<Utc>,
) -> AppResult<Verification> {
    let wants_verification = request.verification_code.is_some() || request.verified_with_token;
    if wants_verification && request.photo_url.is_none() {
        return Err(AppError::Validation(
            "A photo is required for a verified check-in".into(),
        ));
    }

    if let Some(code) = request.verification_code.as_deref() {
        let token = check_token(latest, code, now)
            .map_err(|r| AppError::VerificationRequired(r.reason().into()))?;
        return Ok(Verification::Verified(TokenClaim::ConsumeAndAttach {
            token_id: token.id,
            at: now,
        }));
    }

    let claimable = latest.filter(|t| t.is_claimable());

    if request.verified_with_token {
        let token = claimable.ok_or_else(|| {
            AppError::VerificationRequired(TokenRejection::NoActiveToken.reason().into())
        })?;
        return Ok(Verification::Verified(TokenClaim::Attach { token_id: token.id }));
    }

    if request.photo_url.is_none() || request.skip_verification {
        return Ok(Verification::Unverified);
    }

    match latest {
        // Validated but the client did not say so; the photo is still verified
        Some(token) if token.is_claimable() => {
            Ok(Verification::Verified(TokenClaim::Attach { token_id: token.id }))
        }
        // Token flow started and neither validated nor abandoned
        Some(token) if token.state == TokenState::Issued && !token.is_expired(now) => Err(
            AppError::VerificationRequired("verification_pending".into()),
        ),
        _ => Ok(Verification::Unverified),
    }
}

/// Accepted dates run from the start date through the earlier of the
/// challenge's last day and tomorrow (participant time zones run ahead of UTC).
fn check_date_window(
    date: NaiveDate,
    start: NaiveDate,
    end: NaiveDate,
    today: NaiveDate,
) -> AppResult<()> {
    let latest = end.min(today + Duration::days(1));
    if date < start || date > latest {
        return Err(AppError::Validation(format!(
            "check_in_date must be between {} and {}",
            start, latest
        )));
    }
    Ok(())
}

pub async fn record(
    state: &AppState,
    auth_user: &AuthUser,
    enrollment_id: Uuid,
    request: CheckInRequest,
) -> AppResult<CheckIn> {
    request
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let meal_type: MealType = request
        .meal_type
        .parse()
        .map_err(|_| AppError::InvalidMealType(request.meal_type.clone()))?;

    let enrollment = enrollments::load_owned(state, auth_user, enrollment_id).await?;
    let start = enrollment.ensure_active()?;
    let challenge = enrollments::load_challenge(state, enrollment.challenge_id).await?;

    let now = state.clock.now();
    check_date_window(
        request.check_in_date,
        start,
        challenge.end_date(start),
        now.date_naive(),
    )?;

    let latest = state.store.latest_token(enrollment_id).await?;
    let verification = verification_gate(&request, latest.as_ref(), now).map_err(|e| {
        tracing::info!(
            enrollment_id = %enrollment_id,
            error = %e,
            "Check-in rejected by verification gate"
        );
        e
    })?;

    let (verified, claim) = match verification {
        Verification::Verified(claim) => (true, Some(claim)),
        Verification::Unverified => (false, None),
    };

    let check_in = CheckIn {
        id: Uuid::new_v4(),
        enrollment_id,
        check_in_date: request.check_in_date,
        meal_type,
        oil_type: request.oil_type.trim().to_string(),
        oil_quantity_ml: request.oil_quantity_ml,
        cooking_method: request.cooking_method.trim().to_string(),
        notes: request.notes,
        energy_level: request.energy_level,
        mood: request.mood,
        photo_url: request.photo_url,
        verified_with_token: verified,
        verification_score: request.verification_score,
        created_at: now,
    };

    let check_in = state
        .store
        .insert_check_in(&check_in, claim)
        .await
        .map_err(|e| {
            tracing::info!(
                enrollment_id = %enrollment_id,
                date = %request.check_in_date,
                meal_type = %meal_type,
                error = %e,
                "Check-in rejected"
            );
            AppError::from(e)
        })?;

    tracing::info!(
        enrollment_id = %enrollment_id,
        check_in_id = %check_in.id,
        date = %check_in.check_in_date,
        meal_type = %check_in.meal_type,
        verified = check_in.verified_with_token,
        "Check-in recorded"
    );

    events::publish(
        state,
        EngineEvent::CheckInRecorded {
            user_id: auth_user.id,
            enrollment_id,
            check_in_id: check_in.id,
            check_in_date: check_in.check_in_date,
            meal_type: check_in.meal_type,
            verified: check_in.verified_with_token,
        },
    );

    Ok(check_in)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::token::hash_code;

    fn request() -> CheckInRequest {
        CheckInRequest {
            check_in_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            meal_type: "lunch".into(),
            oil_type: "olive".into(),
            oil_quantity_ml: 10.0,
            cooking_method: "steamed".into(),
            notes: None,
            energy_level: Some(4),
            mood: None,
            photo_url: Some("photos/lunch.jpg".into()),
            verification_score: None,
            verification_code: None,
            verified_with_token: false,
            skip_verification: false,
        }
    }

    fn token(state: TokenState, now: DateTime<Utc>) -> VerificationToken {
        VerificationToken {
            id: Uuid::new_v4(),
            enrollment_id: Uuid::new_v4(),
            code_hash: hash_code("K7M2PQ"),
            display_time: "12:00".into(),
            issued_at: now,
            expires_at: now + Duration::minutes(10),
            state,
            consumed_at: None,
            check_in_id: None,
        }
    }

    #[test]
    fn test_plain_check_in_without_photo() {
        let mut req = request();
        req.photo_url = None;
        let now = Utc::now();
        let pending = token(TokenState::Issued, now);
        assert_eq!(
            verification_gate(&req, Some(&pending), now).unwrap(),
            Verification::Unverified
        );
    }

    #[test]
    fn test_photo_with_pending_token_requires_verification() {
        let now = Utc::now();
        let pending = token(TokenState::Issued, now);
        let err = verification_gate(&request(), Some(&pending), now).unwrap_err();
        assert!(matches!(err, AppError::VerificationRequired(reason) if reason == "verification_pending"));
    }

    #[test]
    fn test_abandoned_flow_stores_unverified() {
        let now = Utc::now();
        let pending = token(TokenState::Issued, now);
        let mut req = request();
        req.skip_verification = true;
        assert_eq!(
            verification_gate(&req, Some(&pending), now).unwrap(),
            Verification::Unverified
        );
    }

    #[test]
    fn test_expired_flow_does_not_block() {
        let now = Utc::now();
        let stale = token(TokenState::Issued, now - Duration::hours(1));
        assert_eq!(
            verification_gate(&request(), Some(&stale), now).unwrap(),
            Verification::Unverified
        );
    }

    #[test]
    fn test_inline_code_consumes_token() {
        let now = Utc::now();
        let pending = token(TokenState::Issued, now);
        let mut req = request();
        req.verification_code = Some("k7m2pq".into());
        assert_eq!(
            verification_gate(&req, Some(&pending), now).unwrap(),
            Verification::Verified(TokenClaim::ConsumeAndAttach {
                token_id: pending.id,
                at: now
            })
        );
    }

    #[test]
    fn test_inline_wrong_code_fails_whole_submission() {
        let now = Utc::now();
        let pending = token(TokenState::Issued, now);
        let mut req = request();
        req.verification_code = Some("WRONG1".into());
        let err = verification_gate(&req, Some(&pending), now).unwrap_err();
        assert!(matches!(err, AppError::VerificationRequired(reason) if reason == "code_mismatch"));
    }

    #[test]
    fn test_previously_validated_token_is_attached() {
        let now = Utc::now();
        let consumed = token(TokenState::Consumed, now);
        let mut req = request();
        req.verified_with_token = true;
        assert_eq!(
            verification_gate(&req, Some(&consumed), now).unwrap(),
            Verification::Verified(TokenClaim::Attach { token_id: consumed.id })
        );
    }

    #[test]
    fn test_verified_flag_without_validated_token_fails() {
        let now = Utc::now();
        let mut req = request();
        req.verified_with_token = true;
        assert!(matches!(
            verification_gate(&req, None, now).unwrap_err(),
            AppError::VerificationRequired(_)
        ));
    }

    #[test]
    fn test_verification_needs_a_photo() {
        let now = Utc::now();
        let mut req = request();
        req.photo_url = None;
        req.verification_code = Some("K7M2PQ".into());
        assert!(matches!(
            verification_gate(&req, None, now).unwrap_err(),
            AppError::Validation(_)
        ));
    }

    #[test]
    fn test_date_window() {
        let d = |s: &str| NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap();
        let (start, end, today) = (d("2024-01-01"), d("2024-01-30"), d("2024-01-10"));

        assert!(check_date_window(d("2024-01-01"), start, end, today).is_ok());
        assert!(check_date_window(d("2024-01-11"), start, end, today).is_ok());
        assert!(check_date_window(d("2024-01-12"), start, end, today).is_err());
        assert!(check_date_window(d("2023-12-31"), start, end, today).is_err());
        assert!(check_date_window(d("2024-01-31"), start, end, d("2024-02-05")).is_err());
    }
}

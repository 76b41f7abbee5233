use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;
use uuid::Uuid;

use super::{ChallengeStore, StoreError, StoreResult, TokenClaim};
use crate::models::challenge::Challenge;
use crate::models::check_in::CheckIn;
use crate::models::enrollment::{Enrollment, EnrollmentStatus};
use crate::models::token::{TokenState, VerificationToken};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(20)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

#[async_trait]
impl ChallengeStore for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_challenge(&self, id: Uuid) -> StoreResult<Option<Challenge>> {
        let challenge = sqlx::query_as::<_, Challenge>("SELECT * FROM challenges WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(challenge)
    }

    async fn insert_enrollment(&self, enrollment: &Enrollment) -> StoreResult<Enrollment> {
        // Partial unique index allows one in-progress enrollment per challenge
        sqlx::query_as::<_, Enrollment>(
            r#"
            INSERT INTO user_challenges
                (id, user_id, challenge_id, status, start_date, started_at, completed_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (user_id, challenge_id) WHERE status = 'in_progress' DO NOTHING
            RETURNING *
            "#,
        )
        .bind(enrollment.id)
        .bind(enrollment.user_id)
        .bind(enrollment.challenge_id)
        .bind(enrollment.status)
        .bind(enrollment.start_date)
        .bind(enrollment.started_at)
        .bind(enrollment.completed_at)
        .bind(enrollment.created_at)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::Conflict("Challenge already in progress".into()))
    }

    async fn get_enrollment(&self, id: Uuid) -> StoreResult<Option<Enrollment>> {
        let enrollment =
            sqlx::query_as::<_, Enrollment>("SELECT * FROM user_challenges WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(enrollment)
    }

    async fn complete_enrollment(
        &self,
        id: Uuid,
        completed_at: DateTime<Utc>,
    ) -> StoreResult<Option<Enrollment>> {
        let enrollment = sqlx::query_as::<_, Enrollment>(
            r#"
            UPDATE user_challenges SET status = $2, completed_at = $3
            WHERE id = $1 AND status = $4
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(EnrollmentStatus::Completed)
        .bind(completed_at)
        .bind(EnrollmentStatus::InProgress)
        .fetch_optional(&self.pool)
        .await?;
        Ok(enrollment)
    }

    async fn insert_token(&self, token: &VerificationToken) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO verification_tokens
                (id, enrollment_id, code_hash, display_time, issued_at, expires_at, state)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(token.id)
        .bind(token.enrollment_id)
        .bind(&token.code_hash)
        .bind(&token.display_time)
        .bind(token.issued_at)
        .bind(token.expires_at)
        .bind(token.state)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn latest_token(&self, enrollment_id: Uuid) -> StoreResult<Option<VerificationToken>> {
        let token = sqlx::query_as::<_, VerificationToken>(
            r#"
            SELECT id, enrollment_id, code_hash, display_time, issued_at, expires_at,
                   state, consumed_at, check_in_id
            FROM verification_tokens
            WHERE enrollment_id = $1
            ORDER BY seq DESC
            LIMIT 1
            "#,
        )
        .bind(enrollment_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(token)
    }

    async fn consume_token(&self, token_id: Uuid, at: DateTime<Utc>) -> StoreResult<bool> {
        let consumed = sqlx::query_scalar::<_, Uuid>(
            r#"
            UPDATE verification_tokens SET state = $2, consumed_at = $3
            WHERE id = $1 AND state = $4
              AND seq = (
                  SELECT max(newer.seq) FROM verification_tokens newer
                  WHERE newer.enrollment_id = verification_tokens.enrollment_id
              )
            RETURNING id
            "#,
        )
        .bind(token_id)
        .bind(TokenState::Consumed)
        .bind(at)
        .bind(TokenState::Issued)
        .fetch_optional(&self.pool)
        .await?;
        Ok(consumed.is_some())
    }

    async fn insert_check_in(
        &self,
        check_in: &CheckIn,
        claim: Option<TokenClaim>,
    ) -> StoreResult<CheckIn> {
        // Dropping `tx` on any early return rolls everything back
        let mut tx = self.pool.begin().await?;

        if let Some(TokenClaim::ConsumeAndAttach { token_id, at }) = claim {
            let consumed = sqlx::query_scalar::<_, Uuid>(
                r#"
                UPDATE verification_tokens SET state = $2, consumed_at = $3
                WHERE id = $1 AND state = $4
                  AND seq = (
                      SELECT max(newer.seq) FROM verification_tokens newer
                      WHERE newer.enrollment_id = verification_tokens.enrollment_id
                  )
                RETURNING id
                "#,
            )
            .bind(token_id)
            .bind(TokenState::Consumed)
            .bind(at)
            .bind(TokenState::Issued)
            .fetch_optional(&mut *tx)
            .await?;
            if consumed.is_none() {
                return Err(StoreError::TokenUnavailable);
            }
        }

        let inserted = sqlx::query_as::<_, CheckIn>(
            r#"
            INSERT INTO check_ins (
                id, enrollment_id, check_in_date, meal_type, oil_type, oil_quantity_ml,
                cooking_method, notes, energy_level, mood, photo_url,
                verified_with_token, verification_score, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ON CONFLICT (enrollment_id, check_in_date, meal_type) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(check_in.id)
        .bind(check_in.enrollment_id)
        .bind(check_in.check_in_date)
        .bind(check_in.meal_type)
        .bind(&check_in.oil_type)
        .bind(check_in.oil_quantity_ml)
        .bind(&check_in.cooking_method)
        .bind(&check_in.notes)
        .bind(check_in.energy_level)
        .bind(&check_in.mood)
        .bind(&check_in.photo_url)
        .bind(check_in.verified_with_token)
        .bind(check_in.verification_score)
        .bind(check_in.created_at)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(StoreError::DuplicateCheckIn)?;

        if let Some(claim) = claim {
            let attached = sqlx::query(
                r#"
                UPDATE verification_tokens SET check_in_id = $2
                WHERE id = $1 AND state = $3 AND check_in_id IS NULL
                "#,
            )
            .bind(claim.token_id())
            .bind(inserted.id)
            .bind(TokenState::Consumed)
            .execute(&mut *tx)
            .await?;
            if attached.rows_affected() == 0 {
                return Err(StoreError::TokenUnavailable);
            }
        }

        tx.commit().await?;
        Ok(inserted)
    }

    async fn list_check_ins(&self, enrollment_id: Uuid) -> StoreResult<Vec<CheckIn>> {
        let check_ins = sqlx::query_as::<_, CheckIn>(
            r#"
            SELECT * FROM check_ins
            WHERE enrollment_id = $1
            ORDER BY check_in_date ASC, created_at ASC
            "#,
        )
        .bind(enrollment_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(check_ins)
    }
}

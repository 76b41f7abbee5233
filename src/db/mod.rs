//! Storage seam for the check-in engine.
//!
//! The engine treats persistence as an external collaborator. `PgStore` is the
//! production backend; `MemoryStore` mirrors its semantics for local runs and
//! tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::challenge::Challenge;
use crate::models::check_in::CheckIn;
use crate::models::enrollment::Enrollment;
use crate::models::token::VerificationToken;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("check-in already exists for this enrollment, date and meal type")]
    DuplicateCheckIn,

    #[error("verification token is no longer available")]
    TokenUnavailable,

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// How a check-in insert interacts with the enrollment's verification token.
/// Applied in the same atomic unit as the insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenClaim {
    /// Consume an issued token (compare-and-set) and attach it to the check-in.
    ConsumeAndAttach { token_id: Uuid, at: DateTime<Utc> },
    /// Attach a token previously consumed through the validate endpoint.
    Attach { token_id: Uuid },
}

impl TokenClaim {
    pub fn token_id(&self) -> Uuid {
        match self {
            TokenClaim::ConsumeAndAttach { token_id, .. } | TokenClaim::Attach { token_id } => {
                *token_id
            }
        }
    }
}

#[async_trait]
pub trait ChallengeStore: Send + Sync {
    async fn ping(&self) -> StoreResult<()>;

    async fn get_challenge(&self, id: Uuid) -> StoreResult<Option<Challenge>>;

    /// Fails `Conflict` when the participant already has an in-progress
    /// enrollment for the same challenge.
    async fn insert_enrollment(&self, enrollment: &Enrollment) -> StoreResult<Enrollment>;

    async fn get_enrollment(&self, id: Uuid) -> StoreResult<Option<Enrollment>>;

    /// `in_progress -> completed`; `None` when the enrollment was not in progress.
    async fn complete_enrollment(
        &self,
        id: Uuid,
        completed_at: DateTime<Utc>,
    ) -> StoreResult<Option<Enrollment>>;

    async fn insert_token(&self, token: &VerificationToken) -> StoreResult<()>;

    /// Most recently issued token for the enrollment, whatever its state.
    async fn latest_token(&self, enrollment_id: Uuid) -> StoreResult<Option<VerificationToken>>;

    /// Atomic `issued -> consumed`. Returns `false` if another caller won.
    async fn consume_token(&self, token_id: Uuid, at: DateTime<Utc>) -> StoreResult<bool>;

    /// Inserts the check-in and applies `claim` atomically: either both land
    /// or neither does.
    async fn insert_check_in(
        &self,
        check_in: &CheckIn,
        claim: Option<TokenClaim>,
    ) -> StoreResult<CheckIn>;

    /// Full log ordered by check-in date, then creation time.
    async fn list_check_ins(&self, enrollment_id: Uuid) -> StoreResult<Vec<CheckIn>>;
}

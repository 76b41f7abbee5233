use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{ChallengeStore, StoreError, StoreResult, TokenClaim};
use crate::models::challenge::Challenge;
use crate::models::check_in::CheckIn;
use crate::models::enrollment::{Enrollment, EnrollmentStatus};
use crate::models::token::{TokenState, VerificationToken};

/// In-process store for single-instance development and tests.
/// Every operation runs under one lock, which gives the same atomicity the
/// Postgres backend gets from conditional updates and transactions.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    challenges: HashMap<Uuid, Challenge>,
    enrollments: HashMap<Uuid, Enrollment>,
    // Issue order; the last matching entry is the latest token
    tokens: Vec<VerificationToken>,
    check_ins: Vec<CheckIn>,
}

impl Inner {
    fn token_mut(&mut self, token_id: Uuid) -> Option<&mut VerificationToken> {
        self.tokens.iter_mut().find(|t| t.id == token_id)
    }

    /// Issued and not superseded by a later token for the same enrollment.
    fn is_consumable(&self, token_id: Uuid) -> bool {
        let Some(token) = self.tokens.iter().find(|t| t.id == token_id) else {
            return false;
        };
        let newest = self
            .tokens
            .iter()
            .rev()
            .find(|t| t.enrollment_id == token.enrollment_id);
        token.state == TokenState::Issued && newest.map(|t| t.id) == Some(token_id)
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Challenges are authored elsewhere; this is how they get here.
    pub async fn insert_challenge(&self, challenge: Challenge) {
        let mut inner = self.inner.lock().await;
        inner.challenges.insert(challenge.id, challenge);
    }
}

#[async_trait]
impl ChallengeStore for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn get_challenge(&self, id: Uuid) -> StoreResult<Option<Challenge>> {
        Ok(self.inner.lock().await.challenges.get(&id).cloned())
    }

    async fn insert_enrollment(&self, enrollment: &Enrollment) -> StoreResult<Enrollment> {
        let mut inner = self.inner.lock().await;
        let already_active = inner.enrollments.values().any(|e| {
            e.user_id == enrollment.user_id
                && e.challenge_id == enrollment.challenge_id
                && e.status == EnrollmentStatus::InProgress
        });
        if already_active && enrollment.status == EnrollmentStatus::InProgress {
            return Err(StoreError::Conflict("Challenge already in progress".into()));
        }
        inner.enrollments.insert(enrollment.id, enrollment.clone());
        Ok(enrollment.clone())
    }

    async fn get_enrollment(&self, id: Uuid) -> StoreResult<Option<Enrollment>> {
        Ok(self.inner.lock().await.enrollments.get(&id).cloned())
    }

    async fn complete_enrollment(
        &self,
        id: Uuid,
        completed_at: DateTime<Utc>,
    ) -> StoreResult<Option<Enrollment>> {
        let mut inner = self.inner.lock().await;
        Ok(inner
            .enrollments
            .get_mut(&id)
            .filter(|e| e.status == EnrollmentStatus::InProgress)
            .map(|e| {
                e.status = EnrollmentStatus::Completed;
                e.completed_at = Some(completed_at);
                e.clone()
            }))
    }

    async fn insert_token(&self, token: &VerificationToken) -> StoreResult<()> {
        self.inner.lock().await.tokens.push(token.clone());
        Ok(())
    }

    async fn latest_token(&self, enrollment_id: Uuid) -> StoreResult<Option<VerificationToken>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .tokens
            .iter()
            .rev()
            .find(|t| t.enrollment_id == enrollment_id)
            .cloned())
    }

    async fn consume_token(&self, token_id: Uuid, at: DateTime<Utc>) -> StoreResult<bool> {
        let mut inner = self.inner.lock().await;
        if !inner.is_consumable(token_id) {
            return Ok(false);
        }
        match inner.token_mut(token_id) {
            Some(token) => {
                token.state = TokenState::Consumed;
                token.consumed_at = Some(at);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn insert_check_in(
        &self,
        check_in: &CheckIn,
        claim: Option<TokenClaim>,
    ) -> StoreResult<CheckIn> {
        let mut inner = self.inner.lock().await;

        // Check everything before mutating so a failure leaves no trace
        let duplicate = inner.check_ins.iter().any(|c| {
            c.enrollment_id == check_in.enrollment_id
                && c.check_in_date == check_in.check_in_date
                && c.meal_type == check_in.meal_type
        });

        // Same failure order as the transactional backend: consume, insert, attach
        let token_usable = claim.map(|claim| match claim {
            TokenClaim::ConsumeAndAttach { token_id, .. } => inner.is_consumable(token_id),
            TokenClaim::Attach { token_id } => inner
                .tokens
                .iter()
                .find(|t| t.id == token_id)
                .map_or(false, |token| token.is_claimable()),
        });

        if let (Some(TokenClaim::ConsumeAndAttach { .. }), Some(false)) = (claim, token_usable) {
            return Err(StoreError::TokenUnavailable);
        }
        if duplicate {
            return Err(StoreError::DuplicateCheckIn);
        }
        if token_usable == Some(false) {
            return Err(StoreError::TokenUnavailable);
        }

        if let Some(claim) = claim {
            if let Some(token) = inner.token_mut(claim.token_id()) {
                if let TokenClaim::ConsumeAndAttach { at, .. } = claim {
                    token.state = TokenState::Consumed;
                    token.consumed_at = Some(at);
                }
                token.check_in_id = Some(check_in.id);
            }
        }

        inner.check_ins.push(check_in.clone());
        Ok(check_in.clone())
    }

    async fn list_check_ins(&self, enrollment_id: Uuid) -> StoreResult<Vec<CheckIn>> {
        let inner = self.inner.lock().await;
        let mut check_ins: Vec<CheckIn> = inner
            .check_ins
            .iter()
            .filter(|c| c.enrollment_id == enrollment_id)
            .cloned()
            .collect();
        check_ins.sort_by_key(|c| (c.check_in_date, c.created_at));
        Ok(check_ins)
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::FromRow;
use uuid::Uuid;

/// Short-lived, single-use code proving a photo was taken inside the window.
///
/// Only the newest token of an enrollment is ever considered; issuing a new one
/// supersedes older rows without deleting them. The plaintext code is returned
/// once at issue time and only its hash is stored.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct VerificationToken {
    pub id: Uuid,
    pub enrollment_id: Uuid,
    #[serde(skip_serializing)]
    pub code_hash: String,
    pub display_time: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub state: TokenState,
    pub consumed_at: Option<DateTime<Utc>>,
    /// Check-in this token verified, once attached.
    pub check_in_id: Option<Uuid>,
}

/// `Issued -> Consumed` is the only transition, guarded by a compare-and-set
/// in the store. Expiry is derived from `expires_at`, never written.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "token_state", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TokenState {
    Issued,
    Consumed,
}

impl VerificationToken {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    pub fn matches(&self, entered: &str) -> bool {
        hash_code(entered) == self.code_hash
    }

    /// Consumed through the validate endpoint but not yet claimed by a check-in.
    pub fn is_claimable(&self) -> bool {
        self.state == TokenState::Consumed && self.check_in_id.is_none()
    }
}

/// Participants copy the code by hand, so compare trimmed and upper-cased.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// SHA-256 of the normalized code, lowercase hex.
pub fn hash_code(code: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalize_code(code).as_bytes());
    hex::encode(hasher.finalize())
}

//! Engine events, fanned out over the WebSocket broadcast channel. The points
//! ledger listens here; this service never awards points itself.

use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

use crate::models::check_in::MealType;
use crate::AppState;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    CheckInRecorded {
        user_id: Uuid,
        enrollment_id: Uuid,
        check_in_id: Uuid,
        check_in_date: NaiveDate,
        meal_type: MealType,
        verified: bool,
    },
    TokenValidated {
        user_id: Uuid,
        enrollment_id: Uuid,
        token_id: Uuid,
        bonus_points: i32,
    },
    ChallengeCompleted {
        user_id: Uuid,
        enrollment_id: Uuid,
        challenge_id: Uuid,
        reward_points: i32,
    },
}

/// Best effort: no subscribers is not an error.
pub fn publish(state: &AppState, event: EngineEvent) {
    let Some(tx) = state.ws_tx.as_ref() else {
        return;
    };
    match serde_json::to_string(&event) {
        Ok(msg) => {
            let _ = tx.send(msg);
        }
        Err(e) => tracing::warn!(error = %e, "Failed to serialize engine event"),
    }
}

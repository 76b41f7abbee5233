use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// One meal-level log entry. Append-only: never updated after insert.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct CheckIn {
    pub id: Uuid,
    pub enrollment_id: Uuid,
    pub check_in_date: NaiveDate,
    pub meal_type: MealType,
    pub oil_type: String,
    pub oil_quantity_ml: f64,
    pub cooking_method: String,
    pub notes: Option<String>,
    pub energy_level: Option<i16>,
    pub mood: Option<String>,
    pub photo_url: Option<String>,
    pub verified_with_token: bool,
    pub verification_score: Option<i16>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "meal_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

impl MealType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MealType::Breakfast => "breakfast",
            MealType::Lunch => "lunch",
            MealType::Dinner => "dinner",
            MealType::Snack => "snack",
        }
    }
}

impl fmt::Display for MealType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown meal type '{0}'")]
pub struct UnknownMealType(pub String);

impl FromStr for MealType {
    type Err = UnknownMealType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "breakfast" => Ok(MealType::Breakfast),
            "lunch" => Ok(MealType::Lunch),
            "dinner" => Ok(MealType::Dinner),
            "snack" => Ok(MealType::Snack),
            _ => Err(UnknownMealType(s.to_string())),
        }
    }
}

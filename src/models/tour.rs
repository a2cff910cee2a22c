//! Tour model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Tour difficulty level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "tour_difficulty", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

#[derive(Debug, Error)]
#[error("Difficulty is either: easy, medium, hard (got '{0}')")]
pub struct ParseDifficultyError(String);

impl std::str::FromStr for Difficulty {
    type Err = ParseDifficultyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(ParseDifficultyError(other.to_string())),
        }
    }
}

/// Tour record
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Tour {
    pub id: Uuid,
    pub name: String,
    /// Length of the tour in days
    pub duration: i32,
    pub max_group_size: i32,
    pub difficulty: Difficulty,
    pub ratings_average: f64,
    pub ratings_quantity: i32,
    pub price: f64,
    pub summary: String,
    pub description: Option<String>,
    pub start_dates: Vec<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

fn default_ratings_average() -> f64 {
    4.5
}

fn trimmed<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(|s| s.trim().to_string())
}

fn trimmed_opt<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(|s| s.map(|s| s.trim().to_string()))
}

/// Present-but-null becomes `Some(None)` so an update can clear the column
fn nullable_trimmed<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    trimmed_opt(deserializer).map(Some)
}

/// Create tour request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTour {
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(
        min = 10,
        max = 40,
        message = "A tour name must have between 10 and 40 characters"
    ))]
    pub name: String,
    #[validate(range(min = 1, message = "A tour duration must be at least 1 day"))]
    pub duration: i32,
    #[validate(range(min = 1, message = "A tour group size must be at least 1"))]
    pub max_group_size: i32,
    pub difficulty: Difficulty,
    #[serde(default = "default_ratings_average")]
    #[validate(range(min = 1.0, max = 5.0, message = "Rating must be between 1.0 and 5.0"))]
    pub ratings_average: f64,
    #[serde(default)]
    #[validate(range(min = 0, message = "Ratings quantity cannot be negative"))]
    pub ratings_quantity: i32,
    #[validate(range(min = 0.01, message = "A tour price must be greater than 0"))]
    pub price: f64,
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1, message = "A tour must have a summary"))]
    pub summary: String,
    #[serde(default, deserialize_with = "trimmed_opt")]
    pub description: Option<String>,
    #[serde(default)]
    pub start_dates: Vec<DateTime<Utc>>,
}

/// Partial tour update; only writable fields are accepted
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateTour {
    #[serde(default, deserialize_with = "trimmed_opt")]
    #[validate(length(
        min = 10,
        max = 40,
        message = "A tour name must have between 10 and 40 characters"
    ))]
    pub name: Option<String>,
    #[validate(range(min = 1, message = "A tour duration must be at least 1 day"))]
    pub duration: Option<i32>,
    #[validate(range(min = 1, message = "A tour group size must be at least 1"))]
    pub max_group_size: Option<i32>,
    pub difficulty: Option<Difficulty>,
    #[validate(range(min = 1.0, max = 5.0, message = "Rating must be between 1.0 and 5.0"))]
    pub ratings_average: Option<f64>,
    #[validate(range(min = 0, message = "Ratings quantity cannot be negative"))]
    pub ratings_quantity: Option<i32>,
    #[validate(range(min = 0.01, message = "A tour price must be greater than 0"))]
    pub price: Option<f64>,
    #[serde(default, deserialize_with = "trimmed_opt")]
    #[validate(length(min = 1, message = "A tour must have a summary"))]
    pub summary: Option<String>,
    /// `null` clears the description
    #[serde(default, deserialize_with = "nullable_trimmed")]
    #[schema(value_type = Option<String>, nullable)]
    pub description: Option<Option<String>>,
    pub start_dates: Option<Vec<DateTime<Utc>>>,
}

impl UpdateTour {
    /// True when the payload carries no field to change
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.duration.is_none()
            && self.max_group_size.is_none()
            && self.difficulty.is_none()
            && self.ratings_average.is_none()
            && self.ratings_quantity.is_none()
            && self.price.is_none()
            && self.summary.is_none()
            && self.description.is_none()
            && self.start_dates.is_none()
    }
}

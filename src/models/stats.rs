//! Aggregated tour report rows

use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;

/// Per-difficulty statistics row
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TourStats {
    /// Difficulty, upper-cased (e.g. `EASY`)
    pub difficulty: String,
    pub avg_rating: f64,
    pub avg_price: f64,
    pub min_price: f64,
    pub max_price: f64,
    pub max_duration: i32,
    pub max_rating: f64,
    pub total_tours: i64,
    /// Sum of ratings quantities across the group
    pub total_ratings: i64,
}

/// Tour starts within one calendar month
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyPlan {
    /// Month number, 1 = January
    pub month: i32,
    /// Number of tour starts in the month
    pub tours_per_month: i64,
    /// Names of the tours starting that month
    pub tours: Vec<String>,
}

//! Data models for Natours

pub mod stats;
pub mod tour;

// Re-export commonly used types
pub use stats::{MonthlyPlan, TourStats};
pub use tour::{CreateTour, Difficulty, Tour, UpdateTour};

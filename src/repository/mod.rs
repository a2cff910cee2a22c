//! Repository layer for database operations

pub mod tours;

use sqlx::{Pool, Postgres};

/// Main repository struct holding the per-table repositories
#[derive(Clone)]
pub struct Repository {
    pub tours: tours::ToursRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            tours: tours::ToursRepository::new(pool),
        }
    }
}

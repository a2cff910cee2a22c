//! Business logic services

pub mod tours;

use crate::{
    error::{AppError, AppResult},
    repository::Repository,
};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub tours: tours::ToursService,
    repository: Repository,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository) -> Self {
        Self {
            tours: tours::ToursService::new(repository.clone()),
            repository,
        }
    }

    /// Verify the database is reachable
    pub async fn check_database(&self) -> AppResult<()> {
        self.repository
            .tours
            .ping()
            .await
            .map_err(|e| AppError::Unavailable(e.to_string()))
    }
}

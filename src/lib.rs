//! Natours Tours API
//!
//! A REST JSON API over a catalogue of tours: CRUD operations, a query-string
//! driven listing (filtering, sorting, field selection, pagination) and two
//! aggregate reports.

use std::sync::Arc;

use sqlx::PgPool;

pub mod api;
pub mod config;
pub mod error;
pub mod features;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}

impl AppState {
    /// Wire repository and services over an existing pool
    pub fn new(config: AppConfig, pool: PgPool) -> Self {
        let repository = repository::Repository::new(pool);
        Self {
            config: Arc::new(config),
            services: Arc::new(services::Services::new(repository)),
        }
    }
}

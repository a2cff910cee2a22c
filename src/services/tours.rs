//! Tours service

use serde_json::{Map, Value};
use uuid::Uuid;

use crate::{
    error::AppResult,
    features::TourQuery,
    models::{CreateTour, MonthlyPlan, Tour, TourStats, UpdateTour},
    repository::Repository,
};

#[derive(Clone)]
pub struct ToursService {
    repository: Repository,
}

impl ToursService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Run a listing query and project each tour onto the requested fields
    pub async fn list(&self, query: &TourQuery) -> AppResult<Vec<Map<String, Value>>> {
        let tours = self.repository.tours.list(query).await?;
        query.project(tours)
    }

    pub async fn get_by_id(&self, id: Uuid) -> AppResult<Tour> {
        self.repository.tours.get_by_id(id).await
    }

    pub async fn create(&self, data: &CreateTour) -> AppResult<Tour> {
        let tour = self.repository.tours.create(data).await?;
        tracing::info!(tour_id = %tour.id, name = %tour.name, "Tour created");
        Ok(tour)
    }

    pub async fn update(&self, id: Uuid, data: &UpdateTour) -> AppResult<Tour> {
        let tour = self.repository.tours.update(id, data).await?;
        tracing::info!(tour_id = %id, "Tour updated");
        Ok(tour)
    }

    /// Delete a tour. Deleting an unknown id is not an error.
    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        if self.repository.tours.delete(id).await? {
            tracing::info!(tour_id = %id, "Tour deleted");
        } else {
            tracing::debug!(tour_id = %id, "Delete requested for unknown tour");
        }
        Ok(())
    }

    pub async fn stats(&self) -> AppResult<Vec<TourStats>> {
        self.repository.tours.stats().await
    }

    pub async fn monthly_plan(&self, year: i32) -> AppResult<Vec<MonthlyPlan>> {
        self.repository.tours.monthly_plan(year).await
    }
}

//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{health, tours};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Natours API",
        version = "1.0.0",
        description = "Tours catalogue REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Tours
        tours::list_tours,
        tours::get_tour,
        tours::create_tour,
        tours::update_tour,
        tours::delete_tour,
        tours::get_tour_stats,
        tours::get_monthly_plan,
    ),
    components(
        schemas(
            // Tours
            crate::models::tour::Tour,
            crate::models::tour::Difficulty,
            crate::models::tour::CreateTour,
            crate::models::tour::UpdateTour,
            crate::models::stats::TourStats,
            crate::models::stats::MonthlyPlan,
            tours::TourListResponse,
            tours::TourListData,
            tours::TourResponse,
            tours::TourData,
            tours::TourStatsResponse,
            tours::MonthlyPlanResponse,
            tours::MonthlyPlanData,
            // Health
            health::HealthResponse,
            // Envelope & errors
            crate::api::ResponseStatus,
            crate::error::ErrorCode,
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "tours", description = "Tour management and reports")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

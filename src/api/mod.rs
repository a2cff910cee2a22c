//! API handlers for Natours REST endpoints

pub mod health;
pub mod openapi;
pub mod tours;

use std::time::Duration;

use axum::{
    async_trait,
    extract::{FromRequest, Request},
    http::{header, StatusCode, Uri},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{de::DeserializeOwned, Serialize};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use utoipa::ToSchema;
use validator::Validate;

use crate::{error::AppError, AppState};

/// Envelope status shared by every response body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Fail,
    Error,
}

/// JSON body extractor that runs the payload's validators
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        value.validate()?;
        Ok(ValidatedJson(value))
    }
}

/// Fallback for unmatched routes
pub async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("Can't find {} on this server", uri.path()))
}

/// Wrap the bodiless 405 and 408 responses produced by method routing and the
/// timeout layer in the error envelope
pub async fn envelope_bare_errors(req: Request, next: Next) -> Response {
    let target = format!("{} {}", req.method(), req.uri().path());
    let response = next.run(req).await;
    if response.headers().contains_key(header::CONTENT_TYPE) {
        return response;
    }

    match response.status() {
        StatusCode::METHOD_NOT_ALLOWED => {
            let mut enveloped =
                AppError::MethodNotAllowed(format!("{} is not supported", target)).into_response();
            if let Some(allow) = response.headers().get(header::ALLOW) {
                enveloped.headers_mut().insert(header::ALLOW, allow.clone());
            }
            enveloped
        }
        StatusCode::REQUEST_TIMEOUT => AppError::Timeout.into_response(),
        _ => response,
    }
}

/// Create the application router with all routes
pub fn router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let timeout = Duration::from_secs(state.config.server.request_timeout_secs);

    // API v1 routes
    let api_v1 = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Tours
        .route("/tours", get(tours::list_tours).post(tours::create_tour))
        .route(
            "/tours/top-5-cheap",
            get(tours::list_tours).layer(middleware::from_fn(tours::alias_top_tours)),
        )
        .route("/tours/tour-stats", get(tours::get_tour_stats))
        .route("/tours/monthly-plan/:year", get(tours::get_monthly_plan))
        .route(
            "/tours/:id",
            get(tours::get_tour)
                .patch(tours::update_tour)
                .delete(tours::delete_tour),
        )
        .with_state(state);

    // OpenAPI documentation
    let openapi = openapi::create_openapi_router();

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi)
        .fallback(not_found)
        .layer(TimeoutLayer::new(timeout))
        .layer(middleware::from_fn(envelope_bare_errors))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

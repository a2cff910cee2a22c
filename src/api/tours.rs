//! Tour endpoints

use axum::{
    async_trait,
    extract::{
        rejection::PathRejection, FromRequestParts, Path, RawQuery, Request, State,
    },
    http::{request::Parts, uri::PathAndQuery, StatusCode, Uri},
    middleware::Next,
    response::Response,
    Json,
};
use serde::Serialize;
use serde_json::{Map, Value};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    features::{parse_query_string, ApiFeatures},
    models::{CreateTour, MonthlyPlan, Tour, TourStats, UpdateTour},
    AppState,
};

use super::{ResponseStatus, ValidatedJson};

/// Parameters forced by the top tours alias
pub const TOP_TOURS_PARAMS: [(&str, &str); 3] = [
    ("limit", "5"),
    ("sort", "-ratingsAverage,price"),
    ("fields", "name,price,difficulty,ratingsAverage,summary"),
];

/// Tour identifier taken from the `:id` path segment
pub struct TourId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for TourId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state).await?;
        Uuid::parse_str(&raw)
            .map(TourId)
            .map_err(|_| AppError::InvalidId(raw))
    }
}

#[derive(Serialize, ToSchema)]
pub struct TourListData {
    /// Tours, reduced to the requested fields
    #[schema(value_type = Vec<Object>)]
    pub tours: Vec<Map<String, Value>>,
}

#[derive(Serialize, ToSchema)]
pub struct TourListResponse {
    pub status: ResponseStatus,
    /// Number of tours in this page
    pub total: usize,
    pub data: TourListData,
}

#[derive(Serialize, ToSchema)]
pub struct TourData {
    pub tour: Tour,
}

#[derive(Serialize, ToSchema)]
pub struct TourResponse {
    pub status: ResponseStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: TourData,
}

impl TourResponse {
    fn success(tour: Tour) -> Self {
        Self {
            status: ResponseStatus::Success,
            message: None,
            data: TourData { tour },
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct TourStatsResponse {
    pub status: ResponseStatus,
    /// One row per difficulty, best rated first
    pub data: Vec<TourStats>,
}

#[derive(Serialize, ToSchema)]
pub struct MonthlyPlanData {
    pub plan: Vec<MonthlyPlan>,
}

#[derive(Serialize, ToSchema)]
pub struct MonthlyPlanResponse {
    pub status: ResponseStatus,
    pub data: MonthlyPlanData,
}

/// Overwrite `limit`, `sort` and `fields` with the top tours view, keeping filters
pub fn apply_top_tours_alias(params: &mut Vec<(String, String)>) {
    params.retain(|(k, _)| !TOP_TOURS_PARAMS.iter().any(|(name, _)| k == name));
    params.extend(
        TOP_TOURS_PARAMS
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string())),
    );
}

/// Middleware rewriting the request query string before the list handler runs
pub async fn alias_top_tours(mut req: Request, next: Next) -> AppResult<Response> {
    let mut params = parse_query_string(req.uri().query())?;
    apply_top_tours_alias(&mut params);

    let query =
        serde_urlencoded::to_string(&params).map_err(|e| AppError::Internal(e.to_string()))?;
    let path_and_query = format!("{}?{}", req.uri().path(), query)
        .parse::<PathAndQuery>()
        .map_err(|e| AppError::Internal(e.to_string()))?;

    let mut parts = req.uri().clone().into_parts();
    parts.path_and_query = Some(path_and_query);
    *req.uri_mut() = Uri::from_parts(parts).map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(next.run(req).await)
}

/// List tours with filtering, sorting, field selection and pagination.
///
/// Also serves `/tours/top-5-cheap`, where `limit`, `sort` and `fields` are
/// forced to the top tours view.
#[utoipa::path(
    get,
    path = "/tours",
    tag = "tours",
    params(
        ("sort" = Option<String>, Query, description = "Comma-separated sort keys, `-` prefix for descending"),
        ("fields" = Option<String>, Query, description = "Comma-separated fields to return"),
        ("page" = Option<i64>, Query, description = "Page number (default: 1)"),
        ("limit" = Option<i64>, Query, description = "Tours per page (default: 100)"),
        ("price[gte]" = Option<f64>, Query, description = "Example comparison filter; operators: gt, gte, lt, lte")
    ),
    responses(
        (status = 200, description = "List of tours", body = TourListResponse),
        (status = 400, description = "Invalid query parameter", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_tours(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> AppResult<Json<TourListResponse>> {
    let query = ApiFeatures::from_query_string(query.as_deref(), &state.config.api)?
        .filter()?
        .sort()?
        .limit_fields()?
        .paginate()?
        .into_query();

    let tours = state.services.tours.list(&query).await?;

    Ok(Json(TourListResponse {
        status: ResponseStatus::Success,
        total: tours.len(),
        data: TourListData { tours },
    }))
}

/// Get tour by ID
#[utoipa::path(
    get,
    path = "/tours/{id}",
    tag = "tours",
    params(("id" = Uuid, Path, description = "Tour ID")),
    responses(
        (status = 200, description = "Tour details", body = TourResponse),
        (status = 400, description = "Malformed ID", body = crate::error::ErrorResponse),
        (status = 404, description = "Tour not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_tour(
    State(state): State<AppState>,
    TourId(id): TourId,
) -> AppResult<Json<TourResponse>> {
    let tour = state.services.tours.get_by_id(id).await?;
    Ok(Json(TourResponse::success(tour)))
}

/// Create a new tour
#[utoipa::path(
    post,
    path = "/tours",
    tag = "tours",
    request_body = CreateTour,
    responses(
        (status = 201, description = "Tour created", body = TourResponse),
        (status = 400, description = "Invalid data", body = crate::error::ErrorResponse),
        (status = 409, description = "Tour name already used", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_tour(
    State(state): State<AppState>,
    ValidatedJson(data): ValidatedJson<CreateTour>,
) -> AppResult<(StatusCode, Json<TourResponse>)> {
    let tour = state.services.tours.create(&data).await?;
    Ok((
        StatusCode::CREATED,
        Json(TourResponse {
            message: Some("New tour has been created".to_string()),
            ..TourResponse::success(tour)
        }),
    ))
}

/// Update an existing tour
#[utoipa::path(
    patch,
    path = "/tours/{id}",
    tag = "tours",
    params(("id" = Uuid, Path, description = "Tour ID")),
    request_body = UpdateTour,
    responses(
        (status = 200, description = "Tour updated", body = TourResponse),
        (status = 400, description = "Invalid data or ID", body = crate::error::ErrorResponse),
        (status = 404, description = "Tour not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Tour name already used", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_tour(
    State(state): State<AppState>,
    TourId(id): TourId,
    ValidatedJson(data): ValidatedJson<UpdateTour>,
) -> AppResult<Json<TourResponse>> {
    let tour = state.services.tours.update(id, &data).await?;
    Ok(Json(TourResponse::success(tour)))
}

/// Delete a tour
#[utoipa::path(
    delete,
    path = "/tours/{id}",
    tag = "tours",
    params(("id" = Uuid, Path, description = "Tour ID")),
    responses(
        (status = 204, description = "Tour deleted (or did not exist)"),
        (status = 400, description = "Malformed ID", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_tour(
    State(state): State<AppState>,
    TourId(id): TourId,
) -> AppResult<StatusCode> {
    state.services.tours.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Statistics grouped by difficulty
#[utoipa::path(
    get,
    path = "/tours/tour-stats",
    tag = "tours",
    responses(
        (status = 200, description = "Per-difficulty statistics", body = TourStatsResponse)
    )
)]
pub async fn get_tour_stats(State(state): State<AppState>) -> AppResult<Json<TourStatsResponse>> {
    let stats = state.services.tours.stats().await?;
    Ok(Json(TourStatsResponse {
        status: ResponseStatus::Success,
        data: stats,
    }))
}

/// Busiest months of a year by tour starts
#[utoipa::path(
    get,
    path = "/tours/monthly-plan/{year}",
    tag = "tours",
    params(("year" = i32, Path, description = "Calendar year")),
    responses(
        (status = 200, description = "Top 3 months", body = MonthlyPlanResponse),
        (status = 400, description = "Invalid year", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_monthly_plan(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> AppResult<Json<MonthlyPlanResponse>> {
    let Path(raw) = path?;
    let year = raw
        .trim()
        .parse::<i32>()
        .ok()
        .filter(|y| (1..=9999).contains(y))
        .ok_or_else(|| AppError::BadRequest(format!("Invalid year: {}", raw)))?;

    let plan = state.services.tours.monthly_plan(year).await?;
    Ok(Json(MonthlyPlanResponse {
        status: ResponseStatus::Success,
        data: MonthlyPlanData { plan },
    }))
}

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use super::auth::{CurrentUser, restrict_to};
use super::{ApiError, ApiResponse, crud};
use crate::models::Role;
use crate::models::tour::{TourInput, TourUpdate};
use crate::services::geo::{self, Unit};
use crate::services::reports;
use crate::state::AppState;

/// GET /api/v1/tours
pub async fn list_tours(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<ApiResponse<Value>>, ApiError> {
    crud::list(&state.store().tours(), &params, None).await
}

/// GET /api/v1/tours/top-5-cheap
///
/// Canned listing: the five best-rated tours, cheapest first on ties,
/// trimmed to the overview fields.
pub async fn top_cheap_tours(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Value>>, ApiError> {
    let params = HashMap::from([
        ("limit".to_string(), "5".to_string()),
        ("sort".to_string(), "-ratingsAverage,price".to_string()),
        (
            "fields".to_string(),
            "name,price,ratingsAverage,summary,difficulty".to_string(),
        ),
    ]);
    crud::list(&state.store().tours(), &params, None).await
}

/// GET /api/v1/tours/{id}
///
/// Single-tour reads resolve the guide references into user documents.
pub async fn get_tour(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<Value>>, ApiError> {
    let (tour, guides) = state
        .store()
        .tours()
        .get_populated(id)
        .await?
        .ok_or_else(ApiError::document_not_found)?;

    let mut value = serde_json::to_value(tour)
        .map_err(|e| ApiError::internal(format!("Serialization failed: {e}")))?;
    if let Value::Object(map) = &mut value {
        map.insert(
            "guides".to_string(),
            serde_json::to_value(guides)
                .map_err(|e| ApiError::internal(format!("Serialization failed: {e}")))?,
        );
    }

    Ok(Json(ApiResponse::success(value)))
}

/// POST /api/v1/tours
pub async fn create_tour(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Json(payload): Json<TourInput>,
) -> Result<(StatusCode, Json<ApiResponse<crate::db::TourRecord>>), ApiError> {
    restrict_to(&current, &[Role::Admin, Role::LeadGuide])?;
    crud::create_one(&state.store().tours(), payload).await
}

/// PATCH /api/v1/tours/{id}
pub async fn update_tour(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<i32>,
    Json(payload): Json<TourUpdate>,
) -> Result<Json<ApiResponse<crate::db::TourRecord>>, ApiError> {
    restrict_to(&current, &[Role::Admin, Role::LeadGuide])?;
    crud::update_one(&state.store().tours(), id, payload).await
}

/// DELETE /api/v1/tours/{id}
pub async fn delete_tour(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    restrict_to(&current, &[Role::Admin, Role::LeadGuide])?;
    crud::delete_one(&state.store().tours(), id).await
}

/// GET /api/v1/tours/tour-stats
pub async fn get_tour_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<reports::DifficultyStats>>>, ApiError> {
    let rows = state.store().tours().stat_rows().await?;
    Ok(Json(ApiResponse::success(reports::tour_stats(&rows))))
}

/// GET /api/v1/tours/monthly-plan/{year}
pub async fn get_monthly_plan(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path(year): Path<i32>,
) -> Result<Json<ApiResponse<Vec<reports::MonthlyPlanEntry>>>, ApiError> {
    restrict_to(&current, &[Role::Admin, Role::LeadGuide, Role::Guide])?;
    let rows = state.store().tours().plan_rows().await?;
    Ok(Json(ApiResponse::success(reports::monthly_plan(&rows, year))))
}

/// GET /api/v1/tours/tours-within/{distance}/center/{latlong}/unit/{unit}
pub async fn tours_within(
    State(state): State<Arc<AppState>>,
    Path((max_distance, latlong, unit)): Path<(f64, String, String)>,
) -> Result<Json<ApiResponse<Value>>, ApiError> {
    let unit = Unit::from_str(&unit).map_err(ApiError::validation)?;
    let (lat, lng) = geo::parse_latlong(&latlong).map_err(ApiError::validation)?;
    if max_distance < 0.0 {
        return Err(ApiError::validation("Distance must not be negative"));
    }

    let tours: Vec<_> = state
        .store()
        .tours()
        .geo_candidates()
        .await?
        .into_iter()
        .filter(|tour| {
            tour.start_location.as_ref().is_some_and(|point| {
                geo::distance(lat, lng, point.lat, point.lng, unit) <= max_distance
            })
        })
        .collect();

    let count = tours.len();
    let value = serde_json::to_value(tours)
        .map_err(|e| ApiError::internal(format!("Serialization failed: {e}")))?;
    Ok(Json(ApiResponse::success_with_results(count, value)))
}

#[derive(Debug, Serialize)]
pub struct TourDistance {
    pub id: i32,
    pub name: String,
    pub distance: f64,
}

/// GET /api/v1/tours/distances/{latlong}/unit/{unit}
pub async fn get_distances(
    State(state): State<Arc<AppState>>,
    Path((latlong, unit)): Path<(String, String)>,
) -> Result<Json<ApiResponse<Vec<TourDistance>>>, ApiError> {
    let unit = Unit::from_str(&unit).map_err(ApiError::validation)?;
    let (lat, lng) = geo::parse_latlong(&latlong).map_err(ApiError::validation)?;

    let mut distances: Vec<TourDistance> = state
        .store()
        .tours()
        .geo_candidates()
        .await?
        .into_iter()
        .filter_map(|tour| {
            tour.start_location.as_ref().map(|point| TourDistance {
                id: tour.id,
                name: tour.name.clone(),
                distance: geo::distance(lat, lng, point.lat, point.lng, unit),
            })
        })
        .collect();
    distances.sort_by(|a, b| a.distance.total_cmp(&b.distance));

    Ok(Json(ApiResponse::success(distances)))
}

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use super::auth::{CurrentUser, restrict_to};
use super::{ApiError, ApiResponse, crud};
use crate::db::ReviewRecord;
use crate::models::Role;
use crate::models::review::{ReviewInput, ReviewUpdate};
use crate::query::Filter;
use crate::state::AppState;

/// GET /api/v1/reviews
pub async fn list_reviews(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<ApiResponse<Value>>, ApiError> {
    crud::list(&state.store().reviews(), &params, None).await
}

/// GET /api/v1/tours/{tour_id}/reviews
pub async fn list_tour_reviews(
    State(state): State<Arc<AppState>>,
    Path(tour_id): Path<i32>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<ApiResponse<Value>>, ApiError> {
    let filter = Filter::eq("tour", tour_id.to_string());
    crud::list(&state.store().reviews(), &params, Some(filter)).await
}

/// POST /api/v1/reviews
pub async fn create_review(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Json(mut payload): Json<ReviewInput>,
) -> Result<(StatusCode, Json<ApiResponse<ReviewRecord>>), ApiError> {
    restrict_to(&current, &[Role::User])?;
    // The author is always the caller, whatever the body says.
    payload.user = Some(current.id);
    crud::create_one(&state.store().reviews(), payload).await
}

/// POST /api/v1/tours/{tour_id}/reviews
pub async fn create_tour_review(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path(tour_id): Path<i32>,
    Json(mut payload): Json<ReviewInput>,
) -> Result<(StatusCode, Json<ApiResponse<ReviewRecord>>), ApiError> {
    restrict_to(&current, &[Role::User])?;
    payload.tour = Some(tour_id);
    payload.user = Some(current.id);
    crud::create_one(&state.store().reviews(), payload).await
}

/// GET /api/v1/reviews/{id}
pub async fn get_review(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<ReviewRecord>>, ApiError> {
    crud::get_one(&state.store().reviews(), id).await
}

/// Plain users can only touch their own reviews; admins any.
async fn check_ownership(
    state: &AppState,
    current: &CurrentUser,
    review_id: i32,
) -> Result<(), ApiError> {
    restrict_to(current, &[Role::User, Role::Admin])?;
    if current.role == Role::Admin {
        return Ok(());
    }
    let review = state
        .store()
        .reviews()
        .get_model(review_id)
        .await?
        .ok_or_else(ApiError::document_not_found)?;
    if review.user_id == current.id {
        Ok(())
    } else {
        Err(ApiError::Forbidden(
            "You can only modify your own reviews".to_string(),
        ))
    }
}

/// PATCH /api/v1/reviews/{id}
pub async fn update_review(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<i32>,
    Json(payload): Json<ReviewUpdate>,
) -> Result<Json<ApiResponse<ReviewRecord>>, ApiError> {
    check_ownership(&state, &current, id).await?;
    crud::update_one(&state.store().reviews(), id, payload).await
}

/// DELETE /api/v1/reviews/{id}
pub async fn delete_review(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    check_ownership(&state, &current, id).await?;
    crud::delete_one(&state.store().reviews(), id).await
}

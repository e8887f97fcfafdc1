use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use super::auth::{CurrentUser, restrict_to};
use super::{ApiError, ApiResponse, crud};
use crate::db::PublicUser;
use crate::models::user::{UpdateMeInput, UserUpdate};
use crate::models::{Role, Validate};
use crate::state::AppState;

/// GET /api/v1/users/me
pub async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<ApiResponse<PublicUser>>, ApiError> {
    crud::get_one(&state.store().users(), current.id).await
}

/// PATCH /api/v1/users/updateMe
pub async fn update_me(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Json(payload): Json<Value>,
) -> Result<Json<ApiResponse<PublicUser>>, ApiError> {
    if payload.get("password").is_some() || payload.get("confirmPassword").is_some() {
        return Err(ApiError::validation(
            "This route is not for password updates. Please use /updatePassword",
        ));
    }

    let input: UpdateMeInput = serde_json::from_value(payload)
        .map_err(|e| ApiError::validation(format!("Invalid body: {e}")))?;
    input.validate()?;

    let user = state
        .store()
        .users()
        .update_me(current.id, input)
        .await?
        .ok_or_else(ApiError::document_not_found)?;
    Ok(Json(ApiResponse::success(user)))
}

/// DELETE /api/v1/users/deleteMe
pub async fn delete_me(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
) -> Result<StatusCode, ApiError> {
    state.store().users().deactivate(current.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/users
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<ApiResponse<Value>>, ApiError> {
    restrict_to(&current, &[Role::Admin])?;
    crud::list(&state.store().users(), &params, None).await
}

/// GET /api/v1/users/{id}
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<PublicUser>>, ApiError> {
    restrict_to(&current, &[Role::Admin])?;
    crud::get_one(&state.store().users(), id).await
}

/// POST /api/v1/users
///
/// User creation goes through /signup; this stub only exists so the route
/// answers something sensible.
pub async fn create_user(
    Extension(current): Extension<CurrentUser>,
) -> Result<Response, ApiError> {
    restrict_to(&current, &[Role::Admin])?;
    Ok((
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({
            "status": "error",
            "message": "This route is not defined! Please use /signup instead",
        })),
    )
        .into_response())
}

/// PATCH /api/v1/users/{id}
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<i32>,
    Json(payload): Json<UserUpdate>,
) -> Result<Json<ApiResponse<PublicUser>>, ApiError> {
    restrict_to(&current, &[Role::Admin])?;
    crud::update_one(&state.store().users(), id, payload).await
}

/// DELETE /api/v1/users/{id}
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    restrict_to(&current, &[Role::Admin])?;
    crud::delete_one(&state.store().users(), id).await
}

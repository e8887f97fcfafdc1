//! Generic resource handlers.
//!
//! Each resource endpoint delegates to these helpers, parameterized over
//! the repository. The list path runs the full query translation: filters,
//! sort, pagination at the database, field projection at serialization.

use std::collections::HashMap;

use axum::{Json, http::StatusCode};
use serde_json::Value;

use super::{ApiError, ApiResponse};
use crate::db::CrudRepository;
use crate::models::Validate;
use crate::query::{Filter, ListQuery, project_fields};

pub async fn list<R: CrudRepository>(
    repo: &R,
    params: &HashMap<String, String>,
    extra: Option<Filter>,
) -> Result<Json<ApiResponse<Value>>, ApiError> {
    let mut query = ListQuery::from_params(params);
    if let Some(filter) = extra {
        query.filters.push(filter);
    }

    let items = repo.find_all(&query).await?;
    let count = items.len();

    let mut value = serde_json::to_value(items)
        .map_err(|e| ApiError::internal(format!("Serialization failed: {e}")))?;
    if let Some(fields) = &query.fields {
        project_fields(&mut value, fields);
    }

    Ok(Json(ApiResponse::success_with_results(count, value)))
}

pub async fn get_one<R: CrudRepository>(
    repo: &R,
    id: i32,
) -> Result<Json<ApiResponse<R::Output>>, ApiError> {
    let item = repo
        .find_by_id(id)
        .await?
        .ok_or_else(ApiError::document_not_found)?;
    Ok(Json(ApiResponse::success(item)))
}

pub async fn create_one<R: CrudRepository>(
    repo: &R,
    input: R::Create,
) -> Result<(StatusCode, Json<ApiResponse<R::Output>>), ApiError> {
    input.validate()?;
    let item = repo.create(input).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(item))))
}

pub async fn update_one<R: CrudRepository>(
    repo: &R,
    id: i32,
    input: R::Update,
) -> Result<Json<ApiResponse<R::Output>>, ApiError> {
    input.validate()?;
    let item = repo
        .update_by_id(id, input)
        .await?
        .ok_or_else(ApiError::document_not_found)?;
    Ok(Json(ApiResponse::success(item)))
}

pub async fn delete_one<R: CrudRepository>(repo: &R, id: i32) -> Result<StatusCode, ApiError> {
    if repo.delete_by_id(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::document_not_found())
    }
}

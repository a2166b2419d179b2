//! Category catalog endpoints.

use axum::extract::{Path, State};
use axum::routing::{get, put};
use axum::{Json, Router};

use freshline_core::CategoryId;

use crate::error::AppError;
use crate::middleware::RequireAdmin;
use crate::models::{Category, NewCategory, UpdateCategory};
use crate::state::AppState;
use crate::storage::StorageError;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/categories", get(list).post(create))
        .route("/categories/{id}", put(update).delete(delete))
}

/// `GET /api/categories` - public, active categories only.
async fn list(State(state): State<AppState>) -> Result<Json<Vec<Category>>, AppError> {
    Ok(Json(state.storage().categories().await?))
}

/// `POST /api/categories` (admin)
async fn create(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Json(payload): Json<NewCategory>,
) -> Result<Json<Category>, AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::Validation("category name is required".to_owned()));
    }
    Ok(Json(state.storage().create_category(payload).await?))
}

/// `PUT /api/categories/{id}` (admin)
async fn update(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<CategoryId>,
    Json(payload): Json<UpdateCategory>,
) -> Result<Json<Category>, AppError> {
    match state.storage().update_category(id, payload).await {
        Ok(category) => Ok(Json(category)),
        Err(StorageError::NotFound) => Err(AppError::NotFound("category")),
        Err(other) => Err(other.into()),
    }
}

/// `DELETE /api/categories/{id}` (admin) - soft delete.
async fn delete(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<CategoryId>,
) -> Result<Json<serde_json::Value>, AppError> {
    match state.storage().delete_category(id).await {
        Ok(()) => Ok(Json(serde_json::json!({ "message": "category deleted" }))),
        Err(StorageError::NotFound) => Err(AppError::NotFound("category")),
        Err(other) => Err(other.into()),
    }
}

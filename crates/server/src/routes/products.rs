//! Product catalog endpoints.

use axum::extract::{Path, Query, State};
use axum::routing::{get, put};
use axum::{Json, Router};
use serde::Deserialize;

use freshline_core::ProductId;

use crate::error::AppError;
use crate::middleware::RequireAdmin;
use crate::models::{NewProduct, Product, ProductFilter, ProductWithCategory, UpdateProduct};
use crate::state::AppState;
use crate::storage::StorageError;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(list).post(create))
        .route("/products/{id}", get(detail).put(update).delete(delete))
        .route("/products/{id}/status", put(set_status))
}

/// `GET /api/products?categoryId=&search=` - public, active products only.
async fn list(
    State(state): State<AppState>,
    Query(filter): Query<ProductFilter>,
) -> Result<Json<Vec<ProductWithCategory>>, AppError> {
    Ok(Json(state.storage().products(filter).await?))
}

/// `GET /api/products/{id}`
async fn detail(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<ProductWithCategory>, AppError> {
    state
        .storage()
        .product_by_id(id)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("product"))
}

/// `POST /api/products` (admin) - also creates the inventory row.
async fn create(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Json(payload): Json<NewProduct>,
) -> Result<Json<Product>, AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::Validation("product name is required".to_owned()));
    }
    if payload.price.is_sign_negative() {
        return Err(AppError::Validation("price cannot be negative".to_owned()));
    }
    if state.storage().category_by_id(payload.category_id).await?.is_none() {
        return Err(AppError::Validation("unknown category".to_owned()));
    }
    Ok(Json(state.storage().create_product(payload).await?))
}

/// `PUT /api/products/{id}` (admin)
async fn update(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<ProductId>,
    Json(payload): Json<UpdateProduct>,
) -> Result<Json<Product>, AppError> {
    if payload.price.is_some_and(|price| price.is_sign_negative()) {
        return Err(AppError::Validation("price cannot be negative".to_owned()));
    }
    match state.storage().update_product(id, payload).await {
        Ok(product) => Ok(Json(product)),
        Err(StorageError::NotFound) => Err(AppError::NotFound("product")),
        Err(other) => Err(other.into()),
    }
}

/// `DELETE /api/products/{id}` (admin) - soft delete; order history keeps
/// referencing the product.
async fn delete(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<ProductId>,
) -> Result<Json<serde_json::Value>, AppError> {
    match state.storage().delete_product(id).await {
        Ok(()) => Ok(Json(serde_json::json!({ "message": "product deleted" }))),
        Err(StorageError::NotFound) => Err(AppError::NotFound("product")),
        Err(other) => Err(other.into()),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusPayload {
    is_active: bool,
}

/// `PUT /api/products/{id}/status` (admin)
async fn set_status(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<ProductId>,
    Json(payload): Json<StatusPayload>,
) -> Result<Json<Product>, AppError> {
    match state.storage().set_product_status(id, payload.is_active).await {
        Ok(product) => Ok(Json(product)),
        Err(StorageError::NotFound) => Err(AppError::NotFound("product")),
        Err(other) => Err(other.into()),
    }
}

//! Inventory endpoints (admin only).

use axum::extract::{Path, State};
use axum::routing::{get, put};
use axum::{Json, Router};

use freshline_core::ProductId;

use crate::error::AppError;
use crate::middleware::RequireAdmin;
use crate::models::{Inventory, ProductWithCategory, UpdateInventory};
use crate::state::AppState;
use crate::storage::StorageError;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/inventory/low-stock", get(low_stock))
        .route("/inventory/{productId}", put(update))
}

/// `GET /api/inventory/low-stock` (admin)
///
/// Products whose stock is at or below their threshold.
async fn low_stock(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<Vec<ProductWithCategory>>, AppError> {
    Ok(Json(state.storage().low_stock_products().await?))
}

/// `PUT /api/inventory/{productId}` (admin)
async fn update(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(product_id): Path<ProductId>,
    Json(payload): Json<UpdateInventory>,
) -> Result<Json<Inventory>, AppError> {
    if payload.quantity.is_some_and(|q| q < 0) {
        return Err(AppError::Validation("quantity cannot be negative".to_owned()));
    }
    match state.storage().update_inventory(product_id, payload).await {
        Ok(inventory) => Ok(Json(inventory)),
        Err(StorageError::NotFound) => Err(AppError::NotFound("inventory")),
        Err(other) => Err(other.into()),
    }
}

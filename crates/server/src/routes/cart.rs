//! Cart endpoints (authenticated).

use axum::extract::{Path, State};
use axum::routing::{get, put};
use axum::{Json, Router};
use serde::Deserialize;

use freshline_core::{CartItemId, ProductId};

use crate::error::AppError;
use crate::middleware::RequireAuth;
use crate::models::{CartItem, CartItemWithProduct};
use crate::state::AppState;
use crate::storage::StorageError;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/cart", get(list).post(add).delete(clear))
        .route("/cart/{id}", put(set_quantity).delete(remove))
}

/// `GET /api/cart`
async fn list(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<CartItemWithProduct>>, AppError> {
    Ok(Json(state.storage().cart_for_user(user.id).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddPayload {
    product_id: ProductId,
    quantity: i32,
}

/// `POST /api/cart`
///
/// Adding a product already in the cart merges quantities into one row.
async fn add(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(payload): Json<AddPayload>,
) -> Result<Json<CartItem>, AppError> {
    if payload.quantity < 1 {
        return Err(AppError::Validation("quantity must be at least 1".to_owned()));
    }
    let product = state
        .storage()
        .product_by_id(payload.product_id)
        .await?
        .ok_or(AppError::NotFound("product"))?;
    if !product.product.is_active {
        return Err(AppError::Validation("product is not available".to_owned()));
    }

    let item = state
        .storage()
        .add_to_cart(user.id, payload.product_id, payload.quantity)
        .await?;
    Ok(Json(item))
}

#[derive(Debug, Deserialize)]
struct QuantityPayload {
    quantity: i32,
}

/// `PUT /api/cart/{id}`
async fn set_quantity(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    Path(id): Path<CartItemId>,
    Json(payload): Json<QuantityPayload>,
) -> Result<Json<CartItem>, AppError> {
    if payload.quantity < 1 {
        return Err(AppError::Validation("quantity must be at least 1".to_owned()));
    }
    match state.storage().set_cart_quantity(id, payload.quantity).await {
        Ok(item) => Ok(Json(item)),
        Err(StorageError::NotFound) => Err(AppError::NotFound("cart item")),
        Err(other) => Err(other.into()),
    }
}

/// `DELETE /api/cart/{id}` - idempotent.
async fn remove(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    Path(id): Path<CartItemId>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.storage().remove_cart_item(id).await?;
    Ok(Json(serde_json::json!({ "message": "item removed" })))
}

/// `DELETE /api/cart` - idempotent.
async fn clear(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<serde_json::Value>, AppError> {
    state.storage().clear_cart(user.id).await?;
    Ok(Json(serde_json::json!({ "message": "cart cleared" })))
}

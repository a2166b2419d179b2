//! Order endpoints (authenticated).

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};

use freshline_core::{OrderId, Role};

use crate::error::AppError;
use crate::middleware::RequireAuth;
use crate::models::{Order, OrderWithItems};
use crate::services::{OrderService, PlaceOrder};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/orders", get(list).post(checkout))
        .route("/orders/{id}", get(detail))
}

/// `POST /api/orders`
///
/// Turns the caller's cart into an order with snapshotted prices and clears
/// the cart. Concurrent checkouts by the same user serialize; the loser gets
/// the empty-cart error.
async fn checkout(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    Json(payload): Json<PlaceOrder>,
) -> Result<Json<Order>, AppError> {
    let user = state
        .storage()
        .user_by_id(current.id)
        .await?
        .ok_or(AppError::Unauthorized)?;

    let service = OrderService::new(state.storage(), state.checkout_locks());
    let order = service.place_order(&user, payload).await?;
    tracing::info!(order_id = %order.id, order_number = %order.order_number, "order placed");

    Ok(Json(order))
}

/// `GET /api/orders` - caller's own orders, newest first.
async fn list(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<OrderWithItems>>, AppError> {
    Ok(Json(state.storage().orders_for_user(user.id).await?))
}

/// `GET /api/orders/{id}`
///
/// Visible to the owner and to admins; anyone else gets 403.
async fn detail(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderWithItems>, AppError> {
    let order = state
        .storage()
        .order_by_id(id)
        .await?
        .ok_or(AppError::NotFound("order"))?;

    if order.order.user_id != user.id && user.role != Role::Admin {
        return Err(AppError::Forbidden);
    }

    Ok(Json(order))
}

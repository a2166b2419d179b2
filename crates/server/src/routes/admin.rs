//! Admin endpoints: dashboard stats and order management.

use axum::extract::{Path, State};
use axum::routing::{get, put};
use axum::{Json, Router};
use serde::Deserialize;

use freshline_core::{OrderId, OrderStatus};

use crate::error::AppError;
use crate::middleware::RequireAdmin;
use crate::models::{AdminStats, Order, OrderWithItems};
use crate::services::OrderService;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/admin/stats", get(stats))
        .route("/admin/orders", get(all_orders))
        .route("/admin/orders/{id}/status", put(update_status))
}

/// `GET /api/admin/stats`
async fn stats(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<AdminStats>, AppError> {
    let stats = state
        .storage()
        .admin_stats(state.config().revenue_includes_cancelled)
        .await?;
    Ok(Json(stats))
}

/// `GET /api/admin/orders` - every order, newest first.
async fn all_orders(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<Vec<OrderWithItems>>, AppError> {
    Ok(Json(state.storage().all_orders().await?))
}

#[derive(Debug, Deserialize)]
struct StatusPayload {
    status: OrderStatus,
}

/// `PUT /api/admin/orders/{id}/status`
///
/// With strict flow configured, only forward transitions are accepted.
async fn update_status(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<OrderId>,
    Json(payload): Json<StatusPayload>,
) -> Result<Json<Order>, AppError> {
    let service = OrderService::new(state.storage(), state.checkout_locks());
    let order = service
        .update_status(id, payload.status, state.config().strict_status_flow)
        .await?;
    tracing::info!(order_id = %order.id, status = %order.status, "order status updated");
    Ok(Json(order))
}

//! Order entities, payloads, and joined projections.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use freshline_core::{OrderId, OrderItemId, OrderStatus, ProductId, UserId};

use super::catalog::Product;
use super::user::PublicUser;

/// A placed order.
///
/// Immutable after creation except for `status` and `updated_at`.
/// `total_amount` is computed once at checkout and never recomputed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub order_number: String,
    pub status: OrderStatus,
    #[serde(with = "rust_decimal::serde::str")]
    pub total_amount: Decimal,
    pub delivery_address: String,
    /// Unused placeholder; carried for schema compatibility.
    pub delivery_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An order line with price and total snapshotted at checkout.
///
/// Snapshots decouple the order's historical record from later price or
/// product edits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: i32,
    #[serde(with = "rust_decimal::serde::str")]
    pub price: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub total: Decimal,
}

/// A new order, ready for storage.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: UserId,
    pub order_number: String,
    pub status: OrderStatus,
    pub total_amount: Decimal,
    pub delivery_address: String,
    pub delivery_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

/// A new order line (the order id is supplied by the storage call).
#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub product_id: ProductId,
    pub quantity: i32,
    pub price: Decimal,
    pub total: Decimal,
}

/// An order line joined with its product (live data, for display).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItemWithProduct {
    #[serde(flatten)]
    pub item: OrderItem,
    pub product: Product,
}

/// An order joined with its lines and the owning user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItemWithProduct>,
    pub user: PublicUser,
}

/// Aggregate dashboard numbers for the admin panel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStats {
    /// All orders, regardless of status.
    pub total_orders: i64,
    /// Sum of order totals. Whether cancelled orders count is configurable.
    #[serde(with = "rust_decimal::serde::str")]
    pub total_revenue: Decimal,
    /// Active products only.
    pub total_products: i64,
    /// Users with the customer role.
    pub total_customers: i64,
    /// The five most recently created orders, fully joined.
    pub recent_orders: Vec<OrderWithItems>,
}

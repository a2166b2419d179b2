//! Cart entities and the joined cart read model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use freshline_core::{CartItemId, ProductId, UserId};

use super::catalog::{Category, Product};

/// One cart row. Unique per `(user_id, product_id)`: adding the same product
/// again merges into the existing row instead of creating a duplicate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub id: CartItemId,
    pub user_id: UserId,
    pub product_id: ProductId,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The live product data attached to a cart row.
///
/// Live, not point-in-time: price changes are reflected here until checkout
/// snapshots them into order items.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartProduct {
    #[serde(flatten)]
    pub product: Product,
    pub category: Category,
}

/// A cart row joined with its product and the product's category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItemWithProduct {
    #[serde(flatten)]
    pub item: CartItem,
    pub product: CartProduct,
}

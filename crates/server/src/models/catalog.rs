//! Category, product, and inventory entities with their joined projections.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use freshline_core::{CategoryId, InventoryId, ProductId};

/// A product category. Soft-deleted only: deletion flips `is_active`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub description: Option<String>,
    pub icon: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Payload for creating a category.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCategory {
    pub name: String,
    pub description: Option<String>,
    pub icon: String,
}

/// Partial category update. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCategory {
    pub name: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub is_active: Option<bool>,
}

/// A sellable product. Owned by exactly one category, soft-deleted only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    pub category_id: CategoryId,
    /// Unit price, exact decimal with 2 fractional digits.
    #[serde(with = "rust_decimal::serde::str")]
    pub price: Decimal,
    /// Unit label shown next to quantities (kg, pieces, liters, ...).
    pub unit: String,
    pub min_quantity: i32,
    pub max_quantity: Option<i32>,
    pub image_url: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for creating a product.
///
/// Creating a product also creates its inventory row with zero stock.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub category_id: CategoryId,
    #[serde(with = "rust_decimal::serde::str")]
    pub price: Decimal,
    pub unit: String,
    #[serde(default = "default_min_quantity")]
    pub min_quantity: i32,
    pub max_quantity: Option<i32>,
    pub image_url: Option<String>,
}

const fn default_min_quantity() -> i32 {
    1
}

/// Partial product update. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProduct {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<CategoryId>,
    #[serde(default, with = "rust_decimal::serde::str_option")]
    pub price: Option<Decimal>,
    pub unit: Option<String>,
    pub min_quantity: Option<i32>,
    pub max_quantity: Option<i32>,
    pub image_url: Option<String>,
    pub is_active: Option<bool>,
}

/// Stock record, one per product.
///
/// `reserved_quantity` is carried for schema compatibility but no business
/// logic consults it; there is no reservation step.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Inventory {
    pub id: InventoryId,
    pub product_id: ProductId,
    pub quantity: i32,
    pub reserved_quantity: i32,
    pub low_stock_threshold: i32,
    pub updated_at: DateTime<Utc>,
}

impl Inventory {
    /// A product is low on stock iff `quantity <= low_stock_threshold`.
    #[must_use]
    pub const fn is_low_stock(&self) -> bool {
        self.quantity <= self.low_stock_threshold
    }
}

/// Partial inventory update. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInventory {
    pub quantity: Option<i32>,
    pub reserved_quantity: Option<i32>,
    pub low_stock_threshold: Option<i32>,
}

/// Listing filter for the product read model.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductFilter {
    pub category_id: Option<CategoryId>,
    /// Case-insensitive substring match on the product name.
    pub search: Option<String>,
}

/// A product joined with its owning category and inventory record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductWithCategory {
    #[serde(flatten)]
    pub product: Product,
    pub category: Category,
    pub inventory: Inventory,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn inventory(quantity: i32, threshold: i32) -> Inventory {
        Inventory {
            id: InventoryId::new(1),
            product_id: ProductId::new(1),
            quantity,
            reserved_quantity: 0,
            low_stock_threshold: threshold,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_low_stock_boundary() {
        assert!(inventory(10, 10).is_low_stock());
        assert!(inventory(0, 10).is_low_stock());
        assert!(!inventory(11, 10).is_low_stock());
    }

    #[test]
    fn test_price_serializes_as_string() {
        let product = Product {
            id: ProductId::new(1),
            name: "Fresh Apples".to_owned(),
            description: None,
            category_id: CategoryId::new(1),
            price: Decimal::new(12000, 2),
            unit: "kg".to_owned(),
            min_quantity: 1,
            max_quantity: Some(10),
            image_url: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let json = serde_json::to_value(&product).unwrap();
        assert_eq!(json["price"], "120.00");
        assert_eq!(json["categoryId"], 1);
    }

    #[test]
    fn test_new_product_defaults_min_quantity() {
        let new: NewProduct = serde_json::from_value(serde_json::json!({
            "name": "Bananas",
            "categoryId": 2,
            "price": "60.00",
            "unit": "dozen"
        }))
        .unwrap();

        assert_eq!(new.min_quantity, 1);
        assert_eq!(new.price, Decimal::new(6000, 2));
    }
}

//! Demo seed data for the in-memory backend.
//!
//! Mirrors what a small grocery wholesaler's catalog looks like on day one:
//! two known accounts, three categories, and a handful of products with
//! stock levels that exercise the low-stock report.

use chrono::Utc;
use rust_decimal::Decimal;

use freshline_core::{CategoryId, Email, InventoryId, ProductId, Role, UserId};

use crate::models::{Category, Inventory, Product, User};

use super::memory::Inner;
use super::{Storage, StorageError};

/// Demo admin login: `admin@freshline.test` / `admin123`.
pub const DEMO_ADMIN_EMAIL: &str = "admin@freshline.test";
/// Demo customer login: `customer@example.com` / `customer123`.
pub const DEMO_CUSTOMER_EMAIL: &str = "customer@example.com";

/// Populate `inner` with the demo dataset.
///
/// `hasher` provides the contract's password primitive so seeded accounts use
/// the same hashing as registered ones.
pub(crate) fn seed_demo(hasher: &dyn Storage, inner: &mut Inner) -> Result<(), StorageError> {
    let now = Utc::now();

    let admin_email = Email::parse(DEMO_ADMIN_EMAIL)
        .map_err(|e| StorageError::Corrupt(format!("demo admin email: {e}")))?;
    let customer_email = Email::parse(DEMO_CUSTOMER_EMAIL)
        .map_err(|e| StorageError::Corrupt(format!("demo customer email: {e}")))?;

    let admin_id = UserId::new(inner.next_id());
    inner.users.push(User {
        id: admin_id,
        email: admin_email,
        password_hash: hasher.hash_password("admin123")?,
        first_name: "Asha".to_owned(),
        last_name: "Menon".to_owned(),
        business_name: "Freshline".to_owned(),
        phone: "9800000001".to_owned(),
        address: "Warehouse 4, Market Yard".to_owned(),
        city: "Mumbai".to_owned(),
        state: "MH".to_owned(),
        pincode: "400001".to_owned(),
        role: Role::Admin,
        is_active: true,
        created_at: now,
        updated_at: now,
    });
    let customer_id = UserId::new(inner.next_id());
    inner.users.push(User {
        id: customer_id,
        email: customer_email,
        password_hash: hasher.hash_password("customer123")?,
        first_name: "Ravi".to_owned(),
        last_name: "Sharma".to_owned(),
        business_name: "Sharma General Store".to_owned(),
        phone: "9800000002".to_owned(),
        address: "12 Station Road".to_owned(),
        city: "Pune".to_owned(),
        state: "MH".to_owned(),
        pincode: "411001".to_owned(),
        role: Role::Customer,
        is_active: true,
        created_at: now,
        updated_at: now,
    });

    let fruits = push_category(inner, "Fruits", "Seasonal fresh fruit", "apple");
    let vegetables = push_category(inner, "Vegetables", "Daily fresh vegetables", "carrot");
    let dairy = push_category(inner, "Dairy", "Milk and milk products", "milk");

    push_product(inner, "Fresh Apples", fruits, dec(12000), "kg", 50);
    push_product(inner, "Bananas", fruits, dec(6000), "dozen", 80);
    push_product(inner, "Fresh Tomatoes", vegetables, dec(4000), "kg", 100);
    push_product(inner, "Onions", vegetables, dec(3500), "kg", 8);
    push_product(inner, "Fresh Milk", dairy, dec(5500), "liter", 60);
    push_product(inner, "Paneer", dairy, dec(32000), "kg", 5);

    Ok(())
}

// Prices carry two fractional digits, e.g. dec(12000) is 120.00.
fn dec(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

fn push_category(inner: &mut Inner, name: &str, description: &str, icon: &str) -> CategoryId {
    let category = Category {
        id: CategoryId::new(inner.next_id()),
        name: name.to_owned(),
        description: Some(description.to_owned()),
        icon: icon.to_owned(),
        is_active: true,
        created_at: Utc::now(),
    };
    let id = category.id;
    inner.categories.push(category);
    id
}

fn push_product(
    inner: &mut Inner,
    name: &str,
    category_id: CategoryId,
    price: Decimal,
    unit: &str,
    stock: i32,
) {
    let now = Utc::now();
    let product = Product {
        id: ProductId::new(inner.next_id()),
        name: name.to_owned(),
        description: None,
        category_id,
        price,
        unit: unit.to_owned(),
        min_quantity: 1,
        max_quantity: None,
        image_url: None,
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    let inventory_id = InventoryId::new(inner.next_id());
    inner.inventory.push(Inventory {
        id: inventory_id,
        product_id: product.id,
        quantity: stock,
        reserved_quantity: 0,
        low_stock_threshold: 10,
        updated_at: now,
    });
    inner.products.push(product);
}

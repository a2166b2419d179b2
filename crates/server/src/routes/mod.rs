//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! # Auth
//! POST   /api/auth/register          - Create an account (logs in)
//! POST   /api/auth/login             - Log in
//! POST   /api/auth/logout            - Log out
//! GET    /api/auth/me                - Current user profile
//!
//! # Catalog
//! GET    /api/categories             - Active categories
//! POST   /api/categories             - Create category (admin)
//! PUT    /api/categories/{id}        - Update category (admin)
//! DELETE /api/categories/{id}        - Soft-delete category (admin)
//! GET    /api/products               - Active products (?categoryId=&search=)
//! GET    /api/products/{id}          - Product detail
//! POST   /api/products               - Create product (admin)
//! PUT    /api/products/{id}          - Update product (admin)
//! DELETE /api/products/{id}          - Soft-delete product (admin)
//! PUT    /api/products/{id}/status   - Toggle product active flag (admin)
//!
//! # Inventory (admin)
//! GET    /api/inventory/low-stock    - Products at or below threshold
//! PUT    /api/inventory/{productId}  - Update stock levels
//!
//! # Cart (authenticated)
//! GET    /api/cart                   - Cart with live product data
//! POST   /api/cart                   - Add to cart (merges duplicates)
//! PUT    /api/cart/{id}              - Set row quantity
//! DELETE /api/cart/{id}              - Remove row
//! DELETE /api/cart                   - Clear cart
//!
//! # Orders (authenticated)
//! POST   /api/orders                 - Checkout the cart
//! GET    /api/orders                 - Own orders, newest first
//! GET    /api/orders/{id}            - Order detail (owner or admin)
//!
//! # Admin
//! GET    /api/admin/orders           - All orders
//! PUT    /api/admin/orders/{id}/status - Update order status
//! GET    /api/admin/stats            - Dashboard aggregates
//! ```

pub mod admin;
pub mod auth;
pub mod cart;
pub mod categories;
pub mod inventory;
pub mod orders;
pub mod products;

use axum::Router;

use crate::state::AppState;

/// All API routes, nested under `/api`.
pub fn api_routes() -> Router<AppState> {
    Router::new().nest(
        "/api",
        Router::new()
            .merge(auth::routes())
            .merge(categories::routes())
            .merge(products::routes())
            .merge(inventory::routes())
            .merge(cart::routes())
            .merge(orders::routes())
            .merge(admin::routes()),
    )
}

//! Storage contract and its two conformers.
//!
//! [`Storage`] is the single persistence abstraction for the whole API:
//! user, catalog, inventory, cart, and order operations plus the admin
//! aggregates. Two backends satisfy the contract identically:
//!
//! - [`PgStorage`] — `PostgreSQL` via sqlx (the persistent backend),
//! - [`MemStorage`] — an in-memory store seeded with demo fixtures.
//!
//! The backend is selected at process startup by configuration; everything
//! above this module is written against `Arc<dyn Storage>` and never knows
//! which one it is talking to.

pub mod fixtures;
pub mod memory;
pub mod postgres;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use async_trait::async_trait;
use thiserror::Error;

use freshline_core::{CartItemId, CategoryId, Email, OrderId, OrderStatus, ProductId, UserId};

use crate::models::{
    AdminStats, CartItem, CartItemWithProduct, Category, Inventory, NewCategory, NewOrder,
    NewOrderItem, NewProduct, NewUser, Order, OrderItem, OrderWithItems, Product, ProductFilter,
    ProductWithCategory, UpdateCategory, UpdateInventory, UpdateProduct, UpdateUser, User,
};

pub use memory::MemStorage;
pub use postgres::PgStorage;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Data in the store is corrupted or invalid.
    #[error("data corruption: {0}")]
    Corrupt(String),

    /// The backing store itself failed.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Self::NotFound,
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                Self::Conflict(db_err.to_string())
            }
            other => Self::Unavailable(other.to_string()),
        }
    }
}

/// The persistence contract.
///
/// Both conformers must behave identically; the contract test suite in
/// `tests/storage_contract.rs` pins the shared semantics.
#[async_trait]
pub trait Storage: Send + Sync {
    // =========================================================================
    // Users
    // =========================================================================

    /// Create a user from a validated registration.
    ///
    /// Hashes the password through [`Storage::hash_password`] and assigns the
    /// role: the first user of a fresh store becomes admin, all later users
    /// are customers.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the email is already registered.
    async fn create_user(&self, new: NewUser) -> Result<User, StorageError>;

    /// Look up a user by email.
    async fn user_by_email(&self, email: &Email) -> Result<Option<User>, StorageError>;

    /// Look up a user by id.
    async fn user_by_id(&self, id: UserId) -> Result<Option<User>, StorageError>;

    /// Apply a partial profile update.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the user doesn't exist.
    async fn update_user(&self, id: UserId, update: UpdateUser) -> Result<User, StorageError>;

    // =========================================================================
    // Categories
    // =========================================================================

    /// Active categories, ordered by name.
    async fn categories(&self) -> Result<Vec<Category>, StorageError>;

    /// Look up a category by id (active or not).
    async fn category_by_id(&self, id: CategoryId) -> Result<Option<Category>, StorageError>;

    /// Create a category.
    async fn create_category(&self, new: NewCategory) -> Result<Category, StorageError>;

    /// Apply a partial category update.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the category doesn't exist.
    async fn update_category(
        &self,
        id: CategoryId,
        update: UpdateCategory,
    ) -> Result<Category, StorageError>;

    /// Soft-delete a category (sets `is_active = false`, never removes rows).
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the category doesn't exist.
    async fn delete_category(&self, id: CategoryId) -> Result<(), StorageError>;

    // =========================================================================
    // Products
    // =========================================================================

    /// Active products joined with category and inventory, ordered by name.
    ///
    /// The filter narrows by owning category and/or a case-insensitive
    /// substring match on the product name.
    async fn products(
        &self,
        filter: ProductFilter,
    ) -> Result<Vec<ProductWithCategory>, StorageError>;

    /// Look up a product by id (active or not), joined.
    async fn product_by_id(
        &self,
        id: ProductId,
    ) -> Result<Option<ProductWithCategory>, StorageError>;

    /// Create a product and its inventory row (zero stock).
    async fn create_product(&self, new: NewProduct) -> Result<Product, StorageError>;

    /// Apply a partial product update.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the product doesn't exist.
    async fn update_product(
        &self,
        id: ProductId,
        update: UpdateProduct,
    ) -> Result<Product, StorageError>;

    /// Soft-delete a product.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the product doesn't exist.
    async fn delete_product(&self, id: ProductId) -> Result<(), StorageError>;

    /// Flip a product's active flag.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the product doesn't exist.
    async fn set_product_status(
        &self,
        id: ProductId,
        is_active: bool,
    ) -> Result<Product, StorageError>;

    // =========================================================================
    // Inventory
    // =========================================================================

    /// Look up the inventory record for a product.
    async fn inventory_by_product(
        &self,
        product_id: ProductId,
    ) -> Result<Option<Inventory>, StorageError>;

    /// Apply a partial inventory update, keyed by product id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if no inventory row exists.
    async fn update_inventory(
        &self,
        product_id: ProductId,
        update: UpdateInventory,
    ) -> Result<Inventory, StorageError>;

    /// Active products whose stock is at or below their low-stock threshold,
    /// joined with category and inventory. The boundary case
    /// `quantity == threshold` is included.
    async fn low_stock_products(&self) -> Result<Vec<ProductWithCategory>, StorageError>;

    // =========================================================================
    // Cart
    // =========================================================================

    /// A user's cart rows joined with live product and category data,
    /// newest first.
    async fn cart_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<CartItemWithProduct>, StorageError>;

    /// Add to the cart with merge semantics.
    ///
    /// If a row for `(user_id, product_id)` exists, its quantity is
    /// incremented by `quantity` and its timestamp refreshed; otherwise a new
    /// row is inserted. The merge is a single atomic upsert, never a
    /// read-then-write.
    async fn add_to_cart(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<CartItem, StorageError>;

    /// Overwrite a cart row's quantity. Callers reject `quantity < 1` before
    /// getting here.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the row doesn't exist.
    async fn set_cart_quantity(
        &self,
        id: CartItemId,
        quantity: i32,
    ) -> Result<CartItem, StorageError>;

    /// Remove a cart row. Idempotent.
    async fn remove_cart_item(&self, id: CartItemId) -> Result<(), StorageError>;

    /// Remove all of a user's cart rows. Idempotent.
    async fn clear_cart(&self, user_id: UserId) -> Result<(), StorageError>;

    // =========================================================================
    // Orders
    // =========================================================================

    /// Insert an order row.
    async fn create_order(&self, new: NewOrder) -> Result<Order, StorageError>;

    /// Bulk-insert order lines for an existing order.
    async fn create_order_items(
        &self,
        order_id: OrderId,
        items: Vec<NewOrderItem>,
    ) -> Result<Vec<OrderItem>, StorageError>;

    /// Atomically create an order with its lines and clear the user's cart.
    ///
    /// This is the checkout step: either the order, all of its items, and
    /// the cart clear land together, or none of them do. No order with zero
    /// items can exist afterwards.
    async fn place_order(
        &self,
        new: NewOrder,
        items: Vec<NewOrderItem>,
    ) -> Result<Order, StorageError>;

    /// A user's orders, newest first, joined with lines and the owning user.
    async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<OrderWithItems>, StorageError>;

    /// Look up an order by id, joined.
    async fn order_by_id(&self, id: OrderId) -> Result<Option<OrderWithItems>, StorageError>;

    /// All orders, newest first, joined.
    async fn all_orders(&self) -> Result<Vec<OrderWithItems>, StorageError>;

    /// Set an order's status and refresh its `updated_at`.
    ///
    /// Storage accepts any transition; the strict-flow policy, when enabled,
    /// is enforced above this layer.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the order doesn't exist.
    async fn set_order_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Order, StorageError>;

    // =========================================================================
    // Admin aggregates
    // =========================================================================

    /// Dashboard aggregates: order/product/customer counts, revenue sum, and
    /// the five most recent orders.
    ///
    /// `revenue_includes_cancelled` selects whether cancelled orders count
    /// toward `total_revenue`.
    async fn admin_stats(
        &self,
        revenue_includes_cancelled: bool,
    ) -> Result<AdminStats, StorageError>;

    // =========================================================================
    // Password primitives
    // =========================================================================

    /// Hash a password with Argon2id and a fresh random salt.
    ///
    /// Provided so both conformers share exactly one implementation.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Unavailable` if hashing fails.
    fn hash_password(&self, password: &str) -> Result<String, StorageError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| StorageError::Unavailable(format!("password hashing failed: {e}")))
    }

    /// Verify a password against a stored hash.
    ///
    /// The comparison runs through argon2's verifier, which is safe against
    /// timing attacks. An unparseable hash verifies as `false`.
    fn verify_password(&self, password: &str, hash: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(hash) else {
            return false;
        };
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }
}

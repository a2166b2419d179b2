//! `PostgreSQL` storage backend.
//!
//! Queries go through runtime-checked `sqlx::query_as` with explicit row
//! structs; role and status columns are stored as TEXT and parsed on the way
//! out, so a malformed value surfaces as [`StorageError::Corrupt`] instead of
//! leaking into handlers.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use sqlx::postgres::{PgPool, PgPoolOptions};

use freshline_core::{
    CartItemId, CategoryId, Email, InventoryId, OrderId, OrderItemId, OrderStatus, ProductId,
    Role, UserId,
};

use crate::models::{
    AdminStats, CartItem, CartItemWithProduct, CartProduct, Category, Inventory, NewCategory,
    NewOrder, NewOrderItem, NewProduct, NewUser, Order, OrderItem, OrderItemWithProduct,
    OrderWithItems, Product, ProductFilter, ProductWithCategory, UpdateCategory, UpdateInventory,
    UpdateProduct, UpdateUser, User,
};

use super::{Storage, StorageError};

/// Create a connection pool and run pending migrations.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn create_pool(database_url: &SecretString) -> Result<PgPool, StorageError> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await?;

    sqlx::migrate!()
        .run(&pool)
        .await
        .map_err(|e| StorageError::Unavailable(format!("migration failed: {e}")))?;

    Ok(pool)
}

/// Storage backed by `PostgreSQL`.
#[derive(Clone)]
pub struct PgStorage {
    pool: PgPool,
}

impl PgStorage {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Fetch joined rows for a set of orders and group them by order id.
    async fn items_for_orders(
        &self,
        order_ids: &[i32],
    ) -> Result<HashMap<OrderId, Vec<OrderItemWithProduct>>, StorageError> {
        let rows = sqlx::query_as::<_, OrderItemProductRow>(
            r"
            SELECT oi.id, oi.order_id, oi.product_id, oi.quantity, oi.price, oi.total,
                   p.id AS p_id, p.name AS p_name, p.description AS p_description,
                   p.category_id AS p_category_id, p.price AS p_price, p.unit AS p_unit,
                   p.min_quantity AS p_min_quantity, p.max_quantity AS p_max_quantity,
                   p.image_url AS p_image_url, p.is_active AS p_is_active,
                   p.created_at AS p_created_at, p.updated_at AS p_updated_at
            FROM order_items oi
            JOIN products p ON p.id = oi.product_id
            WHERE oi.order_id = ANY($1)
            ORDER BY oi.id
            ",
        )
        .bind(order_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut grouped: HashMap<OrderId, Vec<OrderItemWithProduct>> = HashMap::new();
        for row in rows {
            let item = OrderItemWithProduct::from(row);
            grouped.entry(item.item.order_id).or_default().push(item);
        }
        Ok(grouped)
    }

    /// Attach lines and owners to bare order rows, preserving order.
    async fn hydrate_orders(
        &self,
        rows: Vec<OrderUserRow>,
    ) -> Result<Vec<OrderWithItems>, StorageError> {
        let ids: Vec<i32> = rows.iter().map(|r| r.id.as_i32()).collect();
        let mut items = self.items_for_orders(&ids).await?;

        rows.into_iter()
            .map(|row| {
                let (order, user) = row.try_into_parts()?;
                let items = items.remove(&order.id).unwrap_or_default();
                Ok(OrderWithItems { order, items, user })
            })
            .collect()
    }
}

// =============================================================================
// Row types
// =============================================================================

#[derive(sqlx::FromRow)]
struct UserRow {
    id: UserId,
    email: Email,
    password_hash: String,
    first_name: String,
    last_name: String,
    business_name: String,
    phone: String,
    address: String,
    city: String,
    state: String,
    pincode: String,
    role: String,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = StorageError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role: Role = row
            .role
            .parse()
            .map_err(|e| StorageError::Corrupt(format!("user {}: {e}", row.id)))?;
        Ok(Self {
            id: row.id,
            email: row.email,
            password_hash: row.password_hash,
            first_name: row.first_name,
            last_name: row.last_name,
            business_name: row.business_name,
            phone: row.phone,
            address: row.address,
            city: row.city,
            state: row.state,
            pincode: row.pincode,
            role,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CategoryRow {
    id: CategoryId,
    name: String,
    description: Option<String>,
    icon: String,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            icon: row.icon,
            is_active: row.is_active,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    name: String,
    description: Option<String>,
    category_id: CategoryId,
    price: Decimal,
    unit: String,
    min_quantity: i32,
    max_quantity: Option<i32>,
    image_url: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            category_id: row.category_id,
            price: row.price,
            unit: row.unit,
            min_quantity: row.min_quantity,
            max_quantity: row.max_quantity,
            image_url: row.image_url,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct InventoryRow {
    id: InventoryId,
    product_id: ProductId,
    quantity: i32,
    reserved_quantity: i32,
    low_stock_threshold: i32,
    updated_at: DateTime<Utc>,
}

impl From<InventoryRow> for Inventory {
    fn from(row: InventoryRow) -> Self {
        Self {
            id: row.id,
            product_id: row.product_id,
            quantity: row.quantity,
            reserved_quantity: row.reserved_quantity,
            low_stock_threshold: row.low_stock_threshold,
            updated_at: row.updated_at,
        }
    }
}

/// Product joined with category and inventory, columns aliased apart.
#[derive(sqlx::FromRow)]
struct ProductJoinedRow {
    id: ProductId,
    name: String,
    description: Option<String>,
    category_id: CategoryId,
    price: Decimal,
    unit: String,
    min_quantity: i32,
    max_quantity: Option<i32>,
    image_url: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    c_id: CategoryId,
    c_name: String,
    c_description: Option<String>,
    c_icon: String,
    c_is_active: bool,
    c_created_at: DateTime<Utc>,
    i_id: InventoryId,
    i_quantity: i32,
    i_reserved_quantity: i32,
    i_low_stock_threshold: i32,
    i_updated_at: DateTime<Utc>,
}

impl From<ProductJoinedRow> for ProductWithCategory {
    fn from(row: ProductJoinedRow) -> Self {
        Self {
            product: Product {
                id: row.id,
                name: row.name,
                description: row.description,
                category_id: row.category_id,
                price: row.price,
                unit: row.unit,
                min_quantity: row.min_quantity,
                max_quantity: row.max_quantity,
                image_url: row.image_url,
                is_active: row.is_active,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
            category: Category {
                id: row.c_id,
                name: row.c_name,
                description: row.c_description,
                icon: row.c_icon,
                is_active: row.c_is_active,
                created_at: row.c_created_at,
            },
            inventory: Inventory {
                id: row.i_id,
                product_id: row.id,
                quantity: row.i_quantity,
                reserved_quantity: row.i_reserved_quantity,
                low_stock_threshold: row.i_low_stock_threshold,
                updated_at: row.i_updated_at,
            },
        }
    }
}

const PRODUCT_JOINED_COLUMNS: &str = r"
    p.id, p.name, p.description, p.category_id, p.price, p.unit,
    p.min_quantity, p.max_quantity, p.image_url, p.is_active,
    p.created_at, p.updated_at,
    c.id AS c_id, c.name AS c_name, c.description AS c_description,
    c.icon AS c_icon, c.is_active AS c_is_active, c.created_at AS c_created_at,
    i.id AS i_id, i.quantity AS i_quantity, i.reserved_quantity AS i_reserved_quantity,
    i.low_stock_threshold AS i_low_stock_threshold, i.updated_at AS i_updated_at
";

#[derive(sqlx::FromRow)]
struct CartItemRow {
    id: CartItemId,
    user_id: UserId,
    product_id: ProductId,
    quantity: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CartItemRow> for CartItem {
    fn from(row: CartItemRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            product_id: row.product_id,
            quantity: row.quantity,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Cart row joined with product and its category.
#[derive(sqlx::FromRow)]
struct CartJoinedRow {
    id: CartItemId,
    user_id: UserId,
    product_id: ProductId,
    quantity: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    p_id: ProductId,
    p_name: String,
    p_description: Option<String>,
    p_category_id: CategoryId,
    p_price: Decimal,
    p_unit: String,
    p_min_quantity: i32,
    p_max_quantity: Option<i32>,
    p_image_url: Option<String>,
    p_is_active: bool,
    p_created_at: DateTime<Utc>,
    p_updated_at: DateTime<Utc>,
    c_id: CategoryId,
    c_name: String,
    c_description: Option<String>,
    c_icon: String,
    c_is_active: bool,
    c_created_at: DateTime<Utc>,
}

impl From<CartJoinedRow> for CartItemWithProduct {
    fn from(row: CartJoinedRow) -> Self {
        Self {
            item: CartItem {
                id: row.id,
                user_id: row.user_id,
                product_id: row.product_id,
                quantity: row.quantity,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
            product: CartProduct {
                product: Product {
                    id: row.p_id,
                    name: row.p_name,
                    description: row.p_description,
                    category_id: row.p_category_id,
                    price: row.p_price,
                    unit: row.p_unit,
                    min_quantity: row.p_min_quantity,
                    max_quantity: row.p_max_quantity,
                    image_url: row.p_image_url,
                    is_active: row.p_is_active,
                    created_at: row.p_created_at,
                    updated_at: row.p_updated_at,
                },
                category: Category {
                    id: row.c_id,
                    name: row.c_name,
                    description: row.c_description,
                    icon: row.c_icon,
                    is_active: row.c_is_active,
                    created_at: row.c_created_at,
                },
            },
        }
    }
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    user_id: UserId,
    order_number: String,
    status: String,
    total_amount: Decimal,
    delivery_address: String,
    delivery_date: Option<DateTime<Utc>>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = StorageError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let status: OrderStatus = row
            .status
            .parse()
            .map_err(|e| StorageError::Corrupt(format!("order {}: {e}", row.id)))?;
        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            order_number: row.order_number,
            status,
            total_amount: row.total_amount,
            delivery_address: row.delivery_address,
            delivery_date: row.delivery_date,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct OrderItemRow {
    id: OrderItemId,
    order_id: OrderId,
    product_id: ProductId,
    quantity: i32,
    price: Decimal,
    total: Decimal,
}

impl From<OrderItemRow> for OrderItem {
    fn from(row: OrderItemRow) -> Self {
        Self {
            id: row.id,
            order_id: row.order_id,
            product_id: row.product_id,
            quantity: row.quantity,
            price: row.price,
            total: row.total,
        }
    }
}

/// Order joined with its owning user.
#[derive(sqlx::FromRow)]
struct OrderUserRow {
    id: OrderId,
    user_id: UserId,
    order_number: String,
    status: String,
    total_amount: Decimal,
    delivery_address: String,
    delivery_date: Option<DateTime<Utc>>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    u_email: Email,
    u_first_name: String,
    u_last_name: String,
    u_business_name: String,
    u_phone: String,
    u_address: String,
    u_city: String,
    u_state: String,
    u_pincode: String,
    u_role: String,
    u_is_active: bool,
    u_created_at: DateTime<Utc>,
    u_updated_at: DateTime<Utc>,
}

impl OrderUserRow {
    fn try_into_parts(self) -> Result<(Order, crate::models::PublicUser), StorageError> {
        let status: OrderStatus = self
            .status
            .parse()
            .map_err(|e| StorageError::Corrupt(format!("order {}: {e}", self.id)))?;
        let role: Role = self
            .u_role
            .parse()
            .map_err(|e| StorageError::Corrupt(format!("user {}: {e}", self.user_id)))?;

        let order = Order {
            id: self.id,
            user_id: self.user_id,
            order_number: self.order_number,
            status,
            total_amount: self.total_amount,
            delivery_address: self.delivery_address,
            delivery_date: self.delivery_date,
            notes: self.notes,
            created_at: self.created_at,
            updated_at: self.updated_at,
        };
        let user = crate::models::PublicUser {
            id: self.user_id,
            email: self.u_email,
            first_name: self.u_first_name,
            last_name: self.u_last_name,
            business_name: self.u_business_name,
            phone: self.u_phone,
            address: self.u_address,
            city: self.u_city,
            state: self.u_state,
            pincode: self.u_pincode,
            role,
            is_active: self.u_is_active,
            created_at: self.u_created_at,
            updated_at: self.u_updated_at,
        };
        Ok((order, user))
    }
}

/// Order line joined with the product for display.
#[derive(sqlx::FromRow)]
struct OrderItemProductRow {
    id: OrderItemId,
    order_id: OrderId,
    product_id: ProductId,
    quantity: i32,
    price: Decimal,
    total: Decimal,
    p_id: ProductId,
    p_name: String,
    p_description: Option<String>,
    p_category_id: CategoryId,
    p_price: Decimal,
    p_unit: String,
    p_min_quantity: i32,
    p_max_quantity: Option<i32>,
    p_image_url: Option<String>,
    p_is_active: bool,
    p_created_at: DateTime<Utc>,
    p_updated_at: DateTime<Utc>,
}

impl From<OrderItemProductRow> for OrderItemWithProduct {
    fn from(row: OrderItemProductRow) -> Self {
        Self {
            item: OrderItem {
                id: row.id,
                order_id: row.order_id,
                product_id: row.product_id,
                quantity: row.quantity,
                price: row.price,
                total: row.total,
            },
            product: Product {
                id: row.p_id,
                name: row.p_name,
                description: row.p_description,
                category_id: row.p_category_id,
                price: row.p_price,
                unit: row.p_unit,
                min_quantity: row.p_min_quantity,
                max_quantity: row.p_max_quantity,
                image_url: row.p_image_url,
                is_active: row.p_is_active,
                created_at: row.p_created_at,
                updated_at: row.p_updated_at,
            },
        }
    }
}

const ORDER_USER_COLUMNS: &str = r"
    o.id, o.user_id, o.order_number, o.status, o.total_amount,
    o.delivery_address, o.delivery_date, o.notes, o.created_at, o.updated_at,
    u.email AS u_email, u.first_name AS u_first_name, u.last_name AS u_last_name,
    u.business_name AS u_business_name, u.phone AS u_phone, u.address AS u_address,
    u.city AS u_city, u.state AS u_state, u.pincode AS u_pincode, u.role AS u_role,
    u.is_active AS u_is_active, u.created_at AS u_created_at, u.updated_at AS u_updated_at
";

// =============================================================================
// Contract implementation
// =============================================================================

#[async_trait]
impl Storage for PgStorage {
    async fn create_user(&self, new: NewUser) -> Result<User, StorageError> {
        let password_hash = self.hash_password(&new.password)?;

        let mut tx = self.pool.begin().await?;

        // First account on a fresh install is the admin.
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&mut *tx)
            .await?;
        let role = if count == 0 { Role::Admin } else { Role::Customer };

        let row = sqlx::query_as::<_, UserRow>(
            r"
            INSERT INTO users (email, password_hash, first_name, last_name, business_name,
                               phone, address, city, state, pincode, role)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            ",
        )
        .bind(&new.email)
        .bind(&password_hash)
        .bind(&new.first_name)
        .bind(&new.last_name)
        .bind(&new.business_name)
        .bind(&new.phone)
        .bind(&new.address)
        .bind(&new.city)
        .bind(&new.state)
        .bind(&new.pincode)
        .bind(role.as_str())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        row.try_into()
    }

    async fn user_by_email(&self, email: &Email) -> Result<Option<User>, StorageError> {
        let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        row.map(User::try_from).transpose()
    }

    async fn user_by_id(&self, id: UserId) -> Result<Option<User>, StorageError> {
        let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(User::try_from).transpose()
    }

    async fn update_user(&self, id: UserId, update: UpdateUser) -> Result<User, StorageError> {
        let row = sqlx::query_as::<_, UserRow>(
            r"
            UPDATE users
            SET first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                business_name = COALESCE($4, business_name),
                phone = COALESCE($5, phone),
                address = COALESCE($6, address),
                city = COALESCE($7, city),
                state = COALESCE($8, state),
                pincode = COALESCE($9, pincode),
                is_active = COALESCE($10, is_active),
                updated_at = now()
            WHERE id = $1
            RETURNING *
            ",
        )
        .bind(id)
        .bind(update.first_name)
        .bind(update.last_name)
        .bind(update.business_name)
        .bind(update.phone)
        .bind(update.address)
        .bind(update.city)
        .bind(update.state)
        .bind(update.pincode)
        .bind(update.is_active)
        .fetch_one(&self.pool)
        .await?;
        row.try_into()
    }

    async fn categories(&self) -> Result<Vec<Category>, StorageError> {
        let rows = sqlx::query_as::<_, CategoryRow>(
            "SELECT * FROM categories WHERE is_active ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Category::from).collect())
    }

    async fn category_by_id(&self, id: CategoryId) -> Result<Option<Category>, StorageError> {
        let row = sqlx::query_as::<_, CategoryRow>("SELECT * FROM categories WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Category::from))
    }

    async fn create_category(&self, new: NewCategory) -> Result<Category, StorageError> {
        let row = sqlx::query_as::<_, CategoryRow>(
            "INSERT INTO categories (name, description, icon) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(&new.name)
        .bind(&new.description)
        .bind(&new.icon)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn update_category(
        &self,
        id: CategoryId,
        update: UpdateCategory,
    ) -> Result<Category, StorageError> {
        let row = sqlx::query_as::<_, CategoryRow>(
            r"
            UPDATE categories
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                icon = COALESCE($4, icon),
                is_active = COALESCE($5, is_active)
            WHERE id = $1
            RETURNING *
            ",
        )
        .bind(id)
        .bind(update.name)
        .bind(update.description)
        .bind(update.icon)
        .bind(update.is_active)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn delete_category(&self, id: CategoryId) -> Result<(), StorageError> {
        let result = sqlx::query("UPDATE categories SET is_active = FALSE WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn products(
        &self,
        filter: ProductFilter,
    ) -> Result<Vec<ProductWithCategory>, StorageError> {
        let search = filter.search.as_deref().map(like_pattern);
        let sql = format!(
            r"
            SELECT {PRODUCT_JOINED_COLUMNS}
            FROM products p
            JOIN categories c ON c.id = p.category_id
            JOIN inventory i ON i.product_id = p.id
            WHERE p.is_active
              AND ($1::INTEGER IS NULL OR p.category_id = $1)
              AND ($2::TEXT IS NULL OR p.name ILIKE $2)
            ORDER BY p.name
            "
        );
        let rows = sqlx::query_as::<_, ProductJoinedRow>(&sql)
            .bind(filter.category_id)
            .bind(search)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(ProductWithCategory::from).collect())
    }

    async fn product_by_id(
        &self,
        id: ProductId,
    ) -> Result<Option<ProductWithCategory>, StorageError> {
        let sql = format!(
            r"
            SELECT {PRODUCT_JOINED_COLUMNS}
            FROM products p
            JOIN categories c ON c.id = p.category_id
            JOIN inventory i ON i.product_id = p.id
            WHERE p.id = $1
            "
        );
        let row = sqlx::query_as::<_, ProductJoinedRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(ProductWithCategory::from))
    }

    async fn create_product(&self, new: NewProduct) -> Result<Product, StorageError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, ProductRow>(
            r"
            INSERT INTO products (name, description, category_id, price, unit,
                                  min_quantity, max_quantity, image_url)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            ",
        )
        .bind(&new.name)
        .bind(&new.description)
        .bind(new.category_id)
        .bind(new.price)
        .bind(&new.unit)
        .bind(new.min_quantity)
        .bind(new.max_quantity)
        .bind(&new.image_url)
        .fetch_one(&mut *tx)
        .await?;

        // Every product carries an inventory row from birth.
        sqlx::query("INSERT INTO inventory (product_id) VALUES ($1)")
            .bind(row.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(row.into())
    }

    async fn update_product(
        &self,
        id: ProductId,
        update: UpdateProduct,
    ) -> Result<Product, StorageError> {
        let row = sqlx::query_as::<_, ProductRow>(
            r"
            UPDATE products
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                category_id = COALESCE($4, category_id),
                price = COALESCE($5, price),
                unit = COALESCE($6, unit),
                min_quantity = COALESCE($7, min_quantity),
                max_quantity = COALESCE($8, max_quantity),
                image_url = COALESCE($9, image_url),
                is_active = COALESCE($10, is_active),
                updated_at = now()
            WHERE id = $1
            RETURNING *
            ",
        )
        .bind(id)
        .bind(update.name)
        .bind(update.description)
        .bind(update.category_id)
        .bind(update.price)
        .bind(update.unit)
        .bind(update.min_quantity)
        .bind(update.max_quantity)
        .bind(update.image_url)
        .bind(update.is_active)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn delete_product(&self, id: ProductId) -> Result<(), StorageError> {
        let result =
            sqlx::query("UPDATE products SET is_active = FALSE, updated_at = now() WHERE id = $1")
                .bind(id)
                .execute(&self.pool)
                .await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn set_product_status(
        &self,
        id: ProductId,
        is_active: bool,
    ) -> Result<Product, StorageError> {
        let row = sqlx::query_as::<_, ProductRow>(
            "UPDATE products SET is_active = $2, updated_at = now() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(is_active)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn inventory_by_product(
        &self,
        product_id: ProductId,
    ) -> Result<Option<Inventory>, StorageError> {
        let row =
            sqlx::query_as::<_, InventoryRow>("SELECT * FROM inventory WHERE product_id = $1")
                .bind(product_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(Inventory::from))
    }

    async fn update_inventory(
        &self,
        product_id: ProductId,
        update: UpdateInventory,
    ) -> Result<Inventory, StorageError> {
        let row = sqlx::query_as::<_, InventoryRow>(
            r"
            UPDATE inventory
            SET quantity = COALESCE($2, quantity),
                reserved_quantity = COALESCE($3, reserved_quantity),
                low_stock_threshold = COALESCE($4, low_stock_threshold),
                updated_at = now()
            WHERE product_id = $1
            RETURNING *
            ",
        )
        .bind(product_id)
        .bind(update.quantity)
        .bind(update.reserved_quantity)
        .bind(update.low_stock_threshold)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn low_stock_products(&self) -> Result<Vec<ProductWithCategory>, StorageError> {
        let sql = format!(
            r"
            SELECT {PRODUCT_JOINED_COLUMNS}
            FROM products p
            JOIN categories c ON c.id = p.category_id
            JOIN inventory i ON i.product_id = p.id
            WHERE p.is_active AND i.quantity <= i.low_stock_threshold
            ORDER BY i.quantity
            "
        );
        let rows = sqlx::query_as::<_, ProductJoinedRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(ProductWithCategory::from).collect())
    }

    async fn cart_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<CartItemWithProduct>, StorageError> {
        let rows = sqlx::query_as::<_, CartJoinedRow>(
            r"
            SELECT ci.id, ci.user_id, ci.product_id, ci.quantity, ci.created_at, ci.updated_at,
                   p.id AS p_id, p.name AS p_name, p.description AS p_description,
                   p.category_id AS p_category_id, p.price AS p_price, p.unit AS p_unit,
                   p.min_quantity AS p_min_quantity, p.max_quantity AS p_max_quantity,
                   p.image_url AS p_image_url, p.is_active AS p_is_active,
                   p.created_at AS p_created_at, p.updated_at AS p_updated_at,
                   c.id AS c_id, c.name AS c_name, c.description AS c_description,
                   c.icon AS c_icon, c.is_active AS c_is_active, c.created_at AS c_created_at
            FROM cart_items ci
            JOIN products p ON p.id = ci.product_id
            JOIN categories c ON c.id = p.category_id
            WHERE ci.user_id = $1
            ORDER BY ci.created_at DESC
            ",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(CartItemWithProduct::from).collect())
    }

    async fn add_to_cart(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<CartItem, StorageError> {
        // Single atomic upsert; concurrent adds both land.
        let row = sqlx::query_as::<_, CartItemRow>(
            r"
            INSERT INTO cart_items (user_id, product_id, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, product_id)
            DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity,
                          updated_at = now()
            RETURNING *
            ",
        )
        .bind(user_id)
        .bind(product_id)
        .bind(quantity)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn set_cart_quantity(
        &self,
        id: CartItemId,
        quantity: i32,
    ) -> Result<CartItem, StorageError> {
        let row = sqlx::query_as::<_, CartItemRow>(
            "UPDATE cart_items SET quantity = $2, updated_at = now() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(quantity)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn remove_cart_item(&self, id: CartItemId) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM cart_items WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn clear_cart(&self, user_id: UserId) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn create_order(&self, new: NewOrder) -> Result<Order, StorageError> {
        let row = sqlx::query_as::<_, OrderRow>(
            r"
            INSERT INTO orders (user_id, order_number, status, total_amount,
                                delivery_address, delivery_date, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            ",
        )
        .bind(new.user_id)
        .bind(&new.order_number)
        .bind(new.status.as_str())
        .bind(new.total_amount)
        .bind(&new.delivery_address)
        .bind(new.delivery_date)
        .bind(&new.notes)
        .fetch_one(&self.pool)
        .await?;
        row.try_into()
    }

    async fn create_order_items(
        &self,
        order_id: OrderId,
        items: Vec<NewOrderItem>,
    ) -> Result<Vec<OrderItem>, StorageError> {
        let mut tx = self.pool.begin().await?;
        let rows = insert_order_items(&mut tx, order_id, &items).await?;
        tx.commit().await?;
        Ok(rows)
    }

    async fn place_order(
        &self,
        new: NewOrder,
        items: Vec<NewOrderItem>,
    ) -> Result<Order, StorageError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, OrderRow>(
            r"
            INSERT INTO orders (user_id, order_number, status, total_amount,
                                delivery_address, delivery_date, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            ",
        )
        .bind(new.user_id)
        .bind(&new.order_number)
        .bind(new.status.as_str())
        .bind(new.total_amount)
        .bind(&new.delivery_address)
        .bind(new.delivery_date)
        .bind(&new.notes)
        .fetch_one(&mut *tx)
        .await?;

        insert_order_items(&mut tx, row.id, &items).await?;

        sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
            .bind(new.user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        row.try_into()
    }

    async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<OrderWithItems>, StorageError> {
        let sql = format!(
            r"
            SELECT {ORDER_USER_COLUMNS}
            FROM orders o
            JOIN users u ON u.id = o.user_id
            WHERE o.user_id = $1
            ORDER BY o.created_at DESC
            "
        );
        let rows = sqlx::query_as::<_, OrderUserRow>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        self.hydrate_orders(rows).await
    }

    async fn order_by_id(&self, id: OrderId) -> Result<Option<OrderWithItems>, StorageError> {
        let sql = format!(
            r"
            SELECT {ORDER_USER_COLUMNS}
            FROM orders o
            JOIN users u ON u.id = o.user_id
            WHERE o.id = $1
            "
        );
        let row = sqlx::query_as::<_, OrderUserRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else { return Ok(None) };
        Ok(self.hydrate_orders(vec![row]).await?.into_iter().next())
    }

    async fn all_orders(&self) -> Result<Vec<OrderWithItems>, StorageError> {
        let sql = format!(
            r"
            SELECT {ORDER_USER_COLUMNS}
            FROM orders o
            JOIN users u ON u.id = o.user_id
            ORDER BY o.created_at DESC
            "
        );
        let rows = sqlx::query_as::<_, OrderUserRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        self.hydrate_orders(rows).await
    }

    async fn set_order_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Order, StorageError> {
        let row = sqlx::query_as::<_, OrderRow>(
            "UPDATE orders SET status = $2, updated_at = now() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(status.as_str())
        .fetch_one(&self.pool)
        .await?;
        row.try_into()
    }

    async fn admin_stats(
        &self,
        revenue_includes_cancelled: bool,
    ) -> Result<AdminStats, StorageError> {
        let (total_orders,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders")
            .fetch_one(&self.pool)
            .await?;

        let (total_revenue,): (Decimal,) = sqlx::query_as(
            r"
            SELECT COALESCE(SUM(total_amount), 0)
            FROM orders
            WHERE $1 OR status <> 'cancelled'
            ",
        )
        .bind(revenue_includes_cancelled)
        .fetch_one(&self.pool)
        .await?;

        let (total_products,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM products WHERE is_active")
                .fetch_one(&self.pool)
                .await?;

        let (total_customers,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM users WHERE role = 'customer'")
                .fetch_one(&self.pool)
                .await?;

        let sql = format!(
            r"
            SELECT {ORDER_USER_COLUMNS}
            FROM orders o
            JOIN users u ON u.id = o.user_id
            ORDER BY o.created_at DESC
            LIMIT 5
            "
        );
        let rows = sqlx::query_as::<_, OrderUserRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        let recent_orders = self.hydrate_orders(rows).await?;

        Ok(AdminStats {
            total_orders,
            total_revenue,
            total_products,
            total_customers,
            recent_orders,
        })
    }
}

/// Bulk-insert lines for an order inside an open transaction.
async fn insert_order_items(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    order_id: OrderId,
    items: &[NewOrderItem],
) -> Result<Vec<OrderItem>, StorageError> {
    let product_ids: Vec<i32> = items.iter().map(|i| i.product_id.as_i32()).collect();
    let quantities: Vec<i32> = items.iter().map(|i| i.quantity).collect();
    let prices: Vec<Decimal> = items.iter().map(|i| i.price).collect();
    let totals: Vec<Decimal> = items.iter().map(|i| i.total).collect();

    let rows = sqlx::query_as::<_, OrderItemRow>(
        r"
        INSERT INTO order_items (order_id, product_id, quantity, price, total)
        SELECT $1, product_id, quantity, price, total
        FROM UNNEST($2::INTEGER[], $3::INTEGER[], $4::NUMERIC[], $5::NUMERIC[])
            AS t (product_id, quantity, price, total)
        RETURNING *
        ",
    )
    .bind(order_id)
    .bind(&product_ids)
    .bind(&quantities)
    .bind(&prices)
    .bind(&totals)
    .fetch_all(&mut **tx)
    .await?;

    Ok(rows.into_iter().map(OrderItem::from).collect())
}

/// Builds a substring `ILIKE` pattern, escaping LIKE metacharacters so the
/// search term is matched literally (same semantics as the in-memory filter).
fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

#[cfg(test)]
mod tests {
    use super::like_pattern;

    #[test]
    fn like_pattern_wraps_plain_terms() {
        assert_eq!(like_pattern("milk"), "%milk%");
    }

    #[test]
    fn like_pattern_escapes_metacharacters() {
        assert_eq!(like_pattern("100% pure"), r"%100\% pure%");
        assert_eq!(like_pattern("a_b"), r"%a\_b%");
        assert_eq!(like_pattern(r"back\slash"), r"%back\\slash%");
    }
}

//! In-memory storage backend.
//!
//! Holds everything behind a single `tokio::sync::RwLock`, which makes every
//! multi-step operation (checkout, cart merge, first-user-admin) atomic by
//! construction. Used for local development and the integration test suite;
//! the contract tests pin it to the same behavior as [`super::PgStorage`].

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::RwLock;

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

use super::{Storage, StorageError, fixtures};

/// Storage backed by process memory.
pub struct MemStorage {
    inner: RwLock<Inner>,
}

/// All tables, plus one shared id counter.
#[derive(Default)]
pub(crate) struct Inner {
    next_id: i32,
    pub(crate) users: Vec<User>,
    pub(crate) categories: Vec<Category>,
    pub(crate) products: Vec<Product>,
    pub(crate) inventory: Vec<Inventory>,
    pub(crate) cart_items: Vec<CartItem>,
    pub(crate) orders: Vec<Order>,
    pub(crate) order_items: Vec<OrderItem>,
}

impl Inner {
    pub(crate) fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    fn joined_product(&self, product: &Product) -> Result<ProductWithCategory, StorageError> {
        let category = self
            .categories
            .iter()
            .find(|c| c.id == product.category_id)
            .cloned()
            .ok_or_else(|| {
                StorageError::Corrupt(format!("product {} has no category", product.id))
            })?;
        let inventory = self
            .inventory
            .iter()
            .find(|i| i.product_id == product.id)
            .cloned()
            .ok_or_else(|| {
                StorageError::Corrupt(format!("product {} has no inventory", product.id))
            })?;
        Ok(ProductWithCategory {
            product: product.clone(),
            category,
            inventory,
        })
    }

    fn joined_order(&self, order: &Order) -> Result<OrderWithItems, StorageError> {
        let user = self
            .users
            .iter()
            .find(|u| u.id == order.user_id)
            .cloned()
            .ok_or_else(|| StorageError::Corrupt(format!("order {} has no user", order.id)))?;

        let items = self
            .order_items
            .iter()
            .filter(|i| i.order_id == order.id)
            .map(|item| {
                let product = self
                    .products
                    .iter()
                    .find(|p| p.id == item.product_id)
                    .cloned()
                    .ok_or_else(|| {
                        StorageError::Corrupt(format!("order item {} has no product", item.id))
                    })?;
                Ok(OrderItemWithProduct {
                    item: item.clone(),
                    product,
                })
            })
            .collect::<Result<Vec<_>, StorageError>>()?;

        Ok(OrderWithItems {
            order: order.clone(),
            items,
            user: user.into(),
        })
    }

    /// All orders newest first, joined.
    fn orders_sorted(
        &self,
        mut filter: impl FnMut(&Order) -> bool,
    ) -> Result<Vec<OrderWithItems>, StorageError> {
        let mut orders: Vec<&Order> = self.orders.iter().filter(|o| filter(o)).collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        orders.into_iter().map(|o| self.joined_order(o)).collect()
    }
}

impl MemStorage {
    /// An empty store. The first registered user becomes admin.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
        }
    }

    /// A store pre-seeded with demo accounts, categories, and products.
    ///
    /// # Errors
    ///
    /// Returns an error if hashing the demo passwords fails.
    pub fn with_demo_data() -> Result<Self, StorageError> {
        let storage = Self::new();
        let mut inner = Inner::default();
        fixtures::seed_demo(&storage, &mut inner)?;
        Ok(Self {
            inner: RwLock::new(inner),
        })
    }
}

impl Default for MemStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Storage for MemStorage {
    async fn create_user(&self, new: NewUser) -> Result<User, StorageError> {
        let password_hash = self.hash_password(&new.password)?;
        let mut inner = self.inner.write().await;

        if inner.users.iter().any(|u| u.email == new.email) {
            return Err(StorageError::Conflict(format!(
                "email {} already registered",
                new.email
            )));
        }

        // First account on a fresh install is the admin.
        let role = if inner.users.is_empty() {
            Role::Admin
        } else {
            Role::Customer
        };

        let now = Utc::now();
        let user = User {
            id: UserId::new(inner.next_id()),
            email: new.email,
            password_hash,
            first_name: new.first_name,
            last_name: new.last_name,
            business_name: new.business_name,
            phone: new.phone,
            address: new.address,
            city: new.city,
            state: new.state,
            pincode: new.pincode,
            role,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        inner.users.push(user.clone());
        Ok(user)
    }

    async fn user_by_email(&self, email: &Email) -> Result<Option<User>, StorageError> {
        let inner = self.inner.read().await;
        Ok(inner.users.iter().find(|u| &u.email == email).cloned())
    }

    async fn user_by_id(&self, id: UserId) -> Result<Option<User>, StorageError> {
        let inner = self.inner.read().await;
        Ok(inner.users.iter().find(|u| u.id == id).cloned())
    }

    async fn update_user(&self, id: UserId, update: UpdateUser) -> Result<User, StorageError> {
        let mut inner = self.inner.write().await;
        let user = inner
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(StorageError::NotFound)?;

        if let Some(v) = update.first_name {
            user.first_name = v;
        }
        if let Some(v) = update.last_name {
            user.last_name = v;
        }
        if let Some(v) = update.business_name {
            user.business_name = v;
        }
        if let Some(v) = update.phone {
            user.phone = v;
        }
        if let Some(v) = update.address {
            user.address = v;
        }
        if let Some(v) = update.city {
            user.city = v;
        }
        if let Some(v) = update.state {
            user.state = v;
        }
        if let Some(v) = update.pincode {
            user.pincode = v;
        }
        if let Some(v) = update.is_active {
            user.is_active = v;
        }
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn categories(&self) -> Result<Vec<Category>, StorageError> {
        let inner = self.inner.read().await;
        let mut categories: Vec<Category> = inner
            .categories
            .iter()
            .filter(|c| c.is_active)
            .cloned()
            .collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn category_by_id(&self, id: CategoryId) -> Result<Option<Category>, StorageError> {
        let inner = self.inner.read().await;
        Ok(inner.categories.iter().find(|c| c.id == id).cloned())
    }

    async fn create_category(&self, new: NewCategory) -> Result<Category, StorageError> {
        let mut inner = self.inner.write().await;
        let category = Category {
            id: CategoryId::new(inner.next_id()),
            name: new.name,
            description: new.description,
            icon: new.icon,
            is_active: true,
            created_at: Utc::now(),
        };
        inner.categories.push(category.clone());
        Ok(category)
    }

    async fn update_category(
        &self,
        id: CategoryId,
        update: UpdateCategory,
    ) -> Result<Category, StorageError> {
        let mut inner = self.inner.write().await;
        let category = inner
            .categories
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(StorageError::NotFound)?;

        if let Some(v) = update.name {
            category.name = v;
        }
        if let Some(v) = update.description {
            category.description = Some(v);
        }
        if let Some(v) = update.icon {
            category.icon = v;
        }
        if let Some(v) = update.is_active {
            category.is_active = v;
        }
        Ok(category.clone())
    }

    async fn delete_category(&self, id: CategoryId) -> Result<(), StorageError> {
        let mut inner = self.inner.write().await;
        let category = inner
            .categories
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(StorageError::NotFound)?;
        category.is_active = false;
        Ok(())
    }

    async fn products(
        &self,
        filter: ProductFilter,
    ) -> Result<Vec<ProductWithCategory>, StorageError> {
        let inner = self.inner.read().await;
        let search = filter.search.as_deref().map(str::to_lowercase);

        let mut products: Vec<&Product> = inner
            .products
            .iter()
            .filter(|p| p.is_active)
            .filter(|p| filter.category_id.is_none_or(|c| p.category_id == c))
            .filter(|p| {
                search
                    .as_deref()
                    .is_none_or(|s| p.name.to_lowercase().contains(s))
            })
            .collect();
        products.sort_by(|a, b| a.name.cmp(&b.name));

        products
            .into_iter()
            .map(|p| inner.joined_product(p))
            .collect()
    }

    async fn product_by_id(
        &self,
        id: ProductId,
    ) -> Result<Option<ProductWithCategory>, StorageError> {
        let inner = self.inner.read().await;
        inner
            .products
            .iter()
            .find(|p| p.id == id)
            .map(|p| inner.joined_product(p))
            .transpose()
    }

    async fn create_product(&self, new: NewProduct) -> Result<Product, StorageError> {
        let mut inner = self.inner.write().await;
        let now = Utc::now();
        let product = Product {
            id: ProductId::new(inner.next_id()),
            name: new.name,
            description: new.description,
            category_id: new.category_id,
            price: new.price,
            unit: new.unit,
            min_quantity: new.min_quantity,
            max_quantity: new.max_quantity,
            image_url: new.image_url,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        // Every product carries an inventory row from birth.
        let inventory = Inventory {
            id: InventoryId::new(inner.next_id()),
            product_id: product.id,
            quantity: 0,
            reserved_quantity: 0,
            low_stock_threshold: 10,
            updated_at: now,
        };
        inner.products.push(product.clone());
        inner.inventory.push(inventory);
        Ok(product)
    }

    async fn update_product(
        &self,
        id: ProductId,
        update: UpdateProduct,
    ) -> Result<Product, StorageError> {
        let mut inner = self.inner.write().await;
        let product = inner
            .products
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(StorageError::NotFound)?;

        if let Some(v) = update.name {
            product.name = v;
        }
        if let Some(v) = update.description {
            product.description = Some(v);
        }
        if let Some(v) = update.category_id {
            product.category_id = v;
        }
        if let Some(v) = update.price {
            product.price = v;
        }
        if let Some(v) = update.unit {
            product.unit = v;
        }
        if let Some(v) = update.min_quantity {
            product.min_quantity = v;
        }
        if let Some(v) = update.max_quantity {
            product.max_quantity = Some(v);
        }
        if let Some(v) = update.image_url {
            product.image_url = Some(v);
        }
        if let Some(v) = update.is_active {
            product.is_active = v;
        }
        product.updated_at = Utc::now();
        Ok(product.clone())
    }

    async fn delete_product(&self, id: ProductId) -> Result<(), StorageError> {
        let mut inner = self.inner.write().await;
        let product = inner
            .products
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(StorageError::NotFound)?;
        product.is_active = false;
        product.updated_at = Utc::now();
        Ok(())
    }

    async fn set_product_status(
        &self,
        id: ProductId,
        is_active: bool,
    ) -> Result<Product, StorageError> {
        let mut inner = self.inner.write().await;
        let product = inner
            .products
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(StorageError::NotFound)?;
        product.is_active = is_active;
        product.updated_at = Utc::now();
        Ok(product.clone())
    }

    async fn inventory_by_product(
        &self,
        product_id: ProductId,
    ) -> Result<Option<Inventory>, StorageError> {
        let inner = self.inner.read().await;
        Ok(inner
            .inventory
            .iter()
            .find(|i| i.product_id == product_id)
            .cloned())
    }

    async fn update_inventory(
        &self,
        product_id: ProductId,
        update: UpdateInventory,
    ) -> Result<Inventory, StorageError> {
        let mut inner = self.inner.write().await;
        let inventory = inner
            .inventory
            .iter_mut()
            .find(|i| i.product_id == product_id)
            .ok_or(StorageError::NotFound)?;

        if let Some(v) = update.quantity {
            inventory.quantity = v;
        }
        if let Some(v) = update.reserved_quantity {
            inventory.reserved_quantity = v;
        }
        if let Some(v) = update.low_stock_threshold {
            inventory.low_stock_threshold = v;
        }
        inventory.updated_at = Utc::now();
        Ok(inventory.clone())
    }

    async fn low_stock_products(&self) -> Result<Vec<ProductWithCategory>, StorageError> {
        let inner = self.inner.read().await;
        let mut joined: Vec<ProductWithCategory> = inner
            .products
            .iter()
            .filter(|p| p.is_active)
            .map(|p| inner.joined_product(p))
            .collect::<Result<Vec<_>, _>>()?;
        joined.retain(|j| j.inventory.is_low_stock());
        joined.sort_by_key(|j| j.inventory.quantity);
        Ok(joined)
    }

    async fn cart_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<CartItemWithProduct>, StorageError> {
        let inner = self.inner.read().await;
        let mut items: Vec<&CartItem> = inner
            .cart_items
            .iter()
            .filter(|ci| ci.user_id == user_id)
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        items
            .into_iter()
            .map(|ci| {
                let joined = inner
                    .products
                    .iter()
                    .find(|p| p.id == ci.product_id)
                    .map(|p| inner.joined_product(p))
                    .transpose()?
                    .ok_or_else(|| {
                        StorageError::Corrupt(format!("cart item {} has no product", ci.id))
                    })?;
                Ok(CartItemWithProduct {
                    item: ci.clone(),
                    product: CartProduct {
                        product: joined.product,
                        category: joined.category,
                    },
                })
            })
            .collect()
    }

    async fn add_to_cart(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<CartItem, StorageError> {
        let mut inner = self.inner.write().await;

        // Merge under the write lock; the whole upsert is one critical section.
        if let Some(existing) = inner
            .cart_items
            .iter_mut()
            .find(|ci| ci.user_id == user_id && ci.product_id == product_id)
        {
            // Saturate instead of wrapping so a runaway merge can never
            // produce a negative quantity.
            existing.quantity = existing.quantity.saturating_add(quantity);
            existing.updated_at = Utc::now();
            return Ok(existing.clone());
        }

        let now = Utc::now();
        let item = CartItem {
            id: CartItemId::new(inner.next_id()),
            user_id,
            product_id,
            quantity,
            created_at: now,
            updated_at: now,
        };
        inner.cart_items.push(item.clone());
        Ok(item)
    }

    async fn set_cart_quantity(
        &self,
        id: CartItemId,
        quantity: i32,
    ) -> Result<CartItem, StorageError> {
        let mut inner = self.inner.write().await;
        let item = inner
            .cart_items
            .iter_mut()
            .find(|ci| ci.id == id)
            .ok_or(StorageError::NotFound)?;
        item.quantity = quantity;
        item.updated_at = Utc::now();
        Ok(item.clone())
    }

    async fn remove_cart_item(&self, id: CartItemId) -> Result<(), StorageError> {
        let mut inner = self.inner.write().await;
        inner.cart_items.retain(|ci| ci.id != id);
        Ok(())
    }

    async fn clear_cart(&self, user_id: UserId) -> Result<(), StorageError> {
        let mut inner = self.inner.write().await;
        inner.cart_items.retain(|ci| ci.user_id != user_id);
        Ok(())
    }

    async fn create_order(&self, new: NewOrder) -> Result<Order, StorageError> {
        let mut inner = self.inner.write().await;
        Ok(push_order(&mut inner, new))
    }

    async fn create_order_items(
        &self,
        order_id: OrderId,
        items: Vec<NewOrderItem>,
    ) -> Result<Vec<OrderItem>, StorageError> {
        let mut inner = self.inner.write().await;
        Ok(push_order_items(&mut inner, order_id, items))
    }

    async fn place_order(
        &self,
        new: NewOrder,
        items: Vec<NewOrderItem>,
    ) -> Result<Order, StorageError> {
        // One write lock covers order, lines, and cart clear.
        let mut inner = self.inner.write().await;
        let user_id = new.user_id;
        let order = push_order(&mut inner, new);
        push_order_items(&mut inner, order.id, items);
        inner.cart_items.retain(|ci| ci.user_id != user_id);
        Ok(order)
    }

    async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<OrderWithItems>, StorageError> {
        let inner = self.inner.read().await;
        inner.orders_sorted(|o| o.user_id == user_id)
    }

    async fn order_by_id(&self, id: OrderId) -> Result<Option<OrderWithItems>, StorageError> {
        let inner = self.inner.read().await;
        inner
            .orders
            .iter()
            .find(|o| o.id == id)
            .map(|o| inner.joined_order(o))
            .transpose()
    }

    async fn all_orders(&self) -> Result<Vec<OrderWithItems>, StorageError> {
        let inner = self.inner.read().await;
        inner.orders_sorted(|_| true)
    }

    async fn set_order_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Order, StorageError> {
        let mut inner = self.inner.write().await;
        let order = inner
            .orders
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or(StorageError::NotFound)?;
        order.status = status;
        order.updated_at = Utc::now();
        Ok(order.clone())
    }

    async fn admin_stats(
        &self,
        revenue_includes_cancelled: bool,
    ) -> Result<AdminStats, StorageError> {
        let inner = self.inner.read().await;

        let total_orders = inner.orders.len() as i64;
        let total_revenue: Decimal = inner
            .orders
            .iter()
            .filter(|o| revenue_includes_cancelled || o.status != OrderStatus::Cancelled)
            .map(|o| o.total_amount)
            .sum();
        let total_products = inner.products.iter().filter(|p| p.is_active).count() as i64;
        let total_customers = inner
            .users
            .iter()
            .filter(|u| u.role == Role::Customer)
            .count() as i64;

        let mut recent_orders = inner.orders_sorted(|_| true)?;
        recent_orders.truncate(5);

        Ok(AdminStats {
            total_orders,
            total_revenue,
            total_products,
            total_customers,
            recent_orders,
        })
    }
}

fn push_order(inner: &mut Inner, new: NewOrder) -> Order {
    let now = Utc::now();
    let order = Order {
        id: OrderId::new(inner.next_id()),
        user_id: new.user_id,
        order_number: new.order_number,
        status: new.status,
        total_amount: new.total_amount,
        delivery_address: new.delivery_address,
        delivery_date: new.delivery_date,
        notes: new.notes,
        created_at: now,
        updated_at: now,
    };
    inner.orders.push(order.clone());
    order
}

fn push_order_items(
    inner: &mut Inner,
    order_id: OrderId,
    items: Vec<NewOrderItem>,
) -> Vec<OrderItem> {
    items
        .into_iter()
        .map(|item| {
            let row = OrderItem {
                id: OrderItemId::new(inner.next_id()),
                order_id,
                product_id: item.product_id,
                quantity: item.quantity,
                price: item.price,
                total: item.total,
            };
            inner.order_items.push(row.clone());
            row
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_demo_data_accounts_log_in() {
        let storage = MemStorage::with_demo_data().unwrap();

        let admin_email = Email::parse("admin@freshline.test").unwrap();
        let admin = storage.user_by_email(&admin_email).await.unwrap().unwrap();
        assert_eq!(admin.role, Role::Admin);
        assert!(storage.verify_password("admin123", &admin.password_hash));

        let customer_email = Email::parse("customer@example.com").unwrap();
        let customer = storage
            .user_by_email(&customer_email)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(customer.role, Role::Customer);
        assert!(storage.verify_password("customer123", &customer.password_hash));
    }

    #[tokio::test]
    async fn test_demo_data_catalog_is_joined() {
        let storage = MemStorage::with_demo_data().unwrap();

        let categories = storage.categories().await.unwrap();
        assert_eq!(categories.len(), 3);

        let products = storage.products(ProductFilter::default()).await.unwrap();
        assert!(!products.is_empty());
        for product in &products {
            assert_eq!(product.category.id, product.product.category_id);
            assert_eq!(product.inventory.product_id, product.product.id);
        }
    }

    #[tokio::test]
    async fn test_demo_data_does_not_break_first_user_admin_elsewhere() {
        // Seeded users mean later registrations are customers.
        let storage = MemStorage::with_demo_data().unwrap();
        let user = storage
            .create_user(NewUser {
                email: Email::parse("new@example.com").unwrap(),
                password: "secret99".to_owned(),
                first_name: "New".to_owned(),
                last_name: "User".to_owned(),
                business_name: "New Mart".to_owned(),
                phone: "999".to_owned(),
                address: "1 Lane".to_owned(),
                city: "Pune".to_owned(),
                state: "MH".to_owned(),
                pincode: "411001".to_owned(),
            })
            .await
            .unwrap();
        assert_eq!(user.role, Role::Customer);
    }
}

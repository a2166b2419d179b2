//! Checkout and order status flows.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use chrono::Utc;
use rust_decimal::Decimal;
use thiserror::Error;
use tokio::sync::Mutex;

use freshline_core::{OrderId, OrderStatus, UserId};

use crate::models::{NewOrder, NewOrderItem, Order, User};
use crate::storage::{Storage, StorageError};

/// Per-process order sequence, disambiguates orders placed in the same
/// millisecond.
static ORDER_SEQ: AtomicU64 = AtomicU64::new(0);

/// Generate an order number: `FL` + creation time in ms + 4-digit sequence.
fn next_order_number() -> String {
    let seq = ORDER_SEQ.fetch_add(1, Ordering::Relaxed) % 10_000;
    format!("FL{}{seq:04}", Utc::now().timestamp_millis())
}

/// Per-user checkout locks.
///
/// Two concurrent checkouts by the same user serialize on the user's lock, so
/// the second sees the cart the first left behind (empty) and fails with
/// [`OrderError::EmptyCart`] instead of double-ordering. Different users never
/// contend.
#[derive(Clone, Default)]
pub struct CheckoutLocks {
    locks: Arc<StdMutex<HashMap<UserId, Arc<Mutex<()>>>>>,
}

impl CheckoutLocks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, user_id: UserId) -> Arc<Mutex<()>> {
        let mut locks = match self.locks.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        Arc::clone(locks.entry(user_id).or_default())
    }
}

/// Checkout request: everything the client supplies beyond the cart itself.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrder {
    pub delivery_address: String,
    pub notes: Option<String>,
}

/// Errors produced by checkout and status updates.
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("cannot place an order with an empty cart")]
    EmptyCart,

    #[error("delivery address is required")]
    MissingDeliveryAddress,

    #[error("order status cannot change from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("order not found")]
    NotFound,

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Order flows over a borrowed storage handle.
pub struct OrderService<'a> {
    storage: &'a dyn Storage,
    checkout_locks: &'a CheckoutLocks,
}

impl<'a> OrderService<'a> {
    #[must_use]
    pub fn new(storage: &'a dyn Storage, checkout_locks: &'a CheckoutLocks) -> Self {
        Self {
            storage,
            checkout_locks,
        }
    }

    /// Turn the user's cart into an order.
    ///
    /// Prices and line totals are snapshotted from the products as they are
    /// at this moment; later catalog edits don't touch the order. The order,
    /// its lines, and the cart clear land atomically in storage.
    ///
    /// # Errors
    ///
    /// Returns `EmptyCart` if the cart has no rows and
    /// `MissingDeliveryAddress` if the address is blank.
    pub async fn place_order(&self, user: &User, payload: PlaceOrder) -> Result<Order, OrderError> {
        let delivery_address = payload.delivery_address.trim().to_owned();
        if delivery_address.is_empty() {
            return Err(OrderError::MissingDeliveryAddress);
        }

        let lock = self.checkout_locks.lock_for(user.id);
        let _guard = lock.lock().await;

        let cart = self.storage.cart_for_user(user.id).await?;
        if cart.is_empty() {
            return Err(OrderError::EmptyCart);
        }

        let mut total_amount = Decimal::ZERO;
        let mut items = Vec::with_capacity(cart.len());
        for entry in &cart {
            let price = entry.product.product.price;
            let total = price * Decimal::from(entry.item.quantity);
            total_amount += total;
            items.push(NewOrderItem {
                product_id: entry.item.product_id,
                quantity: entry.item.quantity,
                price,
                total,
            });
        }

        let new = NewOrder {
            user_id: user.id,
            order_number: next_order_number(),
            status: OrderStatus::Pending,
            total_amount,
            delivery_address,
            delivery_date: None,
            notes: payload.notes,
        };

        Ok(self.storage.place_order(new, items).await?)
    }

    /// Change an order's status.
    ///
    /// With `strict_flow` enabled, only forward transitions (and
    /// cancellation from pending or processing) are accepted; without it any
    /// status can be set directly.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown order and `InvalidTransition` when
    /// strict flow rejects the change.
    pub async fn update_status(
        &self,
        id: OrderId,
        status: OrderStatus,
        strict_flow: bool,
    ) -> Result<Order, OrderError> {
        if strict_flow {
            let current = self
                .storage
                .order_by_id(id)
                .await?
                .ok_or(OrderError::NotFound)?;
            if !current.order.status.can_transition_to(status) {
                return Err(OrderError::InvalidTransition {
                    from: current.order.status,
                    to: status,
                });
            }
        }

        match self.storage.set_order_status(id, status).await {
            Ok(order) => Ok(order),
            Err(StorageError::NotFound) => Err(OrderError::NotFound),
            Err(other) => Err(other.into()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::models::{NewCategory, NewProduct, NewUser, RegisterUser};
    use crate::services::AuthService;
    use crate::storage::MemStorage;
    use freshline_core::Email;

    async fn seeded_user(storage: &MemStorage, email: &str) -> User {
        storage
            .create_user(NewUser {
                email: Email::parse(email).unwrap(),
                password: "secret99".to_owned(),
                first_name: "Ravi".to_owned(),
                last_name: "Sharma".to_owned(),
                business_name: "Sharma General Store".to_owned(),
                phone: "9800000002".to_owned(),
                address: "12 Station Road".to_owned(),
                city: "Pune".to_owned(),
                state: "MH".to_owned(),
                pincode: "411001".to_owned(),
            })
            .await
            .unwrap()
    }

    async fn seeded_product(storage: &MemStorage, name: &str, price: Decimal) -> crate::models::Product {
        let category = storage
            .create_category(NewCategory {
                name: "Fruits".to_owned(),
                description: None,
                icon: "apple".to_owned(),
            })
            .await
            .unwrap();
        storage
            .create_product(NewProduct {
                name: name.to_owned(),
                description: None,
                category_id: category.id,
                price,
                unit: "kg".to_owned(),
                min_quantity: 1,
                max_quantity: None,
                image_url: None,
            })
            .await
            .unwrap()
    }

    fn place(address: &str) -> PlaceOrder {
        PlaceOrder {
            delivery_address: address.to_owned(),
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_checkout_totals_and_clears_cart() {
        let storage = MemStorage::new();
        let locks = CheckoutLocks::new();
        let user = seeded_user(&storage, "buyer@example.com").await;
        let product = seeded_product(&storage, "Fresh Apples", Decimal::new(12000, 2)).await;

        storage.add_to_cart(user.id, product.id, 2).await.unwrap();

        let service = OrderService::new(&storage, &locks);
        let order = service.place_order(&user, place("12 Station Road")).await.unwrap();

        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.total_amount, Decimal::new(24000, 2));
        assert!(order.order_number.starts_with("FL"));

        let placed = storage.order_by_id(order.id).await.unwrap().unwrap();
        assert_eq!(placed.items.len(), 1);
        assert_eq!(placed.items[0].item.price, Decimal::new(12000, 2));
        assert_eq!(placed.items[0].item.total, Decimal::new(24000, 2));

        assert!(storage.cart_for_user(user.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_checkout_rejects_empty_cart_and_blank_address() {
        let storage = MemStorage::new();
        let locks = CheckoutLocks::new();
        let user = seeded_user(&storage, "buyer@example.com").await;
        let service = OrderService::new(&storage, &locks);

        assert!(matches!(
            service.place_order(&user, place("12 Station Road")).await,
            Err(OrderError::EmptyCart)
        ));
        assert!(matches!(
            service.place_order(&user, place("   ")).await,
            Err(OrderError::MissingDeliveryAddress)
        ));
    }

    #[tokio::test]
    async fn test_order_numbers_are_distinct() {
        let storage = MemStorage::new();
        let locks = CheckoutLocks::new();
        let user = seeded_user(&storage, "buyer@example.com").await;
        let product = seeded_product(&storage, "Bananas", Decimal::new(6000, 2)).await;
        let service = OrderService::new(&storage, &locks);

        storage.add_to_cart(user.id, product.id, 1).await.unwrap();
        let first = service.place_order(&user, place("12 Station Road")).await.unwrap();
        storage.add_to_cart(user.id, product.id, 1).await.unwrap();
        let second = service.place_order(&user, place("12 Station Road")).await.unwrap();

        assert_ne!(first.order_number, second.order_number);
    }

    #[tokio::test]
    async fn test_price_snapshot_survives_catalog_edit() {
        let storage = MemStorage::new();
        let locks = CheckoutLocks::new();
        let user = seeded_user(&storage, "buyer@example.com").await;
        let product = seeded_product(&storage, "Paneer", Decimal::new(32000, 2)).await;
        let service = OrderService::new(&storage, &locks);

        storage.add_to_cart(user.id, product.id, 1).await.unwrap();
        let order = service.place_order(&user, place("12 Station Road")).await.unwrap();

        storage
            .update_product(
                product.id,
                crate::models::UpdateProduct {
                    price: Some(Decimal::new(40000, 2)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let placed = storage.order_by_id(order.id).await.unwrap().unwrap();
        assert_eq!(placed.order.total_amount, Decimal::new(32000, 2));
        assert_eq!(placed.items[0].item.price, Decimal::new(32000, 2));
    }

    #[tokio::test]
    async fn test_strict_flow_rejects_backwards_transition() {
        let storage = MemStorage::new();
        let locks = CheckoutLocks::new();
        let user = seeded_user(&storage, "buyer@example.com").await;
        let product = seeded_product(&storage, "Onions", Decimal::new(3500, 2)).await;
        let service = OrderService::new(&storage, &locks);

        storage.add_to_cart(user.id, product.id, 1).await.unwrap();
        let order = service.place_order(&user, place("12 Station Road")).await.unwrap();

        let shipped = service
            .update_status(order.id, OrderStatus::Processing, true)
            .await
            .unwrap();
        assert_eq!(shipped.status, OrderStatus::Processing);

        assert!(matches!(
            service
                .update_status(order.id, OrderStatus::Pending, true)
                .await,
            Err(OrderError::InvalidTransition { .. })
        ));

        // Lax mode accepts anything.
        let rolled_back = service
            .update_status(order.id, OrderStatus::Pending, false)
            .await
            .unwrap();
        assert_eq!(rolled_back.status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn test_update_status_unknown_order() {
        let storage = MemStorage::new();
        let locks = CheckoutLocks::new();
        let service = OrderService::new(&storage, &locks);

        assert!(matches!(
            service
                .update_status(OrderId::new(999), OrderStatus::Shipped, false)
                .await,
            Err(OrderError::NotFound)
        ));
    }

    // AuthService + OrderService together: the demo store end to end.
    #[tokio::test]
    async fn test_demo_store_checkout() {
        let storage = MemStorage::with_demo_data().unwrap();
        let locks = CheckoutLocks::new();
        let auth = AuthService::new(&storage);

        let buyer = auth
            .register(RegisterUser {
                email: "fresh@example.com".to_owned(),
                password: "secret99".to_owned(),
                first_name: "Meena".to_owned(),
                last_name: "Iyer".to_owned(),
                business_name: "Iyer Stores".to_owned(),
                phone: "9800000003".to_owned(),
                address: "4 Hill Road".to_owned(),
                city: "Mumbai".to_owned(),
                state: "MH".to_owned(),
                pincode: "400050".to_owned(),
            })
            .await
            .unwrap();

        let products = storage
            .products(crate::models::ProductFilter::default())
            .await
            .unwrap();
        let apples = products
            .iter()
            .find(|p| p.product.name == "Fresh Apples")
            .unwrap();

        storage
            .add_to_cart(buyer.id, apples.product.id, 3)
            .await
            .unwrap();

        let service = OrderService::new(&storage, &locks);
        let order = service.place_order(&buyer, place("4 Hill Road")).await.unwrap();
        assert_eq!(order.total_amount, Decimal::new(36000, 2));
    }
}

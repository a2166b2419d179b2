//! Domain models and wire types.
//!
//! Entities mirror the relational schema; joined projections mirror what the
//! read queries return. All wire types serialize in camelCase and monetary
//! fields serialize as decimal strings, never floats.

pub mod cart;
pub mod catalog;
pub mod order;
pub mod session;
pub mod user;

pub use cart::{CartItem, CartItemWithProduct, CartProduct};
pub use catalog::{
    Category, Inventory, NewCategory, NewProduct, Product, ProductFilter, ProductWithCategory,
    UpdateCategory, UpdateInventory, UpdateProduct,
};
pub use order::{
    AdminStats, NewOrder, NewOrderItem, Order, OrderItem, OrderItemWithProduct, OrderWithItems,
};
pub use session::{CurrentUser, keys as session_keys};
pub use user::{NewUser, PublicUser, RegisterUser, UpdateUser, User};

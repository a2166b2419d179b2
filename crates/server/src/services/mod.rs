//! Business logic between the HTTP handlers and storage.
//!
//! Services hold a borrowed `dyn Storage` and carry no state of their own
//! (checkout serialization lives in [`orders::CheckoutLocks`], which the app
//! state owns). Handlers construct them per request.

pub mod auth;
pub mod orders;

pub use auth::{AuthError, AuthService};
pub use orders::{CheckoutLocks, OrderError, OrderService, PlaceOrder};

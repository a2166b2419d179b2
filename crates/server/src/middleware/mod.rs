//! HTTP middleware: session layer and auth extractors.

pub mod auth;
pub mod session;

pub use auth::{RequireAdmin, RequireAuth, clear_current_user, set_current_user};
pub use session::{memory_session_layer, postgres_session_layer};

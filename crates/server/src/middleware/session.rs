//! Session middleware configuration.
//!
//! Two stores, matching the two storage backends: a `PostgreSQL` store for
//! persistent deployments and an in-memory store for the demo backend and
//! tests. Cookie policy is identical either way.

use sqlx::PgPool;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer, SessionStore};
use tower_sessions_sqlx_store::PostgresStore;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "freshline_session";

/// Session expiry time in seconds (7 days).
const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

fn configure<S: SessionStore>(store: S, secure: bool) -> SessionManagerLayer<S> {
    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(secure)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}

/// Create the session layer with a `PostgreSQL` store.
///
/// # Errors
///
/// Returns an error if the session table migration fails.
pub async fn postgres_session_layer(
    pool: &PgPool,
    secure: bool,
) -> Result<SessionManagerLayer<PostgresStore>, tower_sessions::session_store::Error> {
    let store = PostgresStore::new(pool.clone());
    store.migrate().await.map_err(|e| {
        tower_sessions::session_store::Error::Backend(format!("session migration failed: {e}"))
    })?;
    Ok(configure(store, secure))
}

/// Create the session layer with an in-memory store.
#[must_use]
pub fn memory_session_layer(secure: bool) -> SessionManagerLayer<MemoryStore> {
    configure(MemoryStore::default(), secure)
}

//! Freshline API server.
//!
//! A B2B grocery ordering backend: catalog browsing, carts, checkout with
//! price snapshots, session-cookie auth, and an admin surface for inventory
//! and order management. Runs against `PostgreSQL` or an in-memory demo
//! store, selected by configuration.

#![cfg_attr(not(test), forbid(unsafe_code))]

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use tower_http::trace::TraceLayer;
use tower_sessions::{SessionManagerLayer, SessionStore};

pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod storage;

use state::AppState;

/// Assemble the full application router.
///
/// The session layer is passed in because its store depends on the storage
/// backend: `PostgreSQL` deployments persist sessions, the memory backend
/// (and tests) keep them in process.
pub fn app<S>(state: AppState, session_layer: SessionManagerLayer<S>) -> Router
where
    S: SessionStore + Clone,
{
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(routes::api_routes())
        .layer(session_layer)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Verifies the storage backend answers before returning OK.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.storage().categories().await {
        Ok(_) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

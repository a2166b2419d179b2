//! Registration, login, logout, and the current-user endpoint.

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tower_sessions::Session;

use crate::error::AppError;
use crate::middleware::{RequireAuth, clear_current_user, set_current_user};
use crate::models::{CurrentUser, PublicUser, RegisterUser};
use crate::services::AuthService;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(me))
}

/// `POST /api/auth/register`
///
/// Creates the account and logs it in. The first account on a fresh store
/// becomes the admin.
async fn register(
    State(state): State<AppState>,
    session: Session,
    Json(payload): Json<RegisterUser>,
) -> Result<Json<PublicUser>, AppError> {
    let auth = AuthService::new(state.storage());
    let user = auth.register(payload).await?;

    set_current_user(&session, &CurrentUser::from(&user)).await?;
    tracing::info!(user_id = %user.id, "user registered");

    Ok(Json(user.into()))
}

#[derive(Debug, Deserialize)]
struct LoginPayload {
    email: String,
    password: String,
}

/// `POST /api/auth/login`
async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(payload): Json<LoginPayload>,
) -> Result<Json<PublicUser>, AppError> {
    let auth = AuthService::new(state.storage());
    let user = auth.login(&payload.email, &payload.password).await?;

    // Cycle the session id on privilege change.
    session.cycle_id().await?;
    set_current_user(&session, &CurrentUser::from(&user)).await?;
    tracing::info!(user_id = %user.id, "user logged in");

    Ok(Json(user.into()))
}

/// `POST /api/auth/logout`
///
/// Idempotent: logging out without a session is still a 200.
async fn logout(session: Session) -> Result<Json<serde_json::Value>, AppError> {
    clear_current_user(&session).await?;
    session.flush().await?;
    Ok(Json(serde_json::json!({ "message": "logged out" })))
}

/// `GET /api/auth/me`
///
/// Returns the live profile, not the session snapshot, so profile edits show
/// up immediately.
async fn me(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
) -> Result<Json<PublicUser>, AppError> {
    let user = state
        .storage()
        .user_by_id(current.id)
        .await?
        .ok_or(AppError::Unauthorized)?;
    Ok(Json(user.into()))
}

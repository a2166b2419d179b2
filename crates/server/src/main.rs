//! Freshline API server binary.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use freshline_server::config::{Config, StorageBackend};
use freshline_server::middleware::{memory_session_layer, postgres_session_layer};
use freshline_server::state::AppState;
use freshline_server::storage::{MemStorage, PgStorage, Storage, postgres};

#[tokio::main]
async fn main() {
    let config = Config::from_env().expect("Failed to load configuration");

    // Defaults to info level for our crate if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "freshline_server=info,tower_http=debug".into());
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let app = match config.storage_backend {
        StorageBackend::Memory => {
            tracing::info!("using in-memory storage with demo data");
            let storage: Arc<dyn Storage> =
                Arc::new(MemStorage::with_demo_data().expect("Failed to seed demo data"));
            let session_layer = memory_session_layer(config.secure_cookies);
            let state = AppState::new(config.clone(), storage);
            freshline_server::app(state, session_layer)
        }
        StorageBackend::Postgres => {
            let database_url = config
                .database_url
                .as_ref()
                .expect("FRESHLINE_DATABASE_URL is required for the postgres backend");
            let pool = postgres::create_pool(database_url)
                .await
                .expect("Failed to create database pool");
            tracing::info!("database pool created, migrations applied");

            let session_layer = postgres_session_layer(&pool, config.secure_cookies)
                .await
                .expect("Failed to initialize session store");
            let storage: Arc<dyn Storage> = Arc::new(PgStorage::new(pool));
            let state = AppState::new(config.clone(), storage);
            freshline_server::app(state, session_layer)
        }
    };

    let addr = config.socket_addr();
    tracing::info!("freshline listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}

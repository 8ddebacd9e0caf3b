//! Relay server setup
//!
//! HTTP routes for log-in and log-out, the chat WebSocket, and process wiring.

mod auth;
mod handler;
mod response;
mod state;

pub use auth::{login, logout, Identity};
pub use handler::{chat_handler, health_check, HealthResponse};
pub use response::{ApiError, ApiResult, ErrorBody, ErrorDetail, NoContent};
pub use state::RelayState;

use axum::{
    http::{header, Method},
    routing::{get, post},
    Router,
};
use relay_common::{AppConfig, AppError};
use relay_db::{PgMessageStore, PgUserRepository};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Create the relay router
pub fn create_router() -> Router<RelayState> {
    Router::new()
        .route("/api/login", post(login))
        .route("/api/logout", post(logout))
        .route("/api/chat", get(chat_handler))
        .route("/health", get(health_check))
}

/// Build the complete application
pub fn create_app(state: RelayState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .allow_origin(Any);

    create_router()
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Initialize storage and create `RelayState`
///
/// Uses PostgreSQL when a database is configured and in-memory storage otherwise.
pub async fn create_relay_state(config: AppConfig) -> Result<RelayState, AppError> {
    let Some(database) = config.database.clone() else {
        tracing::warn!("DATABASE_URL not set, accounts and messages are kept in memory");
        return Ok(RelayState::in_memory(config));
    };

    tracing::info!("Connecting to PostgreSQL...");
    let db_config = relay_db::DatabaseConfig {
        url: database.url,
        max_connections: database.max_connections,
        min_connections: database.min_connections,
        ..Default::default()
    };
    let pool = relay_db::create_pool(&db_config)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    relay_db::ensure_schema(&pool)
        .await
        .map_err(|e| AppError::Database(format!("Failed to apply schema: {e}")))?;
    tracing::info!("PostgreSQL connection established");

    Ok(RelayState::new(
        config,
        Arc::new(PgUserRepository::new(pool.clone())),
        Arc::new(PgMessageStore::new(pool)),
    ))
}

/// Run the relay server until ctrl-c
pub async fn run_server(app: Router, address: &str) -> Result<(), AppError> {
    tracing::info!("Starting relay server on {}", address);

    let listener = TcpListener::bind(address)
        .await
        .map_err(|e| AppError::Config(format!("Failed to bind to {address}: {e}")))?;

    tracing::info!("Relay listening on ws://{}/api/chat", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::Config(format!("Server error: {e}")))?;

    tracing::info!("Relay server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    }
}

/// Run the complete relay server with configuration
pub async fn run(config: AppConfig) -> Result<(), AppError> {
    let address = config.server.address();

    let state = create_relay_state(config).await?;
    let app = create_app(state);

    run_server(app, &address).await
}

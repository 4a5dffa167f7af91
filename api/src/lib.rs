//! HTTP surface for the legal assistant backend.

use std::{env, error::Error, sync::Arc};

mod core;
mod error_handler;
mod routes;

pub use crate::core::app_state::AppState;

use axum::{
    Router,
    routing::{get, post},
};
use tokio::signal;
use tracing::info;

use crate::routes::chat::chat_route::chat;
use crate::routes::health_route::health;
use crate::routes::retrieval::retrieval_eval_route::evaluate_retrieval;
use crate::routes::sessions::session_routes::{create_session, reset_session};

/// Binds `API_ADDRESS` (default `0.0.0.0:8000`) and serves until Ctrl+C.
pub async fn start(state: Arc<AppState>) -> Result<(), Box<dyn Error>> {
    let host_url = env::var("API_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8000".to_string());

    let app = Router::new()
        .route("/sessions", post(create_session))
        .route("/sessions/{session_id}/reset", post(reset_session))
        .route("/chat", post(chat))
        .route("/evaluate/retrieval", post(evaluate_retrieval))
        .route("/health", get(health))
        .with_state(state);

    info!(target: "api", address = %host_url, "listening");
    let listener = tokio::net::TcpListener::bind(&host_url).await?;

    // Start server with graceful shutdown on Ctrl+C
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Returns a future that resolves when Ctrl+C is pressed
async fn shutdown_signal() {
    signal::ctrl_c()
        .await
        .expect("Failed to listen for shutdown signal");
}

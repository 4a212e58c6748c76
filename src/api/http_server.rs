// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::{net::SocketAddr, sync::Arc};
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::detect::detect_handler;
use super::embed::embed_handler;
use super::embed_text::embed_text_handler;
use super::health::{health_handler, models_handler};
use super::scene::scene_handler;
use crate::dispatch::Dispatcher;
use crate::vision::image_utils::MAX_IMAGE_SIZE;

/// Request body limit: a maximum-size image after base64 expansion plus
/// room for the JSON envelope
pub const MAX_REQUEST_BODY: usize = MAX_IMAGE_SIZE / 3 * 4 + 4 + 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
}

impl AppState {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
        }
    }
}

/// Build the router with all endpoints, CORS and request tracing
pub fn create_app(state: AppState) -> Router {
    Router::new()
        // Model availability
        .route("/health", get(health_handler))
        .route("/models", get(models_handler))
        // Inference endpoints
        .route("/detect", post(detect_handler))
        .route("/embed", post(embed_handler))
        .route("/embed-text", post(embed_text_handler))
        .route("/scene", post(scene_handler))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve until Ctrl-C
pub async fn start_server(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let app = create_app(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("API server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("API server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! POST /embed HTTP handler

use axum::{extract::State, Json};
use tracing::info;

use super::request::EmbedRequest;
use super::response::EmbeddingResponse;
use crate::api::errors::ApiError;
use crate::api::http_server::AppState;

/// POST /embed handler
///
/// # Request Body
/// ```json
/// {
///   "image_base64": "data:image/jpeg;base64,/9j/4AAQ...",
///   "model": "clip"   // optional, informational
/// }
/// ```
///
/// # Response Body
/// ```json
/// {
///   "embedding": [0.012, -0.034, ...],
///   "dims": 512
/// }
/// ```
pub async fn embed_handler(
    State(state): State<AppState>,
    Json(request): Json<EmbedRequest>,
) -> Result<Json<EmbeddingResponse>, ApiError> {
    let response = state.dispatcher.embed_image(&request).await?;
    info!("Image embedding generated: {} dims", response.dims);
    Ok(Json(response))
}

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{extract::State, Json};
use tracing::info;

use super::request::EmbedTextRequest;
use crate::api::embed::EmbeddingResponse;
use crate::api::errors::ApiError;
use crate::api::http_server::AppState;

/// POST /embed-text - CLIP text embedding, same space as /embed
pub async fn embed_text_handler(
    State(state): State<AppState>,
    Json(request): Json<EmbedTextRequest>,
) -> Result<Json<EmbeddingResponse>, ApiError> {
    let response = state.dispatcher.embed_text(&request).await?;
    info!("Text embedding generated: {} dims", response.dims);
    Ok(Json(response))
}

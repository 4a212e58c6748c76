// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{extract::State, Json};
use tracing::info;

use super::request::SceneRequest;
use crate::api::errors::ApiError;
use crate::api::http_server::AppState;
use crate::models::SceneResult;

/// POST /scene - Classify the scene of an image
///
/// Requires the Places365 classifier; without it the endpoint answers 503
/// rather than the placeholder used by /detect.
pub async fn scene_handler(
    State(state): State<AppState>,
    Json(request): Json<SceneRequest>,
) -> Result<Json<SceneResult>, ApiError> {
    let scene = state.dispatcher.classify_scene(&request).await?;
    info!("Scene classified as '{}'", scene.primary);
    Ok(Json(scene))
}

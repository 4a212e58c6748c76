// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detection endpoint handler

use axum::{extract::State, Json};
use tracing::info;

use super::request::DetectRequest;
use super::response::DetectResponse;
use crate::api::errors::ApiError;
use crate::api::http_server::AppState;

/// POST /detect - Detect objects in an image
///
/// # Request
/// - `image_base64`: Base64-encoded image (required)
/// - `image_url`: accepted by the schema but rejected as unsupported
///
/// # Response
/// - `image_id`: content-derived id of the submitted image
/// - `objects`: detections, highest score first
/// - `scene`: scene labels (placeholder `unknown` without a scene model)
///
/// # Errors
/// - 400 Bad Request: missing/unsupported input or undecodable image
/// - 503 Service Unavailable: detector not loaded or timed out
/// - 500 Internal Server Error: detection failed
pub async fn detect_handler(
    State(state): State<AppState>,
    Json(request): Json<DetectRequest>,
) -> Result<Json<DetectResponse>, ApiError> {
    let response = state.dispatcher.detect(&request).await?;

    info!(
        "Detection complete: {} objects, scene '{}' ({})",
        response.objects.len(),
        response.scene.primary,
        response.image_id
    );

    Ok(Json(response))
}

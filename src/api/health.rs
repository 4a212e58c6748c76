// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Model availability endpoints

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::api::http_server::AppState;
use crate::models::SlotStatus;

/// Per-slot availability, as reported by GET /health
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub detector: bool,
    pub scene_classifier: bool,
    pub embedder: bool,
}

/// Detailed slot listing, as reported by GET /models
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelsResponse {
    pub models: Vec<SlotStatus>,
}

/// GET /health - never fails
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(state.dispatcher.health())
}

/// GET /models
pub async fn models_handler(State(state): State<AppState>) -> Json<ModelsResponse> {
    Json(state.dispatcher.models())
}

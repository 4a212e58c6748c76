// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod detect;
pub mod embed;
pub mod embed_text;
pub mod errors;
pub mod health;
pub mod http_server;
pub mod scene;

pub use detect::{detect_handler, DetectRequest, DetectResponse, DetectionResult};
pub use embed::{embed_handler, EmbedRequest, EmbeddingResponse};
pub use embed_text::{embed_text_handler, EmbedTextRequest};
pub use errors::{ApiError, ErrorResponse};
pub use health::{health_handler, models_handler, HealthResponse, ModelsResponse};
pub use http_server::{create_app, start_server, AppState, MAX_REQUEST_BODY};
pub use scene::{scene_handler, SceneRequest};

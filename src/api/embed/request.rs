// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image embedding request types

use serde::{Deserialize, Serialize};

use crate::api::errors::ApiError;
use crate::dispatch::validators::require_field;

/// Embedding model served by this endpoint
pub const DEFAULT_EMBED_MODEL: &str = "clip";

fn default_model() -> String {
    DEFAULT_EMBED_MODEL.to_string()
}

/// Request for an image embedding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedRequest {
    /// Base64-encoded image, bare or as a data URI
    #[serde(default)]
    pub image_base64: Option<String>,

    /// Informational; only CLIP is served
    #[serde(default = "default_model")]
    pub model: String,
}

impl Default for EmbedRequest {
    fn default() -> Self {
        Self {
            image_base64: None,
            model: default_model(),
        }
    }
}

impl EmbedRequest {
    pub fn from_base64(payload: impl Into<String>) -> Self {
        Self {
            image_base64: Some(payload.into()),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<&str, ApiError> {
        require_field("image_base64", self.image_base64.as_deref())
    }
}

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use serde::{Deserialize, Serialize};

use crate::api::errors::ApiError;
use crate::dispatch::validators::require_image;

/// Request for scene classification
///
/// Same image sources as detection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SceneRequest {
    #[serde(default)]
    pub image_url: Option<String>,

    #[serde(default)]
    pub image_base64: Option<String>,
}

impl SceneRequest {
    pub fn from_base64(payload: impl Into<String>) -> Self {
        Self {
            image_url: None,
            image_base64: Some(payload.into()),
        }
    }

    pub fn validate(&self) -> Result<&str, ApiError> {
        require_image(self.image_base64.as_deref(), self.image_url.as_deref())
    }
}

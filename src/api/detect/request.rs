// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detection request types

use serde::{Deserialize, Serialize};

use crate::api::errors::ApiError;
use crate::dispatch::validators::require_image;

/// Request for object detection
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectRequest {
    /// Image URL (not supported yet)
    #[serde(default)]
    pub image_url: Option<String>,

    /// Base64-encoded image, bare or as a data URI
    #[serde(default)]
    pub image_base64: Option<String>,
}

impl DetectRequest {
    pub fn from_base64(payload: impl Into<String>) -> Self {
        Self {
            image_url: None,
            image_base64: Some(payload.into()),
        }
    }

    /// Validate the request, returning the base64 payload to decode
    pub fn validate(&self) -> Result<&str, ApiError> {
        require_image(self.image_base64.as_deref(), self.image_url.as_deref())
    }
}

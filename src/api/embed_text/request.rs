// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use serde::{Deserialize, Serialize};

use crate::api::errors::ApiError;
use crate::dispatch::validators::require_field;

/// Request for a text embedding
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmbedTextRequest {
    #[serde(default)]
    pub text: Option<String>,
}

impl EmbedTextRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
        }
    }

    pub fn validate(&self) -> Result<&str, ApiError> {
        require_field("text", self.text.as_deref())
    }
}

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use crate::models::SlotName;
use crate::vision::ImageError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub error_type: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HashMap<String, serde_json::Value>>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    #[error("Invalid image data: {0}")]
    InvalidImage(String),

    #[error("{message}")]
    MissingInput {
        field: &'static str,
        message: String,
    },

    #[error("{message}")]
    UnsupportedInput {
        field: &'static str,
        message: String,
    },

    #[error("{0} model not loaded")]
    ModelUnavailable(SlotName),

    #[error("{0} inference timed out")]
    Timeout(SlotName),

    #[error("{0}")]
    Inference(String),
}

impl ApiError {
    pub fn missing(field: &'static str, message: impl Into<String>) -> Self {
        ApiError::MissingInput {
            field,
            message: message.into(),
        }
    }

    pub fn unsupported(field: &'static str, message: impl Into<String>) -> Self {
        ApiError::UnsupportedInput {
            field,
            message: message.into(),
        }
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            ApiError::InvalidImage(_) => "invalid_image",
            ApiError::MissingInput { .. } => "missing_input",
            ApiError::UnsupportedInput { .. } => "unsupported_input",
            ApiError::ModelUnavailable(_) => "model_unavailable",
            ApiError::Timeout(_) => "timeout",
            ApiError::Inference(_) => "inference_error",
        }
    }

    pub fn to_response(&self) -> ErrorResponse {
        let details = match self {
            ApiError::MissingInput { field, .. } | ApiError::UnsupportedInput { field, .. } => {
                let mut details = HashMap::new();
                details.insert(
                    "field".to_string(),
                    serde_json::Value::String(field.to_string()),
                );
                Some(details)
            }
            ApiError::ModelUnavailable(slot) | ApiError::Timeout(slot) => {
                let mut details = HashMap::new();
                details.insert(
                    "model".to_string(),
                    serde_json::Value::String(slot.to_string()),
                );
                Some(details)
            }
            ApiError::InvalidImage(_) | ApiError::Inference(_) => None,
        };

        ErrorResponse {
            error_type: self.error_type().to_string(),
            message: self.to_string(),
            details,
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::InvalidImage(_)
            | ApiError::MissingInput { .. }
            | ApiError::UnsupportedInput { .. } => 400,
            ApiError::ModelUnavailable(_) | ApiError::Timeout(_) => 503,
            ApiError::Inference(_) => 500,
        }
    }
}

impl From<ImageError> for ApiError {
    fn from(err: ImageError) -> Self {
        ApiError::InvalidImage(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_response())).into_response()
    }
}

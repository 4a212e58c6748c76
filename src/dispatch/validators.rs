// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Required-field checks shared by the endpoint request types
//!
//! These run before any model lookup or decoding.

use crate::api::errors::ApiError;

/// Resolve the image source of an image request
///
/// Only inline base64 images are served. A request carrying just an
/// `image_url` is rejected as unsupported; one with neither source is
/// rejected as missing input. Empty strings count as absent.
pub fn require_image<'a>(
    image_base64: Option<&'a str>,
    image_url: Option<&str>,
) -> Result<&'a str, ApiError> {
    match (non_empty(image_base64), non_empty(image_url)) {
        (Some(payload), _) => Ok(payload),
        (None, Some(_)) => Err(ApiError::unsupported(
            "image_url",
            "Only base64 images supported currently",
        )),
        (None, None) => Err(ApiError::missing(
            "image_base64",
            "Either image_base64 or image_url must be provided",
        )),
    }
}

/// Require a non-empty string field
pub fn require_field<'a>(field: &'static str, text: Option<&'a str>) -> Result<&'a str, ApiError> {
    non_empty(text).ok_or_else(|| ApiError::missing(field, format!("{} is required", field)))
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

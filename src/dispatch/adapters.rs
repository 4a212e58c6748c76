// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Model-native outputs to response schema

use sha2::{Digest, Sha256};
use std::cmp::Ordering;

use crate::api::detect::DetectionResult;
use crate::models::RawDetection;
use crate::vision::strip_data_uri;

/// Hex characters of the payload digest kept in an image id
const IMAGE_ID_HEX_LEN: usize = 16;

/// Diagnostic id for an image payload: `img_` + 16 hex chars of SHA-256
///
/// Computed over the base64 body, so data-URI and bare forms of the same
/// image share an id.
pub fn image_id(payload: &str) -> String {
    let digest = Sha256::digest(strip_data_uri(payload).trim().as_bytes());
    let hex = hex::encode(digest);
    format!("img_{}", &hex[..IMAGE_ID_HEX_LEN])
}

/// Convert detector boxes to response objects
///
/// Objects are ordered by descending score; equal scores keep detector
/// output order. `object_id` is `obj_{position}_{class_id}`. Boxes become
/// `[x, y, width, height]` with every entry clamped to be non-negative.
pub fn to_detection_results<F>(mut raw: Vec<RawDetection>, class_name: F) -> Vec<DetectionResult>
where
    F: Fn(usize) -> String,
{
    raw.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));

    raw.into_iter()
        .enumerate()
        .map(|(i, det)| {
            let x = det.x1.max(0.0);
            let y = det.y1.max(0.0);
            DetectionResult {
                object_id: format!("obj_{}_{}", i, det.class_id),
                class_name: class_name(det.class_id),
                score: det.score.clamp(0.0, 1.0),
                bbox: [
                    x,
                    y,
                    (det.x2 - x).max(0.0),
                    (det.y2 - y).max(0.0),
                ],
                crop_url: None,
            }
        })
        .collect()
}

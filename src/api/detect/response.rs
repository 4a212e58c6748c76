// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detection response types

use serde::{Deserialize, Serialize};

use crate::models::SceneResult;

/// A detected object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    /// `obj_{position}_{class_id}`, unique within one response
    pub object_id: String,
    pub class_name: String,
    /// Confidence score (0.0-1.0)
    pub score: f32,
    /// `[x, y, width, height]` in source image pixels
    pub bbox: [f32; 4],
    /// Crop reference (always null)
    pub crop_url: Option<String>,
}

/// Response from object detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectResponse {
    pub image_id: String,
    pub objects: Vec<DetectionResult>,
    pub scene: SceneResult,
}

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! YOLO object detector (ONNX export)
//!
//! Runs an Ultralytics YOLO/YOLOE export on a 640x640 letterboxed input and
//! decodes the `[1, 4 + classes (+ mask coefficients), anchors]` head into
//! boxes in source-image pixel coordinates.

use anyhow::{Context, Result};
use image::DynamicImage;
use ndarray::{ArrayViewD, Axis, Ix2};
use ort::session::Session;
use ort::value::Value;
use std::cmp::Ordering;
use std::path::Path;
use tracing::{debug, info, warn};

use super::session::{build_session, first_input_name};
use crate::vision::preprocessing::{letterbox, LetterboxInfo, DETECTOR_INPUT_SIZE};

/// Class names file expected next to the detector model
pub const CLASS_NAMES_FILE: &str = "classes.txt";

/// Upper bound on boxes returned for one image
pub const MAX_DETECTIONS: usize = 300;

/// Process-wide detection thresholds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionParams {
    /// Minimum class confidence for a box to be kept
    pub confidence_threshold: f32,
    /// Overlap (IoU) above which the lower-scored box of a class is suppressed
    pub iou_threshold: f32,
}

impl Default for DetectionParams {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.25,
            iou_threshold: 0.45,
        }
    }
}

/// One detector box in source-image pixel coordinates (corner form)
#[derive(Debug, Clone, PartialEq)]
pub struct RawDetection {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    /// Class confidence (0.0-1.0)
    pub score: f32,
    /// Index into the detector's class table
    pub class_id: usize,
}

impl RawDetection {
    pub fn width(&self) -> f32 {
        (self.x2 - self.x1).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.y2 - self.y1).max(0.0)
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// Intersection over union with another box
    pub fn iou(&self, other: &RawDetection) -> f32 {
        let ix = (self.x2.min(other.x2) - self.x1.max(other.x1)).max(0.0);
        let iy = (self.y2.min(other.y2) - self.y1.max(other.y1)).max(0.0);
        let intersection = ix * iy;
        let union = self.area() + other.area() - intersection;
        if union <= 0.0 {
            0.0
        } else {
            intersection / union
        }
    }
}

/// Object detection capability held by the `detector` slot
#[cfg_attr(test, mockall::automock)]
pub trait ObjectDetector: Send {
    /// Human-readable name for a class index
    fn class_name(&self, class_id: usize) -> String;

    /// Detect objects, returning boxes above `params.confidence_threshold`
    /// after overlap suppression
    fn detect(&mut self, image: &DynamicImage, params: &DetectionParams) -> Result<Vec<RawDetection>>;
}

/// YOLO detector backed by ONNX Runtime
pub struct YoloDetector {
    session: Session,
    input_name: String,
    class_names: Vec<String>,
}

impl std::fmt::Debug for YoloDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YoloDetector")
            .field("input_name", &self.input_name)
            .field("classes", &self.class_names.len())
            .finish_non_exhaustive()
    }
}

impl YoloDetector {
    /// Load the detector from an ONNX file
    ///
    /// Class names are read from `classes.txt` in the same directory when
    /// present; otherwise classes are reported as `class_<index>`.
    pub fn load(model_path: &Path) -> Result<Self> {
        let session = build_session(model_path)?;
        let input_name = first_input_name(&session, "images");

        let names_path = model_path
            .parent()
            .map(|dir| dir.join(CLASS_NAMES_FILE))
            .filter(|p| p.exists());

        let class_names = match names_path {
            Some(path) => {
                let text = std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read class names from {}", path.display()))?;
                parse_class_names(&text)
            }
            None => {
                warn!(
                    "No {} next to {}, using numeric class names",
                    CLASS_NAMES_FILE,
                    model_path.display()
                );
                Vec::new()
            }
        };

        info!(
            "YOLO detector ready (input: {}, {} class names)",
            input_name,
            class_names.len()
        );

        Ok(Self {
            session,
            input_name,
            class_names,
        })
    }
}

impl ObjectDetector for YoloDetector {
    fn class_name(&self, class_id: usize) -> String {
        self.class_names
            .get(class_id)
            .cloned()
            .unwrap_or_else(|| format!("class_{}", class_id))
    }

    fn detect(&mut self, image: &DynamicImage, params: &DetectionParams) -> Result<Vec<RawDetection>> {
        let (tensor, info) = letterbox(image, DETECTOR_INPUT_SIZE);

        let input_value = Value::from_array(tensor).context("Failed to create input tensor")?;

        let outputs = self
            .session
            .run(ort::inputs![self.input_name.as_str() => input_value])
            .context("Detection inference failed")?;

        let output = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract output tensor")?;

        debug!("Detector output shape: {:?}", output.shape());

        let known_classes = (!self.class_names.is_empty()).then_some(self.class_names.len());
        let candidates = decode_predictions(output.view(), known_classes, params, &info)?;

        Ok(non_max_suppression(candidates, params.iou_threshold))
    }
}

/// Parse a class names file: one name per line, blank lines ignored
pub fn parse_class_names(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Decode a YOLO head into candidate boxes above the confidence threshold
///
/// Accepts `[1, features, anchors]` (Ultralytics default) or the transposed
/// `[1, anchors, features]`. `features = 4 + classes (+ mask coefficients)`.
/// When `num_classes` is unknown every feature after the box is a class score.
pub fn decode_predictions(
    output: ArrayViewD<f32>,
    num_classes: Option<usize>,
    params: &DetectionParams,
    info: &LetterboxInfo,
) -> Result<Vec<RawDetection>> {
    let shape = output.shape().to_vec();
    if shape.len() != 3 || shape[0] != 1 {
        anyhow::bail!("Unexpected detector output shape: {:?}", shape);
    }

    let head = output
        .index_axis(Axis(0), 0)
        .into_dimensionality::<Ix2>()
        .context("Failed to view detector output as 2-D")?;
    // Anchors always outnumber features for 640x640 inputs
    let head = if shape[1] <= shape[2] {
        head
    } else {
        head.reversed_axes()
    };

    let features = head.shape()[0];
    let anchors = head.shape()[1];
    if features <= 4 {
        anyhow::bail!("Detector output has no class scores: {:?}", shape);
    }

    let classes = num_classes
        .filter(|n| *n > 0 && 4 + n <= features)
        .unwrap_or(features - 4);

    let mut detections = Vec::new();

    for a in 0..anchors {
        let mut best_class = 0;
        let mut best_score = f32::MIN;
        for c in 0..classes {
            let score = head[[4 + c, a]];
            if score > best_score {
                best_score = score;
                best_class = c;
            }
        }

        if best_score < params.confidence_threshold {
            continue;
        }

        let (cx, cy, w, h) = (head[[0, a]], head[[1, a]], head[[2, a]], head[[3, a]]);
        let (x1, y1) = info.map_to_original(cx - w / 2.0, cy - h / 2.0);
        let (x2, y2) = info.map_to_original(cx + w / 2.0, cy + h / 2.0);

        if x2 <= x1 || y2 <= y1 {
            continue;
        }

        detections.push(RawDetection {
            x1,
            y1,
            x2,
            y2,
            score: best_score.clamp(0.0, 1.0),
            class_id: best_class,
        });
    }

    Ok(detections)
}

/// Per-class greedy non-maximum suppression
///
/// Output is sorted by descending score; equal scores keep their input order.
pub fn non_max_suppression(mut candidates: Vec<RawDetection>, iou_threshold: f32) -> Vec<RawDetection> {
    candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));

    let mut kept: Vec<RawDetection> = Vec::new();
    for candidate in candidates {
        let suppressed = kept
            .iter()
            .any(|k| k.class_id == candidate.class_id && k.iou(&candidate) > iou_threshold);
        if !suppressed {
            kept.push(candidate);
            if kept.len() == MAX_DETECTIONS {
                break;
            }
        }
    }

    kept
}

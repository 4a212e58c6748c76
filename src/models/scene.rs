// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Scene classification
//!
//! Two implementations of [`SceneClassifier`]:
//! - [`Places365Classifier`]: ResNet-50 trained on Places365 (ONNX export)
//! - [`UnavailableClassifier`]: fixed placeholder used when no real
//!   classifier is loaded

use anyhow::{Context, Result};
use image::DynamicImage;
use ort::session::Session;
use ort::value::Value;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::Path;
use tracing::info;

use super::session::{build_session, first_input_name};
use crate::vision::preprocessing::preprocess_for_scene;

/// Category list expected next to the Places365 model
pub const CATEGORIES_FILE: &str = "categories_places365.txt";

/// Label reported when no scene could be determined
pub const UNKNOWN_SCENE: &str = "unknown";

/// One ranked scene label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneLabel {
    pub label: String,
    pub score: f32,
}

/// Primary scene label plus ranked alternatives
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneResult {
    pub primary: String,
    pub labels: Vec<SceneLabel>,
}

impl SceneResult {
    /// Placeholder scene: `unknown` with score 0
    pub fn unknown() -> Self {
        Self {
            primary: UNKNOWN_SCENE.to_string(),
            labels: vec![SceneLabel {
                label: UNKNOWN_SCENE.to_string(),
                score: 0.0,
            }],
        }
    }
}

/// Scene classification capability held by the `scene-classifier` slot
#[cfg_attr(test, mockall::automock)]
pub trait SceneClassifier: Send {
    /// Classify an image, returning at most `top_k` labels
    fn classify(&mut self, image: &DynamicImage, top_k: usize) -> Result<SceneResult>;
}

/// Stand-in classifier used when no Places365 model is loaded
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableClassifier;

impl SceneClassifier for UnavailableClassifier {
    fn classify(&mut self, _image: &DynamicImage, _top_k: usize) -> Result<SceneResult> {
        Ok(SceneResult::unknown())
    }
}

/// Places365 ResNet-50 classifier backed by ONNX Runtime
pub struct Places365Classifier {
    session: Session,
    input_name: String,
    categories: Vec<String>,
}

impl std::fmt::Debug for Places365Classifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Places365Classifier")
            .field("input_name", &self.input_name)
            .field("categories", &self.categories.len())
            .finish_non_exhaustive()
    }
}

impl Places365Classifier {
    /// Load the classifier and its category list
    ///
    /// The category file (`categories_places365.txt`) must sit next to the
    /// model; without it the logits cannot be named.
    pub fn load(model_path: &Path) -> Result<Self> {
        let categories_path = model_path
            .parent()
            .map(|dir| dir.join(CATEGORIES_FILE))
            .context("Scene model path has no parent directory")?;

        let text = std::fs::read_to_string(&categories_path).with_context(|| {
            format!(
                "Failed to read scene categories from {}",
                categories_path.display()
            )
        })?;
        let categories: Vec<String> = text.lines().filter_map(parse_category_line).collect();
        if categories.is_empty() {
            anyhow::bail!("No categories in {}", categories_path.display());
        }

        let session = build_session(model_path)?;
        let input_name = first_input_name(&session, "input");

        info!(
            "✅ Places365 classifier loaded ({} categories)",
            categories.len()
        );

        Ok(Self {
            session,
            input_name,
            categories,
        })
    }
}

impl SceneClassifier for Places365Classifier {
    fn classify(&mut self, image: &DynamicImage, top_k: usize) -> Result<SceneResult> {
        let input = Value::from_array(preprocess_for_scene(image))
            .context("Failed to create scene input tensor")?;

        let outputs = self
            .session
            .run(ort::inputs![self.input_name.as_str() => input])
            .context("Scene inference failed")?;

        let logits: Vec<f32> = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract scene logits")?
            .iter()
            .copied()
            .collect();

        if logits.len() != self.categories.len() {
            anyhow::bail!(
                "Scene model produced {} logits for {} categories",
                logits.len(),
                self.categories.len()
            );
        }

        Ok(rank_top_k(&softmax(&logits), &self.categories, top_k))
    }
}

/// Parse one line of `categories_places365.txt`
///
/// `/a/airfield 0` → `airfield`, `/a/arena/hockey 14` → `arena/hockey`.
pub fn parse_category_line(line: &str) -> Option<String> {
    let name = line.split_whitespace().next()?;
    let bytes = name.as_bytes();
    let stripped = if bytes.len() > 3 && bytes[0] == b'/' && bytes[2] == b'/' {
        &name[3..]
    } else {
        name.trim_start_matches('/')
    };
    (!stripped.is_empty()).then(|| stripped.to_string())
}

/// Numerically stable softmax
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&l| (l - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    if sum <= 0.0 || !sum.is_finite() {
        return vec![0.0; logits.len()];
    }
    exps.into_iter().map(|e| e / sum).collect()
}

/// Rank probabilities and keep the `top_k` best labels
///
/// Labels come back in descending score order; equal scores keep category
/// order.
pub fn rank_top_k(probs: &[f32], categories: &[String], top_k: usize) -> SceneResult {
    let mut ranked: Vec<(usize, f32)> = probs.iter().copied().enumerate().collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

    let labels: Vec<SceneLabel> = ranked
        .into_iter()
        .take(top_k.max(1))
        .filter_map(|(idx, score)| {
            categories.get(idx).map(|label| SceneLabel {
                label: label.clone(),
                score,
            })
        })
        .collect();

    match labels.first() {
        Some(first) => SceneResult {
            primary: first.label.clone(),
            labels,
        },
        None => SceneResult::unknown(),
    }
}

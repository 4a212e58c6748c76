// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! CLIP image/text embedder (ONNX export)
//!
//! The visual and textual towers are exported as two separate ONNX graphs
//! sharing one embedding space:
//! - `visual.onnx`: pixel values `[1, 3, 224, 224]` → image embedding
//! - `textual.onnx`: token ids `[1, 77]` → text embedding
//! - `tokenizer.json`: HuggingFace CLIP BPE tokenizer
//!
//! Vectors are returned flattened and unnormalized; `dims` is whatever the
//! graph produces.

use anyhow::{Context, Result};
use image::DynamicImage;
use ndarray::Array2;
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use tokenizers::Tokenizer;
use tracing::{debug, info};

use super::session::{build_session, first_input_name, has_input};
use crate::vision::preprocessing::preprocess_for_clip;

/// CLIP text context length
pub const CLIP_CONTEXT_LENGTH: usize = 77;

/// End-of-text token in the CLIP vocabulary
pub const CLIP_EOT_TOKEN: &str = "<|endoftext|>";

pub const VISUAL_MODEL_FILE: &str = "visual.onnx";
pub const TEXTUAL_MODEL_FILE: &str = "textual.onnx";
pub const TOKENIZER_FILE: &str = "tokenizer.json";

/// Image and text embedding capability held by the `embedder` slot
///
/// Both methods must produce vectors in the same space so callers can
/// compare image and text embeddings directly.
#[cfg_attr(test, mockall::automock)]
pub trait ImageTextEmbedder: Send {
    fn embed_image(&mut self, image: &DynamicImage) -> Result<Vec<f32>>;

    fn embed_text(&mut self, text: &str) -> Result<Vec<f32>>;
}

/// CLIP ViT-B/32 embedder backed by ONNX Runtime
pub struct ClipEmbedder {
    visual: Session,
    textual: Session,
    tokenizer: Tokenizer,
    visual_input: String,
    textual_input: String,
    text_attention_mask: bool,
    eot_id: Option<u32>,
}

impl std::fmt::Debug for ClipEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClipEmbedder")
            .field("visual_input", &self.visual_input)
            .field("textual_input", &self.textual_input)
            .field("text_attention_mask", &self.text_attention_mask)
            .finish_non_exhaustive()
    }
}

impl ClipEmbedder {
    /// Load both CLIP towers and the tokenizer from a model directory
    ///
    /// # Errors
    /// Returns error if any of `visual.onnx`, `textual.onnx` or
    /// `tokenizer.json` is missing or fails to load.
    pub fn load(model_dir: &Path) -> Result<Self> {
        let tokenizer_path = model_dir.join(TOKENIZER_FILE);
        if !tokenizer_path.exists() {
            anyhow::bail!("Tokenizer file not found: {}", tokenizer_path.display());
        }

        let visual = build_session(&model_dir.join(VISUAL_MODEL_FILE))?;
        let textual = build_session(&model_dir.join(TEXTUAL_MODEL_FILE))?;

        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow::anyhow!("Failed to load tokenizer: {}", e))?;

        let visual_input = first_input_name(&visual, "pixel_values");
        let textual_input = first_input_name(&textual, "input_ids");
        let text_attention_mask = has_input(&textual, "attention_mask");
        let eot_id = tokenizer.token_to_id(CLIP_EOT_TOKEN);

        info!(
            "✅ CLIP embedder loaded from {} (attention mask: {})",
            model_dir.display(),
            text_attention_mask
        );

        Ok(Self {
            visual,
            textual,
            tokenizer,
            visual_input,
            textual_input,
            text_attention_mask,
            eot_id,
        })
    }
}

impl ImageTextEmbedder for ClipEmbedder {
    fn embed_image(&mut self, image: &DynamicImage) -> Result<Vec<f32>> {
        let pixels = preprocess_for_clip(image);
        let pixel_values = Value::from_array(pixels).context("Failed to create pixel tensor")?;

        let outputs = self
            .visual
            .run(ort::inputs![self.visual_input.as_str() => pixel_values])
            .context("CLIP visual inference failed")?;

        let embedding: Vec<f32> = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract image embedding")?
            .iter()
            .copied()
            .collect();

        debug!("Image embedding: {} dims", embedding.len());
        Ok(embedding)
    }

    fn embed_text(&mut self, text: &str) -> Result<Vec<f32>> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| anyhow::anyhow!("Tokenization failed: {}", e))?;

        let (ids, mask) = pad_clip_tokens(encoding.get_ids(), self.eot_id);

        let input_ids = Array2::from_shape_vec((1, CLIP_CONTEXT_LENGTH), ids)
            .context("Failed to create input_ids array")?;

        let run_result = if self.text_attention_mask {
            let attention_mask = Array2::from_shape_vec((1, CLIP_CONTEXT_LENGTH), mask)
                .context("Failed to create attention_mask array")?;
            self.textual.run(ort::inputs![
                self.textual_input.as_str() => Value::from_array(input_ids)?,
                "attention_mask" => Value::from_array(attention_mask)?
            ])
        } else {
            self.textual
                .run(ort::inputs![self.textual_input.as_str() => Value::from_array(input_ids)?])
        };
        let outputs = run_result.context("CLIP textual inference failed")?;

        let embedding: Vec<f32> = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract text embedding")?
            .iter()
            .copied()
            .collect();

        debug!("Text embedding: {} dims", embedding.len());
        Ok(embedding)
    }
}

/// Fit token ids to the CLIP context window
///
/// Sequences longer than the window are truncated and end with the EOT
/// token (when known); shorter ones are zero-padded. Returns `(ids, mask)`.
pub fn pad_clip_tokens(ids: &[u32], eot_id: Option<u32>) -> (Vec<i64>, Vec<i64>) {
    let mut tokens: Vec<i64> = ids.iter().map(|&id| id as i64).collect();

    if tokens.len() > CLIP_CONTEXT_LENGTH {
        tokens.truncate(CLIP_CONTEXT_LENGTH);
        if let Some(eot) = eot_id {
            tokens[CLIP_CONTEXT_LENGTH - 1] = eot as i64;
        }
    }

    let real = tokens.len();
    let mut mask = vec![1i64; real];

    tokens.resize(CLIP_CONTEXT_LENGTH, 0);
    mask.resize(CLIP_CONTEXT_LENGTH, 0);

    (tokens, mask)
}

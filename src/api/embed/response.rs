// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use serde::{Deserialize, Serialize};

/// Embedding vector with its dimension count
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingResponse {
    pub embedding: Vec<f32>,
    /// Always `embedding.len()`
    pub dims: usize,
}

impl EmbeddingResponse {
    pub fn new(embedding: Vec<f32>) -> Self {
        let dims = embedding.len();
        Self { embedding, dims }
    }
}

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! ONNX Runtime session construction shared by all model slots

use anyhow::{Context, Result};
use ort::execution_providers::{CPUExecutionProvider, CUDAExecutionProvider};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use std::path::Path;
use tracing::{info, warn};

/// Intra-op threads per session
const INTRA_THREADS: usize = 4;

/// Load an ONNX model, trying CUDA first and falling back to CPU
pub fn build_session(model_path: &Path) -> Result<Session> {
    if !model_path.exists() {
        anyhow::bail!("ONNX model file not found: {}", model_path.display());
    }

    let cuda_result = Session::builder()
        .context("Failed to create session builder")?
        .with_execution_providers([CUDAExecutionProvider::default().build()])
        .context("Failed to set CUDA execution provider")?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .context("Failed to set optimization level")?
        .with_intra_threads(INTRA_THREADS)
        .context("Failed to set intra threads")?
        .commit_from_file(model_path);

    match cuda_result {
        Ok(session) => {
            info!("✅ Loaded {} (CUDA execution provider)", model_path.display());
            Ok(session)
        }
        Err(e) => {
            warn!("⚠️  CUDA execution provider failed for {}: {}", model_path.display(), e);
            let session = Session::builder()
                .context("Failed to create session builder")?
                .with_execution_providers([CPUExecutionProvider::default().build()])
                .context("Failed to set CPU execution provider")?
                .with_optimization_level(GraphOptimizationLevel::Level3)
                .context("Failed to set optimization level")?
                .with_intra_threads(INTRA_THREADS)
                .context("Failed to set intra threads")?
                .commit_from_file(model_path)
                .context(format!(
                    "Failed to load ONNX model from {}",
                    model_path.display()
                ))?;
            info!("✅ Loaded {} (CPU execution provider)", model_path.display());
            Ok(session)
        }
    }
}

/// Name of the first model input, or `fallback` if the graph declares none
pub fn first_input_name(session: &Session, fallback: &str) -> String {
    session
        .inputs
        .first()
        .map(|input| input.name.clone())
        .unwrap_or_else(|| fallback.to_string())
}

/// Whether the model declares an input with the given name
pub fn has_input(session: &Session, name: &str) -> bool {
    session.inputs.iter().any(|input| input.name == name)
}

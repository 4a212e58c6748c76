// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Request dispatch
//!
//! Every endpoint follows the same contract:
//! 1. Required fields are validated (400 on failure)
//! 2. Required model slots are checked (503 before any decoding)
//! 3. The image is decoded and the model is invoked under its slot lock
//!
//! Inference failures are logged here and surface as a generic 500.

pub mod adapters;
pub mod validators;

use image::DynamicImage;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::api::detect::{DetectRequest, DetectResponse};
use crate::api::embed::{EmbedRequest, EmbeddingResponse};
use crate::api::embed_text::EmbedTextRequest;
use crate::api::errors::ApiError;
use crate::api::health::{HealthResponse, ModelsResponse};
use crate::api::scene::SceneRequest;
use crate::models::{
    DetectionParams, ModelHandle, ModelRegistry, SceneClassifier, SceneResult, SlotName,
    UnavailableClassifier,
};
use crate::vision::{decode_base64_image, ImageInfo};

use adapters::{image_id, to_detection_results};

/// Process-wide inference settings, fixed at startup
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchSettings {
    pub detection: DetectionParams,
    /// Labels returned per scene classification
    pub scene_top_k: usize,
    /// Per-call inference limit, counted from when the call gets the slot
    /// lock; time queued behind other calls is not included. `None` waits
    /// indefinitely
    pub inference_timeout: Option<Duration>,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            detection: DetectionParams::default(),
            scene_top_k: 5,
            inference_timeout: Some(Duration::from_secs(30)),
        }
    }
}

/// Routes validated requests to loaded models
pub struct Dispatcher {
    registry: Arc<ModelRegistry>,
    settings: DispatchSettings,
}

impl Dispatcher {
    pub fn new(registry: Arc<ModelRegistry>, settings: DispatchSettings) -> Self {
        Self { registry, settings }
    }

    pub fn health(&self) -> HealthResponse {
        HealthResponse {
            detector: self.registry.is_loaded(SlotName::Detector),
            scene_classifier: self.registry.is_loaded(SlotName::SceneClassifier),
            embedder: self.registry.is_loaded(SlotName::Embedder),
        }
    }

    pub fn models(&self) -> ModelsResponse {
        ModelsResponse {
            models: self.registry.list_models(),
        }
    }

    /// Detect objects and attach a scene label
    ///
    /// The scene comes from the loaded classifier when there is one and
    /// falls back to the `unknown` placeholder otherwise, including when
    /// classification fails.
    pub async fn detect(&self, request: &DetectRequest) -> Result<DetectResponse, ApiError> {
        let payload = request.validate().map_err(|e| rejected("detect", e))?;
        let detector = available(self.registry.detector(), SlotName::Detector)?;
        let image = Arc::new(decode(payload)?);

        let params = self.settings.detection;
        let objects = {
            let image = Arc::clone(&image);
            self.invoke(&detector, "Detection", move |model| {
                let raw = model.detect(&image, &params)?;
                Ok(to_detection_results(raw, |class_id| model.class_name(class_id)))
            })
            .await?
        };

        let scene = self.scene_for_detection(image).await;

        Ok(DetectResponse {
            image_id: image_id(payload),
            objects,
            scene,
        })
    }

    pub async fn embed_image(&self, request: &EmbedRequest) -> Result<EmbeddingResponse, ApiError> {
        let payload = request.validate().map_err(|e| rejected("embed", e))?;
        let embedder = available(self.registry.embedder(), SlotName::Embedder)?;

        if request.model != crate::api::embed::request::DEFAULT_EMBED_MODEL {
            debug!("Ignoring requested embed model '{}'", request.model);
        }

        let image = decode(payload)?;
        let embedding = self
            .invoke(&embedder, "Embedding generation", move |model| {
                model.embed_image(&image)
            })
            .await?;

        Ok(EmbeddingResponse::new(embedding))
    }

    pub async fn embed_text(
        &self,
        request: &EmbedTextRequest,
    ) -> Result<EmbeddingResponse, ApiError> {
        let text = request
            .validate()
            .map_err(|e| rejected("embed-text", e))?
            .to_string();
        let embedder = available(self.registry.embedder(), SlotName::Embedder)?;

        let embedding = self
            .invoke(&embedder, "Text embedding generation", move |model| {
                model.embed_text(&text)
            })
            .await?;

        Ok(EmbeddingResponse::new(embedding))
    }

    /// Classify the scene of an image; requires a loaded classifier
    pub async fn classify_scene(&self, request: &SceneRequest) -> Result<SceneResult, ApiError> {
        let payload = request.validate().map_err(|e| rejected("scene", e))?;
        let classifier = available(self.registry.scene_classifier(), SlotName::SceneClassifier)?;
        let image = decode(payload)?;

        let top_k = self.settings.scene_top_k;
        self.invoke(&classifier, "Scene classification", move |model| {
            model.classify(&image, top_k)
        })
        .await
    }

    async fn scene_for_detection(&self, image: Arc<DynamicImage>) -> SceneResult {
        let top_k = self.settings.scene_top_k;

        match self.registry.scene_classifier() {
            Some(classifier) => {
                let result = self
                    .invoke(&classifier, "Scene classification", move |model| {
                        model.classify(&image, top_k)
                    })
                    .await;
                result.unwrap_or_else(|e| {
                    warn!("Using placeholder scene for detection: {}", e);
                    SceneResult::unknown()
                })
            }
            None => UnavailableClassifier
                .classify(&image, top_k)
                .unwrap_or_else(|_| SceneResult::unknown()),
        }
    }

    /// Run one model call under the slot lock, with the configured timeout
    /// applied once the lock is held
    async fn invoke<M, R, F>(
        &self,
        handle: &ModelHandle<M>,
        operation: &'static str,
        call: F,
    ) -> Result<R, ApiError>
    where
        M: ?Sized + Send + 'static,
        R: Send + 'static,
        F: FnOnce(&mut M) -> anyhow::Result<R> + Send + 'static,
    {
        let run = handle.acquire().await.run(call);

        let result = match self.settings.inference_timeout {
            Some(limit) => tokio::time::timeout(limit, run).await.map_err(|_| {
                warn!("{} timed out after {:?} on {}", operation, limit, handle.slot());
                ApiError::Timeout(handle.slot())
            })?,
            None => run.await,
        };

        result.map_err(|e| {
            error!("{} failed: {:#}", operation, e);
            ApiError::Inference(format!("{} failed", operation))
        })
    }
}

fn rejected(endpoint: &str, err: ApiError) -> ApiError {
    warn!("{} request rejected: {}", endpoint, err);
    err
}

fn available<M: ?Sized>(
    handle: Option<ModelHandle<M>>,
    slot: SlotName,
) -> Result<ModelHandle<M>, ApiError> {
    handle.ok_or_else(|| {
        warn!("{} model not loaded", slot);
        ApiError::ModelUnavailable(slot)
    })
}

fn decode(payload: &str) -> Result<DynamicImage, ApiError> {
    let (image, info): (DynamicImage, ImageInfo) = decode_base64_image(payload).map_err(|e| {
        warn!("Failed to decode image: {}", e);
        ApiError::from(e)
    })?;

    debug!(
        "Decoded image: {}x{} {:?}, {} bytes",
        info.width, info.height, info.format, info.size_bytes
    );

    Ok(image)
}

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// tests/mock/mod.rs - Hand-written model fakes shared by integration tests
#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{DynamicImage, ImageFormat, RgbImage};
use reflect_ml_service::{
    api::{create_app, AppState},
    dispatch::{DispatchSettings, Dispatcher},
    models::{
        DetectionParams, ImageTextEmbedder, ModelRegistry, ObjectDetector, RawDetection,
        SceneClassifier, SceneLabel, SceneResult,
    },
};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use tower::util::ServiceExt;

/// Shared call counter
#[derive(Debug, Clone, Default)]
pub struct Calls(Arc<AtomicUsize>);

impl Calls {
    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    fn hit(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// Detector returning a fixed set of boxes
pub struct FakeDetector {
    pub boxes: Vec<RawDetection>,
    pub calls: Calls,
}

impl FakeDetector {
    pub fn new(boxes: Vec<RawDetection>) -> Self {
        Self {
            boxes,
            calls: Calls::default(),
        }
    }
}

impl ObjectDetector for FakeDetector {
    fn class_name(&self, class_id: usize) -> String {
        match class_id {
            0 => "person".to_string(),
            56 => "chair".to_string(),
            other => format!("class_{}", other),
        }
    }

    fn detect(
        &mut self,
        _image: &DynamicImage,
        _params: &DetectionParams,
    ) -> anyhow::Result<Vec<RawDetection>> {
        self.calls.hit();
        Ok(self.boxes.clone())
    }
}

/// Embedder returning constant vectors of a fixed size
pub struct FakeEmbedder {
    pub dims: usize,
    pub image_calls: Calls,
    pub text_calls: Calls,
}

impl FakeEmbedder {
    pub fn new(dims: usize) -> Self {
        Self {
            dims,
            image_calls: Calls::default(),
            text_calls: Calls::default(),
        }
    }
}

impl ImageTextEmbedder for FakeEmbedder {
    fn embed_image(&mut self, _image: &DynamicImage) -> anyhow::Result<Vec<f32>> {
        self.image_calls.hit();
        Ok(vec![0.5; self.dims])
    }

    fn embed_text(&mut self, text: &str) -> anyhow::Result<Vec<f32>> {
        self.text_calls.hit();
        Ok(vec![text.len() as f32; self.dims])
    }
}

/// Scene classifier returning one fixed label
pub struct FakeSceneClassifier {
    pub primary: String,
    pub calls: Calls,
}

impl FakeSceneClassifier {
    pub fn new(primary: &str) -> Self {
        Self {
            primary: primary.to_string(),
            calls: Calls::default(),
        }
    }
}

impl SceneClassifier for FakeSceneClassifier {
    fn classify(&mut self, _image: &DynamicImage, top_k: usize) -> anyhow::Result<SceneResult> {
        self.calls.hit();
        let labels = [(self.primary.as_str(), 0.8), ("outdoor", 0.1), ("natural", 0.05)]
            .into_iter()
            .take(top_k)
            .map(|(label, score)| SceneLabel {
                label: label.to_string(),
                score,
            })
            .collect();
        Ok(SceneResult {
            primary: self.primary.clone(),
            labels,
        })
    }
}

pub fn raw_box(x1: f32, y1: f32, x2: f32, y2: f32, score: f32, class_id: usize) -> RawDetection {
    RawDetection {
        x1,
        y1,
        x2,
        y2,
        score,
        class_id,
    }
}

/// Registry whose slots are filled from fakes
///
/// Slots left as `None` stay unloaded. The temp dir stands in for the
/// model path and must outlive the registry's use.
#[derive(Default)]
pub struct TestRegistry {
    pub detector: Option<FakeDetector>,
    pub scene: Option<FakeSceneClassifier>,
    pub embedder: Option<FakeEmbedder>,
}

impl TestRegistry {
    pub fn build(self) -> (TempDir, Arc<ModelRegistry>) {
        let dir = tempfile::tempdir().unwrap();
        let registry = Arc::new(ModelRegistry::new());

        if let Some(detector) = self.detector {
            registry.detector_slot().attempt_load(dir.path(), move |_| {
                Ok(Box::new(detector) as Box<dyn ObjectDetector>)
            });
        }
        if let Some(scene) = self.scene {
            registry
                .scene_classifier_slot()
                .attempt_load(dir.path(), move |_| {
                    Ok(Box::new(scene) as Box<dyn SceneClassifier>)
                });
        }
        if let Some(embedder) = self.embedder {
            registry.embedder_slot().attempt_load(dir.path(), move |_| {
                Ok(Box::new(embedder) as Box<dyn ImageTextEmbedder>)
            });
        }

        (dir, registry)
    }
}

pub fn app_for(registry: Arc<ModelRegistry>) -> Router {
    let dispatcher = Dispatcher::new(registry, DispatchSettings::default());
    create_app(AppState::new(dispatcher))
}

/// Send one request through the router and decode the JSON body
pub async fn send(
    app: Router,
    method: Method,
    uri: &str,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = app.oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
    };

    (status, json)
}

pub async fn post_json(
    app: Router,
    uri: &str,
    body: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    send(app, Method::POST, uri, Some(body)).await
}

/// Solid-colour PNG as bare base64
pub fn png_base64(width: u32, height: u32) -> String {
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, image::Rgb([90, 120, 200])))
        .write_to(&mut buf, ImageFormat::Png)
        .unwrap();
    STANDARD.encode(buf.into_inner())
}

/// PNG of pseudo-random pixels, which compresses poorly, as bare base64
pub fn noisy_png_base64(width: u32, height: u32) -> String {
    let mut state: u32 = 0x9E37_79B9;
    let image = RgbImage::from_fn(width, height, |_, _| {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        let [r, g, b, _] = state.to_le_bytes();
        image::Rgb([r, g, b])
    });

    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(image)
        .write_to(&mut buf, ImageFormat::Png)
        .unwrap();
    STANDARD.encode(buf.into_inner())
}

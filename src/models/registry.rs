// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Model registry: one independently loadable slot per capability
//!
//! Each slot moves through `Unloaded → Loading → {Loaded | LoadFailed}`
//! exactly once. Both end states are terminal for the process lifetime.
//! A slot only publishes its handle once the load has fully succeeded, so
//! readers see either "not loaded" or a complete model.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{error, info, warn};

use super::detector::{ObjectDetector, YoloDetector};
use super::embedder::{ClipEmbedder, ImageTextEmbedder};
use super::scene::{Places365Classifier, SceneClassifier};

/// Named model capability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SlotName {
    Detector,
    SceneClassifier,
    Embedder,
}

impl SlotName {
    pub const ALL: [SlotName; 3] = [
        SlotName::Detector,
        SlotName::SceneClassifier,
        SlotName::Embedder,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SlotName::Detector => "detector",
            SlotName::SceneClassifier => "scene-classifier",
            SlotName::Embedder => "embedder",
        }
    }
}

impl fmt::Display for SlotName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observable slot state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotState {
    Unloaded,
    Loading,
    Loaded,
    LoadFailed,
}

/// Snapshot of one slot, as listed by `GET /models`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotStatus {
    pub name: SlotName,
    pub state: SlotState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Shared handle to a loaded model
///
/// Calls go through [`ModelHandle::run`], which holds the slot's lock for
/// the whole call: at most one inference per slot is in flight and later
/// callers queue behind it.
pub struct ModelHandle<M: ?Sized> {
    slot: SlotName,
    model: Arc<Mutex<Box<M>>>,
}

impl<M: ?Sized> Clone for ModelHandle<M> {
    fn clone(&self) -> Self {
        Self {
            slot: self.slot,
            model: Arc::clone(&self.model),
        }
    }
}

impl<M: ?Sized> fmt::Debug for ModelHandle<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelHandle")
            .field("slot", &self.slot)
            .finish_non_exhaustive()
    }
}

impl<M: ?Sized + Send + 'static> ModelHandle<M> {
    pub fn new(slot: SlotName, model: Box<M>) -> Self {
        Self {
            slot,
            model: Arc::new(Mutex::new(model)),
        }
    }

    pub fn slot(&self) -> SlotName {
        self.slot
    }

    /// Wait for exclusive use of the model
    pub async fn acquire(&self) -> ModelGuard<M> {
        ModelGuard {
            slot: self.slot,
            guard: Arc::clone(&self.model).lock_owned().await,
        }
    }

    /// Run a blocking model call on the blocking thread pool while holding
    /// the slot lock
    pub async fn run<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut M) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        self.acquire().await.run(f).await
    }
}

/// Exclusive access to a loaded model
///
/// The lock moves onto the blocking thread with the call, so it is only
/// released once the call really returns, even if the caller stops waiting.
pub struct ModelGuard<M: ?Sized> {
    slot: SlotName,
    guard: OwnedMutexGuard<Box<M>>,
}

impl<M: ?Sized + Send + 'static> ModelGuard<M> {
    pub async fn run<R, F>(self, f: F) -> Result<R>
    where
        F: FnOnce(&mut M) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let Self { slot, mut guard } = self;
        tokio::task::spawn_blocking(move || f(&mut **guard))
            .await
            .with_context(|| format!("{} inference task failed", slot))?
    }
}

enum SlotCell<M: ?Sized> {
    Unloaded,
    Loading,
    Loaded(ModelHandle<M>),
    LoadFailed(String),
}

struct SlotInner<M: ?Sized> {
    cell: SlotCell<M>,
    path: Option<PathBuf>,
}

/// One loadable capability
pub struct ModelSlot<M: ?Sized> {
    name: SlotName,
    inner: RwLock<SlotInner<M>>,
}

impl<M: ?Sized + Send + 'static> ModelSlot<M> {
    pub fn new(name: SlotName) -> Self {
        Self {
            name,
            inner: RwLock::new(SlotInner {
                cell: SlotCell::Unloaded,
                path: None,
            }),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, SlotInner<M>> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SlotInner<M>> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Attempt the slot's one and only load
    ///
    /// A missing `path` fails without calling `loader`. Loader errors and
    /// loader panics are logged and leave the slot in `LoadFailed`. Calling this on a slot
    /// that already left `Unloaded` changes nothing. Returns the resulting
    /// state.
    pub fn attempt_load<F>(&self, path: &Path, loader: F) -> SlotState
    where
        F: FnOnce(&Path) -> Result<Box<M>>,
    {
        {
            let mut inner = self.write();
            if !matches!(inner.cell, SlotCell::Unloaded) {
                let state = state_of(&inner.cell);
                warn!(
                    "{} load already attempted (state: {:?}), ignoring",
                    self.name, state
                );
                return state;
            }
            inner.cell = SlotCell::Loading;
            inner.path = Some(path.to_path_buf());
        }

        info!("Loading {} model from {}", self.name, path.display());

        let outcome = if path.exists() {
            panic::catch_unwind(AssertUnwindSafe(|| loader(path))).unwrap_or_else(|payload| {
                Err(anyhow::anyhow!("loader panicked: {}", panic_message(&*payload)))
            })
        } else {
            Err(anyhow::anyhow!("model not found at {}", path.display()))
        };

        let mut inner = self.write();
        match outcome {
            Ok(model) => {
                inner.cell = SlotCell::Loaded(ModelHandle::new(self.name, model));
                info!("✅ {} model loaded", self.name);
                SlotState::Loaded
            }
            Err(e) => {
                warn!("⚠️  Failed to load {} model: {:#}", self.name, e);
                inner.cell = SlotCell::LoadFailed(format!("{:#}", e));
                SlotState::LoadFailed
            }
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self.read().cell, SlotCell::Loaded(_))
    }

    pub fn state(&self) -> SlotState {
        state_of(&self.read().cell)
    }

    /// Handle to the loaded model, `None` unless the slot is `Loaded`
    pub fn handle(&self) -> Option<ModelHandle<M>> {
        match &self.read().cell {
            SlotCell::Loaded(handle) => Some(handle.clone()),
            _ => None,
        }
    }

    pub fn status(&self) -> SlotStatus {
        let inner = self.read();
        SlotStatus {
            name: self.name,
            state: state_of(&inner.cell),
            path: inner.path.as_ref().map(|p| p.display().to_string()),
            error: match &inner.cell {
                SlotCell::LoadFailed(reason) => Some(reason.clone()),
                _ => None,
            },
        }
    }
}

fn state_of<M: ?Sized>(cell: &SlotCell<M>) -> SlotState {
    match cell {
        SlotCell::Unloaded => SlotState::Unloaded,
        SlotCell::Loading => SlotState::Loading,
        SlotCell::Loaded(_) => SlotState::Loaded,
        SlotCell::LoadFailed(_) => SlotState::LoadFailed,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}

/// Where each slot's model lives on disk
#[derive(Debug, Clone, PartialEq)]
pub struct ModelPaths {
    /// Detector ONNX file
    pub detector: PathBuf,
    /// Places365 ONNX file (categories file alongside)
    pub scene_classifier: PathBuf,
    /// CLIP directory (visual.onnx, textual.onnx, tokenizer.json)
    pub embedder: PathBuf,
}

impl ModelPaths {
    /// Standard layout under a model directory
    pub fn from_model_dir(model_dir: &Path) -> Self {
        Self {
            detector: model_dir.join("yolo").join("yoloe-11l-seg-pf.onnx"),
            scene_classifier: model_dir
                .join("places365")
                .join("resnet50_places365.onnx"),
            embedder: model_dir.join("clip"),
        }
    }
}

/// Process-wide model state: one slot per capability
///
/// Built once at startup and shared behind an `Arc`. Tests construct it
/// directly and install synthetic models through the slots.
pub struct ModelRegistry {
    detector: ModelSlot<dyn ObjectDetector>,
    scene_classifier: ModelSlot<dyn SceneClassifier>,
    embedder: ModelSlot<dyn ImageTextEmbedder>,
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelRegistry {
    /// Registry with every slot `Unloaded`
    pub fn new() -> Self {
        Self {
            detector: ModelSlot::new(SlotName::Detector),
            scene_classifier: ModelSlot::new(SlotName::SceneClassifier),
            embedder: ModelSlot::new(SlotName::Embedder),
        }
    }

    /// Build a registry and load all three slots in parallel
    ///
    /// Never fails: slots whose load fails stay unavailable and the
    /// endpoints that need them answer 503.
    pub async fn load_from_config(paths: &ModelPaths) -> Arc<Self> {
        let registry = Arc::new(Self::new());

        let detector = {
            let registry = Arc::clone(&registry);
            let path = paths.detector.clone();
            tokio::task::spawn_blocking(move || {
                registry.detector_slot().attempt_load(&path, |p| {
                    Ok(Box::new(YoloDetector::load(p)?) as Box<dyn ObjectDetector>)
                })
            })
        };

        let scene = {
            let registry = Arc::clone(&registry);
            let path = paths.scene_classifier.clone();
            tokio::task::spawn_blocking(move || {
                registry.scene_classifier_slot().attempt_load(&path, |p| {
                    Ok(Box::new(Places365Classifier::load(p)?) as Box<dyn SceneClassifier>)
                })
            })
        };

        let embedder = {
            let registry = Arc::clone(&registry);
            let path = paths.embedder.clone();
            tokio::task::spawn_blocking(move || {
                registry.embedder_slot().attempt_load(&path, |p| {
                    Ok(Box::new(ClipEmbedder::load(p)?) as Box<dyn ImageTextEmbedder>)
                })
            })
        };

        for (name, task) in [
            (SlotName::Detector, detector),
            (SlotName::SceneClassifier, scene),
            (SlotName::Embedder, embedder),
        ] {
            match task.await {
                Ok(state) => info!("{} slot: {:?}", name, state),
                Err(e) => error!("{} load task join error: {}", name, e),
            }
        }

        registry
    }

    pub fn detector_slot(&self) -> &ModelSlot<dyn ObjectDetector> {
        &self.detector
    }

    pub fn scene_classifier_slot(&self) -> &ModelSlot<dyn SceneClassifier> {
        &self.scene_classifier
    }

    pub fn embedder_slot(&self) -> &ModelSlot<dyn ImageTextEmbedder> {
        &self.embedder
    }

    pub fn is_loaded(&self, slot: SlotName) -> bool {
        match slot {
            SlotName::Detector => self.detector.is_loaded(),
            SlotName::SceneClassifier => self.scene_classifier.is_loaded(),
            SlotName::Embedder => self.embedder.is_loaded(),
        }
    }

    pub fn status(&self, slot: SlotName) -> SlotStatus {
        match slot {
            SlotName::Detector => self.detector.status(),
            SlotName::SceneClassifier => self.scene_classifier.status(),
            SlotName::Embedder => self.embedder.status(),
        }
    }

    /// Status of every slot, in [`SlotName::ALL`] order
    pub fn list_models(&self) -> Vec<SlotStatus> {
        SlotName::ALL.iter().map(|slot| self.status(*slot)).collect()
    }

    pub fn detector(&self) -> Option<ModelHandle<dyn ObjectDetector>> {
        self.detector.handle()
    }

    pub fn scene_classifier(&self) -> Option<ModelHandle<dyn SceneClassifier>> {
        self.scene_classifier.handle()
    }

    pub fn embedder(&self) -> Option<ModelHandle<dyn ImageTextEmbedder>> {
        self.embedder.handle()
    }
}

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vision model runtimes and the registry that owns them

pub mod detector;
pub mod embedder;
pub mod registry;
pub mod scene;
pub mod session;

pub use detector::{
    non_max_suppression, DetectionParams, ObjectDetector, RawDetection, YoloDetector,
};
pub use embedder::{ClipEmbedder, ImageTextEmbedder};
pub use registry::{
    ModelGuard, ModelHandle, ModelPaths, ModelRegistry, ModelSlot, SlotName, SlotState,
    SlotStatus,
};
pub use scene::{
    Places365Classifier, SceneClassifier, SceneLabel, SceneResult, UnavailableClassifier,
};

#[cfg(test)]
pub use detector::MockObjectDetector;
#[cfg(test)]
pub use embedder::MockImageTextEmbedder;
#[cfg(test)]
pub use scene::MockSceneClassifier;

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Model registry state machine tests
//!
//! Verifies that:
//! - Every slot starts unloaded
//! - A slot whose path is missing never becomes loaded
//! - Health flips false → true exactly once and never back
//! - A failed load is permanent
//! - One failing slot does not affect the others

use reflect_ml_service::models::{
    ModelPaths, ModelRegistry, ObjectDetector, SlotName, SlotState,
};
use std::path::Path;

use crate::mock::{app_for, send, FakeDetector};
use axum::http::Method;

fn fake_detector(_: &Path) -> anyhow::Result<Box<dyn ObjectDetector>> {
    Ok(Box::new(FakeDetector::new(Vec::new())))
}

#[test]
fn test_fresh_registry_is_empty() {
    let registry = ModelRegistry::new();

    for slot in SlotName::ALL {
        assert!(!registry.is_loaded(slot), "{} should start unloaded", slot);
        assert_eq!(registry.status(slot).state, SlotState::Unloaded);
    }
    assert!(registry.detector().is_none());
    assert!(registry.scene_classifier().is_none());
    assert!(registry.embedder().is_none());
}

#[test]
fn test_missing_path_never_loads() {
    let dir = tempfile::tempdir().unwrap();
    let registry = ModelRegistry::new();
    let missing = dir.path().join("yolo").join("yoloe-11l-seg-pf.onnx");

    let state = registry.detector_slot().attempt_load(&missing, fake_detector);

    assert_eq!(state, SlotState::LoadFailed);
    assert!(!registry.is_loaded(SlotName::Detector));

    // Creating the file afterwards does not revive the slot
    std::fs::create_dir_all(missing.parent().unwrap()).unwrap();
    std::fs::write(&missing, b"weights").unwrap();
    registry.detector_slot().attempt_load(&missing, fake_detector);
    assert!(!registry.is_loaded(SlotName::Detector));
}

#[tokio::test]
async fn test_health_flips_exactly_once() {
    let dir = tempfile::tempdir().unwrap();
    let registry = std::sync::Arc::new(ModelRegistry::new());
    let mut observed = Vec::new();

    let (_, body) = send(app_for(registry.clone()), Method::GET, "/health", None).await;
    observed.push(body["detector"].as_bool().unwrap());

    registry
        .detector_slot()
        .attempt_load(dir.path(), fake_detector);

    for _ in 0..3 {
        let (_, body) = send(app_for(registry.clone()), Method::GET, "/health", None).await;
        observed.push(body["detector"].as_bool().unwrap());

        // Further attempts never unload
        registry
            .detector_slot()
            .attempt_load(dir.path(), |_| anyhow::bail!("reload attempted"));
    }

    assert_eq!(observed, vec![false, true, true, true]);
}

#[test]
fn test_load_failure_is_terminal_and_isolated() {
    let dir = tempfile::tempdir().unwrap();
    let registry = ModelRegistry::new();

    registry
        .detector_slot()
        .attempt_load(dir.path(), |_| anyhow::bail!("incompatible opset"));
    registry
        .detector_slot()
        .attempt_load(dir.path(), fake_detector);

    let status = registry.status(SlotName::Detector);
    assert_eq!(status.state, SlotState::LoadFailed);
    assert_eq!(status.error.as_deref(), Some("incompatible opset"));
    assert_eq!(
        status.path.as_deref(),
        Some(dir.path().display().to_string().as_str())
    );

    assert_eq!(registry.status(SlotName::Embedder).state, SlotState::Unloaded);
}

#[tokio::test]
async fn test_load_from_config_with_partial_model_dir() {
    let dir = tempfile::tempdir().unwrap();
    let paths = ModelPaths::from_model_dir(dir.path());

    // A detector file that is not a valid ONNX graph
    std::fs::create_dir_all(paths.detector.parent().unwrap()).unwrap();
    std::fs::write(&paths.detector, b"not an onnx model").unwrap();

    let registry = ModelRegistry::load_from_config(&paths).await;

    for status in registry.list_models() {
        assert_eq!(status.state, SlotState::LoadFailed, "{:?}", status);
        assert!(status.error.is_some());
    }
    assert!(!registry.is_loaded(SlotName::Detector));
}

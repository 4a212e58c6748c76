// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Per-slot serialization and load visibility tests

use image::{DynamicImage, RgbImage};
use reflect_ml_service::models::{
    DetectionParams, ModelRegistry, ObjectDetector, RawDetection, SlotState,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Detector that records how many calls overlap
struct OverlapProbe {
    in_flight: Arc<AtomicUsize>,
    max_seen: Arc<AtomicUsize>,
}

impl ObjectDetector for OverlapProbe {
    fn class_name(&self, class_id: usize) -> String {
        format!("class_{}", class_id)
    }

    fn detect(
        &mut self,
        _image: &DynamicImage,
        _params: &DetectionParams,
    ) -> anyhow::Result<Vec<RawDetection>> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_seen.fetch_max(now, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(10));
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(Vec::new())
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_one_inference_in_flight_per_slot() {
    let dir = tempfile::tempdir().unwrap();
    let registry = Arc::new(ModelRegistry::new());
    let in_flight = Arc::new(AtomicUsize::new(0));
    let max_seen = Arc::new(AtomicUsize::new(0));

    let probe = OverlapProbe {
        in_flight: in_flight.clone(),
        max_seen: max_seen.clone(),
    };
    registry
        .detector_slot()
        .attempt_load(dir.path(), move |_| Ok(Box::new(probe) as Box<dyn ObjectDetector>));

    let image = Arc::new(DynamicImage::ImageRgb8(RgbImage::new(4, 4)));
    let mut tasks = Vec::new();
    for _ in 0..6 {
        let handle = registry.detector().unwrap();
        let image = image.clone();
        tasks.push(tokio::spawn(async move {
            handle
                .run(move |model| model.detect(&image, &DetectionParams::default()))
                .await
        }));
    }

    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    assert_eq!(in_flight.load(Ordering::SeqCst), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_loading_slot_is_invisible_to_readers() {
    let dir = tempfile::tempdir().unwrap();
    let registry = Arc::new(ModelRegistry::new());
    let (started_tx, started_rx) = std::sync::mpsc::channel();
    let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();

    let loader_registry = registry.clone();
    let path = dir.path().to_path_buf();
    let load = tokio::task::spawn_blocking(move || {
        loader_registry.detector_slot().attempt_load(&path, move |_| {
            started_tx.send(()).unwrap();
            release_rx.recv().unwrap();
            Ok(Box::new(OverlapProbe {
                in_flight: Arc::default(),
                max_seen: Arc::default(),
            }) as Box<dyn ObjectDetector>)
        })
    });

    tokio::task::spawn_blocking(move || started_rx.recv().unwrap())
        .await
        .unwrap();

    assert_eq!(registry.detector_slot().state(), SlotState::Loading);
    assert!(registry.detector().is_none());
    assert!(!registry.detector_slot().is_loaded());

    release_tx.send(()).unwrap();
    assert_eq!(load.await.unwrap(), SlotState::Loaded);
    assert!(registry.detector().is_some());
}

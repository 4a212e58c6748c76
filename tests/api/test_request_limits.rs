// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Request size limits through the full router

use axum::http::StatusCode;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reflect_ml_service::api::MAX_REQUEST_BODY;
use reflect_ml_service::vision::image_utils::MAX_IMAGE_SIZE;
use serde_json::json;

use crate::mock::{app_for, noisy_png_base64, post_json, FakeDetector, TestRegistry};

#[tokio::test]
async fn test_multi_megabyte_photo_reaches_detector() {
    let detector = FakeDetector::new(Vec::new());
    let calls = detector.calls.clone();
    let (_dir, registry) = TestRegistry {
        detector: Some(detector),
        ..Default::default()
    }
    .build();

    let payload = noisy_png_base64(900, 900);
    // Well past axum's 2 MB default, well under the image limit
    assert!(payload.len() > 3 * 1024 * 1024);
    assert!(payload.len() / 4 * 3 < MAX_IMAGE_SIZE);

    let (status, body) = post_json(
        app_for(registry),
        "/detect",
        json!({ "image_base64": payload }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["objects"], json!([]));
    assert_eq!(calls.count(), 1);
}

#[tokio::test]
async fn test_oversized_image_is_invalid_image() {
    let detector = FakeDetector::new(Vec::new());
    let calls = detector.calls.clone();
    let (_dir, registry) = TestRegistry {
        detector: Some(detector),
        ..Default::default()
    }
    .build();

    let payload = STANDARD.encode(vec![0u8; MAX_IMAGE_SIZE + 1]);
    assert!(payload.len() < MAX_REQUEST_BODY);

    let (status, body) = post_json(
        app_for(registry),
        "/detect",
        json!({ "image_base64": payload }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_type"], "invalid_image");
    assert_eq!(calls.count(), 0);
}

#[tokio::test]
async fn test_body_over_limit_is_rejected() {
    let (_dir, registry) = TestRegistry {
        detector: Some(FakeDetector::new(Vec::new())),
        ..Default::default()
    }
    .build();

    let payload = "A".repeat(MAX_REQUEST_BODY + 1);
    let (status, _) = post_json(
        app_for(registry),
        "/detect",
        json!({ "image_base64": payload }),
    )
    .await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! POST /embed and POST /embed-text tests

use axum::http::StatusCode;
use serde_json::json;

use crate::mock::{app_for, png_base64, post_json, FakeEmbedder, TestRegistry};

#[cfg(test)]
mod embed_image_tests {
    use super::*;

    #[tokio::test]
    async fn test_embed_image_dims_match_length() {
        let (_dir, registry) = TestRegistry {
            embedder: Some(FakeEmbedder::new(512)),
            ..Default::default()
        }
        .build();

        let (status, body) = post_json(
            app_for(registry),
            "/embed",
            json!({"image_base64": png_base64(32, 32), "model": "clip"}),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let embedding = body["embedding"].as_array().unwrap();
        assert_eq!(body["dims"].as_u64().unwrap() as usize, embedding.len());
        assert_eq!(embedding.len(), 512);
    }

    #[tokio::test]
    async fn test_embed_image_without_embedder() {
        let (_dir, registry) = TestRegistry::default().build();

        let (status, body) = post_json(
            app_for(registry),
            "/embed",
            json!({"image_base64": png_base64(8, 8)}),
        )
        .await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error_type"], "model_unavailable");
        assert_eq!(body["details"]["model"], "embedder");
    }

    #[tokio::test]
    async fn test_embed_image_invalid_payload() {
        let embedder = FakeEmbedder::new(512);
        let calls = embedder.image_calls.clone();
        let (_dir, registry) = TestRegistry {
            embedder: Some(embedder),
            ..Default::default()
        }
        .build();

        let (status, body) =
            post_json(app_for(registry), "/embed", json!({"image_base64": "@@@@"})).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error_type"], "invalid_image");
        assert_eq!(calls.count(), 0);
    }

    #[tokio::test]
    async fn test_embed_image_missing_field() {
        let (_dir, registry) = TestRegistry {
            embedder: Some(FakeEmbedder::new(512)),
            ..Default::default()
        }
        .build();

        let (status, body) = post_json(app_for(registry), "/embed", json!({"model": "clip"})).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error_type"], "missing_input");
    }
}

#[cfg(test)]
mod embed_text_tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_text_never_reaches_embedder() {
        let embedder = FakeEmbedder::new(512);
        let calls = embedder.text_calls.clone();
        let (_dir, registry) = TestRegistry {
            embedder: Some(embedder),
            ..Default::default()
        }
        .build();

        let (status, body) =
            post_json(app_for(registry.clone()), "/embed-text", json!({"text": ""})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error_type"], "missing_input");

        let (status, _) = post_json(app_for(registry), "/embed-text", json!({})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        assert_eq!(calls.count(), 0);
    }

    #[tokio::test]
    async fn test_embed_text_dims_match_length() {
        let embedder = FakeEmbedder::new(512);
        let calls = embedder.text_calls.clone();
        let (_dir, registry) = TestRegistry {
            embedder: Some(embedder),
            ..Default::default()
        }
        .build();

        let (status, body) = post_json(
            app_for(registry),
            "/embed-text",
            json!({"text": "a mid-century armchair"}),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["dims"], 512);
        assert_eq!(body["embedding"].as_array().unwrap().len(), 512);
        assert_eq!(calls.count(), 1);
    }

    #[tokio::test]
    async fn test_embed_text_without_embedder() {
        let (_dir, registry) = TestRegistry::default().build();

        let (status, body) =
            post_json(app_for(registry), "/embed-text", json!({"text": "sofa"})).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error_type"], "model_unavailable");
    }

    #[tokio::test]
    async fn test_image_and_text_share_dimensions() {
        let (_dir, registry) = TestRegistry {
            embedder: Some(FakeEmbedder::new(768)),
            ..Default::default()
        }
        .build();

        let (_, image) = post_json(
            app_for(registry.clone()),
            "/embed",
            json!({"image_base64": png_base64(4, 4)}),
        )
        .await;
        let (_, text) = post_json(app_for(registry), "/embed-text", json!({"text": "lamp"})).await;

        assert_eq!(image["dims"], text["dims"]);
    }
}

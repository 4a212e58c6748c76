// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image handling for the inference endpoints
//!
//! This module provides:
//! - Base64 / data-URI payload decoding to RGB8 images
//! - Per-model preprocessing (detector letterbox, CLIP, Places365)

pub mod image_utils;
pub mod preprocessing;

pub use image_utils::{decode_base64_image, decode_image_bytes, detect_format, strip_data_uri, ImageError, ImageInfo};
pub use preprocessing::{letterbox, preprocess_for_clip, preprocess_for_scene, LetterboxInfo};

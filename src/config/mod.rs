// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Service configuration
//!
//! Every option can be set by flag or environment variable (`.env` files
//! are honoured). Values are read once at startup.

use anyhow::{Context, Result};
use clap::Parser;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::dispatch::DispatchSettings;
use crate::models::{DetectionParams, ModelPaths};

/// Reflect ML inference service
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "reflect-ml-service")]
#[command(version)]
#[command(about = "Object detection, scene classification and CLIP embeddings over HTTP", long_about = None)]
pub struct ServiceConfig {
    /// Directory holding the yolo/, places365/ and clip/ model folders
    #[arg(long, env = "MODEL_DIR", default_value = "./models")]
    pub model_dir: PathBuf,

    /// Minimum detection confidence (0.0-1.0)
    #[arg(long, env = "MIN_DETECTION_SCORE", default_value_t = 0.25)]
    pub min_detection_score: f32,

    /// IoU threshold for non-maximum suppression (0.0-1.0)
    #[arg(long, env = "NMS_IOU_THRESHOLD", default_value_t = 0.45)]
    pub nms_iou_threshold: f32,

    /// Number of scene labels returned
    #[arg(long, env = "SCENE_TOP_K", default_value_t = 5)]
    pub scene_top_k: usize,

    /// Per-request inference limit in seconds, 0 disables
    #[arg(long, env = "INFERENCE_TIMEOUT_SECS", default_value_t = 30)]
    pub inference_timeout_secs: u64,

    /// Bind address (IPv4 or IPv6 literal)
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "PORT", default_value_t = 8000)]
    pub port: u16,
}

impl ServiceConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.min_detection_score) {
            anyhow::bail!(
                "MIN_DETECTION_SCORE must be within [0, 1], got {}",
                self.min_detection_score
            );
        }
        if !(0.0..=1.0).contains(&self.nms_iou_threshold) {
            anyhow::bail!(
                "NMS_IOU_THRESHOLD must be within [0, 1], got {}",
                self.nms_iou_threshold
            );
        }
        if self.scene_top_k == 0 {
            anyhow::bail!("SCENE_TOP_K must be at least 1");
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self
            .host
            .parse()
            .with_context(|| format!("HOST must be an IP address, got '{}'", self.host))?;
        Ok(SocketAddr::new(ip, self.port))
    }

    pub fn model_paths(&self) -> ModelPaths {
        ModelPaths::from_model_dir(&self.model_dir)
    }

    pub fn detection_params(&self) -> DetectionParams {
        DetectionParams {
            confidence_threshold: self.min_detection_score,
            iou_threshold: self.nms_iou_threshold,
        }
    }

    pub fn inference_timeout(&self) -> Option<Duration> {
        (self.inference_timeout_secs > 0).then(|| Duration::from_secs(self.inference_timeout_secs))
    }

    pub fn dispatch_settings(&self) -> DispatchSettings {
        DispatchSettings {
            detection: self.detection_params(),
            scene_top_k: self.scene_top_k,
            inference_timeout: self.inference_timeout(),
        }
    }
}

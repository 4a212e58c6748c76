// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod api;
pub mod config;
pub mod dispatch;
pub mod models;
pub mod version;
pub mod vision;

// Re-export main types
pub use api::{create_app, ApiError, AppState};
pub use config::ServiceConfig;
pub use dispatch::{DispatchSettings, Dispatcher};
pub use models::{ModelPaths, ModelRegistry, SlotName, SlotState};

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::Result;
use clap::Parser;
use reflect_ml_service::{
    api::{start_server, AppState},
    config::ServiceConfig,
    dispatch::Dispatcher,
    models::{ModelRegistry, SlotState},
    version,
};
use std::env;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Initialize tracing subscriber for logging
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    info!("🚀 Starting {}", version::get_version_string());

    let config = ServiceConfig::parse();
    config.validate()?;
    let addr = config.socket_addr()?;

    info!("Loading ML models from {}...", config.model_dir.display());
    let registry = ModelRegistry::load_from_config(&config.model_paths()).await;

    for status in registry.list_models() {
        match status.state {
            SlotState::Loaded => info!("✅ {}: loaded", status.name),
            _ => warn!(
                "⚠️  {}: unavailable ({})",
                status.name,
                status.error.as_deref().unwrap_or("not loaded")
            ),
        }
    }
    info!("ML service startup complete");

    let dispatcher = Dispatcher::new(registry, config.dispatch_settings());
    start_server(addr, AppState::new(dispatcher)).await
}

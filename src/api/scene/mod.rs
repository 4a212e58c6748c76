// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Scene classification endpoint (POST /scene)

pub mod handler;
pub mod request;

pub use handler::scene_handler;
pub use request::SceneRequest;

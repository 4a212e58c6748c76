// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image embedding endpoint
//!
//! Provides POST /embed, returning a CLIP image embedding. The response
//! type is shared with /embed-text so both vectors can be compared.

pub mod handler;
pub mod request;
pub mod response;

pub use handler::embed_handler;
pub use request::EmbedRequest;
pub use response::EmbeddingResponse;

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Upstream image provider proxy

pub mod client;
pub mod types;

pub use client::{ImageProvider, OpenAiImageClient};
pub use types::{GenerationRequest, GenerationResult, ImagePayload, UpstreamError};

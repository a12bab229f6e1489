// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image generation API endpoint module
//!
//! Provides POST /api/generate-image behind admission control.

pub mod handler;
pub mod response;

pub use handler::{generate_image_handler, MAX_BODY_BYTES};
pub use crate::admission::{GenerateImageRequest, ValidationError, ALLOWED_SIZES};
pub use response::GenerateImageResponse;

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod cors;
pub mod errors;
pub mod generate_image;
pub mod http_server;

pub use cors::CorsPolicy;
pub use errors::{ApiError, ErrorResponse};
pub use generate_image::{generate_image_handler, GenerateImageRequest, GenerateImageResponse};
pub use http_server::{create_app, start_server, AppState, GENERATE_IMAGE_PATH};

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image generation response types

use serde::{Deserialize, Serialize};

use crate::upstream::ImagePayload;

/// Successful response: `{ image }`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerateImageResponse {
    /// `data:image/...;base64,...` URL or a provider-hosted URL
    pub image: String,
}

impl From<&ImagePayload> for GenerateImageResponse {
    fn from(payload: &ImagePayload) -> Self {
        Self {
            image: payload.to_client_url(),
        }
    }
}

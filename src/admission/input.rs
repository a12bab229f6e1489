// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Generation request body and input validation

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::upstream::GenerationRequest;

/// Sizes accepted by the image provider
pub const ALLOWED_SIZES: &[&str] = &[
    "256x256",
    "512x512",
    "1024x1024",
    "1024x1536",
    "1536x1024",
    "1024x1792",
    "1792x1024",
    "auto",
];

/// Body of POST /api/generate-image
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateImageRequest {
    /// Text prompt describing the desired image
    #[serde(default)]
    pub prompt: Option<String>,

    /// Output image size (e.g., "1024x1024")
    #[serde(default)]
    pub size: Option<String>,

    /// Model name (optional; defaults to the configured model)
    #[serde(default)]
    pub model: Option<String>,
}

/// Input validation failures, all reported as 400
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("invalid request body: {0}")]
    InvalidBody(String),

    #[error("Missing prompt")]
    MissingPrompt,

    #[error("invalid size '{size}'; allowed: {allowed}")]
    InvalidSize { size: String, allowed: String },
}

impl GenerateImageRequest {
    /// Parse a raw JSON body. An empty body parses as an empty request.
    pub fn parse(body: &[u8]) -> Result<Self, ValidationError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(body).map_err(|e| ValidationError::InvalidBody(e.to_string()))
    }

    /// Validate the request and produce the upstream request
    pub fn validate(&self) -> Result<GenerationRequest, ValidationError> {
        let prompt = self
            .prompt
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .ok_or(ValidationError::MissingPrompt)?;

        if let Some(ref size) = self.size {
            if !ALLOWED_SIZES.contains(&size.as_str()) {
                return Err(ValidationError::InvalidSize {
                    size: size.clone(),
                    allowed: ALLOWED_SIZES.join(", "),
                });
            }
        }

        let model = self
            .model
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string);

        Ok(GenerationRequest {
            prompt: prompt.to_string(),
            size: self.size.clone(),
            model,
        })
    }
}

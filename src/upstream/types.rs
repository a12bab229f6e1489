// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image generation request and result types

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::Value;
use thiserror::Error;

/// A validated generation request
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    /// Trimmed, non-empty prompt
    pub prompt: String,
    /// Output size; provider default when `None`
    pub size: Option<String>,
    /// Model identifier; provider default when `None`
    pub model: Option<String>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            size: None,
            model: None,
        }
    }
}

/// The generated image, exactly one of inline bytes or a hosted URL
#[derive(Debug, Clone, PartialEq)]
pub enum ImagePayload {
    /// Decoded image bytes returned inline by the provider
    Inline(Vec<u8>),
    /// URL of an image hosted by the provider
    Remote(String),
}

impl ImagePayload {
    /// Decode a provider `b64_json` field
    pub fn from_base64(encoded: &str) -> Result<Self, UpstreamError> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| UpstreamError::MalformedPayload(format!("invalid base64 image: {}", e)))?;
        if bytes.is_empty() {
            return Err(UpstreamError::NoImage);
        }
        Ok(Self::Inline(bytes))
    }

    /// String handed back to the browser: a data URL or the remote URL
    pub fn to_client_url(&self) -> String {
        match self {
            Self::Inline(bytes) => {
                format!("data:{};base64,{}", sniff_mime(bytes), STANDARD.encode(bytes))
            }
            Self::Remote(url) => url.clone(),
        }
    }
}

/// Guess an image MIME type from magic bytes, defaulting to PNG
pub fn sniff_mime(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        "image/jpeg"
    } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        "image/webp"
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        "image/gif"
    } else {
        "image/png"
    }
}

/// Ways an upstream generation can fail
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// The provider answered with a non-success status
    #[error("image provider returned {status}")]
    Http {
        status: u16,
        /// Parsed JSON error body, or the raw text when it is not JSON
        details: Value,
    },

    /// The provider could not be reached
    #[error("image provider unreachable: {0}")]
    Transport(String),

    /// The provider succeeded but returned neither inline data nor a URL
    #[error("no image returned")]
    NoImage,

    /// The provider succeeded but the body could not be interpreted
    #[error("invalid provider payload: {0}")]
    MalformedPayload(String),
}

impl UpstreamError {
    /// Build an `Http` error from a status and raw body text
    pub fn from_error_body(status: u16, body: &str) -> Self {
        let details = serde_json::from_str::<Value>(body)
            .unwrap_or_else(|_| Value::String(body.to_string()));
        Self::Http { status, details }
    }
}

pub type GenerationResult = Result<ImagePayload, UpstreamError>;

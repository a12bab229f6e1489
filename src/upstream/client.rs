// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Client for an OpenAI-compatible image generation API

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

use super::types::{GenerationRequest, GenerationResult, ImagePayload, UpstreamError};
use crate::config::ProviderConfig;

/// Something that turns a prompt into an image
#[async_trait]
pub trait ImageProvider: Send + Sync {
    /// Run a single generation. No retries.
    async fn generate(&self, request: GenerationRequest) -> GenerationResult;

    /// Provider name for logging
    fn name(&self) -> &'static str;
}

/// Outbound request body
#[derive(Debug, Serialize)]
pub struct ProviderImageRequest<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    pub size: &'a str,
    pub n: u32,
}

// --- OpenAI-compatible response types ---

#[derive(Debug, Deserialize)]
pub struct OpenAIImageResponse {
    #[serde(default)]
    pub data: Vec<OpenAIImageData>,
}

#[derive(Debug, Deserialize)]
pub struct OpenAIImageData {
    #[serde(default)]
    pub b64_json: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub revised_prompt: Option<String>,
}

impl OpenAIImageResponse {
    /// Pick the image out of the first entry; inline data wins over a URL
    pub fn into_payload(self) -> GenerationResult {
        let first = self.data.into_iter().next().ok_or(UpstreamError::NoImage)?;

        if let Some(b64) = first.b64_json.filter(|s| !s.trim().is_empty()) {
            return ImagePayload::from_base64(&b64);
        }
        if let Some(url) = first.url.filter(|s| !s.trim().is_empty()) {
            return Ok(ImagePayload::Remote(url));
        }
        Err(UpstreamError::NoImage)
    }
}

/// HTTP client for `POST {base}/v1/images/generations`
pub struct OpenAiImageClient {
    client: Client,
    endpoint: String,
    api_key: String,
    default_model: String,
    default_size: String,
}

impl OpenAiImageClient {
    /// Create a new client from provider configuration
    pub fn new(config: &ProviderConfig) -> Result<Self, UpstreamError> {
        let client = Client::builder()
            .build()
            .map_err(|e| UpstreamError::Transport(format!("failed to build HTTP client: {}", e)))?;

        let endpoint = format!(
            "{}/v1/images/generations",
            config.base_url.trim_end_matches('/')
        );
        info!(
            "Image provider configured: endpoint={}, model={}",
            endpoint, config.default_model
        );

        Ok(Self {
            client,
            endpoint,
            api_key: config.api_key.clone(),
            default_model: config.default_model.clone(),
            default_size: config.default_size.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }
}

#[async_trait]
impl ImageProvider for OpenAiImageClient {
    async fn generate(&self, request: GenerationRequest) -> GenerationResult {
        let body = ProviderImageRequest {
            model: request.model.as_deref().unwrap_or(&self.default_model),
            prompt: &request.prompt,
            size: request.size.as_deref().unwrap_or(&self.default_size),
            n: 1,
        };

        debug!(
            "Image generate POST {} model={} size={}",
            self.endpoint, body.model, body.size
        );
        let start = Instant::now();

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(UpstreamError::from_error_body(status.as_u16(), &text));
        }

        let api_response: OpenAIImageResponse = response
            .json()
            .await
            .map_err(|e| UpstreamError::MalformedPayload(format!("JSON parse error: {}", e)))?;

        let payload = api_response.into_payload()?;
        debug!(
            "Image provider answered in {}ms",
            start.elapsed().as_millis()
        );
        Ok(payload)
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

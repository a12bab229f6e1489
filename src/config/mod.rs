// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Gateway configuration
//!
//! Loaded once from the process environment at startup and then shared
//! read-only with every request handler.

use std::env;
use std::time::Duration;

use url::Url;

/// Default provider endpoint (OpenAI-compatible image generation API)
pub const DEFAULT_IMAGE_API_BASE_URL: &str = "https://api.openai.com";
/// Default image model when the caller omits one
pub const DEFAULT_IMAGE_MODEL: &str = "gpt-image-1";
/// Default output size when the caller omits one
pub const DEFAULT_IMAGE_SIZE: &str = "1024x1024";
/// One free generation per 24 hours
pub const DEFAULT_QUOTA_WINDOW_SECS: u64 = 86_400;
/// Longest accepted quota window (365 days)
pub const MAX_QUOTA_WINDOW_SECS: u64 = 365 * 86_400;
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";

/// Top-level gateway configuration
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Address the HTTP server binds to
    pub listen_addr: String,
    /// Exact origins allowed to call the generation endpoint
    pub allowed_origins: Vec<String>,
    /// Image provider settings
    pub provider: ProviderConfig,
    /// Quota store settings
    pub quota: QuotaConfig,
}

/// Upstream image provider configuration
#[derive(Clone)]
pub struct ProviderConfig {
    /// Bearer credential for the provider
    pub api_key: String,
    /// Base URL; `/v1/images/generations` is appended
    pub base_url: String,
    pub default_model: String,
    pub default_size: String,
}

/// Quota store configuration
#[derive(Clone)]
pub struct QuotaConfig {
    /// REST endpoint of the key-value service. `None` selects the in-memory store.
    pub rest_url: Option<String>,
    /// Bearer token for the key-value service
    pub rest_token: Option<String>,
    /// How long a committed quota record lives
    pub window: Duration,
}

// Credentials must never end up in logs through `{:?}`.
impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("default_model", &self.default_model)
            .field("default_size", &self.default_size)
            .finish()
    }
}

impl std::fmt::Debug for QuotaConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuotaConfig")
            .field("rest_url", &self.rest_url)
            .field("rest_token", &self.rest_token.as_ref().map(|_| "<redacted>"))
            .field("window", &self.window)
            .finish()
    }
}

impl GatewayConfig {
    /// Load configuration from environment variables
    ///
    /// Fails only on values that cannot be parsed at all; range and
    /// consistency checks live in [`GatewayConfig::validate`].
    pub fn from_env() -> Result<Self, String> {
        let window = parse_window_secs(env::var("QUOTA_WINDOW_SECS").ok().as_deref())?;

        Ok(Self {
            listen_addr: env::var("LISTEN_ADDR")
                .unwrap_or_else(|_| DEFAULT_LISTEN_ADDR.to_string()),
            allowed_origins: env::var("ALLOWED_ORIGIN")
                .map(|v| parse_origin_list(&v))
                .unwrap_or_default(),
            provider: ProviderConfig {
                api_key: env::var("OPENAI_API_KEY").unwrap_or_default(),
                base_url: env::var("IMAGE_API_BASE_URL")
                    .unwrap_or_else(|_| DEFAULT_IMAGE_API_BASE_URL.to_string()),
                default_model: env::var("IMAGE_MODEL")
                    .unwrap_or_else(|_| DEFAULT_IMAGE_MODEL.to_string()),
                default_size: env::var("IMAGE_DEFAULT_SIZE")
                    .unwrap_or_else(|_| DEFAULT_IMAGE_SIZE.to_string()),
            },
            quota: QuotaConfig {
                rest_url: env::var("KV_REST_API_URL").ok().filter(|v| !v.is_empty()),
                rest_token: env::var("KV_REST_API_TOKEN").ok().filter(|v| !v.is_empty()),
                window,
            },
        })
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.allowed_origins.is_empty() {
            return Err("ALLOWED_ORIGIN must name at least one origin".to_string());
        }
        for origin in &self.allowed_origins {
            validate_origin(origin)?;
        }

        if self.provider.api_key.trim().is_empty() {
            return Err("OPENAI_API_KEY must be set".to_string());
        }
        Url::parse(&self.provider.base_url)
            .map_err(|e| format!("invalid IMAGE_API_BASE_URL '{}': {}", self.provider.base_url, e))?;

        if let Some(ref url) = self.quota.rest_url {
            Url::parse(url).map_err(|e| format!("invalid KV_REST_API_URL '{}': {}", url, e))?;
            if self.quota.rest_token.is_none() {
                return Err("KV_REST_API_URL is set but KV_REST_API_TOKEN is missing".to_string());
            }
        }

        if self.quota.window.is_zero() {
            return Err("quota window must be greater than 0".to_string());
        }
        if self.quota.window > Duration::from_secs(MAX_QUOTA_WINDOW_SECS) {
            return Err(format!(
                "quota window of {}s exceeds the maximum of {}s",
                self.quota.window.as_secs(),
                MAX_QUOTA_WINDOW_SECS
            ));
        }
        Ok(())
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            allowed_origins: vec!["http://localhost:3000".to_string()],
            provider: ProviderConfig {
                api_key: String::new(),
                base_url: DEFAULT_IMAGE_API_BASE_URL.to_string(),
                default_model: DEFAULT_IMAGE_MODEL.to_string(),
                default_size: DEFAULT_IMAGE_SIZE.to_string(),
            },
            quota: QuotaConfig {
                rest_url: None,
                rest_token: None,
                window: Duration::from_secs(DEFAULT_QUOTA_WINDOW_SECS),
            },
        }
    }
}

/// Parse `QUOTA_WINDOW_SECS`; unset or blank means the default window
fn parse_window_secs(raw: Option<&str>) -> Result<Duration, String> {
    match raw.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(Duration::from_secs(DEFAULT_QUOTA_WINDOW_SECS)),
        Some(v) => v
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|e| format!("invalid QUOTA_WINDOW_SECS '{}': {}", v, e)),
    }
}

fn parse_origin_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|o| o.trim().trim_end_matches('/').to_string())
        .filter(|o| !o.is_empty())
        .collect()
}

/// An origin is scheme://host[:port] with nothing else
fn validate_origin(origin: &str) -> Result<(), String> {
    if origin == "*" {
        return Err("wildcard origin is not allowed; list exact origins".to_string());
    }
    let url = Url::parse(origin).map_err(|e| format!("invalid origin '{}': {}", origin, e))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(format!("origin '{}' must use http or https", origin));
    }
    if url.host_str().is_none() || url.path() != "/" || url.query().is_some() {
        return Err(format!("origin '{}' must not carry a path or query", origin));
    }
    if origin.ends_with('/') {
        return Err(format!("origin '{}' must not end with '/'", origin));
    }
    Ok(())
}

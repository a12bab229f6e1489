// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! CORS handling
//!
//! `CorsLayer` answers preflight requests before they reach a handler and
//! reflects the request origin when it exactly matches a configured one.
//! Responses to any other origin still carry the first configured origin,
//! never `*`.

use axum::http::{
    header::{ACCESS_CONTROL_ALLOW_ORIGIN, AUTHORIZATION, CONTENT_TYPE},
    HeaderValue, Method,
};
use std::time::Duration;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    set_header::SetResponseHeaderLayer,
};
use tracing::warn;

pub const PREFLIGHT_MAX_AGE: Duration = Duration::from_secs(86_400);

/// CORS configuration for the configured origins
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    origins: Vec<HeaderValue>,
}

impl CorsPolicy {
    /// Build a policy; origins that are not valid header values are skipped
    pub fn new(allowed_origins: &[String]) -> Self {
        let origins = allowed_origins
            .iter()
            .filter_map(|o| match HeaderValue::from_str(o) {
                Ok(v) => Some(v),
                Err(_) => {
                    warn!("Skipping origin that is not a valid header value: {:?}", o);
                    None
                }
            })
            .collect();
        Self { origins }
    }

    /// Origin sent back when the request's own origin is not allowed
    pub fn fallback_origin(&self) -> Option<HeaderValue> {
        self.origins.first().cloned()
    }

    /// Preflight handling and exact-match origin reflection
    pub fn layer(&self) -> CorsLayer {
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(self.origins.iter().cloned()))
            .allow_methods([Method::POST, Method::OPTIONS])
            .allow_headers([CONTENT_TYPE, AUTHORIZATION])
            .max_age(PREFLIGHT_MAX_AGE)
    }

    /// Fills in `Access-Control-Allow-Origin` where `layer` left it out
    pub fn fallback_layer(&self) -> SetResponseHeaderLayer<Option<HeaderValue>> {
        SetResponseHeaderLayer::if_not_present(ACCESS_CONTROL_ALLOW_ORIGIN, self.fallback_origin())
    }
}

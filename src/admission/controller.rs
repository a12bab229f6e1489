// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Admission controller
//!
//! `decide` runs, in order, and stops at the first failure:
//! 1. method check (POST only)
//! 2. exact origin match
//! 3. body parsing and input validation
//! 4. fingerprint derivation
//! 5. quota lookup
//!
//! `decide` never writes. The quota record is written by `commit` after the
//! upstream call succeeded, so a failed generation does not use up the
//! caller's allowance. Read-then-write is not atomic: two concurrent first
//! requests from one client can both be admitted.

use axum::http::{header::ORIGIN, HeaderMap, Method};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use super::decision::{AdmissionDecision, AdmissionError};
use super::fingerprint::ClientFingerprint;
use super::input::GenerateImageRequest;
use crate::config::GatewayConfig;
use crate::quota::{quota_key, QuotaStore, StoreError, QUOTA_SENTINEL};

/// The parts of an inbound request admission looks at
#[derive(Debug, Clone, Copy)]
pub struct AdmissionRequest<'a> {
    pub method: &'a Method,
    pub headers: &'a HeaderMap,
    pub body: &'a [u8],
}

impl<'a> AdmissionRequest<'a> {
    pub fn new(method: &'a Method, headers: &'a HeaderMap, body: &'a [u8]) -> Self {
        Self {
            method,
            headers,
            body,
        }
    }
}

/// Decides whether a generation request may go upstream
pub struct AdmissionController {
    store: Arc<dyn QuotaStore>,
    allowed_origins: Vec<String>,
    window: Duration,
}

impl AdmissionController {
    pub fn new(store: Arc<dyn QuotaStore>, allowed_origins: Vec<String>, window: Duration) -> Self {
        Self {
            store,
            allowed_origins,
            window,
        }
    }

    pub fn from_config(config: &GatewayConfig, store: Arc<dyn QuotaStore>) -> Self {
        Self::new(store, config.allowed_origins.clone(), config.quota.window)
    }

    /// Quota window length
    pub fn window(&self) -> Duration {
        self.window
    }

    fn is_allowed_origin(&self, origin: &str) -> bool {
        self.allowed_origins.iter().any(|o| o == origin)
    }

    /// Method and origin checks, which need no body.
    ///
    /// Returns the denial, or `None` when the caller may proceed to input
    /// validation.
    pub fn check_caller(&self, method: &Method, headers: &HeaderMap) -> Option<AdmissionDecision> {
        if *method != Method::POST {
            debug!("Rejecting method {}", method);
            return Some(AdmissionDecision::DeniedMethod);
        }

        match headers.get(ORIGIN).and_then(|v| v.to_str().ok()) {
            Some(origin) if self.is_allowed_origin(origin) => None,
            origin => {
                info!("Origin denied: {:?}", origin);
                Some(AdmissionDecision::DeniedOrigin)
            }
        }
    }

    /// Evaluate the admission checks for one request
    pub async fn decide(
        &self,
        request: AdmissionRequest<'_>,
    ) -> Result<AdmissionDecision, AdmissionError> {
        if let Some(denied) = self.check_caller(request.method, request.headers) {
            return Ok(denied);
        }

        let generation = GenerateImageRequest::parse(request.body)?.validate()?;

        let fingerprint = ClientFingerprint::from_headers(request.headers);
        let key = quota_key(&fingerprint);

        if self.store.get(&key).await?.is_some() {
            info!("Quota exhausted for client {}", fingerprint.short());
            return Ok(AdmissionDecision::DeniedQuota { fingerprint });
        }

        debug!(
            "Client {} admitted (prompt_len={})",
            fingerprint.short(),
            generation.prompt.len()
        );
        Ok(AdmissionDecision::Allowed {
            fingerprint,
            request: generation,
        })
    }

    /// Record that `fingerprint` used its allowance for the current window
    pub async fn commit(&self, fingerprint: &ClientFingerprint) -> Result<(), StoreError> {
        self.store
            .set_with_expiry(&quota_key(fingerprint), QUOTA_SENTINEL, self.window)
            .await?;
        debug!(
            "Quota committed for client {} via {} store ({}s)",
            fingerprint.short(),
            self.store.name(),
            self.window.as_secs()
        );
        Ok(())
    }
}

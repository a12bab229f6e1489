// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Admission outcomes

use thiserror::Error;

use super::fingerprint::ClientFingerprint;
use super::input::ValidationError;
use crate::quota::StoreError;
use crate::upstream::GenerationRequest;

/// Outcome of an admission check for one request
#[derive(Debug, Clone, PartialEq)]
pub enum AdmissionDecision {
    /// Forward upstream, then commit quota for `fingerprint` on success
    Allowed {
        fingerprint: ClientFingerprint,
        request: GenerationRequest,
    },
    DeniedMethod,
    DeniedOrigin,
    /// A live quota record exists for this client
    DeniedQuota { fingerprint: ClientFingerprint },
}

impl AdmissionDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed { .. })
    }
}

/// Admission checks that fail rather than deny
#[derive(Debug, Error)]
pub enum AdmissionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The quota lookup failed; admission fails closed
    #[error("quota lookup failed: {0}")]
    Store(#[from] StoreError),
}

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Quota store trait definition

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

pub const QUOTA_KEY_PREFIX: &str = "quota:";

/// Value written for a consumed allowance. Readers only test for presence.
pub const QUOTA_SENTINEL: &str = "1";

/// Build the store key for a client fingerprint
pub fn quota_key(fingerprint: impl AsRef<str>) -> String {
    format!("{}{}", QUOTA_KEY_PREFIX, fingerprint.as_ref())
}

/// Errors returned by a quota store
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store answered with a non-success status
    #[error("quota store returned {status}: {message}")]
    Unavailable { status: u16, message: String },

    /// The store could not be reached
    #[error("quota store unreachable: {0}")]
    Unreachable(String),

    /// The store answered but the reply could not be understood
    #[error("quota store protocol error: {0}")]
    Protocol(String),
}

/// A key-value store with time-bounded entries
///
/// Each call is a single round trip. Implementations never retry; the caller
/// decides how a failure is handled.
#[async_trait]
pub trait QuotaStore: Send + Sync {
    /// Read a key, returning `None` when absent or expired
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write a key that expires after `ttl`
    async fn set_with_expiry(&self, key: &str, value: &str, ttl: Duration)
        -> Result<(), StoreError>;

    /// Store name for logging
    fn name(&self) -> &'static str;
}

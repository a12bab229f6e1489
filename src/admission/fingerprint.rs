// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Anonymous client fingerprinting
//!
//! The fingerprint is a SHA-256 over `address|user-agent`. It is a cheap
//! per-client bucket for a free-tier limit, not an authenticated identity:
//! clients behind one proxy share a bucket and a client can change its
//! user agent to get a new one.

use axum::http::{header::USER_AGENT, HeaderMap};
use sha2::{Digest, Sha256};
use std::fmt;

pub const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";
pub const REAL_IP_HEADER: &str = "x-real-ip";
/// Address used when no forwarding header is present
pub const UNKNOWN_ADDRESS: &str = "unknown";

/// Opaque, deterministic client identity token (64 lowercase hex chars)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientFingerprint(String);

impl ClientFingerprint {
    /// Derive a fingerprint from an address and user agent
    pub fn derive(address: &str, user_agent: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(address.as_bytes());
        hasher.update(b"|");
        hasher.update(user_agent.as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    /// Derive a fingerprint from request headers
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let address = client_address(headers);
        let user_agent = headers
            .get(USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        Self::derive(&address, user_agent)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short prefix for log lines
    pub fn short(&self) -> &str {
        &self.0[..12]
    }
}

impl AsRef<str> for ClientFingerprint {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resolve the client address: first `X-Forwarded-For` entry, then
/// `X-Real-IP`, then [`UNKNOWN_ADDRESS`]
pub fn client_address(headers: &HeaderMap) -> String {
    let forwarded = headers
        .get(FORWARDED_FOR_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    let real_ip = || {
        headers
            .get(REAL_IP_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    forwarded
        .or_else(real_ip)
        .unwrap_or(UNKNOWN_ADDRESS)
        .to_string()
}

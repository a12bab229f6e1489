// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! REST client for a Redis-compatible key-value service
//!
//! Commands are POSTed as a JSON array to the service root with a bearer
//! token, e.g. `["SET", "quota:ab12..", "1", "EX", "86400"]`. Replies are
//! `{"result": ...}` on success or `{"error": "..."}` on failure.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::store::{QuotaStore, StoreError};

/// HTTP quota store client
pub struct RestQuotaStore {
    client: Client,
    endpoint: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct CommandReply {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

impl RestQuotaStore {
    /// Create a client for the service at `endpoint`
    pub fn new(endpoint: &str, token: &str) -> Result<Self, StoreError> {
        let client = Client::builder()
            .build()
            .map_err(|e| StoreError::Unreachable(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    async fn command(&self, args: &[&str]) -> Result<Option<Value>, StoreError> {
        debug!("quota store {} {}", args.first().unwrap_or(&""), self.endpoint);

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .json(args)
            .send()
            .await
            .map_err(|e| StoreError::Unreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(StoreError::Unavailable {
                status: status.as_u16(),
                message,
            });
        }

        let reply: CommandReply = response
            .json()
            .await
            .map_err(|e| StoreError::Protocol(format!("invalid reply: {}", e)))?;

        if let Some(error) = reply.error {
            return Err(StoreError::Protocol(error));
        }
        Ok(reply.result.filter(|v| !v.is_null()))
    }
}

/// EX takes whole seconds; round up so a short TTL never becomes "no expiry"
fn ttl_secs(ttl: Duration) -> u64 {
    let secs = ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0);
    secs.max(1)
}

#[async_trait]
impl QuotaStore for RestQuotaStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let result = self.command(&["GET", key]).await?;
        Ok(result.map(|v| match v {
            Value::String(s) => s,
            other => other.to_string(),
        }))
    }

    async fn set_with_expiry(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let secs = ttl_secs(ttl).to_string();
        match self.command(&["SET", key, value, "EX", &secs]).await? {
            Some(Value::String(ref s)) if s == "OK" => Ok(()),
            Some(other) => Err(StoreError::Protocol(format!(
                "unexpected SET reply: {}",
                other
            ))),
            None => Err(StoreError::Protocol("empty SET reply".to_string())),
        }
    }

    fn name(&self) -> &'static str {
        "rest"
    }
}

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! In-process TTL quota store
//!
//! Only suitable for a single instance (local development, tests). Records
//! are lost on restart and are not shared between instances.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use super::store::{QuotaStore, StoreError};

struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// TTL map implementing [`QuotaStore`]
#[derive(Default)]
pub struct MemoryQuotaStore {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryQuotaStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (non-expired) records
    pub fn live_count(&self) -> usize {
        let now = Instant::now();
        match self.entries.read() {
            Ok(entries) => entries.values().filter(|e| e.is_live(now)).count(),
            Err(_) => 0,
        }
    }

    /// Remove expired records
    pub fn cleanup_expired(&self) {
        let now = Instant::now();
        if let Ok(mut entries) = self.entries.write() {
            entries.retain(|_, e| e.is_live(now));
        }
    }
}

#[async_trait]
impl QuotaStore for MemoryQuotaStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self
            .entries
            .read()
            .map_err(|_| StoreError::Protocol("memory store lock poisoned".to_string()))?;
        let now = Instant::now();
        Ok(entries
            .get(key)
            .filter(|e| e.is_live(now))
            .map(|e| e.value.clone()))
    }

    async fn set_with_expiry(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| StoreError::Protocol("memory store lock poisoned".to_string()))?;
        let now = Instant::now();
        let expires_at = now.checked_add(ttl).ok_or_else(|| {
            StoreError::Protocol(format!("ttl of {}s is out of range", ttl.as_secs()))
        })?;
        entries.retain(|_, e| e.is_live(now));
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at,
            },
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Quota store clients
//!
//! The quota store is an external key-value service with GET and
//! SET-with-expiry semantics. A record under `quota:<fingerprint>` means that
//! client has used its allowance for the current window.

pub mod memory;
pub mod rest;
pub mod store;

pub use memory::MemoryQuotaStore;
pub use rest::RestQuotaStore;
pub use store::{quota_key, QuotaStore, StoreError, QUOTA_KEY_PREFIX, QUOTA_SENTINEL};

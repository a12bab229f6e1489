// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod admission;
pub mod api;
pub mod cli;
pub mod config;
pub mod quota;
pub mod upstream;

pub use admission::{AdmissionController, AdmissionDecision, ClientFingerprint};
pub use api::{create_app, AppState};
pub use config::GatewayConfig;
pub use quota::{MemoryQuotaStore, QuotaStore, RestQuotaStore};
pub use upstream::{ImagePayload, ImageProvider, OpenAiImageClient};

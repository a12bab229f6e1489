// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Admission control for the generation endpoint
//!
//! Checks method, origin, input and quota in that order; the first failing
//! check decides the outcome.

pub mod controller;
pub mod decision;
pub mod fingerprint;
pub mod input;

pub use controller::{AdmissionController, AdmissionRequest};
pub use decision::{AdmissionDecision, AdmissionError};
pub use fingerprint::{client_address, ClientFingerprint};
pub use input::{GenerateImageRequest, ValidationError, ALLOWED_SIZES};

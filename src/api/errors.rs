// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::admission::{AdmissionError, ValidationError};
use crate::upstream::UpstreamError;

/// JSON error body: `{ error, message?, details? }`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

#[derive(Debug)]
pub enum ApiError {
    InvalidRequest(String),
    MissingPrompt,
    InvalidSize(String),
    OriginDenied,
    MethodNotAllowed,
    QuotaExceeded { window: Duration },
    Upstream(UpstreamError),
    /// Quota store failed on the read path
    StoreUnavailable,
    InternalError,
}

impl ApiError {
    pub fn to_response(&self) -> ErrorResponse {
        let (error, message, details) = match self {
            ApiError::InvalidRequest(msg) => ("invalid_request", Some(msg.clone()), None),
            ApiError::MissingPrompt => ("missing_prompt", Some("Missing prompt".to_string()), None),
            ApiError::InvalidSize(msg) => ("invalid_size", Some(msg.clone()), None),
            ApiError::OriginDenied => (
                "origin_not_allowed",
                Some("Origin not allowed".to_string()),
                None,
            ),
            ApiError::MethodNotAllowed => (
                "method_not_allowed",
                Some("Method not allowed".to_string()),
                None,
            ),
            ApiError::QuotaExceeded { window } => {
                let secs = window.as_secs();
                (
                    "limit_reached",
                    Some(format!(
                        "You have used your free image for now. Try again in {}.",
                        describe_window(secs)
                    )),
                    Some(serde_json::json!({ "windowSecs": secs })),
                )
            }
            ApiError::Upstream(UpstreamError::Http { status, details }) => (
                "upstream_error",
                Some(format!("Image provider returned {}", status)),
                Some(details.clone()),
            ),
            ApiError::Upstream(UpstreamError::Transport(_)) => (
                "upstream_error",
                Some("Image provider unreachable".to_string()),
                None,
            ),
            ApiError::Upstream(UpstreamError::NoImage) => (
                "no_image_returned",
                Some("No image returned".to_string()),
                None,
            ),
            ApiError::Upstream(UpstreamError::MalformedPayload(_)) => (
                "invalid_upstream_payload",
                Some("Image provider returned an unreadable response".to_string()),
                None,
            ),
            ApiError::StoreUnavailable | ApiError::InternalError => {
                ("server_error", Some("Server error".to_string()), None)
            }
        };

        ErrorResponse {
            error: error.to_string(),
            message,
            details,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidRequest(_) | ApiError::MissingPrompt | ApiError::InvalidSize(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::OriginDenied => StatusCode::FORBIDDEN,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::QuotaExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Upstream(UpstreamError::Http { .. })
            | ApiError::Upstream(UpstreamError::Transport(_)) => StatusCode::BAD_GATEWAY,
            ApiError::Upstream(UpstreamError::NoImage)
            | ApiError::Upstream(UpstreamError::MalformedPayload(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::StoreUnavailable | ApiError::InternalError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

fn describe_window(secs: u64) -> String {
    match secs {
        s if s >= 3600 && s % 3600 == 0 => format!("{} hours", s / 3600),
        s if s >= 60 && s % 60 == 0 => format!("{} minutes", s / 60),
        s => format!("{} seconds", s),
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            ApiError::MissingPrompt => write!(f, "Missing prompt"),
            ApiError::InvalidSize(msg) => write!(f, "Invalid size: {}", msg),
            ApiError::OriginDenied => write!(f, "Origin not allowed"),
            ApiError::MethodNotAllowed => write!(f, "Method not allowed"),
            ApiError::QuotaExceeded { window } => {
                write!(f, "Quota exceeded for a {}s window", window.as_secs())
            }
            ApiError::Upstream(e) => write!(f, "Upstream error: {}", e),
            ApiError::StoreUnavailable => write!(f, "Quota store unavailable"),
            ApiError::InternalError => write!(f, "Internal error"),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        match e {
            ValidationError::InvalidBody(msg) => ApiError::InvalidRequest(msg),
            ValidationError::MissingPrompt => ApiError::MissingPrompt,
            e @ ValidationError::InvalidSize { .. } => ApiError::InvalidSize(e.to_string()),
        }
    }
}

impl From<AdmissionError> for ApiError {
    fn from(e: AdmissionError) -> Self {
        match e {
            AdmissionError::Validation(v) => v.into(),
            AdmissionError::Store(_) => ApiError::StoreUnavailable,
        }
    }
}

impl From<UpstreamError> for ApiError {
    fn from(e: UpstreamError) -> Self {
        ApiError::Upstream(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self.to_response())).into_response()
    }
}

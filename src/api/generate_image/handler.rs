// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image generation endpoint handler

use axum::{
    body::to_bytes,
    extract::{Request, State},
    Json,
};
use tracing::{error, field, info, info_span, warn, Instrument, Span};
use uuid::Uuid;

use super::response::GenerateImageResponse;
use crate::admission::{AdmissionDecision, AdmissionError, AdmissionRequest};
use crate::api::errors::ApiError;
use crate::api::http_server::AppState;

/// Largest request body read from the client
pub const MAX_BODY_BYTES: usize = 64 * 1024;

/// /api/generate-image - Generate an image from a text prompt
///
/// Pipeline:
/// 1. Method and origin checks, before the body is read
/// 2. Admission: input validation, quota lookup
/// 3. Forward the validated request to the image provider
/// 4. On success, commit the caller's quota (failures are logged only)
/// 5. Return `{ image }`
///
/// OPTIONS never gets here; the CORS layer answers it.
pub async fn generate_image_handler(
    State(state): State<AppState>,
    request: Request,
) -> Result<Json<GenerateImageResponse>, ApiError> {
    let request_id = Uuid::new_v4();
    let span = info_span!("generate_image", %request_id, client = field::Empty);
    handle(state, request).instrument(span).await
}

async fn handle(
    state: AppState,
    request: Request,
) -> Result<Json<GenerateImageResponse>, ApiError> {
    let (parts, body) = request.into_parts();

    if let Some(denied) = state.admission.check_caller(&parts.method, &parts.headers) {
        return Err(denied_error(&state, denied));
    }

    let body = to_bytes(body, MAX_BODY_BYTES).await.map_err(|e| {
        info!("Request body rejected: {}", e);
        ApiError::InvalidRequest(format!("request body could not be read: {}", e))
    })?;

    let decision = state
        .admission
        .decide(AdmissionRequest::new(&parts.method, &parts.headers, &body))
        .await
        .map_err(|e| {
            match &e {
                AdmissionError::Validation(v) => info!("Request rejected: {}", v),
                AdmissionError::Store(s) => error!("Quota lookup failed, refusing request: {}", s),
            }
            ApiError::from(e)
        })?;

    let (fingerprint, request) = match decision {
        AdmissionDecision::Allowed {
            fingerprint,
            request,
        } => {
            Span::current().record("client", fingerprint.short());
            (fingerprint, request)
        }
        denied => return Err(denied_error(&state, denied)),
    };

    let payload = state.provider.generate(request).await.map_err(|e| {
        warn!(
            "Image generation via {} failed for client {}: {}",
            state.provider.name(),
            fingerprint.short(),
            e
        );
        ApiError::from(e)
    })?;

    if let Err(e) = state.admission.commit(&fingerprint).await {
        warn!(
            "Quota commit failed for client {}, returning image anyway: {}",
            fingerprint.short(),
            e
        );
    }

    info!("Image generated for client {}", fingerprint.short());
    Ok(Json(GenerateImageResponse::from(&payload)))
}

fn denied_error(state: &AppState, decision: AdmissionDecision) -> ApiError {
    match decision {
        AdmissionDecision::DeniedMethod => ApiError::MethodNotAllowed,
        AdmissionDecision::DeniedOrigin => ApiError::OriginDenied,
        AdmissionDecision::DeniedQuota { .. } => ApiError::QuotaExceeded {
            window: state.admission.window(),
        },
        AdmissionDecision::Allowed { .. } => ApiError::InternalError,
    }
}

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use std::{any::Any, net::SocketAddr, sync::Arc};
use tokio::signal;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};
use tracing::{error, info};

use super::cors::CorsPolicy;
use super::errors::ApiError;
use super::generate_image::generate_image_handler;
use crate::admission::AdmissionController;
use crate::config::GatewayConfig;
use crate::quota::QuotaStore;
use crate::upstream::ImageProvider;

pub const GENERATE_IMAGE_PATH: &str = "/api/generate-image";

/// Shared, read-only state for request handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub admission: Arc<AdmissionController>,
    pub provider: Arc<dyn ImageProvider>,
}

impl AppState {
    pub fn new(
        config: GatewayConfig,
        store: Arc<dyn QuotaStore>,
        provider: Arc<dyn ImageProvider>,
    ) -> Self {
        let admission = AdmissionController::from_config(&config, store);
        Self {
            config: Arc::new(config),
            admission: Arc::new(admission),
            provider,
        }
    }
}

/// Build the router with panic, CORS and trace layers
pub fn create_app(state: AppState) -> Router {
    let cors = CorsPolicy::new(&state.config.allowed_origins);

    Router::new()
        // Any method: the handler produces the JSON 405 itself
        .route(GENERATE_IMAGE_PATH, any(generate_image_handler))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(cors.layer())
        .layer(cors.fallback_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!("Request handler panicked: {}", detail);
    ApiError::InternalError.into_response()
}

pub async fn start_server(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    let app = create_app(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("Image gateway listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Image gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

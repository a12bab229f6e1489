// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{anyhow, Result};
use clap::{Args, Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::api::{start_server, AppState};
use crate::config::GatewayConfig;
use crate::quota::{MemoryQuotaStore, QuotaStore, RestQuotaStore};
use crate::upstream::OpenAiImageClient;

/// Image generation gateway
#[derive(Parser, Debug)]
#[command(name = "image-gateway")]
#[command(version)]
#[command(about = "Admission-controlled gateway in front of an image generation API", long_about = None)]
pub struct Cli {
    /// Load environment variables from this file instead of ./.env
    #[arg(long, global = true)]
    pub env_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP gateway (default)
    Serve(ServeArgs),

    /// Validate configuration and exit
    CheckConfig,
}

/// Arguments for the serve command
#[derive(Args, Debug, Default)]
pub struct ServeArgs {
    /// Listen address, overrides LISTEN_ADDR
    #[arg(long)]
    pub listen: Option<String>,
}

/// Load the env file named on the command line, or `./.env` if present
pub fn load_env_file(cli: &Cli) -> Result<()> {
    match cli.env_file {
        Some(ref path) => {
            dotenv::from_path(path)
                .map_err(|e| anyhow!("failed to load {}: {}", path.display(), e))?;
        }
        None => {
            dotenv::dotenv().ok();
        }
    }
    Ok(())
}

/// Execute CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    match cli.command.unwrap_or(Commands::Serve(ServeArgs::default())) {
        Commands::Serve(args) => serve(args).await,
        Commands::CheckConfig => check_config(),
    }
}

fn load_config(listen: Option<String>) -> Result<GatewayConfig> {
    let mut config =
        GatewayConfig::from_env().map_err(|e| anyhow!("invalid configuration: {}", e))?;
    if let Some(listen) = listen {
        config.listen_addr = listen;
    }
    config.validate().map_err(|e| anyhow!("invalid configuration: {}", e))?;
    Ok(config)
}

fn check_config() -> Result<()> {
    let config = load_config(None)?;
    info!("Configuration OK: {:?}", config);
    Ok(())
}

/// Select the quota store: REST when configured, in-memory otherwise
pub fn build_store(config: &GatewayConfig) -> Result<Arc<dyn QuotaStore>> {
    let store: Arc<dyn QuotaStore> = match (&config.quota.rest_url, &config.quota.rest_token) {
        (Some(url), Some(token)) => {
            info!("Using REST quota store at {}", url);
            Arc::new(RestQuotaStore::new(url, token)?)
        }
        _ => {
            warn!("KV_REST_API_URL not set; using in-memory quota store (single instance only)");
            Arc::new(MemoryQuotaStore::new())
        }
    };
    Ok(store)
}

/// Wire config, quota store and provider into handler state
pub fn build_state(config: GatewayConfig) -> Result<AppState> {
    let store = build_store(&config)?;
    let provider = Arc::new(OpenAiImageClient::new(&config.provider)?);
    Ok(AppState::new(config, store, provider))
}

async fn serve(args: ServeArgs) -> Result<()> {
    let config = load_config(args.listen)?;
    let addr: SocketAddr = config
        .listen_addr
        .parse()
        .map_err(|e| anyhow!("invalid listen address '{}': {}", config.listen_addr, e))?;

    info!(
        "Allowed origins: {}; quota window: {}s",
        config.allowed_origins.join(", "),
        config.quota.window.as_secs()
    );

    let state = build_state(config)?;
    start_server(state, addr).await
}

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::Result;
use clap::Parser;
use image_gateway::cli::{execute, load_env_file, Cli};
use std::env;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    load_env_file(&cli)?;

    // Initialize tracing subscriber for logging
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    match execute(cli).await {
        Ok(()) => Ok(()),
        Err(e) => {
            tracing::error!("{:#}", e);
            std::process::exit(1);
        }
    }
}

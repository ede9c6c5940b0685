//! Paid agent HTTP service.
//!
//! Gates a work handler behind a402 payment verification: unpaid requests
//! come back with payment requirements, paid requests are verified, served,
//! and settled.
//!
//! # Usage
//!
//! ```bash
//! # Delegate settlement to the public facilitator
//! PAY_TO_ADDRESS=0x... cargo run -p a402-agent
//!
//! # Settle directly against a chain RPC
//! PAY_TO_ADDRESS=0x... PRIVATE_KEY=0x... SETTLEMENT_MODE=direct cargo run -p a402-agent
//!
//! # Configure logging level
//! RUST_LOG=debug cargo run -p a402-agent
//! ```
//!
//! Settings come from environment variables or flags; see [`config::Config`].
//! A `.env` file in the working directory is loaded first when present.

mod config;
mod error;
mod handlers;
mod merchant;
mod process;
mod service;

use std::net::SocketAddr;
use std::sync::Arc;

use alloy_signer_local::PrivateKeySigner;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use a402_evm::{LocalFacilitator, USDC_DECIMALS, chain_config};
use a402_http::{DEFAULT_FACILITATOR_URL, FacilitatorClient};

use crate::config::{Config, ConfigError, SettlementMode, price_to_atomic};
use crate::handlers::{AppState, agent_router};
use crate::merchant::{Merchant, SettlementBackend};
use crate::service::EchoService;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run().await {
        tracing::error!("Agent failed: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::parse();
    let network = config.resolved_network();
    let chain =
        chain_config(&network).ok_or_else(|| ConfigError::UnknownNetwork(network.clone()))?;
    let amount = price_to_atomic(config.price_usd, USDC_DECIMALS)?;

    let backend = match config.resolve_settlement_mode() {
        SettlementMode::Direct => {
            let key = config
                .private_key
                .as_deref()
                .ok_or(ConfigError::MissingPrivateKey)?;
            let signer: PrivateKeySigner = key
                .parse()
                .map_err(|e| ConfigError::InvalidPrivateKey(format!("{e}")))?;
            let rpc_url = config.rpc_url.as_deref().unwrap_or(chain.rpc_url);
            tracing::info!(%network, rpc_url, signer = %signer.address(), "Settling directly against chain RPC");
            let facilitator = LocalFacilitator::connect(network.clone(), rpc_url, signer).await?;
            SettlementBackend::Direct(facilitator)
        }
        SettlementMode::Facilitator => {
            let url = config
                .facilitator_url
                .as_deref()
                .unwrap_or(DEFAULT_FACILITATOR_URL);
            tracing::info!(facilitator = url, "Delegating settlement to facilitator");
            let mut client = FacilitatorClient::try_from(url)?;
            if let Some(api_key) = config.facilitator_api_key.clone() {
                client = client.with_api_key(api_key);
            }
            SettlementBackend::Facilitator(client)
        }
    };

    let merchant = Merchant::new(
        config.pay_to_address,
        network.clone(),
        chain.usdc,
        amount,
        config.resource_url(),
        backend,
    );
    tracing::info!(
        address = %config.pay_to_address,
        %network,
        price = %config.price_display(),
        "Payment gate initialized"
    );

    let state = Arc::new(AppState {
        merchant,
        handler: EchoService,
        price_display: config.price_display(),
        process_url: config.loopback_url(),
        http: reqwest::Client::new(),
    });
    let app = agent_router(state);

    let addr = SocketAddr::new(config.host, config.port);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Agent listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Agent shut down gracefully");
    Ok(())
}

/// Waits for Ctrl-C or SIGTERM (Unix) to initiate graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => tracing::info!("Received Ctrl-C, shutting down..."),
            _ = sigterm.recv() => tracing::info!("Received SIGTERM, shutting down..."),
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await.expect("failed to listen for Ctrl-C");
        tracing::info!("Received Ctrl-C, shutting down...");
    }
}

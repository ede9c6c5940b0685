//! Bundled chain data for the networks this crate can settle on.
//!
//! Each entry pairs a protocol network name with its USDC deployment and a
//! public RPC endpoint usable when no explicit endpoint is configured.

use a402::networks::Network;
use alloy_primitives::{Address, address};

/// USDC contract address on Base mainnet.
pub const USDC_BASE: Address = address!("0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913");

/// USDC contract address on Base Sepolia.
pub const USDC_BASE_SEPOLIA: Address = address!("0x036CbD53842c5426634e7929541eC2318f3dCF7e");

/// USDC contract address on Ethereum mainnet.
pub const USDC_ETHEREUM: Address = address!("0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48");

/// USDC contract address on Polygon PoS mainnet.
pub const USDC_POLYGON: Address = address!("0x3c499c542cEF5E3811e1192ce70d8cC03d5c3359");

/// USDC contract address on Polygon Amoy.
pub const USDC_POLYGON_AMOY: Address = address!("0x41E94Eb71Ef8C9fAE0235d1e472b21E21B5a4dbF");

/// Token decimals for USDC on every supported network.
pub const USDC_DECIMALS: u32 = 6;

/// EIP-712 domain name used when a requirement carries no `extra`.
pub const DEFAULT_EIP712_NAME: &str = "USDC";

/// EIP-712 domain version used when a requirement carries no `extra`.
pub const DEFAULT_EIP712_VERSION: &str = "2";

/// Chain data bundled for one network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainConfig {
    /// The protocol network name.
    pub network: Network,
    /// The USDC deployment on this network.
    pub usdc: Address,
    /// A public RPC endpoint for this network.
    pub rpc_url: &'static str,
}

/// All networks with bundled USDC deployments.
pub const KNOWN_CHAINS: [ChainConfig; 5] = [
    ChainConfig {
        network: Network::Base,
        usdc: USDC_BASE,
        rpc_url: "https://mainnet.base.org",
    },
    ChainConfig {
        network: Network::BaseSepolia,
        usdc: USDC_BASE_SEPOLIA,
        rpc_url: "https://sepolia.base.org",
    },
    ChainConfig {
        network: Network::Ethereum,
        usdc: USDC_ETHEREUM,
        rpc_url: "https://ethereum-rpc.publicnode.com",
    },
    ChainConfig {
        network: Network::Polygon,
        usdc: USDC_POLYGON,
        rpc_url: "https://polygon-rpc.com",
    },
    ChainConfig {
        network: Network::PolygonAmoy,
        usdc: USDC_POLYGON_AMOY,
        rpc_url: "https://rpc-amoy.polygon.technology",
    },
];

/// Looks up the bundled chain data for a network.
///
/// Returns `None` for networks without a bundled USDC deployment, including
/// every [`Network::Other`].
#[must_use]
pub fn chain_config(network: &Network) -> Option<&'static ChainConfig> {
    KNOWN_CHAINS.iter().find(|config| &config.network == network)
}

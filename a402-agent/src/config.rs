//! Environment-driven agent configuration.
//!
//! Every setting arrives through an environment variable (a `.env` file is
//! loaded first when present) or its matching command-line flag. The only
//! required setting is the payout address; everything else has a deployable
//! default.

use a402::networks::Network;
use a402::proto::TokenAmount;
use alloy_primitives::{Address, U256};
use clap::Parser;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

/// Agent service configuration.
#[derive(Debug, Parser)]
#[command(name = "a402-agent", version, about = "Paid agent service")]
pub struct Config {
    /// Bind address.
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: std::net::IpAddr,

    /// Bind port.
    #[arg(long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Address that receives payments.
    #[arg(long, env = "PAY_TO_ADDRESS")]
    pub pay_to_address: Address,

    /// Network payments are accepted on.
    #[arg(long, env = "NETWORK", default_value = "base-sepolia")]
    pub network: String,

    /// Base URL of the remote facilitator.
    #[arg(long, env = "FACILITATOR_URL")]
    pub facilitator_url: Option<String>,

    /// API key sent to the facilitator as a bearer token.
    #[arg(long, env = "FACILITATOR_API_KEY", hide_env_values = true)]
    pub facilitator_api_key: Option<String>,

    /// Public URL of the paid resource, advertised in requirements.
    #[arg(long, env = "SERVICE_URL")]
    pub service_url: Option<String>,

    /// Private key used for direct settlement.
    #[arg(long, env = "PRIVATE_KEY", hide_env_values = true)]
    pub private_key: Option<String>,

    /// Chain RPC endpoint used for direct settlement.
    #[arg(long, env = "RPC_URL")]
    pub rpc_url: Option<String>,

    /// Settlement mode: `facilitator`, `direct`, or `local` (alias for
    /// direct). Inferred from the other settings when unset.
    #[arg(long, env = "SETTLEMENT_MODE")]
    pub settlement_mode: Option<String>,

    /// Price per request, in dollars.
    #[arg(long, env = "PRICE_USD", default_value = "0.10")]
    pub price_usd: Decimal,
}

/// How verified payments get settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementMode {
    /// Delegate verification and settlement to a remote facilitator.
    Facilitator,
    /// Verify and settle directly against a chain RPC.
    Direct,
}

/// Errors raised while turning raw settings into a runnable configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Direct settlement was selected without a signing key.
    #[error("direct settlement requires PRIVATE_KEY")]
    MissingPrivateKey,
    /// The signing key could not be parsed.
    #[error("invalid PRIVATE_KEY: {0}")]
    InvalidPrivateKey(String),
    /// The configured network has no bundled chain data.
    #[error("no chain data for network {0}")]
    UnknownNetwork(Network),
    /// The price is negative.
    #[error("PRICE_USD must not be negative")]
    NegativePrice,
    /// The price has more precision than the asset can represent.
    #[error("PRICE_USD has more precision than the asset's {0} decimals")]
    PriceTooPrecise(u32),
    /// The price does not fit the asset's integer range.
    #[error("PRICE_USD is out of range")]
    PriceOutOfRange,
}

impl Config {
    /// Resolves the configured network name, falling back to Base Sepolia
    /// for identifiers without bundled chain data.
    #[must_use]
    pub fn resolved_network(&self) -> Network {
        let network: Network = self
            .network
            .parse()
            .unwrap_or(Network::Other(self.network.clone()));
        if network.is_known() {
            network
        } else {
            tracing::warn!(
                network = %self.network,
                "Unknown network, falling back to base-sepolia"
            );
            Network::BaseSepolia
        }
    }

    /// Picks the settlement mode.
    ///
    /// An explicit `SETTLEMENT_MODE` wins. Otherwise a configured
    /// facilitator URL selects facilitator mode, then a configured private
    /// key selects direct mode, and the public facilitator is the final
    /// fallback.
    #[must_use]
    pub fn resolve_settlement_mode(&self) -> SettlementMode {
        let explicit = self
            .settlement_mode
            .as_deref()
            .map(str::to_ascii_lowercase);
        match explicit.as_deref() {
            Some("direct" | "local") => SettlementMode::Direct,
            Some("facilitator") => SettlementMode::Facilitator,
            Some(other) => {
                tracing::warn!(mode = %other, "Unknown settlement mode, using facilitator");
                SettlementMode::Facilitator
            }
            None if self.facilitator_url.is_some() => SettlementMode::Facilitator,
            None if self.private_key.is_some() => SettlementMode::Direct,
            None => SettlementMode::Facilitator,
        }
    }

    /// The resource URL advertised in payment requirements.
    #[must_use]
    pub fn resource_url(&self) -> String {
        self.service_url
            .clone()
            .unwrap_or_else(|| format!("http://localhost:{}/process", self.port))
    }

    /// The URL of this server's own process endpoint, used by `/test`.
    #[must_use]
    pub fn loopback_url(&self) -> String {
        format!("http://localhost:{}/process", self.port)
    }

    /// Dollar-formatted price for display.
    #[must_use]
    pub fn price_display(&self) -> String {
        format!("${}", self.price_usd)
    }
}

/// Converts a dollar price into the asset's smallest unit.
///
/// # Errors
///
/// Returns a [`ConfigError`] when the price is negative, carries more
/// decimal places than the asset, or overflows.
pub fn price_to_atomic(price: Decimal, decimals: u32) -> Result<TokenAmount, ConfigError> {
    if price.is_sign_negative() {
        return Err(ConfigError::NegativePrice);
    }
    let scale = Decimal::from(
        10_u64
            .checked_pow(decimals)
            .ok_or(ConfigError::PriceOutOfRange)?,
    );
    let scaled = price
        .checked_mul(scale)
        .ok_or(ConfigError::PriceOutOfRange)?;
    if !scaled.fract().is_zero() {
        return Err(ConfigError::PriceTooPrecise(decimals));
    }
    let units = scaled.to_u128().ok_or(ConfigError::PriceOutOfRange)?;
    Ok(TokenAmount::new(U256::from(units)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use a402_evm::USDC_DECIMALS;
    use alloy_primitives::address;

    fn base_config() -> Config {
        Config {
            host: "0.0.0.0".parse().unwrap(),
            port: 3000,
            pay_to_address: address!("0x1234567890123456789012345678901234567890"),
            network: "base-sepolia".to_owned(),
            facilitator_url: None,
            facilitator_api_key: None,
            service_url: None,
            private_key: None,
            rpc_url: None,
            settlement_mode: None,
            price_usd: "0.10".parse().unwrap(),
        }
    }

    #[test]
    fn test_default_price_converts_to_usdc_units() {
        let amount = price_to_atomic("0.10".parse().unwrap(), USDC_DECIMALS).unwrap();
        assert_eq!(amount, TokenAmount::from(100_000_u64));
    }

    #[test]
    fn test_whole_dollar_price_converts() {
        let amount = price_to_atomic("2".parse().unwrap(), USDC_DECIMALS).unwrap();
        assert_eq!(amount, TokenAmount::from(2_000_000_u64));
    }

    #[test]
    fn test_overprecise_price_is_refused() {
        let err = price_to_atomic("0.0000001".parse().unwrap(), USDC_DECIMALS).unwrap_err();
        assert!(matches!(err, ConfigError::PriceTooPrecise(6)));
    }

    #[test]
    fn test_negative_price_is_refused() {
        let err = price_to_atomic("-1".parse().unwrap(), USDC_DECIMALS).unwrap_err();
        assert!(matches!(err, ConfigError::NegativePrice));
    }

    #[test]
    fn test_explicit_mode_wins_over_inference() {
        let mut config = base_config();
        config.facilitator_url = Some("https://x402.org/facilitator".to_owned());
        config.settlement_mode = Some("local".to_owned());
        assert_eq!(config.resolve_settlement_mode(), SettlementMode::Direct);
    }

    #[test]
    fn test_facilitator_url_implies_facilitator_mode() {
        let mut config = base_config();
        config.facilitator_url = Some("https://x402.org/facilitator".to_owned());
        config.private_key = Some("0xkey".to_owned());
        assert_eq!(
            config.resolve_settlement_mode(),
            SettlementMode::Facilitator
        );
    }

    #[test]
    fn test_private_key_alone_implies_direct_mode() {
        let mut config = base_config();
        config.private_key = Some("0xkey".to_owned());
        assert_eq!(config.resolve_settlement_mode(), SettlementMode::Direct);
    }

    #[test]
    fn test_bare_config_defaults_to_facilitator_mode() {
        assert_eq!(
            base_config().resolve_settlement_mode(),
            SettlementMode::Facilitator
        );
    }

    #[test]
    fn test_unknown_network_falls_back_to_base_sepolia() {
        let mut config = base_config();
        config.network = "gnosis".to_owned();
        assert_eq!(config.resolved_network(), Network::BaseSepolia);
    }

    #[test]
    fn test_resource_url_defaults_to_local_process() {
        let config = base_config();
        assert_eq!(config.resource_url(), "http://localhost:3000/process");
        assert_eq!(config.price_display(), "$0.10");
    }
}

//! Well-known chain identifiers.
//!
//! The protocol names networks with the short identifiers used by x402
//! deployments (`base-sepolia`, `polygon`, ...). Unknown identifiers survive
//! deserialization as [`Network::Other`] so that a proof referencing a
//! network the service never advertised can be rejected explicitly instead
//! of failing at the parse boundary.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A chain identifier as carried on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Network {
    /// Base mainnet (chain id 8453).
    Base,
    /// Base Sepolia testnet (chain id 84532).
    BaseSepolia,
    /// Ethereum mainnet (chain id 1).
    Ethereum,
    /// Polygon PoS mainnet (chain id 137).
    Polygon,
    /// Polygon Amoy testnet (chain id 80002).
    PolygonAmoy,
    /// A network this crate has no chain data for.
    Other(String),
}

impl Network {
    /// All networks with bundled chain data.
    pub const KNOWN: [Self; 5] = [
        Self::Base,
        Self::BaseSepolia,
        Self::Ethereum,
        Self::Polygon,
        Self::PolygonAmoy,
    ];

    /// Returns the wire identifier for this network.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Base => "base",
            Self::BaseSepolia => "base-sepolia",
            Self::Ethereum => "ethereum",
            Self::Polygon => "polygon",
            Self::PolygonAmoy => "polygon-amoy",
            Self::Other(name) => name,
        }
    }

    /// Returns the numeric EIP-155 chain id, or `None` for unknown networks.
    #[must_use]
    pub const fn chain_id(&self) -> Option<u64> {
        match self {
            Self::Base => Some(8453),
            Self::BaseSepolia => Some(84_532),
            Self::Ethereum => Some(1),
            Self::Polygon => Some(137),
            Self::PolygonAmoy => Some(80_002),
            Self::Other(_) => None,
        }
    }

    /// Whether this network has bundled chain data.
    #[must_use]
    pub const fn is_known(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl FromStr for Network {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "base" => Self::Base,
            "base-sepolia" => Self::BaseSepolia,
            "ethereum" => Self::Ethereum,
            "polygon" => Self::Polygon,
            "polygon-amoy" => Self::PolygonAmoy,
            other => Self::Other(other.to_owned()),
        })
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Network {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Network {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(s.parse().unwrap_or(Self::Other(s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_roundtrip() {
        for network in Network::KNOWN {
            let json = serde_json::to_string(&network).unwrap();
            let back: Network = serde_json::from_str(&json).unwrap();
            assert_eq!(network, back);
        }
    }

    #[test]
    fn test_unknown_network_survives_deserialization() {
        let network: Network = serde_json::from_str("\"gnosis\"").unwrap();
        assert_eq!(network, Network::Other("gnosis".to_owned()));
        assert_eq!(network.chain_id(), None);
    }

    #[test]
    fn test_chain_ids_match_deployments() {
        assert_eq!(Network::Base.chain_id(), Some(8453));
        assert_eq!(Network::BaseSepolia.chain_id(), Some(84_532));
        assert_eq!(Network::Ethereum.chain_id(), Some(1));
        assert_eq!(Network::Polygon.chain_id(), Some(137));
        assert_eq!(Network::PolygonAmoy.chain_id(), Some(80_002));
    }
}

//! Protocol types for x402 payment messages.
//!
//! This module defines the wire format types used for payment negotiation
//! between a paying client, a merchant agent, and a facilitator. The protocol
//! is version 1 of x402: networks are identified by human-readable names
//! (e.g., "base-sepolia") and amounts are decimal strings in the asset's
//! smallest unit.
//!
//! # Key Types
//!
//! - [`PaymentRequired`] - Envelope advertising acceptable payment methods
//! - [`PaymentRequirements`] - Payment terms set by the merchant
//! - [`PaymentPayload`] - Signed payment proof from the buyer
//! - [`VerifyRequest`] / [`VerifyResponse`] - Verification messages
//! - [`SettleRequest`] / [`SettleResponse`] - Settlement messages
//! - [`ErrorReason`] - Machine-readable failure codes
//!
//! # Wire Format
//!
//! All types serialize to JSON using camelCase field names. The protocol
//! version is pinned by the `x402Version` field, which serializes as the
//! bare integer `1`.

use alloy_primitives::{Address, U256};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::networks::Network;

pub mod error;
pub mod version;

pub use error::{ErrorReason, PaymentVerificationError};
pub use version::Version;

/// Version marker for x402 protocol version 1.
///
/// This is a type alias for [`Version<1>`] that serializes as the integer `1`
/// and rejects other values on deserialization.
///
/// Use the [`V1`] constant when constructing protocol messages.
pub type X402Version1 = Version<1>;

/// Convenience constant for constructing protocol messages.
pub const V1: X402Version1 = Version;

/// A payment scheme identifier.
///
/// Two schemes are bundled: [`Scheme::Exact`] carries a signed EIP-3009
/// authorization that the seller side executes, and [`Scheme::DirectTransfer`]
/// references a token transfer the buyer already broadcast. Unknown scheme
/// names survive deserialization as [`Scheme::Other`] so they can be rejected
/// with a reason code instead of a parse failure.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scheme {
    /// EIP-3009 `transferWithAuthorization` signed by the buyer.
    Exact,
    /// A transfer the buyer already submitted on-chain.
    DirectTransfer,
    /// A scheme this crate has no handler for.
    Other(String),
}

impl Scheme {
    /// Returns the wire identifier for this scheme.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Exact => "exact",
            Self::DirectTransfer => "direct-transfer",
            Self::Other(name) => name,
        }
    }
}

impl FromStr for Scheme {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "exact" => Self::Exact,
            "direct-transfer" => Self::DirectTransfer,
            other => Self::Other(other.to_owned()),
        })
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Scheme {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Scheme {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(s.parse().unwrap_or(Self::Other(s)))
    }
}

/// A token amount in the asset's smallest unit.
///
/// Serializes as a decimal string (e.g., `"100000"` for 0.10 USDC) to avoid
/// precision loss in JSON parsers that coerce large integers to floats.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TokenAmount(U256);

impl TokenAmount {
    /// Wraps a raw amount.
    #[must_use]
    pub const fn new(value: U256) -> Self {
        Self(value)
    }

    /// Returns the inner amount.
    #[must_use]
    pub const fn inner(&self) -> U256 {
        self.0
    }
}

impl From<u64> for TokenAmount {
    fn from(value: u64) -> Self {
        Self(U256::from(value))
    }
}

impl From<U256> for TokenAmount {
    fn from(value: U256) -> Self {
        Self(value)
    }
}

impl From<TokenAmount> for U256 {
    fn from(value: TokenAmount) -> Self {
        value.0
    }
}

impl FromStr for TokenAmount {
    type Err = <U256 as FromStr>::Err;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<U256>().map(Self)
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for TokenAmount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for TokenAmount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Payment terms set by the merchant.
///
/// Defines the terms under which a payment will be accepted, including the
/// amount, recipient, asset, and timing constraints. A merchant advertises
/// one `PaymentRequirements` entry per acceptable payment method.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequirements {
    /// The payment scheme.
    pub scheme: Scheme,
    /// The network name (e.g., "base-sepolia").
    pub network: Network,
    /// The maximum amount required, in the asset's smallest unit.
    pub max_amount_required: TokenAmount,
    /// The resource URL being paid for.
    pub resource: String,
    /// Human-readable description of the resource.
    pub description: String,
    /// MIME type of the resource.
    pub mime_type: String,
    /// The recipient address for payment.
    pub pay_to: Address,
    /// Maximum time in seconds for payment validity.
    pub max_timeout_seconds: u64,
    /// The token asset address.
    pub asset: Address,
    /// Scheme-specific extra data (for `exact`, the asset's EIP-712 domain
    /// name and version).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<serde_json::Value>,
}

impl PaymentRequirements {
    /// Decodes the `extra` field into a concrete type.
    ///
    /// Returns `None` if the field is absent or does not match `T`.
    #[must_use]
    pub fn extra_as<T: DeserializeOwned>(&self) -> Option<T> {
        self.extra
            .as_ref()
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

/// Envelope advertising acceptable payment methods.
///
/// A merchant returns this when a request arrives without payment. The buyer
/// picks one entry from `accepts` and responds with a matching
/// [`PaymentPayload`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequired {
    /// Protocol version (always 1).
    pub x402_version: X402Version1,
    /// List of acceptable payment methods.
    #[serde(default)]
    pub accepts: Vec<PaymentRequirements>,
    /// Optional error message if the triggering request was malformed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PaymentRequired {
    /// Builds an envelope from the given payment methods.
    #[must_use]
    pub const fn new(accepts: Vec<PaymentRequirements>) -> Self {
        Self {
            x402_version: V1,
            accepts,
            error: None,
        }
    }
}

/// A signed payment proof from the buyer.
///
/// Carries the scheme and network the buyer chose, plus the scheme-specific
/// proof. The proof stays as raw JSON until a scheme handler decodes it with
/// [`PaymentPayload::payload_as`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentPayload {
    /// Protocol version (always 1).
    pub x402_version: X402Version1,
    /// The payment scheme the buyer chose.
    pub scheme: Scheme,
    /// The network the proof targets.
    pub network: Network,
    /// The scheme-specific proof.
    pub payload: serde_json::Value,
}

impl PaymentPayload {
    /// Decodes the scheme-specific proof into a concrete type.
    ///
    /// # Errors
    ///
    /// Returns a decode error if the proof does not match `T`.
    pub fn payload_as<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.payload.clone())
    }
}

/// Request to verify a payment proof against payment requirements.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    /// The payment proof submitted by the buyer.
    pub payment: PaymentPayload,
    /// The requirements the proof must satisfy.
    pub requirements: PaymentRequirements,
}

/// Request to settle a verified payment.
///
/// Structurally identical to [`VerifyRequest`] on the wire, but represented
/// as a distinct type so the compiler can prevent settling a payment that was
/// never verified. Use `From<VerifyRequest>` after verification succeeds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettleRequest {
    /// The payment proof to execute.
    pub payment: PaymentPayload,
    /// The requirements the proof was verified against.
    pub requirements: PaymentRequirements,
}

impl From<VerifyRequest> for SettleRequest {
    fn from(request: VerifyRequest) -> Self {
        Self {
            payment: request.payment,
            requirements: request.requirements,
        }
    }
}

/// Result of verifying a payment proof.
///
/// Indicates whether the proof is valid and identifies the payer. If invalid,
/// includes a machine-readable reason describing why verification failed.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum VerifyResponse {
    /// The proof matches the requirements and passes all checks.
    Valid {
        /// The address of the payer.
        payer: String,
    },
    /// The proof was well-formed but failed verification.
    Invalid {
        /// Machine-readable reason verification failed.
        reason: String,
        /// The payer address, if identifiable.
        payer: Option<String>,
    },
}

impl VerifyResponse {
    /// Constructs a successful verification response.
    #[must_use]
    pub const fn valid(payer: String) -> Self {
        Self::Valid { payer }
    }

    /// Constructs a failed verification response.
    #[must_use]
    pub fn invalid(payer: Option<String>, reason: ErrorReason) -> Self {
        Self::Invalid {
            reason: reason.to_string(),
            payer,
        }
    }

    /// Constructs a failed verification response from a raw reason string.
    #[must_use]
    pub const fn invalid_raw(payer: Option<String>, reason: String) -> Self {
        Self::Invalid { reason, payer }
    }

    /// Returns `true` if the verification succeeded.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        matches!(self, Self::Valid { .. })
    }

    /// Returns the payer address, if identified.
    #[must_use]
    pub fn payer(&self) -> Option<&str> {
        match self {
            Self::Valid { payer } => Some(payer),
            Self::Invalid { payer, .. } => payer.as_deref(),
        }
    }

    /// Returns the failure reason, if verification failed.
    #[must_use]
    pub fn invalid_reason(&self) -> Option<&str> {
        match self {
            Self::Valid { .. } => None,
            Self::Invalid { reason, .. } => Some(reason),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VerifyResponseWire {
    is_valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    payer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    invalid_reason: Option<String>,
}

impl Serialize for VerifyResponse {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let wire = match self {
            Self::Valid { payer } => VerifyResponseWire {
                is_valid: true,
                payer: Some(payer.clone()),
                invalid_reason: None,
            },
            Self::Invalid { reason, payer } => VerifyResponseWire {
                is_valid: false,
                payer: payer.clone(),
                invalid_reason: Some(reason.clone()),
            },
        };
        wire.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for VerifyResponse {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = VerifyResponseWire::deserialize(deserializer)?;
        if wire.is_valid {
            let payer = wire
                .payer
                .ok_or_else(|| serde::de::Error::missing_field("payer"))?;
            Ok(Self::Valid { payer })
        } else {
            let reason = wire
                .invalid_reason
                .unwrap_or_else(|| ErrorReason::UnexpectedError.to_string());
            Ok(Self::Invalid {
                reason,
                payer: wire.payer,
            })
        }
    }
}

/// Result of settling a payment.
///
/// Indicates whether the payment executed on-chain, including the transaction
/// hash and payer address on success.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum SettleResponse {
    /// Settlement succeeded.
    Success {
        /// The address that paid, if reported.
        payer: Option<String>,
        /// The on-chain transaction hash.
        transaction: String,
        /// The network where settlement occurred.
        network: Network,
    },
    /// Settlement failed.
    Error {
        /// Machine-readable reason for failure.
        reason: String,
        /// The network where settlement was attempted, if known.
        network: Option<Network>,
    },
}

impl SettleResponse {
    /// Constructs a successful settlement response.
    #[must_use]
    pub const fn success(payer: Option<String>, transaction: String, network: Network) -> Self {
        Self::Success {
            payer,
            transaction,
            network,
        }
    }

    /// Constructs a failed settlement response.
    #[must_use]
    pub fn error(reason: ErrorReason, network: Option<Network>) -> Self {
        Self::Error {
            reason: reason.to_string(),
            network,
        }
    }

    /// Constructs a failed settlement response from a raw reason string.
    #[must_use]
    pub const fn error_raw(reason: String, network: Option<Network>) -> Self {
        Self::Error { reason, network }
    }

    /// Returns `true` if the settlement succeeded.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Returns the on-chain transaction hash, if settlement succeeded.
    #[must_use]
    pub fn transaction(&self) -> Option<&str> {
        match self {
            Self::Success { transaction, .. } => Some(transaction),
            Self::Error { .. } => None,
        }
    }

    /// Returns the payer address, if reported.
    #[must_use]
    pub fn payer(&self) -> Option<&str> {
        match self {
            Self::Success { payer, .. } => payer.as_deref(),
            Self::Error { .. } => None,
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettleResponseWire {
    success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    payer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    transaction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    network: Option<Network>,
}

impl Serialize for SettleResponse {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let wire = match self {
            Self::Success {
                payer,
                transaction,
                network,
            } => SettleResponseWire {
                success: true,
                error_reason: None,
                payer: payer.clone(),
                transaction: Some(transaction.clone()),
                network: Some(network.clone()),
            },
            Self::Error { reason, network } => SettleResponseWire {
                success: false,
                error_reason: Some(reason.clone()),
                payer: None,
                transaction: None,
                network: network.clone(),
            },
        };
        wire.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SettleResponse {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = SettleResponseWire::deserialize(deserializer)?;
        if wire.success {
            let transaction = wire
                .transaction
                .ok_or_else(|| serde::de::Error::missing_field("transaction"))?;
            let network = wire
                .network
                .ok_or_else(|| serde::de::Error::missing_field("network"))?;
            Ok(Self::Success {
                payer: wire.payer,
                transaction,
                network,
            })
        } else {
            let reason = wire
                .error_reason
                .unwrap_or_else(|| ErrorReason::UnexpectedError.to_string());
            Ok(Self::Error {
                reason,
                network: wire.network,
            })
        }
    }
}

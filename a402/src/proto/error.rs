//! Error types for payment verification.
//!
//! This module defines structured error types used when payment verification
//! or settlement fails, along with machine-readable reason codes.

use serde::{Deserialize, Serialize};

/// Errors that can occur during payment verification.
///
/// These errors are produced when a payment proof fails validation checks
/// performed before settlement.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum PaymentVerificationError {
    /// The payment payload format is invalid or malformed.
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
    /// The payment amount doesn't match the requirements.
    #[error("Payment amount is invalid with respect to the payment requirements")]
    InvalidPaymentAmount,
    /// The payment authorization's `validAfter` timestamp is in the future.
    #[error("Payment authorization is not yet valid")]
    Early,
    /// The payment authorization's `validBefore` timestamp has passed.
    #[error("Payment authorization is expired")]
    Expired,
    /// The payment's scheme doesn't match the requirements.
    #[error("Payment scheme is invalid with respect to the payment requirements")]
    SchemeMismatch,
    /// The payment's network doesn't match the requirements.
    #[error("Payment network is invalid with respect to the payment requirements")]
    NetworkMismatch,
    /// The payment recipient doesn't match the requirements.
    #[error("Payment recipient is invalid with respect to the payment requirements")]
    RecipientMismatch,
    /// The payment asset (token) doesn't match the requirements.
    #[error("Payment asset is invalid with respect to the payment requirements")]
    AssetMismatch,
    /// The payer's on-chain balance is insufficient.
    #[error("Onchain balance is not enough to cover the payment amount")]
    InsufficientFunds,
    /// The payment signature is invalid.
    #[error("{0}")]
    InvalidSignature(String),
    /// The payment scheme is not supported.
    #[error("Unsupported scheme")]
    UnsupportedScheme,
    /// The payment network is not supported.
    #[error("Unsupported network")]
    UnsupportedNetwork,
    /// The referenced transaction does not exist on-chain.
    #[error("Transaction not found")]
    TransactionNotFound,
    /// The referenced transaction exists but reverted.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),
    /// Verification could not reach the chain or the facilitator.
    #[error("Verification transport failed: {0}")]
    Transport(String),
}

impl PaymentVerificationError {
    /// Returns the machine-readable reason code for this error.
    #[must_use]
    pub const fn reason(&self) -> ErrorReason {
        match self {
            Self::InvalidFormat(_) => ErrorReason::InvalidFormat,
            Self::InvalidPaymentAmount => ErrorReason::InvalidPaymentAmount,
            Self::Early => ErrorReason::InvalidPaymentEarly,
            Self::Expired => ErrorReason::InvalidPaymentExpired,
            Self::SchemeMismatch => ErrorReason::SchemeMismatch,
            Self::NetworkMismatch => ErrorReason::NetworkMismatch,
            Self::RecipientMismatch => ErrorReason::RecipientMismatch,
            Self::AssetMismatch => ErrorReason::AssetMismatch,
            Self::InsufficientFunds => ErrorReason::InsufficientFunds,
            Self::InvalidSignature(_) => ErrorReason::InvalidSignature,
            Self::UnsupportedScheme => ErrorReason::UnsupportedScheme,
            Self::UnsupportedNetwork => ErrorReason::UnsupportedNetwork,
            Self::TransactionNotFound => ErrorReason::TransactionNotFound,
            Self::TransactionFailed(_) => ErrorReason::TransactionFailed,
            Self::Transport(_) => ErrorReason::TransportError,
        }
    }
}

impl From<serde_json::Error> for PaymentVerificationError {
    fn from(value: serde_json::Error) -> Self {
        Self::InvalidFormat(value.to_string())
    }
}

/// Machine-readable error reason codes for payment failures.
///
/// These codes are carried in verification and settlement responses so that
/// clients can programmatically handle different failure scenarios.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum ErrorReason {
    /// The payment payload format is invalid.
    InvalidFormat,
    /// The payment amount is incorrect.
    InvalidPaymentAmount,
    /// The payment authorization is not yet valid.
    InvalidPaymentEarly,
    /// The payment authorization has expired.
    InvalidPaymentExpired,
    /// The scheme doesn't match the requirements.
    SchemeMismatch,
    /// The network doesn't match the requirements.
    NetworkMismatch,
    /// The recipient address doesn't match.
    RecipientMismatch,
    /// The token asset doesn't match.
    AssetMismatch,
    /// The signature is invalid.
    InvalidSignature,
    /// Insufficient on-chain balance.
    InsufficientFunds,
    /// The scheme is not supported.
    UnsupportedScheme,
    /// The network is not supported.
    UnsupportedNetwork,
    /// The referenced transaction was not found on-chain.
    TransactionNotFound,
    /// The referenced transaction reverted.
    TransactionFailed,
    /// Verification or settlement could not reach its backend.
    TransportError,
    /// An unexpected error occurred.
    UnexpectedError,
}

impl ErrorReason {
    /// Returns the `snake_case` string representation matching the wire format.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidFormat => "invalid_format",
            Self::InvalidPaymentAmount => "invalid_payment_amount",
            Self::InvalidPaymentEarly => "invalid_payment_early",
            Self::InvalidPaymentExpired => "invalid_payment_expired",
            Self::SchemeMismatch => "scheme_mismatch",
            Self::NetworkMismatch => "network_mismatch",
            Self::RecipientMismatch => "recipient_mismatch",
            Self::AssetMismatch => "asset_mismatch",
            Self::InvalidSignature => "invalid_signature",
            Self::InsufficientFunds => "insufficient_funds",
            Self::UnsupportedScheme => "unsupported_scheme",
            Self::UnsupportedNetwork => "unsupported_network",
            Self::TransactionNotFound => "transaction_not_found",
            Self::TransactionFailed => "transaction_failed",
            Self::TransportError => "transport_error",
            Self::UnexpectedError => "unexpected_error",
        }
    }
}

impl core::fmt::Display for ErrorReason {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

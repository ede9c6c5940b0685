//! The `direct-transfer` payment scheme: transfers the payer broadcasts
//! itself.
//!
//! Instead of handing the service a signed authorization, the payer moves the
//! tokens up front and proves it with the resulting transaction hash.
//! Verification inspects the receipt; settlement has nothing left to execute
//! on-chain.

use a402::proto::TokenAmount;
use alloy_primitives::{Address, TxHash};
use serde::{Deserialize, Serialize};

#[cfg(feature = "client-provider")]
pub mod client;

#[cfg(feature = "facilitator")]
pub mod facilitator;

/// Scheme-specific proof carried in a `PaymentPayload` for `direct-transfer`.
///
/// The declared fields let the receiving side run its cheap checks before
/// touching the chain; the receipt behind `transaction` remains the source of
/// truth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferPayload {
    /// Hash of the transfer transaction.
    pub transaction: TxHash,
    /// The wallet that funded the transfer.
    pub payer: Address,
    /// The token that was transferred.
    pub asset: Address,
    /// The transfer recipient.
    pub pay_to: Address,
    /// The amount transferred, in the token's smallest unit.
    pub value: TokenAmount,
}

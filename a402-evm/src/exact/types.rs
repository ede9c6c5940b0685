//! Wire types for the `exact` payment scheme.
//!
//! An `exact` proof carries an ERC-3009 transfer authorization and the
//! EIP-712 signature over it. The payer never moves tokens itself; the
//! receiving side executes `transferWithAuthorization` on the token contract
//! with these values.

use a402::proto::TokenAmount;
use a402::timestamp::UnixTimestamp;
use alloy_primitives::{Address, B256, Bytes};
#[cfg(any(feature = "client", feature = "facilitator"))]
use alloy_sol_types::sol;
use serde::{Deserialize, Serialize};

use crate::networks::{DEFAULT_EIP712_NAME, DEFAULT_EIP712_VERSION};

/// Scheme-specific proof carried in a `PaymentPayload` for `exact`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExactPayload {
    /// EIP-712 signature over the authorization (65 raw bytes or a 64-byte
    /// ERC-2098 compact form).
    pub signature: Bytes,
    /// The authorization values that were signed.
    pub authorization: Eip3009Authorization,
}

/// The parameters of an ERC-3009 `transferWithAuthorization` call.
///
/// These values are what the payer signs; the verifier rebuilds the same
/// EIP-712 struct from them, so any field drift invalidates the signature.
#[derive(Debug, Copy, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Eip3009Authorization {
    /// The token owner authorizing the transfer.
    pub from: Address,
    /// The recipient of the transfer.
    pub to: Address,
    /// The amount transferred, in the token's smallest unit.
    pub value: TokenAmount,
    /// Not valid before this timestamp (inclusive).
    pub valid_after: UnixTimestamp,
    /// Expires at this timestamp (exclusive).
    pub valid_before: UnixTimestamp,
    /// Unique 32-byte replay-protection nonce.
    pub nonce: B256,
}

#[cfg(any(feature = "client", feature = "facilitator"))]
impl Eip3009Authorization {
    /// Computes the EIP-712 signing hash of this authorization under `domain`.
    ///
    /// Both the signing side and the verifying side derive the hash through
    /// this method, from the same field set.
    #[must_use]
    pub fn signing_hash(&self, domain: &alloy_sol_types::Eip712Domain) -> B256 {
        use alloy_primitives::U256;
        use alloy_sol_types::SolStruct;

        let transfer = TransferWithAuthorization {
            from: self.from,
            to: self.to,
            value: self.value.inner(),
            validAfter: U256::from(self.valid_after.as_secs()),
            validBefore: U256::from(self.valid_before.as_secs()),
            nonce: self.nonce,
        };
        transfer.eip712_signing_hash(domain)
    }
}

/// EIP-712 domain parameters carried in a requirement's `extra` field.
///
/// Defaults to the domain used by current USDC deployments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Eip712Extra {
    /// The token's EIP-712 domain name.
    pub name: String,
    /// The token's EIP-712 domain version.
    pub version: String,
}

impl Default for Eip712Extra {
    fn default() -> Self {
        Self {
            name: DEFAULT_EIP712_NAME.to_owned(),
            version: DEFAULT_EIP712_VERSION.to_owned(),
        }
    }
}

#[cfg(any(feature = "client", feature = "facilitator"))]
sol!(
    /// The ERC-3009 typed-data struct, as defined by EIP-3009.
    ///
    /// Field names and order are fixed by the standard; the EIP-712 type
    /// hash is derived from this exact declaration.
    #[derive(Serialize, Deserialize)]
    struct TransferWithAuthorization {
        address from;
        address to;
        uint256 value;
        uint256 validAfter;
        uint256 validBefore;
        bytes32 nonce;
    }
);

//! Proof signing for the `exact` scheme.
//!
//! [`ExactPayer`] turns a selected payment requirement into a signed
//! ERC-3009 authorization. Signing happens locally against a [`SignerLike`];
//! no chain connectivity is needed to produce a proof.

use std::future::Future;
use std::sync::Arc;

use a402::client::Payer;
use a402::networks::Network;
use a402::proto::{PaymentPayload, PaymentRequirements, Scheme, V1};
use a402::select::ProofCapability;
use a402::timestamp::UnixTimestamp;
use alloy_primitives::{Address, B256, Signature};
use alloy_signer_local::PrivateKeySigner;
use alloy_sol_types::eip712_domain;
use rand::{RngExt, rng};

use super::{Eip3009Authorization, Eip712Extra, ExactPayload};

/// Abstracts hash signing over owned and shared signers.
///
/// Alloy's `Signer` trait is not implemented for `Arc<T>`, but callers often
/// share one signer across tasks; this trait covers both shapes.
pub trait SignerLike: Send + Sync {
    /// Returns the signer's address.
    fn address(&self) -> Address;

    /// Signs the given 32-byte hash.
    fn sign_hash(
        &self,
        hash: &B256,
    ) -> impl Future<Output = Result<Signature, alloy_signer::Error>> + Send;
}

impl SignerLike for PrivateKeySigner {
    fn address(&self) -> Address {
        Self::address(self)
    }

    async fn sign_hash(&self, hash: &B256) -> Result<Signature, alloy_signer::Error> {
        alloy_signer::Signer::sign_hash(self, hash).await
    }
}

impl<T: SignerLike> SignerLike for Arc<T> {
    fn address(&self) -> Address {
        (**self).address()
    }

    async fn sign_hash(&self, hash: &B256) -> Result<Signature, alloy_signer::Error> {
        (**self).sign_hash(hash).await
    }
}

/// Errors produced while building an `exact` proof.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ExactClientError {
    /// The requirement names a network without a known chain id.
    #[error("no chain id known for network {0}")]
    UnknownNetwork(Network),
    /// The signer refused or failed to sign the authorization.
    #[error("signing failed: {0}")]
    Signing(#[from] alloy_signer::Error),
    /// The signed proof could not be encoded as JSON.
    #[error("proof encoding failed: {0}")]
    Encode(#[source] serde_json::Error),
}

/// A payer that signs ERC-3009 transfer authorizations.
#[derive(Debug)]
pub struct ExactPayer<S> {
    signer: S,
}

impl<S> ExactPayer<S> {
    /// Creates a payer around the given signer.
    pub const fn new(signer: S) -> Self {
        Self { signer }
    }
}

impl<S: SignerLike> Payer for ExactPayer<S> {
    type Error = ExactClientError;

    fn capability(&self) -> ProofCapability {
        ProofCapability::SignAuthorization
    }

    async fn pay(
        &self,
        requirement: &PaymentRequirements,
    ) -> Result<PaymentPayload, ExactClientError> {
        let chain_id = requirement
            .network
            .chain_id()
            .ok_or_else(|| ExactClientError::UnknownNetwork(requirement.network.clone()))?;
        let extra = requirement.extra_as::<Eip712Extra>().unwrap_or_default();
        let domain = eip712_domain! {
            name: extra.name,
            version: extra.version,
            chain_id: chain_id,
            verifying_contract: requirement.asset,
        };

        // The authorization window opens at the epoch so the proof is valid
        // the moment it is checked; expiry is bound by the requirement.
        let nonce: [u8; 32] = rng().random();
        let authorization = Eip3009Authorization {
            from: self.signer.address(),
            to: requirement.pay_to,
            value: requirement.max_amount_required,
            valid_after: UnixTimestamp::from_secs(0),
            valid_before: UnixTimestamp::now() + requirement.max_timeout_seconds,
            nonce: B256::from(nonce),
        };

        let hash = authorization.signing_hash(&domain);
        let signature = self.signer.sign_hash(&hash).await?;
        let proof = ExactPayload {
            signature: signature.as_bytes().into(),
            authorization,
        };

        Ok(PaymentPayload {
            x402_version: V1,
            scheme: Scheme::Exact,
            network: requirement.network.clone(),
            payload: serde_json::to_value(proof).map_err(ExactClientError::Encode)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use a402::proto::TokenAmount;
    use alloy_primitives::address;

    fn requirement(network: Network) -> PaymentRequirements {
        PaymentRequirements {
            scheme: Scheme::Exact,
            network,
            max_amount_required: TokenAmount::from(100_000_u64),
            resource: "http://localhost:3000/process".to_owned(),
            description: "Payment for AI agent task processing".to_owned(),
            mime_type: "application/json".to_owned(),
            pay_to: address!("0x1234567890123456789012345678901234567890"),
            max_timeout_seconds: 600,
            asset: address!("0x036CbD53842c5426634e7929541eC2318f3dCF7e"),
            extra: None,
        }
    }

    #[tokio::test]
    async fn test_signed_authorization_recovers_to_signer() {
        let signer = PrivateKeySigner::random();
        let expected = SignerLike::address(&signer);
        let payer = ExactPayer::new(signer);
        let requirement = requirement(Network::BaseSepolia);

        let payment = payer.pay(&requirement).await.unwrap();
        assert_eq!(payment.scheme, Scheme::Exact);
        assert_eq!(payment.network, Network::BaseSepolia);

        let proof: ExactPayload = payment.payload_as().unwrap();
        assert_eq!(proof.authorization.from, expected);
        assert_eq!(proof.authorization.to, requirement.pay_to);
        assert_eq!(proof.authorization.value, requirement.max_amount_required);
        assert_eq!(proof.authorization.valid_after.as_secs(), 0);

        let domain = eip712_domain! {
            name: "USDC",
            version: "2",
            chain_id: 84_532,
            verifying_contract: requirement.asset,
        };
        let hash = proof.authorization.signing_hash(&domain);
        let recovered = Signature::from_raw(&proof.signature)
            .unwrap()
            .recover_address_from_prehash(&hash)
            .unwrap();
        assert_eq!(recovered, expected);
    }

    #[tokio::test]
    async fn test_each_proof_gets_a_fresh_nonce() {
        let payer = ExactPayer::new(PrivateKeySigner::random());
        let requirement = requirement(Network::BaseSepolia);

        let first: ExactPayload = payer
            .pay(&requirement)
            .await
            .unwrap()
            .payload_as()
            .unwrap();
        let second: ExactPayload = payer
            .pay(&requirement)
            .await
            .unwrap()
            .payload_as()
            .unwrap();
        assert_ne!(first.authorization.nonce, second.authorization.nonce);
    }

    #[test]
    fn test_nonce_sampling_produces_no_collisions() {
        let mut seen = std::collections::HashSet::new();
        for _ in 0..10_000 {
            let nonce: [u8; 32] = rng().random();
            assert!(seen.insert(nonce), "nonce collision");
        }
    }

    #[tokio::test]
    async fn test_unknown_network_is_refused() {
        let payer = ExactPayer::new(PrivateKeySigner::random());
        let requirement = requirement(Network::Other("gnosis".to_owned()));

        let err = payer.pay(&requirement).await.unwrap_err();
        assert!(matches!(err, ExactClientError::UnknownNetwork(_)));
    }
}

//! Chain-backed verification and settlement.
//!
//! [`LocalFacilitator`] implements the facilitator contract directly against
//! a chain RPC instead of delegating to a remote facilitator service. It
//! serves exactly one network; proofs for any other network come back as
//! unsupported rather than being proxied.

use a402::facilitator::Facilitator;
use a402::networks::Network;
use a402::proto::{
    ErrorReason, PaymentPayload, PaymentRequirements, PaymentVerificationError, Scheme,
    SettleRequest, SettleResponse, VerifyRequest, VerifyResponse,
};
use alloy_network::EthereumWallet;
use alloy_primitives::TxHash;
use alloy_provider::{DynProvider, Provider, ProviderBuilder};
use alloy_signer_local::PrivateKeySigner;
#[cfg(feature = "telemetry")]
use tracing::instrument;

use crate::exact::{self, ExactPayload};
use crate::transfer::{self, TransferPayload};

/// Errors raised while checking or executing a payment on-chain.
///
/// Only the transport-shaped variants surface to callers of the facilitator
/// trait; proof failures are folded into invalid verify and settle responses.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum EvmFacilitatorError {
    /// RPC transport error.
    #[error(transparent)]
    Transport(#[from] alloy_transport::TransportError),
    /// Waiting for a transaction receipt failed.
    #[error(transparent)]
    PendingTransaction(#[from] alloy_provider::PendingTransactionError),
    /// The settlement transaction was included but reverted.
    #[error("transaction {0} reverted")]
    TransactionReverted(TxHash),
    /// A contract call failed for a non-transport reason.
    #[error("contract call failed: {0}")]
    ContractCall(String),
    /// The proof failed a verification check.
    #[error(transparent)]
    PaymentVerification(#[from] PaymentVerificationError),
}

impl From<alloy_contract::Error> for EvmFacilitatorError {
    fn from(e: alloy_contract::Error) -> Self {
        match e {
            alloy_contract::Error::TransportError(e) => Self::Transport(e),
            alloy_contract::Error::PendingTransactionError(e) => Self::PendingTransaction(e),
            other => Self::ContractCall(other.to_string()),
        }
    }
}

/// Verifies and settles payments directly against a chain RPC.
pub struct LocalFacilitator {
    provider: DynProvider,
    network: Network,
}

impl std::fmt::Debug for LocalFacilitator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalFacilitator")
            .field("network", &self.network)
            .finish_non_exhaustive()
    }
}

impl LocalFacilitator {
    /// Creates a facilitator over an existing provider.
    ///
    /// For settlement the provider must carry a wallet able to pay gas;
    /// [`LocalFacilitator::connect`] builds such a provider from a key.
    #[must_use]
    pub const fn new(provider: DynProvider, network: Network) -> Self {
        Self { provider, network }
    }

    /// Connects to `rpc_url` with a wallet around `signer`.
    ///
    /// # Errors
    ///
    /// Returns a transport error when the endpoint cannot be reached or the
    /// URL is not understood.
    pub async fn connect(
        network: Network,
        rpc_url: &str,
        signer: PrivateKeySigner,
    ) -> Result<Self, EvmFacilitatorError> {
        let wallet = EthereumWallet::from(signer);
        let provider = ProviderBuilder::new()
            .wallet(wallet)
            .connect(rpc_url)
            .await?
            .erased();
        Ok(Self::new(provider, network))
    }

    /// The network this facilitator serves.
    #[must_use]
    pub const fn network(&self) -> &Network {
        &self.network
    }

    /// Requirement-level checks shared by verification and settlement.
    fn mismatch(
        &self,
        payment: &PaymentPayload,
        requirements: &PaymentRequirements,
    ) -> Option<ErrorReason> {
        if payment.scheme != requirements.scheme {
            return Some(ErrorReason::SchemeMismatch);
        }
        if payment.network != requirements.network {
            return Some(ErrorReason::NetworkMismatch);
        }
        if requirements.network != self.network {
            return Some(ErrorReason::UnsupportedNetwork);
        }
        None
    }
}

impl Facilitator for LocalFacilitator {
    type Error = EvmFacilitatorError;

    #[cfg_attr(feature = "telemetry", instrument(skip_all, err))]
    async fn verify(&self, request: &VerifyRequest) -> Result<VerifyResponse, Self::Error> {
        let payment = &request.payment;
        let requirements = &request.requirements;
        if let Some(reason) = self.mismatch(payment, requirements) {
            return Ok(VerifyResponse::invalid(None, reason));
        }
        match &requirements.scheme {
            Scheme::Exact => {
                let proof: ExactPayload = match payment.payload_as() {
                    Ok(proof) => proof,
                    Err(e) => {
                        return Ok(VerifyResponse::invalid(
                            None,
                            PaymentVerificationError::from(e).reason(),
                        ));
                    }
                };
                let payer = proof.authorization.from.to_string();
                match exact::facilitator::verify_payment(&self.provider, &proof, requirements)
                    .await
                {
                    Ok(()) => Ok(VerifyResponse::valid(payer)),
                    Err(EvmFacilitatorError::PaymentVerification(e)) => {
                        Ok(VerifyResponse::invalid(Some(payer), e.reason()))
                    }
                    Err(e) => Err(e),
                }
            }
            Scheme::DirectTransfer => {
                let proof: TransferPayload = match payment.payload_as() {
                    Ok(proof) => proof,
                    Err(e) => {
                        return Ok(VerifyResponse::invalid(
                            None,
                            PaymentVerificationError::from(e).reason(),
                        ));
                    }
                };
                let payer = proof.payer.to_string();
                match transfer::facilitator::verify_transfer(&self.provider, &proof, requirements)
                    .await
                {
                    Ok(()) => Ok(VerifyResponse::valid(payer)),
                    Err(EvmFacilitatorError::PaymentVerification(e)) => {
                        Ok(VerifyResponse::invalid(Some(payer), e.reason()))
                    }
                    Err(e) => Err(e),
                }
            }
            Scheme::Other(_) => Ok(VerifyResponse::invalid(
                None,
                ErrorReason::UnsupportedScheme,
            )),
        }
    }

    #[cfg_attr(feature = "telemetry", instrument(skip_all, err))]
    async fn settle(&self, request: &SettleRequest) -> Result<SettleResponse, Self::Error> {
        let payment = &request.payment;
        let requirements = &request.requirements;
        let network = requirements.network.clone();
        if let Some(reason) = self.mismatch(payment, requirements) {
            return Ok(SettleResponse::error(reason, Some(network)));
        }
        match &requirements.scheme {
            Scheme::Exact => {
                let proof: ExactPayload = match payment.payload_as() {
                    Ok(proof) => proof,
                    Err(e) => {
                        return Ok(SettleResponse::error(
                            PaymentVerificationError::from(e).reason(),
                            Some(network),
                        ));
                    }
                };
                let payer = proof.authorization.from.to_string();
                match exact::facilitator::settle_payment(&self.provider, &proof, requirements)
                    .await
                {
                    Ok(tx) => Ok(SettleResponse::success(
                        Some(payer),
                        tx.to_string(),
                        network,
                    )),
                    Err(EvmFacilitatorError::PaymentVerification(e)) => {
                        Ok(SettleResponse::error(e.reason(), Some(network)))
                    }
                    Err(EvmFacilitatorError::TransactionReverted(_)) => Ok(SettleResponse::error(
                        ErrorReason::TransactionFailed,
                        Some(network),
                    )),
                    Err(e) => Err(e),
                }
            }
            Scheme::DirectTransfer => {
                let proof: TransferPayload = match payment.payload_as() {
                    Ok(proof) => proof,
                    Err(e) => {
                        return Ok(SettleResponse::error(
                            PaymentVerificationError::from(e).reason(),
                            Some(network),
                        ));
                    }
                };
                // The transfer already happened on-chain; settlement re-checks
                // the receipt and reports the existing transaction.
                match transfer::facilitator::verify_transfer(&self.provider, &proof, requirements)
                    .await
                {
                    Ok(()) => Ok(SettleResponse::success(
                        Some(proof.payer.to_string()),
                        proof.transaction.to_string(),
                        network,
                    )),
                    Err(EvmFacilitatorError::PaymentVerification(e)) => {
                        Ok(SettleResponse::error(e.reason(), Some(network)))
                    }
                    Err(e) => Err(e),
                }
            }
            Scheme::Other(_) => Ok(SettleResponse::error(
                ErrorReason::UnsupportedScheme,
                Some(network),
            )),
        }
    }
}

//! Proof construction for the `direct-transfer` scheme.
//!
//! [`TransferPayer`] satisfies a requirement by moving the tokens before the
//! call is resubmitted: it asks its [`TransferWallet`] for an ERC-20 transfer
//! and embeds the confirmed transaction hash in the proof. A wallet that
//! cannot report a hash cannot produce a proof.

use std::future::Future;

use a402::client::Payer;
use a402::proto::{PaymentPayload, PaymentRequirements, Scheme, V1};
use a402::select::ProofCapability;
use alloy_network::EthereumWallet;
use alloy_primitives::{Address, TxHash, U256};
use alloy_provider::{DynProvider, Provider, ProviderBuilder};
use alloy_signer_local::PrivateKeySigner;
use alloy_sol_types::sol;

use super::TransferPayload;

/// A wallet able to move tokens and report the resulting transaction.
///
/// Implementations may hold a key and talk to a chain RPC directly, like
/// [`RpcWallet`], or delegate to a custodial wallet API; the payer only needs
/// the funding address and a confirmed transaction hash back.
pub trait TransferWallet: Send + Sync {
    /// Error reported when the transfer cannot be confirmed.
    type Error: std::error::Error + Send + Sync + 'static;

    /// The wallet's funding address.
    fn address(&self) -> Address;

    /// Submits a token transfer and resolves once it is confirmed.
    fn transfer(
        &self,
        asset: Address,
        to: Address,
        value: U256,
    ) -> impl Future<Output = Result<TxHash, Self::Error>> + Send;
}

/// Errors produced while building a `direct-transfer` proof.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum TransferClientError {
    /// The wallet failed to produce a confirmed transfer.
    #[error("transfer submission failed: {0}")]
    Wallet(#[source] Box<dyn std::error::Error + Send + Sync>),
    /// The proof could not be encoded as JSON.
    #[error("proof encoding failed: {0}")]
    Encode(#[source] serde_json::Error),
}

/// A payer that settles up front by broadcasting the transfer itself.
#[derive(Debug)]
pub struct TransferPayer<W> {
    wallet: W,
}

impl<W> TransferPayer<W> {
    /// Creates a payer around the given wallet.
    pub const fn new(wallet: W) -> Self {
        Self { wallet }
    }
}

impl<W: TransferWallet> Payer for TransferPayer<W> {
    type Error = TransferClientError;

    fn capability(&self) -> ProofCapability {
        ProofCapability::SubmitTransfer
    }

    async fn pay(
        &self,
        requirement: &PaymentRequirements,
    ) -> Result<PaymentPayload, TransferClientError> {
        let transaction = self
            .wallet
            .transfer(
                requirement.asset,
                requirement.pay_to,
                requirement.max_amount_required.inner(),
            )
            .await
            .map_err(|e| TransferClientError::Wallet(Box::new(e)))?;

        let proof = TransferPayload {
            transaction,
            payer: self.wallet.address(),
            asset: requirement.asset,
            pay_to: requirement.pay_to,
            value: requirement.max_amount_required,
        };
        Ok(PaymentPayload {
            x402_version: V1,
            scheme: Scheme::DirectTransfer,
            network: requirement.network.clone(),
            payload: serde_json::to_value(proof).map_err(TransferClientError::Encode)?,
        })
    }
}

sol! {
    #[allow(missing_docs)]
    #[sol(rpc)]
    interface IErc20 {
        function transfer(address to, uint256 amount) external returns (bool);
    }
}

/// Errors raised by [`RpcWallet`] while submitting a transfer.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum RpcWalletError {
    /// RPC transport error.
    #[error(transparent)]
    Transport(#[from] alloy_transport::TransportError),
    /// Waiting for the transfer receipt failed.
    #[error(transparent)]
    PendingTransaction(#[from] alloy_provider::PendingTransactionError),
    /// The transfer was included but reverted.
    #[error("transaction {0} reverted")]
    TransactionReverted(TxHash),
    /// A contract call failed for a non-transport reason.
    #[error("contract call failed: {0}")]
    ContractCall(String),
}

impl From<alloy_contract::Error> for RpcWalletError {
    fn from(e: alloy_contract::Error) -> Self {
        match e {
            alloy_contract::Error::TransportError(e) => Self::Transport(e),
            alloy_contract::Error::PendingTransactionError(e) => Self::PendingTransaction(e),
            other => Self::ContractCall(other.to_string()),
        }
    }
}

/// A [`TransferWallet`] that signs and broadcasts transfers over a chain RPC.
pub struct RpcWallet {
    provider: DynProvider,
    address: Address,
}

impl std::fmt::Debug for RpcWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcWallet")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

impl RpcWallet {
    /// Connects to `rpc_url` with a wallet around `signer`.
    ///
    /// # Errors
    ///
    /// Returns a transport error when the endpoint cannot be reached or the
    /// URL is not understood.
    pub async fn connect(rpc_url: &str, signer: PrivateKeySigner) -> Result<Self, RpcWalletError> {
        let address = signer.address();
        let wallet = EthereumWallet::from(signer);
        let provider = ProviderBuilder::new()
            .wallet(wallet)
            .connect(rpc_url)
            .await?
            .erased();
        Ok(Self { provider, address })
    }
}

impl TransferWallet for RpcWallet {
    type Error = RpcWalletError;

    fn address(&self) -> Address {
        self.address
    }

    async fn transfer(
        &self,
        asset: Address,
        to: Address,
        value: U256,
    ) -> Result<TxHash, RpcWalletError> {
        let contract = IErc20::new(asset, &self.provider);
        let pending = contract.transfer(to, value).send().await?;
        let receipt = pending.get_receipt().await?;
        if receipt.status() {
            Ok(receipt.transaction_hash)
        } else {
            Err(RpcWalletError::TransactionReverted(
                receipt.transaction_hash,
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use a402::networks::Network;
    use a402::proto::TokenAmount;
    use alloy_primitives::{address, b256};

    const TX: TxHash =
        b256!("0x2222222222222222222222222222222222222222222222222222222222222222");

    struct FixedWallet;

    impl TransferWallet for FixedWallet {
        type Error = RpcWalletError;

        fn address(&self) -> Address {
            address!("0x70997970C51812dc3A010C7d01b50e0d17dc79C8")
        }

        async fn transfer(
            &self,
            _asset: Address,
            _to: Address,
            _value: U256,
        ) -> Result<TxHash, RpcWalletError> {
            Ok(TX)
        }
    }

    struct BrokeWallet;

    impl TransferWallet for BrokeWallet {
        type Error = RpcWalletError;

        fn address(&self) -> Address {
            Address::ZERO
        }

        async fn transfer(
            &self,
            _asset: Address,
            _to: Address,
            _value: U256,
        ) -> Result<TxHash, RpcWalletError> {
            Err(RpcWalletError::TransactionReverted(TX))
        }
    }

    fn requirement() -> PaymentRequirements {
        PaymentRequirements {
            scheme: Scheme::DirectTransfer,
            network: Network::BaseSepolia,
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
    async fn test_proof_carries_the_confirmed_transaction() {
        let payer = TransferPayer::new(FixedWallet);
        let requirement = requirement();

        let payment = payer.pay(&requirement).await.unwrap();
        assert_eq!(payment.scheme, Scheme::DirectTransfer);
        assert_eq!(payment.network, Network::BaseSepolia);

        let proof: TransferPayload = payment.payload_as().unwrap();
        assert_eq!(proof.transaction, TX);
        assert_eq!(proof.payer, FixedWallet.address());
        assert_eq!(proof.pay_to, requirement.pay_to);
        assert_eq!(proof.value, requirement.max_amount_required);
    }

    #[tokio::test]
    async fn test_failed_transfer_yields_no_proof() {
        let payer = TransferPayer::new(BrokeWallet);
        let err = payer.pay(&requirement()).await.unwrap_err();
        assert!(matches!(err, TransferClientError::Wallet(_)));
    }

    #[test]
    fn test_capability_is_submit_transfer() {
        assert_eq!(
            TransferPayer::new(FixedWallet).capability(),
            ProofCapability::SubmitTransfer
        );
    }
}

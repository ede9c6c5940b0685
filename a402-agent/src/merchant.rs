//! The merchant side of the payment exchange.
//!
//! A [`Merchant`] advertises fresh payment requirements for every request,
//! checks submitted proofs against what it advertised, and finalizes
//! verified payments through its settlement backend. The backend is chosen
//! once at startup: a remote facilitator or direct chain access.

use a402::facilitator::Facilitator;
use a402::networks::Network;
use a402::proto::{
    ErrorReason, PaymentPayload, PaymentRequired, PaymentRequirements, Scheme, SettleRequest,
    SettleResponse, TokenAmount, VerifyRequest, VerifyResponse,
};
use a402_evm::{DEFAULT_EIP712_NAME, DEFAULT_EIP712_VERSION, LocalFacilitator};
use a402_http::FacilitatorClient;
use alloy_primitives::Address;

/// Validity window advertised for signed authorizations, in seconds.
const MAX_TIMEOUT_SECONDS: u64 = 600;

/// Where verified payments are executed.
#[derive(Debug)]
pub enum SettlementBackend {
    /// Delegate to a remote facilitator service over HTTP.
    Facilitator(FacilitatorClient),
    /// Verify and settle directly against a chain RPC.
    Direct(LocalFacilitator),
}

/// Infrastructure failure from whichever backend is configured.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The remote facilitator could not be reached or answered garbage.
    #[error(transparent)]
    Facilitator(#[from] a402_http::FacilitatorClientError),
    /// The chain RPC could not be reached or the call failed.
    #[error(transparent)]
    Chain(#[from] a402_evm::EvmFacilitatorError),
}

impl SettlementBackend {
    async fn verify(&self, request: &VerifyRequest) -> Result<VerifyResponse, BackendError> {
        match self {
            Self::Facilitator(client) => Ok(client.verify(request).await?),
            Self::Direct(facilitator) => Ok(facilitator.verify(request).await?),
        }
    }

    async fn settle(&self, request: &SettleRequest) -> Result<SettleResponse, BackendError> {
        match self {
            Self::Facilitator(client) => Ok(client.settle(request).await?),
            Self::Direct(facilitator) => Ok(facilitator.settle(request).await?),
        }
    }
}

/// Advertises, verifies, and settles payments for one priced resource.
#[derive(Debug)]
pub struct Merchant {
    pay_to: Address,
    network: Network,
    asset: Address,
    amount: TokenAmount,
    resource: String,
    backend: SettlementBackend,
}

impl Merchant {
    /// Creates a merchant charging `amount` of `asset` per request.
    #[must_use]
    pub const fn new(
        pay_to: Address,
        network: Network,
        asset: Address,
        amount: TokenAmount,
        resource: String,
        backend: SettlementBackend,
    ) -> Self {
        Self {
            pay_to,
            network,
            asset,
            amount,
            resource,
            backend,
        }
    }

    /// The payout address.
    #[must_use]
    pub const fn pay_to(&self) -> Address {
        self.pay_to
    }

    /// The network payments are accepted on.
    #[must_use]
    pub const fn network(&self) -> &Network {
        &self.network
    }

    /// Builds the payment-required envelope advertised to unpaid callers.
    ///
    /// Both schemes are offered: a signed authorization the merchant
    /// executes, and a transfer the caller broadcasts itself. Preference
    /// order on the caller side follows the listing order.
    #[must_use]
    pub fn payment_required(&self) -> PaymentRequired {
        let base = PaymentRequirements {
            scheme: Scheme::Exact,
            network: self.network.clone(),
            max_amount_required: self.amount,
            resource: self.resource.clone(),
            description: "Payment for AI agent task processing".to_owned(),
            mime_type: "application/json".to_owned(),
            pay_to: self.pay_to,
            max_timeout_seconds: MAX_TIMEOUT_SECONDS,
            asset: self.asset,
            extra: Some(serde_json::json!({
                "name": DEFAULT_EIP712_NAME,
                "version": DEFAULT_EIP712_VERSION,
            })),
        };
        let transfer = PaymentRequirements {
            scheme: Scheme::DirectTransfer,
            extra: None,
            ..base.clone()
        };
        PaymentRequired::new(vec![base, transfer])
    }

    /// Checks a submitted proof against the advertised requirements.
    ///
    /// Proofs referencing a scheme or network the merchant never advertised
    /// are rejected locally; everything else is the backend's verdict. A
    /// backend that cannot be reached yields an invalid response with a
    /// transport reason rather than a pass.
    pub async fn verify_payment(&self, payment: &PaymentPayload) -> VerifyResponse {
        let requirements = match self.match_requirement(payment) {
            Ok(requirements) => requirements,
            Err(reason) => return VerifyResponse::invalid(None, reason),
        };
        let request = VerifyRequest {
            payment: payment.clone(),
            requirements,
        };
        match self.backend.verify(&request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(error = %e, "payment verification backend unreachable");
                VerifyResponse::invalid(None, ErrorReason::TransportError)
            }
        }
    }

    /// Executes a verified payment through the backend.
    ///
    /// Failures come back as unsuccessful settle responses; the caller
    /// decides what a failed settlement means for the already-executed work.
    pub async fn settle_payment(&self, payment: &PaymentPayload) -> SettleResponse {
        let network = Some(self.network.clone());
        let requirements = match self.match_requirement(payment) {
            Ok(requirements) => requirements,
            Err(reason) => return SettleResponse::error(reason, network),
        };
        let request = SettleRequest {
            payment: payment.clone(),
            requirements,
        };
        match self.backend.settle(&request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(error = %e, "payment settlement backend unreachable");
                SettleResponse::error(ErrorReason::TransportError, network)
            }
        }
    }

    /// Finds the advertised requirement a proof claims to satisfy.
    fn match_requirement(&self, payment: &PaymentPayload) -> Result<PaymentRequirements, ErrorReason> {
        let accepts = self.payment_required().accepts;
        let Some(requirement) = accepts
            .into_iter()
            .find(|r| r.scheme == payment.scheme)
        else {
            return Err(ErrorReason::UnsupportedScheme);
        };
        if requirement.network != payment.network {
            return Err(ErrorReason::NetworkMismatch);
        }
        Ok(requirement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use a402::proto::V1;
    use alloy_primitives::address;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn merchant(facilitator_url: &str) -> Merchant {
        Merchant::new(
            address!("0x1234567890123456789012345678901234567890"),
            Network::BaseSepolia,
            address!("0x036CbD53842c5426634e7929541eC2318f3dCF7e"),
            TokenAmount::from(100_000_u64),
            "http://localhost:3000/process".to_owned(),
            SettlementBackend::Facilitator(FacilitatorClient::try_from(facilitator_url).unwrap()),
        )
    }

    fn payment(scheme: Scheme, network: Network) -> PaymentPayload {
        PaymentPayload {
            x402_version: V1,
            scheme,
            network,
            payload: json!({}),
        }
    }

    #[test]
    fn test_envelope_advertises_both_schemes() {
        let envelope = merchant("http://127.0.0.1:9").payment_required();
        assert_eq!(envelope.accepts.len(), 2);
        assert_eq!(envelope.accepts[0].scheme, Scheme::Exact);
        assert_eq!(envelope.accepts[1].scheme, Scheme::DirectTransfer);
        assert_eq!(
            envelope.accepts[0].max_amount_required,
            TokenAmount::from(100_000_u64)
        );
        assert_eq!(envelope.accepts[0].extra.as_ref().unwrap()["name"], "USDC");
        assert!(envelope.accepts[1].extra.is_none());
    }

    #[tokio::test]
    async fn test_unadvertised_scheme_is_rejected_locally() {
        let merchant = merchant("http://127.0.0.1:9");
        let response = merchant
            .verify_payment(&payment(
                Scheme::Other("barter".to_owned()),
                Network::BaseSepolia,
            ))
            .await;
        assert_eq!(response.invalid_reason(), Some("unsupported_scheme"));
    }

    #[tokio::test]
    async fn test_unadvertised_network_is_rejected_locally() {
        let merchant = merchant("http://127.0.0.1:9");
        let response = merchant
            .verify_payment(&payment(Scheme::Exact, Network::Polygon))
            .await;
        assert_eq!(response.invalid_reason(), Some("network_mismatch"));
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_not_a_pass() {
        let merchant = merchant("http://127.0.0.1:9");
        let response = merchant
            .verify_payment(&payment(Scheme::Exact, Network::BaseSepolia))
            .await;
        assert!(!response.is_valid());
        assert_eq!(response.invalid_reason(), Some("transport_error"));
    }

    #[tokio::test]
    async fn test_verification_is_idempotent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/verify"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "isValid": true,
                "payer": "0x70997970C51812dc3A010C7d01b50e0d17dc79C8"
            })))
            .expect(2)
            .mount(&server)
            .await;

        let merchant = merchant(&server.uri());
        let payment = payment(Scheme::Exact, Network::BaseSepolia);
        let first = merchant.verify_payment(&payment).await;
        let second = merchant.verify_payment(&payment).await;
        assert!(first.is_valid());
        assert_eq!(first.payer(), second.payer());
    }

    #[tokio::test]
    async fn test_unreachable_backend_fails_settlement() {
        let merchant = merchant("http://127.0.0.1:9");
        let response = merchant
            .settle_payment(&payment(Scheme::Exact, Network::BaseSepolia))
            .await;
        assert!(!response.is_success());
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["errorReason"], "transport_error");
        assert_eq!(json["network"], "base-sepolia");
    }
}

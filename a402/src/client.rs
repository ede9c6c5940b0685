//! Outbound payment negotiation for calling paid agents.
//!
//! When a call comes back paused with a [`PaymentRequired`] envelope, the
//! caller selects one requirement it can satisfy, asks its [`Payer`] for a
//! proof, and resubmits the call with the proof attached to the message
//! metadata. The HTTP driving of the two legs lives elsewhere; this module
//! is the transport-agnostic negotiation core.

use std::future::Future;

use crate::proto::{PaymentPayload, PaymentRequired, PaymentRequirements};
use crate::select::{ProofCapability, SelectionError, select_requirement};
use crate::task::{Message, PAYMENT_PAYLOAD_KEY, PAYMENT_STATUS_KEY, PaymentStatus};

/// Produces payment proofs on behalf of a caller.
///
/// A payer wraps exactly one wallet capability: either it signs EIP-3009
/// authorizations or it submits on-chain transfers. [`Payer::capability`]
/// drives requirement selection; [`Payer::pay`] is only ever invoked with a
/// requirement the payer selected.
pub trait Payer: Send + Sync {
    /// Error produced when proof construction fails.
    type Error: std::error::Error + Send + Sync + 'static;

    /// The kind of proof this payer can produce.
    fn capability(&self) -> ProofCapability;

    /// Produces a payment proof satisfying the given requirement.
    fn pay(
        &self,
        requirement: &PaymentRequirements,
    ) -> impl Future<Output = Result<PaymentPayload, Self::Error>> + Send;
}

/// Errors produced while negotiating a payment.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum NegotiationError<E> {
    /// No acceptable requirement could be selected.
    #[error(transparent)]
    Selection(#[from] SelectionError),
    /// The payer failed to produce a proof.
    #[error("payment failed: {0}")]
    Payment(E),
}

/// Selects a requirement from the envelope and produces a proof for it.
///
/// # Errors
///
/// Returns [`NegotiationError::Selection`] when the envelope offers nothing
/// the payer can satisfy, and [`NegotiationError::Payment`] when proof
/// construction fails.
pub async fn negotiate_payment<P: Payer>(
    payer: &P,
    envelope: &PaymentRequired,
) -> Result<PaymentPayload, NegotiationError<P::Error>> {
    let requirement = select_requirement(&envelope.accepts, payer.capability())?;
    payer
        .pay(requirement)
        .await
        .map_err(NegotiationError::Payment)
}

/// Attaches a payment proof to an outgoing message.
///
/// Stamps the proof and the `payment-submitted` status into the message
/// metadata, the shape a merchant looks for when resuming a paused task.
///
/// # Errors
///
/// Returns an encoding error if the proof cannot be represented as JSON.
pub fn attach_payment(
    message: &mut Message,
    payload: &PaymentPayload,
) -> Result<(), serde_json::Error> {
    message.insert_metadata(PAYMENT_PAYLOAD_KEY, serde_json::to_value(payload)?);
    message.insert_metadata(
        PAYMENT_STATUS_KEY,
        PaymentStatus::PaymentSubmitted.as_str().into(),
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::networks::Network;
    use crate::proto::{Scheme, TokenAmount, V1};
    use alloy_primitives::address;

    struct TransferOnlyPayer;

    #[derive(Debug, thiserror::Error)]
    #[error("payer offline")]
    struct PayerOffline;

    impl Payer for TransferOnlyPayer {
        type Error = PayerOffline;

        fn capability(&self) -> ProofCapability {
            ProofCapability::SubmitTransfer
        }

        async fn pay(
            &self,
            requirement: &PaymentRequirements,
        ) -> Result<PaymentPayload, Self::Error> {
            Ok(PaymentPayload {
                x402_version: V1,
                scheme: requirement.scheme.clone(),
                network: requirement.network.clone(),
                payload: serde_json::json!({"transaction": "0xabc"}),
            })
        }
    }

    fn requirement(scheme: Scheme) -> PaymentRequirements {
        PaymentRequirements {
            scheme,
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
    async fn test_negotiate_produces_proof_for_selected_requirement() {
        let envelope = PaymentRequired::new(vec![
            requirement(Scheme::Exact),
            requirement(Scheme::DirectTransfer),
        ]);
        let payload = negotiate_payment(&TransferOnlyPayer, &envelope)
            .await
            .unwrap();
        assert_eq!(payload.scheme, Scheme::DirectTransfer);
    }

    #[tokio::test]
    async fn test_negotiate_refuses_capability_mismatch() {
        let envelope = PaymentRequired::new(vec![requirement(Scheme::Exact)]);
        let result = negotiate_payment(&TransferOnlyPayer, &envelope).await;
        assert!(matches!(result, Err(NegotiationError::Selection(_))));
    }

    #[tokio::test]
    async fn test_attach_payment_stamps_submission_metadata() {
        let envelope = PaymentRequired::new(vec![requirement(Scheme::DirectTransfer)]);
        let payload = negotiate_payment(&TransferOnlyPayer, &envelope)
            .await
            .unwrap();

        let mut message = Message::user("resume");
        attach_payment(&mut message, &payload).unwrap();

        assert_eq!(
            message.payment_status(),
            Some(PaymentStatus::PaymentSubmitted)
        );
        assert_eq!(message.payment_payload().unwrap(), payload);
    }
}

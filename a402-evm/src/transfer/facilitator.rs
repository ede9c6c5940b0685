//! Receipt verification for the `direct-transfer` scheme.
//!
//! The proof's declared fields are checked first; only then is the receipt
//! fetched and searched for a matching ERC-20 `Transfer` event on the
//! required token. A receipt that moved the wrong token, the wrong amount, or
//! to the wrong recipient does not pay for anything.

use a402::proto::{PaymentRequirements, PaymentVerificationError};
use alloy_provider::Provider;
use alloy_sol_types::{SolEvent, sol};
#[cfg(feature = "telemetry")]
use tracing::instrument;

use super::TransferPayload;
use crate::facilitator::EvmFacilitatorError;

sol! {
    /// The ERC-20 `Transfer` event, matched against receipt logs.
    #[allow(missing_docs)]
    event Transfer(address indexed from, address indexed to, uint256 value);
}

/// Checks the proof's declared fields against the requirements.
///
/// Runs before any chain access; a proof that disagrees with the requirements
/// never costs an RPC round trip.
fn assert_requirements(
    proof: &TransferPayload,
    requirements: &PaymentRequirements,
) -> Result<(), PaymentVerificationError> {
    if proof.asset != requirements.asset {
        return Err(PaymentVerificationError::AssetMismatch);
    }
    if proof.pay_to != requirements.pay_to {
        return Err(PaymentVerificationError::RecipientMismatch);
    }
    if proof.value.inner() < requirements.max_amount_required.inner() {
        return Err(PaymentVerificationError::InvalidPaymentAmount);
    }
    Ok(())
}

/// Confirms that the referenced transaction really moved the required tokens.
///
/// # Errors
///
/// Returns [`EvmFacilitatorError::PaymentVerification`] for proof defects,
/// including a missing or reverted transaction, and a transport-shaped error
/// when the receipt query fails.
#[cfg_attr(feature = "telemetry", instrument(skip_all, err))]
pub(crate) async fn verify_transfer<P: Provider>(
    provider: &P,
    proof: &TransferPayload,
    requirements: &PaymentRequirements,
) -> Result<(), EvmFacilitatorError> {
    assert_requirements(proof, requirements)?;

    let receipt = provider
        .get_transaction_receipt(proof.transaction)
        .await?
        .ok_or(PaymentVerificationError::TransactionNotFound)?;
    if !receipt.status() {
        return Err(
            PaymentVerificationError::TransactionFailed("transaction reverted".to_owned()).into(),
        );
    }

    let logs = receipt
        .inner
        .as_receipt()
        .map_or(&[][..], |r| r.logs.as_slice());
    let moved = logs
        .iter()
        .filter(|log| log.address() == requirements.asset)
        .filter_map(|log| Transfer::decode_log(&log.inner).ok())
        .any(|event| {
            event.data.from == proof.payer
                && event.data.to == requirements.pay_to
                && event.data.value >= requirements.max_amount_required.inner()
        });
    if moved {
        Ok(())
    } else {
        Err(PaymentVerificationError::TransactionFailed(
            "no matching token transfer in the receipt".to_owned(),
        )
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use a402::networks::Network;
    use a402::proto::{Scheme, TokenAmount};
    use alloy_primitives::{address, b256};

    fn requirements() -> PaymentRequirements {
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

    fn proof() -> TransferPayload {
        TransferPayload {
            transaction: b256!(
                "0x2222222222222222222222222222222222222222222222222222222222222222"
            ),
            payer: address!("0x70997970C51812dc3A010C7d01b50e0d17dc79C8"),
            asset: address!("0x036CbD53842c5426634e7929541eC2318f3dCF7e"),
            pay_to: address!("0x1234567890123456789012345678901234567890"),
            value: TokenAmount::from(100_000_u64),
        }
    }

    #[test]
    fn test_matching_proof_passes_the_static_checks() {
        assert_requirements(&proof(), &requirements()).unwrap();
    }

    #[test]
    fn test_wrong_token_is_rejected() {
        let mut proof = proof();
        proof.asset = address!("0x00000000000000000000000000000000deadbeef");
        let err = assert_requirements(&proof, &requirements()).unwrap_err();
        assert!(matches!(err, PaymentVerificationError::AssetMismatch));
    }

    #[test]
    fn test_wrong_recipient_is_rejected() {
        let mut proof = proof();
        proof.pay_to = address!("0x00000000000000000000000000000000deadbeef");
        let err = assert_requirements(&proof, &requirements()).unwrap_err();
        assert!(matches!(err, PaymentVerificationError::RecipientMismatch));
    }

    #[test]
    fn test_underpaying_transfer_is_rejected() {
        let mut proof = proof();
        proof.value = TokenAmount::from(99_999_u64);
        let err = assert_requirements(&proof, &requirements()).unwrap_err();
        assert!(matches!(
            err,
            PaymentVerificationError::InvalidPaymentAmount
        ));
    }
}

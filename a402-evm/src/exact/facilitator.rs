//! Verification and settlement of `exact` proofs against a chain RPC.
//!
//! Verification is free of side effects: it replays the requirement checks,
//! recovers the EIP-712 signer, and confirms the payer holds enough tokens.
//! Settlement is the only step that spends gas; it executes the signed
//! authorization through `transferWithAuthorization` and waits for the
//! receipt.

use a402::proto::{PaymentRequirements, PaymentVerificationError};
use a402::timestamp::UnixTimestamp;
use alloy_primitives::{Address, Signature, TxHash, U256};
use alloy_provider::Provider;
use alloy_sol_types::{Eip712Domain, eip712_domain, sol};
#[cfg(feature = "telemetry")]
use tracing::instrument;

use super::{Eip712Extra, ExactPayload};
use crate::facilitator::EvmFacilitatorError;

sol! {
    /// The ERC-3009 surface this module calls on USDC-style tokens.
    ///
    /// Only the bytes-signature `transferWithAuthorization` overload is
    /// declared; proofs carry packed signatures, so the (v, r, s) overload is
    /// never needed.
    #[allow(missing_docs)]
    #[sol(rpc)]
    interface IEip3009 {
        function balanceOf(address account) external view returns (uint256);
        function transferWithAuthorization(
            address from,
            address to,
            uint256 value,
            uint256 validAfter,
            uint256 validBefore,
            bytes32 nonce,
            bytes signature
        ) external;
    }
}

/// Grace buffer subtracted from the expiry, covering settlement latency.
const EXPIRY_GRACE_SECS: u64 = 6;

/// Validates that now falls within the `validAfter`/`validBefore` window.
///
/// The expiry check adds a [`EXPIRY_GRACE_SECS`] buffer so an authorization
/// that would lapse while the settlement transaction is in flight is rejected
/// up front.
fn assert_time(
    valid_after: UnixTimestamp,
    valid_before: UnixTimestamp,
) -> Result<(), PaymentVerificationError> {
    let now = UnixTimestamp::now();
    if valid_before < now + EXPIRY_GRACE_SECS {
        return Err(PaymentVerificationError::Expired);
    }
    if valid_after > now {
        return Err(PaymentVerificationError::Early);
    }
    Ok(())
}

/// Checks the authorization against the requirements and builds the EIP-712
/// domain the signature must verify under.
///
/// Everything here is local; no chain access happens before these checks
/// pass.
fn assert_requirements(
    proof: &ExactPayload,
    requirements: &PaymentRequirements,
) -> Result<Eip712Domain, PaymentVerificationError> {
    let authorization = &proof.authorization;
    if authorization.to != requirements.pay_to {
        return Err(PaymentVerificationError::RecipientMismatch);
    }
    if authorization.value.inner() < requirements.max_amount_required.inner() {
        return Err(PaymentVerificationError::InvalidPaymentAmount);
    }
    assert_time(authorization.valid_after, authorization.valid_before)?;

    let chain_id = requirements
        .network
        .chain_id()
        .ok_or(PaymentVerificationError::UnsupportedNetwork)?;
    let extra = requirements.extra_as::<Eip712Extra>().unwrap_or_default();
    Ok(eip712_domain! {
        name: extra.name,
        version: extra.version,
        chain_id: chain_id,
        verifying_contract: requirements.asset,
    })
}

/// Recovers the EOA that signed the authorization and checks it is the
/// claimed payer.
///
/// Accepts 65-byte raw and 64-byte ERC-2098 compact signatures.
fn assert_signer(
    proof: &ExactPayload,
    domain: &Eip712Domain,
) -> Result<Address, PaymentVerificationError> {
    let bytes = &proof.signature;
    let signature = if bytes.len() == 65 {
        Signature::from_raw(bytes)
            .map_err(|e| PaymentVerificationError::InvalidSignature(e.to_string()))?
            .normalized_s()
    } else if bytes.len() == 64 {
        Signature::from_erc2098(bytes).normalized_s()
    } else {
        return Err(PaymentVerificationError::InvalidSignature(format!(
            "unexpected signature length {}",
            bytes.len()
        )));
    };

    let hash = proof.authorization.signing_hash(domain);
    let recovered = signature
        .recover_address_from_prehash(&hash)
        .map_err(|e| PaymentVerificationError::InvalidSignature(e.to_string()))?;
    if recovered != proof.authorization.from {
        return Err(PaymentVerificationError::InvalidSignature(
            "signature does not recover to the claimed payer".to_owned(),
        ));
    }
    Ok(recovered)
}

/// Runs every check a valid `exact` proof must pass.
///
/// # Errors
///
/// Returns [`EvmFacilitatorError::PaymentVerification`] for proof defects and
/// a transport-shaped error when the balance query fails.
#[cfg_attr(feature = "telemetry", instrument(skip_all, err))]
pub(crate) async fn verify_payment<P: Provider>(
    provider: &P,
    proof: &ExactPayload,
    requirements: &PaymentRequirements,
) -> Result<(), EvmFacilitatorError> {
    let domain = assert_requirements(proof, requirements)?;
    let payer = assert_signer(proof, &domain)?;

    let contract = IEip3009::new(requirements.asset, provider);
    let balance = contract.balanceOf(payer).call().await?;
    if balance < requirements.max_amount_required.inner() {
        return Err(PaymentVerificationError::InsufficientFunds.into());
    }
    Ok(())
}

/// Executes a verified authorization on the token contract.
///
/// Re-runs the proof checks first; an authorization that expired between
/// verification and settlement fails here instead of wasting gas.
///
/// # Errors
///
/// Returns [`EvmFacilitatorError::TransactionReverted`] when the transfer is
/// included but reverts, and a transport-shaped error when submission fails.
#[cfg_attr(feature = "telemetry", instrument(skip_all, err))]
pub(crate) async fn settle_payment<P: Provider>(
    provider: &P,
    proof: &ExactPayload,
    requirements: &PaymentRequirements,
) -> Result<TxHash, EvmFacilitatorError> {
    let domain = assert_requirements(proof, requirements)?;
    assert_signer(proof, &domain)?;

    let authorization = &proof.authorization;
    let contract = IEip3009::new(requirements.asset, provider);
    let pending = contract
        .transferWithAuthorization(
            authorization.from,
            authorization.to,
            authorization.value.inner(),
            U256::from(authorization.valid_after.as_secs()),
            U256::from(authorization.valid_before.as_secs()),
            authorization.nonce,
            proof.signature.clone(),
        )
        .send()
        .await?;
    let receipt = pending.get_receipt().await?;

    if receipt.status() {
        #[cfg(feature = "telemetry")]
        tracing::info!(tx = %receipt.transaction_hash, "transferWithAuthorization succeeded");
        Ok(receipt.transaction_hash)
    } else {
        #[cfg(feature = "telemetry")]
        tracing::warn!(tx = %receipt.transaction_hash, "transferWithAuthorization reverted");
        Err(EvmFacilitatorError::TransactionReverted(
            receipt.transaction_hash,
        ))
    }
}

//! Requirement selection for paying clients.
//!
//! A merchant advertises several acceptable payment methods; the client picks
//! exactly one based on what kind of proof it can produce. Selection is
//! deterministic and never silently coerces an incompatible scheme: a signer
//! that can only submit on-chain transfers cannot satisfy an
//! off-chain-authorization requirement, and vice versa.

use std::fmt;

use crate::proto::{PaymentRequirements, Scheme};

/// The kind of payment proof a payer can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProofCapability {
    /// Can sign EIP-3009 authorizations (the `exact` scheme).
    SignAuthorization,
    /// Can submit token transfers on-chain (the `direct-transfer` scheme).
    SubmitTransfer,
}

impl ProofCapability {
    /// Returns the scheme this capability satisfies.
    #[must_use]
    pub const fn scheme(&self) -> Scheme {
        match self {
            Self::SignAuthorization => Scheme::Exact,
            Self::SubmitTransfer => Scheme::DirectTransfer,
        }
    }
}

impl fmt::Display for ProofCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.scheme().as_str())
    }
}

/// Errors produced while selecting a payment requirement.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SelectionError {
    /// The merchant offered no payment methods at all.
    #[error("no payment requirements provided")]
    Empty,
    /// The merchant offers no scheme the payer can produce a proof for.
    #[error("no payment requirement matches the {0} capability")]
    CapabilityMismatch(ProofCapability),
}

/// Picks one requirement from the merchant's `accepts` list.
///
/// A transfer-capable payer takes the first `direct-transfer` entry. If none
/// exists and every entry is `exact`, the schemes are not bridgeable and
/// selection fails; if entries with unrecognized schemes remain, the first
/// entry is returned so the payer can refuse it with a concrete reason.
///
/// A signature-capable payer takes the first `exact` entry or fails.
///
/// # Errors
///
/// Returns [`SelectionError::Empty`] when `accepts` is empty and
/// [`SelectionError::CapabilityMismatch`] when no offered scheme is
/// satisfiable.
pub fn select_requirement(
    accepts: &[PaymentRequirements],
    capability: ProofCapability,
) -> Result<&PaymentRequirements, SelectionError> {
    if accepts.is_empty() {
        return Err(SelectionError::Empty);
    }
    match capability {
        ProofCapability::SubmitTransfer => {
            if let Some(requirement) = accepts
                .iter()
                .find(|requirement| requirement.scheme == Scheme::DirectTransfer)
            {
                return Ok(requirement);
            }
            if accepts
                .iter()
                .all(|requirement| requirement.scheme == Scheme::Exact)
            {
                return Err(SelectionError::CapabilityMismatch(capability));
            }
            #[cfg(feature = "telemetry")]
            tracing::warn!("no direct-transfer requirement offered, using the first entry");
            Ok(&accepts[0])
        }
        ProofCapability::SignAuthorization => accepts
            .iter()
            .find(|requirement| requirement.scheme == Scheme::Exact)
            .ok_or(SelectionError::CapabilityMismatch(capability)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::networks::Network;
    use crate::proto::TokenAmount;
    use alloy_primitives::address;

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

    #[test]
    fn test_transfer_payer_picks_direct_transfer_regardless_of_order() {
        let accepts = vec![
            requirement(Scheme::Exact),
            requirement(Scheme::DirectTransfer),
        ];
        let selected = select_requirement(&accepts, ProofCapability::SubmitTransfer).unwrap();
        assert_eq!(selected.scheme, Scheme::DirectTransfer);
    }

    #[test]
    fn test_transfer_payer_rejects_exact_only_offer() {
        let accepts = vec![requirement(Scheme::Exact)];
        let result = select_requirement(&accepts, ProofCapability::SubmitTransfer);
        assert!(matches!(
            result,
            Err(SelectionError::CapabilityMismatch(
                ProofCapability::SubmitTransfer
            ))
        ));
    }

    #[test]
    fn test_transfer_payer_falls_back_to_first_unknown_scheme() {
        let accepts = vec![
            requirement(Scheme::Other("permit2".to_owned())),
            requirement(Scheme::Exact),
        ];
        let selected = select_requirement(&accepts, ProofCapability::SubmitTransfer).unwrap();
        assert_eq!(selected.scheme, Scheme::Other("permit2".to_owned()));
    }

    #[test]
    fn test_signature_payer_picks_first_exact() {
        let accepts = vec![
            requirement(Scheme::DirectTransfer),
            requirement(Scheme::Exact),
        ];
        let selected = select_requirement(&accepts, ProofCapability::SignAuthorization).unwrap();
        assert_eq!(selected.scheme, Scheme::Exact);
    }

    #[test]
    fn test_signature_payer_rejects_transfer_only_offer() {
        let accepts = vec![requirement(Scheme::DirectTransfer)];
        let result = select_requirement(&accepts, ProofCapability::SignAuthorization);
        assert!(matches!(
            result,
            Err(SelectionError::CapabilityMismatch(
                ProofCapability::SignAuthorization
            ))
        ));
    }

    #[test]
    fn test_empty_offer_is_an_error() {
        let result = select_requirement(&[], ProofCapability::SubmitTransfer);
        assert!(matches!(result, Err(SelectionError::Empty)));
    }
}

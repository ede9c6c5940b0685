#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! EVM chain support for the a402 pay-per-call payment protocol.
//!
//! This crate implements both payment schemes of the protocol against
//! EVM-compatible chains:
//!
//! - [`exact`] - signed ERC-3009 `transferWithAuthorization` payloads that the
//!   receiving service executes on the payer's behalf
//! - [`transfer`] - plain ERC-20 transfers the payer broadcasts itself, proven
//!   by the resulting transaction hash
//!
//! The client side produces payment proofs ([`ExactPayer`], [`TransferPayer`]);
//! the facilitator side checks and executes them against a chain RPC
//! ([`LocalFacilitator`]).
//!
//! # Feature Flags
//!
//! - `client` - proof signing with a local private key
//! - `client-provider` - proof construction that submits transfers on-chain
//! - `facilitator` - verification and settlement against a chain RPC
//! - `telemetry` - tracing instrumentation

pub mod exact;
pub mod transfer;

mod networks;
pub use networks::*;

#[cfg(feature = "facilitator")]
mod facilitator;
#[cfg(feature = "facilitator")]
pub use facilitator::{EvmFacilitatorError, LocalFacilitator};

#[cfg(feature = "client")]
pub use exact::client::{ExactPayer, SignerLike};

#[cfg(feature = "client-provider")]
pub use transfer::client::{RpcWallet, TransferPayer, TransferWallet};

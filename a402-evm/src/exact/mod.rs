//! The `exact` payment scheme: signed ERC-3009 transfer authorizations.
//!
//! The payer signs a `transferWithAuthorization` message off-chain; the
//! receiving side executes it on the token contract, paying the gas itself.

mod types;

pub use types::*;

#[cfg(feature = "client")]
pub mod client;

#[cfg(feature = "facilitator")]
pub mod facilitator;

//! The verify/settle contract between a merchant and its settlement backend.
//!
//! A merchant never executes payments inline; it delegates to a
//! [`Facilitator`], which either proxies a remote facilitator service over
//! HTTP or performs verification and settlement against a chain RPC
//! directly. Both backends expose the same two operations.

use std::future::Future;

use crate::proto::{SettleRequest, SettleResponse, VerifyRequest, VerifyResponse};

/// Verifies and settles payment proofs.
///
/// `Err` values represent infrastructure failures (unreachable backend,
/// malformed response); a proof that merely fails its checks comes back as
/// `Ok` with an invalid [`VerifyResponse`] so the caller can distinguish
/// "payment invalid" from "could not determine validity".
pub trait Facilitator: Send + Sync {
    /// Error produced by transport or backend failures.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Checks a payment proof against requirements without executing it.
    fn verify(
        &self,
        request: &VerifyRequest,
    ) -> impl Future<Output = Result<VerifyResponse, Self::Error>> + Send;

    /// Executes a verified payment.
    fn settle(
        &self,
        request: &SettleRequest,
    ) -> impl Future<Output = Result<SettleResponse, Self::Error>> + Send;
}

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! HTTP plumbing for the a402 pay-per-call protocol.
//!
//! Two clients live here:
//!
//! - [`FacilitatorClient`] - delegates payment verification and settlement to
//!   a remote facilitator service, implementing the core
//!   [`Facilitator`](a402::facilitator::Facilitator) trait over HTTP
//! - [`OutboundClient`] - drives a paid call against another agent end to
//!   end: submit, negotiate the advertised payment, resubmit with proof
//!
//! # Feature Flags
//!
//! - `telemetry` - tracing instrumentation

mod facilitator_client;
mod outbound;

pub use facilitator_client::{DEFAULT_FACILITATOR_URL, FacilitatorClient, FacilitatorClientError};
pub use outbound::{OutboundClient, OutboundError, ProcessResponse};

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Core types for the a402 pay-per-call protocol.
//!
//! This crate provides the foundational types for gating a service operation
//! behind a priced payment requirement. A caller negotiates one of the payment
//! methods the service advertises, produces a payment proof, and resubmits the
//! same logical call with the proof attached; the service verifies and settles
//! the proof around executing the underlying work.
//!
//! # Overview
//!
//! A request without payment is answered with a [`proto::PaymentRequired`]
//! envelope carried on a [`task::Task`] in the `input-required` state. The
//! caller picks one of the advertised [`proto::PaymentRequirements`] via
//! [`select::select_requirement`], builds a [`proto::PaymentPayload`] through
//! a [`client::Payer`], and resubmits the call echoing the task identifiers.
//! The service verifies the proof, runs the paid work, and settles through a
//! [`facilitator::Facilitator`].
//!
//! # Modules
//!
//! - [`client`] - Caller-side payer abstraction for proof construction
//! - [`facilitator`] - Verification and settlement trait
//! - [`networks`] - Well-known chain identifiers
//! - [`proto`] - Wire format types and verification reason codes
//! - [`select`] - Requirement selection policy
//! - [`task`] - Task state machine types and payment status metadata
//! - [`timestamp`] - String-serialized Unix timestamps
//!
//! # Feature Flags
//!
//! - `telemetry` - Enables tracing instrumentation

pub mod client;
pub mod facilitator;
pub mod networks;
pub mod proto;
pub mod select;
pub mod task;
pub mod timestamp;

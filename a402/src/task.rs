//! Task and message types for agent-to-agent payment exchanges.
//!
//! A paying client submits a [`Message`] inside a [`TaskSubmission`]; the
//! serving agent answers with a [`Task`] whose state tracks the payment
//! lifecycle. Payment data rides in `metadata` maps on both tasks and
//! messages, under reverse-dotted `x402.payment.*` keys, so the task shape
//! stays compatible with agents that know nothing about payments.
//!
//! The exchange is stateless: the serving agent holds no task store, and a
//! client resuming a paused task echoes back the `taskId` and `contextId` it
//! was given.

use rand::{RngExt, rng};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::SystemTime;

use crate::proto::{PaymentPayload, PaymentRequired, SettleResponse};

/// Metadata key carrying the [`PaymentStatus`] of a task or message.
pub const PAYMENT_STATUS_KEY: &str = "x402.payment.status";
/// Metadata key carrying the [`PaymentRequired`] envelope on a paused task.
pub const PAYMENT_REQUIRED_KEY: &str = "x402.payment.required";
/// Metadata key carrying the buyer's [`PaymentPayload`] on a resumed task.
pub const PAYMENT_PAYLOAD_KEY: &str = "x402.payment.payload";
/// Metadata key carrying the verified payer address.
pub const PAYMENT_PAYER_KEY: &str = "x402.payment.payer";
/// Metadata key carrying the reason a payment was rejected or failed.
pub const PAYMENT_ERROR_KEY: &str = "x402.payment.error";
/// Metadata key carrying settlement receipts.
pub const PAYMENT_RECEIPTS_KEY: &str = "x402.payment.receipts";

/// Arbitrary JSON metadata attached to tasks and messages.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Lifecycle state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskState {
    /// The task is paused waiting for client input (payment, typically).
    InputRequired,
    /// The task is being worked on.
    Working,
    /// The task finished successfully.
    Completed,
    /// The task finished unsuccessfully.
    Failed,
}

impl TaskState {
    /// Returns the wire identifier for this state.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::InputRequired => "input-required",
            Self::Working => "working",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payment lifecycle markers carried under [`PAYMENT_STATUS_KEY`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaymentStatus {
    /// The agent requires payment before it will work.
    PaymentRequired,
    /// The client has attached a payment proof.
    PaymentSubmitted,
    /// The proof passed verification.
    PaymentVerified,
    /// The proof failed verification.
    PaymentRejected,
    /// The payment settled on-chain.
    PaymentCompleted,
    /// Settlement was attempted and failed.
    PaymentFailed,
}

impl PaymentStatus {
    /// Returns the wire identifier for this status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::PaymentRequired => "payment-required",
            Self::PaymentSubmitted => "payment-submitted",
            Self::PaymentVerified => "payment-verified",
            Self::PaymentRejected => "payment-rejected",
            Self::PaymentCompleted => "payment-completed",
            Self::PaymentFailed => "payment-failed",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unrecognized payment status string.
#[derive(Debug, thiserror::Error)]
#[error("unknown payment status: {0}")]
pub struct UnknownPaymentStatus(String);

impl FromStr for PaymentStatus {
    type Err = UnknownPaymentStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "payment-required" => Ok(Self::PaymentRequired),
            "payment-submitted" => Ok(Self::PaymentSubmitted),
            "payment-verified" => Ok(Self::PaymentVerified),
            "payment-rejected" => Ok(Self::PaymentRejected),
            "payment-completed" => Ok(Self::PaymentCompleted),
            "payment-failed" => Ok(Self::PaymentFailed),
            other => Err(UnknownPaymentStatus(other.to_owned())),
        }
    }
}

/// The sender of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The paying client.
    User,
    /// The serving agent.
    Agent,
}

/// A single content part of a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Part {
    /// Plain text content.
    Text {
        /// The text itself.
        text: String,
    },
}

impl Part {
    /// Builds a text part.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }
}

/// A message exchanged between client and agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Unique message identifier.
    pub message_id: String,
    /// Who sent the message.
    pub role: Role,
    /// Content parts, in order.
    pub parts: Vec<Part>,
    /// Payment data and other metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl Message {
    /// Builds a user message with a freshly minted id.
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            message_id: mint_message_id(),
            role: Role::User,
            parts: vec![Part::text(text)],
            metadata: None,
        }
    }

    /// Builds an agent message with a freshly minted id.
    #[must_use]
    pub fn agent(text: impl Into<String>) -> Self {
        Self {
            message_id: mint_message_id(),
            role: Role::Agent,
            parts: vec![Part::text(text)],
            metadata: None,
        }
    }

    /// Concatenates the text parts of this message.
    #[must_use]
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .map(|part| match part {
                Part::Text { text } => text.as_str(),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Inserts a metadata entry, creating the map if absent.
    pub fn insert_metadata(&mut self, key: &str, value: serde_json::Value) {
        self.metadata
            .get_or_insert_with(Metadata::new)
            .insert(key.to_owned(), value);
    }

    /// Reads the payment status attached to this message, if any.
    #[must_use]
    pub fn payment_status(&self) -> Option<PaymentStatus> {
        let value = self.metadata.as_ref()?.get(PAYMENT_STATUS_KEY)?;
        value.as_str()?.parse().ok()
    }

    /// Decodes the payment proof attached to this message, if any.
    #[must_use]
    pub fn payment_payload(&self) -> Option<PaymentPayload> {
        let value = self.metadata.as_ref()?.get(PAYMENT_PAYLOAD_KEY)?;
        serde_json::from_value(value.clone()).ok()
    }

    /// Decodes the payment methods advertised in this message, if any.
    #[must_use]
    pub fn payment_required(&self) -> Option<PaymentRequired> {
        let value = self.metadata.as_ref()?.get(PAYMENT_REQUIRED_KEY)?;
        serde_json::from_value(value.clone()).ok()
    }
}

/// Current status of a task: its state plus the latest agent message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatus {
    /// The lifecycle state.
    pub state: TaskState,
    /// The most recent message, typically from the agent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
}

/// A unit of work tracked across the payment exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique task identifier, echoed back by resuming clients.
    pub id: String,
    /// Groups related tasks of one conversation.
    pub context_id: String,
    /// Current status.
    pub status: TaskStatus,
    /// Payment data and other metadata.
    #[serde(default)]
    pub metadata: Metadata,
}

/// Request body submitted to a paid agent endpoint.
///
/// `task_id` and `context_id` are absent on a first contact and echoed back
/// when resuming a task that paused for payment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSubmission {
    /// The message to process. Required; rejected with an error if absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    /// Identifier of the task being resumed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    /// Identifier of the conversation context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,
    /// Initial task metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl TaskSubmission {
    /// Builds a first-contact submission carrying the given message.
    #[must_use]
    pub fn new(message: Message) -> Self {
        Self {
            message: Some(message),
            task_id: None,
            context_id: None,
            metadata: None,
        }
    }
}

impl Task {
    /// Opens a task for an incoming message, minting ids where the
    /// submission carries none.
    #[must_use]
    pub fn receive(
        message: Message,
        task_id: Option<String>,
        context_id: Option<String>,
        metadata: Option<Metadata>,
    ) -> Self {
        Self {
            id: task_id.unwrap_or_else(mint_task_id),
            context_id: context_id.unwrap_or_else(mint_context_id),
            status: TaskStatus {
                state: TaskState::InputRequired,
                message: Some(message),
            },
            metadata: metadata.unwrap_or_default(),
        }
    }

    /// Returns a copy of this task with a new status, keeping ids and
    /// metadata. Work handlers use this to report progress snapshots.
    #[must_use]
    pub fn snapshot(&self, state: TaskState, message: Message) -> Self {
        Self {
            id: self.id.clone(),
            context_id: self.context_id.clone(),
            status: TaskStatus {
                state,
                message: Some(message),
            },
            metadata: self.metadata.clone(),
        }
    }

    /// Reads the payment status attached to this task, if any.
    #[must_use]
    pub fn payment_status(&self) -> Option<PaymentStatus> {
        let value = self.metadata.get(PAYMENT_STATUS_KEY)?;
        value.as_str()?.parse().ok()
    }

    /// Decodes the payment methods advertised on this task, if any.
    ///
    /// Looks in the task metadata first and falls back to the status
    /// message, since some agents only stamp one of the two.
    #[must_use]
    pub fn payment_required(&self) -> Option<PaymentRequired> {
        if let Some(value) = self.metadata.get(PAYMENT_REQUIRED_KEY)
            && let Ok(envelope) = serde_json::from_value(value.clone())
        {
            return Some(envelope);
        }
        self.status.message.as_ref()?.payment_required()
    }

    /// Pauses this task demanding payment.
    ///
    /// The state moves to `input-required` and the advertised payment
    /// methods are stamped into both the task metadata and the metadata of
    /// a fresh agent message.
    ///
    /// # Errors
    ///
    /// Returns an encoding error if the envelope cannot be represented as
    /// JSON.
    pub fn require_payment(&mut self, envelope: &PaymentRequired) -> Result<(), serde_json::Error> {
        let envelope_value = serde_json::to_value(envelope)?;

        let mut message = Message::agent("Payment required. Please submit payment to continue.");
        message.insert_metadata(PAYMENT_REQUIRED_KEY, envelope_value.clone());
        message.insert_metadata(
            PAYMENT_STATUS_KEY,
            PaymentStatus::PaymentRequired.as_str().into(),
        );

        self.status.state = TaskState::InputRequired;
        self.status.message = Some(message);
        self.metadata
            .insert(PAYMENT_REQUIRED_KEY.to_owned(), envelope_value);
        self.metadata.insert(
            PAYMENT_STATUS_KEY.to_owned(),
            PaymentStatus::PaymentRequired.as_str().into(),
        );
        Ok(())
    }

    /// Fails this task because its payment proof was rejected.
    pub fn reject_payment(&mut self, reason: &str) {
        let mut message = Message::agent(format!("Payment verification failed: {reason}"));
        message.insert_metadata(
            PAYMENT_STATUS_KEY,
            PaymentStatus::PaymentRejected.as_str().into(),
        );
        message.insert_metadata(PAYMENT_ERROR_KEY, reason.into());

        self.status.state = TaskState::Failed;
        self.status.message = Some(message);
        self.metadata.insert(
            PAYMENT_STATUS_KEY.to_owned(),
            PaymentStatus::PaymentRejected.as_str().into(),
        );
        self.metadata
            .insert(PAYMENT_ERROR_KEY.to_owned(), reason.into());
    }

    /// Marks this task's payment proof as verified, recording the payer.
    pub fn record_verification(&mut self, payer: Option<&str>) {
        self.metadata.insert(
            PAYMENT_STATUS_KEY.to_owned(),
            PaymentStatus::PaymentVerified.as_str().into(),
        );
        if let Some(payer) = payer {
            self.metadata
                .insert(PAYMENT_PAYER_KEY.to_owned(), payer.into());
        }
    }

    /// Records the outcome of settlement on this task.
    ///
    /// A successful settlement appends a receipt; a failed one records the
    /// failure reason. The task state is left alone since the work outcome
    /// is reported separately.
    ///
    /// # Errors
    ///
    /// Returns an encoding error if the settlement cannot be represented as
    /// JSON.
    pub fn record_settlement(&mut self, settlement: &SettleResponse) -> Result<(), serde_json::Error> {
        let status = if settlement.is_success() {
            PaymentStatus::PaymentCompleted
        } else {
            PaymentStatus::PaymentFailed
        };
        self.metadata
            .insert(PAYMENT_STATUS_KEY.to_owned(), status.as_str().into());

        if settlement.transaction().is_some() {
            let receipt = serde_json::to_value(settlement)?;
            self.metadata.insert(
                PAYMENT_RECEIPTS_KEY.to_owned(),
                serde_json::Value::Array(vec![receipt]),
            );
        }
        if let SettleResponse::Error { reason, .. } = settlement {
            self.metadata
                .insert(PAYMENT_ERROR_KEY.to_owned(), reason.as_str().into());
        }
        Ok(())
    }
}

fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}

fn rng_suffix() -> String {
    const CHARSET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let bytes: [u8; 9] = rng().random();
    bytes
        .iter()
        .map(|b| CHARSET[(b % 36) as usize] as char)
        .collect()
}

/// Mints a fresh task identifier.
///
/// Either side of the exchange may mint; whoever speaks first picks the id
/// and the other side echoes it.
#[must_use]
pub fn mint_task_id() -> String {
    format!("task-{}-{}", now_millis(), rng_suffix())
}

/// Mints a fresh context identifier.
#[must_use]
pub fn mint_context_id() -> String {
    format!("context-{}", now_millis())
}

fn mint_message_id() -> String {
    format!("msg-{}", now_millis())
}

//! Outbound client that drives a paid call end to end.
//!
//! The first leg submits the message and watches the returned task for a
//! payment-required pause. When one shows up, the client negotiates a proof
//! through its [`Payer`] and resubmits the same text with the proof attached,
//! echoing the task identifiers from the pause so the serving agent can
//! correlate the two legs.

use a402::client::{NegotiationError, Payer, attach_payment, negotiate_payment};
use a402::proto::SettleResponse;
use a402::task::{Message, Task, TaskSubmission, mint_context_id, mint_task_id};
use serde::{Deserialize, Serialize};
use url::Url;

/// Response body of a paid agent's process endpoint.
///
/// The same shape covers all three outcomes: payment required, payment
/// rejected, and work executed. Absent fields deserialize to their defaults
/// so partial bodies from older agents still parse.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessResponse {
    /// Whether the work executed and its payment settled.
    #[serde(default)]
    pub success: bool,
    /// Error summary, set when the call did not run to completion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Rejection reason code, set when payment verification failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// The task in its final state for this exchange.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<Task>,
    /// Task updates emitted while serving the request.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<Task>,
    /// Settlement outcome, present once work has executed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settlement: Option<SettleResponse>,
}

/// Errors produced while driving a paid call.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum OutboundError<E> {
    /// The service URL could not be parsed.
    #[error("invalid service URL: {0}")]
    UrlParse(#[from] url::ParseError),
    /// An HTTP exchange with the service failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The advertised payment methods could not be satisfied.
    #[error(transparent)]
    Negotiation(NegotiationError<E>),
    /// The payment proof could not be attached to the message.
    #[error("proof encoding failed: {0}")]
    Encode(#[source] serde_json::Error),
}

/// A client that calls paid agents, paying as it goes.
#[derive(Debug)]
pub struct OutboundClient<P> {
    client: reqwest::Client,
    process_url: Url,
    payer: P,
}

impl<P: Payer> OutboundClient<P> {
    /// Creates a client for the given process endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`OutboundError::UrlParse`] when `process_url` is not a valid
    /// URL.
    pub fn new(process_url: &str, payer: P) -> Result<Self, OutboundError<P::Error>> {
        Ok(Self {
            client: reqwest::Client::new(),
            process_url: Url::parse(process_url)?,
            payer,
        })
    }

    /// Sends `text` to the agent, paying if it demands payment.
    ///
    /// A service that serves the request outright completes in one exchange;
    /// a paused task triggers negotiation and a second exchange. The task
    /// identifiers from the pause are echoed on the resubmission.
    ///
    /// # Errors
    ///
    /// Returns [`OutboundError::Negotiation`] when no advertised payment
    /// method matches the payer's capability or proof construction fails,
    /// and transport-shaped errors for HTTP failures on either leg.
    pub async fn call(&self, text: &str) -> Result<ProcessResponse, OutboundError<P::Error>> {
        let submission = TaskSubmission {
            message: Some(Message::user(text)),
            task_id: Some(mint_task_id()),
            context_id: Some(mint_context_id()),
            metadata: None,
        };
        let first = self.submit(&submission).await?;

        let Some(task) = first.task.as_ref() else {
            return Ok(first);
        };
        let Some(envelope) = task.payment_required() else {
            return Ok(first);
        };

        #[cfg(feature = "telemetry")]
        tracing::info!(task = %task.id, accepts = envelope.accepts.len(), "payment required");

        let payload = negotiate_payment(&self.payer, &envelope)
            .await
            .map_err(OutboundError::Negotiation)?;
        let mut message = Message::user(text);
        attach_payment(&mut message, &payload).map_err(OutboundError::Encode)?;

        let resubmission = TaskSubmission {
            message: Some(message),
            task_id: Some(task.id.clone()),
            context_id: Some(task.context_id.clone()),
            metadata: None,
        };
        self.submit(&resubmission).await
    }

    /// POSTs one submission and decodes the response body.
    ///
    /// The body is decoded regardless of the HTTP status; a rejection comes
    /// back as a 402 with the same response shape.
    async fn submit(
        &self,
        submission: &TaskSubmission,
    ) -> Result<ProcessResponse, OutboundError<P::Error>> {
        let response = self
            .client
            .post(self.process_url.clone())
            .json(submission)
            .send()
            .await?;
        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use a402::networks::Network;
    use a402::proto::{
        PaymentPayload, PaymentRequired, PaymentRequirements, Scheme, TokenAmount, V1,
    };
    use a402::select::ProofCapability;
    use a402::task::{PaymentStatus, TaskState};
    use alloy_primitives::address;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Debug, thiserror::Error)]
    #[error("wallet offline")]
    struct WalletOffline;

    struct StubTransferPayer;

    impl Payer for StubTransferPayer {
        type Error = WalletOffline;

        fn capability(&self) -> ProofCapability {
            ProofCapability::SubmitTransfer
        }

        async fn pay(
            &self,
            requirement: &PaymentRequirements,
        ) -> Result<PaymentPayload, Self::Error> {
            Ok(PaymentPayload {
                x402_version: V1,
                scheme: Scheme::DirectTransfer,
                network: requirement.network.clone(),
                payload: json!({"transaction": "0xabc"}),
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

    fn paused_task(accepts: Vec<PaymentRequirements>) -> Task {
        let mut task = Task::receive(
            Message::user("hi"),
            Some("task-echo".to_owned()),
            Some("context-echo".to_owned()),
            None,
        );
        task.require_payment(&PaymentRequired::new(accepts)).unwrap();
        task
    }

    #[tokio::test]
    async fn test_free_response_passes_through_without_paying() {
        let server = MockServer::start().await;
        let free_task = Task::receive(Message::user("hi"), None, None, None);
        Mock::given(method("POST"))
            .and(path("/process"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "task": free_task,
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client =
            OutboundClient::new(&format!("{}/process", server.uri()), StubTransferPayer).unwrap();
        let response = client.call("hello").await.unwrap();
        assert!(response.success);
    }

    #[tokio::test]
    async fn test_paid_call_resubmits_with_proof_and_echoed_ids() {
        let server = MockServer::start().await;
        let task = paused_task(vec![requirement(Scheme::DirectTransfer)]);

        let mut completed = task.snapshot(
            TaskState::Completed,
            Message::agent("Processed your paid request: hello"),
        );
        completed.metadata.insert(
            "x402.payment.status".to_owned(),
            PaymentStatus::PaymentCompleted.as_str().into(),
        );

        // Second leg: the resubmission carries the proof and echoes the ids
        // the pause minted.
        Mock::given(method("POST"))
            .and(path("/process"))
            .and(body_partial_json(json!({
                "taskId": "task-echo",
                "contextId": "context-echo",
                "message": {"metadata": {"x402.payment.status": "payment-submitted"}}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "task": completed,
                "settlement": {
                    "success": true,
                    "transaction": "0xtxhash",
                    "network": "base-sepolia"
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        // First leg: anything without a proof gets the pause. Mounted second
        // so the proof-matching mock gets first pick.
        Mock::given(method("POST"))
            .and(path("/process"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": false,
                "error": "Payment Required",
                "task": task,
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client =
            OutboundClient::new(&format!("{}/process", server.uri()), StubTransferPayer).unwrap();
        let response = client.call("hello").await.unwrap();

        assert!(response.success);
        let final_task = response.task.unwrap();
        assert_eq!(final_task.id, "task-echo");
        assert_eq!(
            final_task.payment_status(),
            Some(PaymentStatus::PaymentCompleted)
        );
        assert!(response.settlement.unwrap().is_success());
    }

    #[tokio::test]
    async fn test_incompatible_requirements_abort_before_resubmission() {
        let server = MockServer::start().await;
        let task = paused_task(vec![requirement(Scheme::Exact)]);
        Mock::given(method("POST"))
            .and(path("/process"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": false,
                "error": "Payment Required",
                "task": task,
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client =
            OutboundClient::new(&format!("{}/process", server.uri()), StubTransferPayer).unwrap();
        let err = client.call("hello").await.unwrap_err();
        assert!(matches!(
            err,
            OutboundError::Negotiation(NegotiationError::Selection(_))
        ));
    }
}

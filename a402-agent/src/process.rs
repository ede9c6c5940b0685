//! The request state machine for one `/process` exchange.
//!
//! Each exchange is stateless: the submitted message alone decides the path.
//! No acceptable proof pauses the task demanding payment; a proof is
//! verified, the work runs, and settlement is attempted afterwards. A failed
//! settlement marks the payment failed but never rolls the work back.

use a402::proto::SettleResponse;
use a402::task::{PaymentStatus, Task, TaskSubmission};

use crate::error::AgentError;
use crate::merchant::Merchant;
use crate::service::{EventSink, RequestContext, WorkHandler};

/// Terminal outcome of one `/process` exchange.
#[derive(Debug)]
pub enum ProcessOutcome {
    /// The request carried no acceptable payment; the task paused.
    PaymentRequired {
        /// The paused task carrying the advertised payment methods.
        task: Task,
        /// Task updates for this exchange.
        events: Vec<Task>,
    },
    /// The submitted proof failed verification; the task failed.
    Rejected {
        /// The verification failure reason code.
        reason: String,
        /// The failed task.
        task: Task,
        /// Task updates for this exchange.
        events: Vec<Task>,
    },
    /// Payment verified and the work executed.
    Executed {
        /// Whether settlement also succeeded.
        success: bool,
        /// The task in its final state.
        task: Task,
        /// Task updates for this exchange.
        events: Vec<Task>,
        /// The settlement outcome.
        settlement: SettleResponse,
    },
}

/// Drives one submission through the payment exchange.
///
/// # Errors
///
/// Returns [`AgentError::MissingMessage`] for bodies without a message and
/// server-side errors when encoding or work execution fails. Payment
/// rejections are outcomes, not errors.
pub async fn process<H: WorkHandler>(
    merchant: &Merchant,
    handler: &H,
    submission: TaskSubmission,
) -> Result<ProcessOutcome, AgentError> {
    let message = submission.message.ok_or(AgentError::MissingMessage)?;
    let mut task = Task::receive(
        message.clone(),
        submission.task_id,
        submission.context_id,
        submission.metadata,
    );

    let submitted = message.payment_status() == Some(PaymentStatus::PaymentSubmitted);
    let Some(payload) = message.payment_payload().filter(|_| submitted) else {
        task.require_payment(&merchant.payment_required())?;
        tracing::info!(task = %task.id, "payment required");
        let events = vec![task.clone()];
        return Ok(ProcessOutcome::PaymentRequired { task, events });
    };

    let verification = merchant.verify_payment(&payload).await;
    if !verification.is_valid() {
        let reason = verification
            .invalid_reason()
            .unwrap_or("invalid payment")
            .to_owned();
        tracing::warn!(task = %task.id, %reason, "payment rejected");
        task.reject_payment(&reason);
        let events = vec![task.clone()];
        return Ok(ProcessOutcome::Rejected {
            reason,
            task,
            events,
        });
    }
    task.record_verification(verification.payer());
    tracing::info!(task = %task.id, payer = verification.payer(), "payment verified");

    let context = RequestContext {
        task: task.clone(),
        message,
    };
    let mut sink = EventSink::new();
    handler
        .execute(&context, &mut sink)
        .await
        .map_err(AgentError::Work)?;

    // Work first, settlement after: the caller gets its result even when
    // settlement fails, and the payment status records the debt.
    let settlement = merchant.settle_payment(&payload).await;
    task.record_settlement(&settlement)?;
    match &settlement {
        SettleResponse::Success { transaction, .. } => {
            tracing::info!(task = %task.id, %transaction, "payment settled");
        }
        SettleResponse::Error { reason, .. } => {
            tracing::warn!(task = %task.id, %reason, "settlement failed after work execution");
        }
        _ => {}
    }

    let mut events = sink.into_events();
    let mut response_task = events.pop().unwrap_or_else(|| task.clone());
    copy_payment_metadata(&task, &mut response_task);
    events.push(response_task.clone());

    Ok(ProcessOutcome::Executed {
        success: settlement.is_success(),
        task: response_task,
        events,
        settlement,
    })
}

/// Carries the payment outcome onto the handler's final task update, whose
/// metadata snapshot predates settlement.
fn copy_payment_metadata(from: &Task, into: &mut Task) {
    for (key, value) in &from.metadata {
        if key.starts_with("x402.payment.") {
            into.metadata.insert(key.clone(), value.clone());
        }
    }
}

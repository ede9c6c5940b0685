//! The agent's HTTP surface.
//!
//! Three routes: `GET /health` for liveness and payment details,
//! `POST /process` for the paid task exchange, and `POST /test` which
//! loops an unpaid request back through `/process` for smoke testing.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::error::AgentError;
use crate::merchant::Merchant;
use crate::process::{ProcessOutcome, process};
use crate::service::WorkHandler;

/// Shared state behind every route.
#[derive(Debug)]
pub struct AppState<H> {
    /// The payment gate.
    pub merchant: Merchant,
    /// The work behind the gate.
    pub handler: H,
    /// Dollar-formatted price, for `/health`.
    pub price_display: String,
    /// This server's own `/process` URL, for `/test`.
    pub process_url: String,
    /// Client used by `/test` to call `/process`.
    pub http: reqwest::Client,
}

/// The state handle handlers receive.
pub type AgentState<H> = Arc<AppState<H>>;

/// Builds the agent router over the given state.
pub fn agent_router<H: WorkHandler + 'static>(state: AgentState<H>) -> Router {
    Router::new()
        .route("/health", get(health::<H>))
        .route("/process", post(process_task::<H>))
        .route("/test", post(test_loopback::<H>))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health<H: WorkHandler>(State(state): State<AgentState<H>>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "payment": {
            "address": state.merchant.pay_to(),
            "network": state.merchant.network(),
            "price": state.price_display,
        },
    }))
}

async fn process_task<H: WorkHandler>(
    State(state): State<AgentState<H>>,
    Json(submission): Json<a402::task::TaskSubmission>,
) -> Result<Response, AgentError> {
    let outcome = process(&state.merchant, &state.handler, submission).await?;
    let response = match outcome {
        ProcessOutcome::PaymentRequired { task, events } => (
            StatusCode::OK,
            Json(json!({
                "success": false,
                "error": "Payment Required",
                "task": task,
                "events": events,
            })),
        ),
        ProcessOutcome::Rejected {
            reason,
            task,
            events,
        } => (
            StatusCode::PAYMENT_REQUIRED,
            Json(json!({
                "error": "Payment verification failed",
                "reason": reason,
                "task": task,
                "events": events,
            })),
        ),
        ProcessOutcome::Executed {
            success,
            task,
            events,
            settlement,
        } => (
            StatusCode::OK,
            Json(json!({
                "success": success,
                "task": task,
                "events": events,
                "settlement": settlement,
            })),
        ),
    };
    Ok(response.into_response())
}

#[derive(Debug, Default, Deserialize)]
struct TestRequest {
    text: Option<String>,
}

/// Submits an unpaid message to this server's own `/process` endpoint and
/// passes the response through, status code included. Exercises the
/// payment-required leg without a wallet.
async fn test_loopback<H: WorkHandler>(
    State(state): State<AgentState<H>>,
    body: Option<Json<TestRequest>>,
) -> Result<Response, AgentError> {
    let text = body
        .and_then(|Json(request)| request.text)
        .unwrap_or_else(|| "Hello, tell me a joke!".to_owned());
    let submission = a402::task::TaskSubmission::new(a402::task::Message::user(text));

    let upstream = state
        .http
        .post(&state.process_url)
        .json(&submission)
        .send()
        .await?;
    let status = upstream.status();
    let payload: serde_json::Value = upstream.json().await?;
    Ok((
        StatusCode::from_u16(status.as_u16()).unwrap_or(StatusCode::BAD_GATEWAY),
        Json(payload),
    )
        .into_response())
}

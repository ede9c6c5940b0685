//! Error responses for the agent's HTTP surface.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Errors surfaced by the `/process` and `/test` handlers.
///
/// Payment rejections are not errors; they have their own response shape.
/// These variants cover malformed requests and server-side failures.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// The submission carried no message.
    #[error("Missing message in request body")]
    MissingMessage,
    /// A task or payment object could not be encoded as JSON.
    #[error("response encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
    /// The work handler failed after payment verification.
    #[error("work execution failed: {0}")]
    Work(#[source] Box<dyn std::error::Error + Send + Sync>),
    /// The `/test` loopback request failed.
    #[error("test request failed: {0}")]
    Loopback(#[from] reqwest::Error),
}

impl IntoResponse for AgentError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::MissingMessage => StatusCode::BAD_REQUEST,
            Self::Encode(_) | Self::Work(_) | Self::Loopback(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_message_maps_to_bad_request() {
        let response = AgentError::MissingMessage.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_work_failure_maps_to_internal_error() {
        let response = AgentError::Work("model unavailable".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}

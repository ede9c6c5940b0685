//! A [`Facilitator`] implementation that delegates to a remote facilitator
//! service over HTTP.
//!
//! The client POSTs `{payment, requirements}` bodies to the facilitator's
//! `./verify` and `./settle` endpoints and trusts the verdicts that come
//! back. An operator API key, when configured, rides along as a bearer
//! token.
//!
//! ## Error Handling
//!
//! Error variants capture the failure context by endpoint:
//! - URL construction
//! - HTTP transport failures
//! - JSON deserialization errors
//! - Unexpected HTTP status responses

use a402::facilitator::Facilitator;
use a402::proto::{SettleRequest, SettleResponse, VerifyRequest, VerifyResponse};
use reqwest::{Client, StatusCode};
use url::Url;

#[cfg(feature = "telemetry")]
use tracing::instrument;

/// The public facilitator used when no explicit URL is configured.
pub const DEFAULT_FACILITATOR_URL: &str = "https://x402.org/facilitator";

/// A client for communicating with a remote a402 facilitator.
///
/// Handles the `/verify` and `/settle` endpoints via JSON HTTP.
#[derive(Clone)]
pub struct FacilitatorClient {
    /// Base URL of the facilitator (e.g. `https://facilitator.example/`)
    base_url: Url,
    /// Full URL for `POST /verify` requests
    verify_url: Url,
    /// Full URL for `POST /settle` requests
    settle_url: Url,
    /// Shared Reqwest HTTP client
    client: Client,
    /// Optional API key sent as a bearer token
    api_key: Option<String>,
}

impl std::fmt::Debug for FacilitatorClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FacilitatorClient")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}

/// Errors that can occur while interacting with a remote facilitator.
#[derive(Debug, thiserror::Error)]
pub enum FacilitatorClientError {
    /// URL parse error.
    #[error("URL parse error: {context}: {source}")]
    UrlParse {
        /// Human-readable context.
        context: &'static str,
        /// The underlying parse error.
        #[source]
        source: url::ParseError,
    },
    /// HTTP transport error.
    #[error("HTTP error: {context}: {source}")]
    Http {
        /// Human-readable context.
        context: &'static str,
        /// The underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },
    /// JSON deserialization error.
    #[error("Failed to deserialize JSON: {context}: {source}")]
    JsonDeserialization {
        /// Human-readable context.
        context: &'static str,
        /// The underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },
    /// Unexpected HTTP status code.
    #[error("Unexpected HTTP status {status}: {context}: {body}")]
    HttpStatus {
        /// Human-readable context.
        context: &'static str,
        /// The HTTP status code.
        status: StatusCode,
        /// The response body.
        body: String,
    },
    /// Failed to read response body.
    #[error("Failed to read response body as text: {context}: {source}")]
    ResponseBodyRead {
        /// Human-readable context.
        context: &'static str,
        /// The underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },
}

impl FacilitatorClient {
    /// Constructs a new [`FacilitatorClient`] from a base URL.
    ///
    /// This sets up the `./verify` and `./settle` endpoint URLs relative to
    /// the base, so a base of `https://host/facilitator/` yields
    /// `https://host/facilitator/verify`.
    ///
    /// # Errors
    ///
    /// Returns [`FacilitatorClientError::UrlParse`] if URL construction
    /// fails.
    pub fn try_new(base_url: Url) -> Result<Self, FacilitatorClientError> {
        let verify_url =
            base_url
                .join("./verify")
                .map_err(|e| FacilitatorClientError::UrlParse {
                    context: "Failed to construct ./verify URL",
                    source: e,
                })?;
        let settle_url =
            base_url
                .join("./settle")
                .map_err(|e| FacilitatorClientError::UrlParse {
                    context: "Failed to construct ./settle URL",
                    source: e,
                })?;
        Ok(Self {
            base_url,
            verify_url,
            settle_url,
            client: Client::new(),
            api_key: None,
        })
    }

    /// Attaches an API key sent as `Authorization: Bearer` on every request.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Returns the base URL used by this client.
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Returns the computed `./verify` URL relative to [`Self::base_url`].
    pub const fn verify_url(&self) -> &Url {
        &self.verify_url
    }

    /// Returns the computed `./settle` URL relative to [`Self::base_url`].
    pub const fn settle_url(&self) -> &Url {
        &self.settle_url
    }

    /// Sends a `POST /verify` request to the facilitator.
    ///
    /// # Errors
    ///
    /// Returns [`FacilitatorClientError`] if the HTTP request fails.
    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "a402.facilitator_client.verify", skip_all, err)
    )]
    pub async fn verify(
        &self,
        request: &VerifyRequest,
    ) -> Result<VerifyResponse, FacilitatorClientError> {
        self.post_json(&self.verify_url, "POST /verify", request)
            .await
    }

    /// Sends a `POST /settle` request to the facilitator.
    ///
    /// # Errors
    ///
    /// Returns [`FacilitatorClientError`] if the HTTP request fails.
    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "a402.facilitator_client.settle", skip_all, err)
    )]
    pub async fn settle(
        &self,
        request: &SettleRequest,
    ) -> Result<SettleResponse, FacilitatorClientError> {
        self.post_json(&self.settle_url, "POST /settle", request)
            .await
    }

    /// Generic POST helper handling JSON serialization and error mapping.
    ///
    /// `context` is a human-readable identifier used in error messages
    /// (e.g. `"POST /verify"`).
    async fn post_json<T, R>(
        &self,
        url: &Url,
        context: &'static str,
        payload: &T,
    ) -> Result<R, FacilitatorClientError>
    where
        T: serde::Serialize + Sync + ?Sized,
        R: serde::de::DeserializeOwned,
    {
        let mut req = self.client.post(url.clone()).json(payload);
        if let Some(api_key) = &self.api_key {
            req = req.bearer_auth(api_key);
        }
        let http_response = req
            .send()
            .await
            .map_err(|e| FacilitatorClientError::Http { context, source: e })?;

        if http_response.status() == StatusCode::OK {
            http_response
                .json::<R>()
                .await
                .map_err(|e| FacilitatorClientError::JsonDeserialization { context, source: e })
        } else {
            let status = http_response.status();
            let body = http_response
                .text()
                .await
                .map_err(|e| FacilitatorClientError::ResponseBodyRead { context, source: e })?;
            Err(FacilitatorClientError::HttpStatus {
                context,
                status,
                body,
            })
        }
    }
}

impl Facilitator for FacilitatorClient {
    type Error = FacilitatorClientError;

    async fn verify(&self, request: &VerifyRequest) -> Result<VerifyResponse, Self::Error> {
        Self::verify(self, request).await
    }

    async fn settle(&self, request: &SettleRequest) -> Result<SettleResponse, Self::Error> {
        Self::settle(self, request).await
    }
}

/// Converts a string URL into a [`FacilitatorClient`], normalizing trailing
/// slashes so path-suffixed bases keep their last segment.
impl TryFrom<&str> for FacilitatorClient {
    type Error = FacilitatorClientError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        // Normalize: strip trailing slashes and add a single trailing slash.
        let mut normalized = value.trim_end_matches('/').to_owned();
        normalized.push('/');
        let url = Url::parse(&normalized).map_err(|e| FacilitatorClientError::UrlParse {
            context: "Failed to parse base url",
            source: e,
        })?;
        Self::try_new(url)
    }
}

/// Converts a String URL into a [`FacilitatorClient`].
impl TryFrom<String> for FacilitatorClient {
    type Error = FacilitatorClientError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_from(value.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use a402::networks::Network;
    use a402::proto::{PaymentPayload, PaymentRequirements, Scheme, TokenAmount, V1};
    use alloy_primitives::address;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn verify_request() -> VerifyRequest {
        VerifyRequest {
            payment: PaymentPayload {
                x402_version: V1,
                scheme: Scheme::Exact,
                network: Network::BaseSepolia,
                payload: json!({"signature": "0x11"}),
            },
            requirements: PaymentRequirements {
                scheme: Scheme::Exact,
                network: Network::BaseSepolia,
                max_amount_required: TokenAmount::from(100_000_u64),
                resource: "http://localhost:3000/process".to_owned(),
                description: "Payment for AI agent task processing".to_owned(),
                mime_type: "application/json".to_owned(),
                pay_to: address!("0x1234567890123456789012345678901234567890"),
                max_timeout_seconds: 600,
                asset: address!("0x036CbD53842c5426634e7929541eC2318f3dCF7e"),
                extra: None,
            },
        }
    }

    #[test]
    fn test_base_url_normalization_keeps_path_segments() {
        let client = FacilitatorClient::try_from("https://x402.org/facilitator").unwrap();
        assert_eq!(client.base_url().as_str(), "https://x402.org/facilitator/");
        assert_eq!(
            client.verify_url().as_str(),
            "https://x402.org/facilitator/verify"
        );
        assert_eq!(
            client.settle_url().as_str(),
            "https://x402.org/facilitator/settle"
        );
    }

    #[tokio::test]
    async fn test_verify_returns_the_facilitator_verdict() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/verify"))
            .and(body_partial_json(json!({
                "payment": {"scheme": "exact", "network": "base-sepolia"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "isValid": true,
                "payer": "0x70997970C51812dc3A010C7d01b50e0d17dc79C8"
            })))
            .mount(&server)
            .await;

        let client = FacilitatorClient::try_from(server.uri()).unwrap();
        let response = client.verify(&verify_request()).await.unwrap();
        assert!(response.is_valid());
        assert_eq!(
            response.payer(),
            Some("0x70997970C51812dc3A010C7d01b50e0d17dc79C8")
        );
    }

    #[tokio::test]
    async fn test_verify_passes_through_invalid_reasons() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/verify"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "isValid": false,
                "invalidReason": "insufficient_funds"
            })))
            .mount(&server)
            .await;

        let client = FacilitatorClient::try_from(server.uri()).unwrap();
        let response = client.verify(&verify_request()).await.unwrap();
        assert!(!response.is_valid());
        assert_eq!(response.invalid_reason(), Some("insufficient_funds"));
    }

    #[tokio::test]
    async fn test_settle_returns_the_transaction() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/settle"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "transaction": "0xtxhash",
                "network": "base-sepolia"
            })))
            .mount(&server)
            .await;

        let client = FacilitatorClient::try_from(server.uri()).unwrap();
        let request = SettleRequest::from(verify_request());
        let response = client.settle(&request).await.unwrap();
        assert!(response.is_success());
        assert_eq!(response.transaction(), Some("0xtxhash"));
    }

    #[tokio::test]
    async fn test_non_ok_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/verify"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let client = FacilitatorClient::try_from(server.uri()).unwrap();
        let err = client.verify(&verify_request()).await.unwrap_err();
        match err {
            FacilitatorClientError::HttpStatus { status, body, .. } => {
                assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
                assert_eq!(body, "maintenance");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_api_key_rides_as_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/verify"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "isValid": true,
                "payer": "0x70997970C51812dc3A010C7d01b50e0d17dc79C8"
            })))
            .mount(&server)
            .await;

        let client = FacilitatorClient::try_from(server.uri())
            .unwrap()
            .with_api_key("sk-test");
        let response = client.verify(&verify_request()).await.unwrap();
        assert!(response.is_valid());
    }
}

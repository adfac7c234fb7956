//! Test-side client for a running Decoy server.
//!
//! Issues the four control request shapes (`/_register`, `/_history`,
//! `/_reset` and the dynamic URL helper) so test code never builds control
//! requests by hand.

use std::time::Duration;

use http::StatusCode;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::core::{RegistrationRequest, RequestEvent, ResponseSpec};

/// Errors surfaced by [`DecoyClient`] operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ClientError {
    /// Transport-level failure (connect, timeout, decode).
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with an unexpected status.
    #[error("response status not OK, got {0}")]
    UnexpectedStatus(StatusCode),
}

/// Result type alias for client operations
pub type ClientResult<T> = Result<T, ClientError>;

/// Client for the control surface of one Decoy server.
pub struct DecoyClient {
    base_url: String,
    http: reqwest::Client,
}

impl DecoyClient {
    /// Connect to `host:port` with a short request timeout.
    pub fn new(host: &str, port: u16) -> ClientResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(2))
            .build()?;
        Ok(Self {
            base_url: format!("http://{host}:{port}"),
            http,
        })
    }

    /// Like [`DecoyClient::new`], but flushes the server state first.
    pub async fn new_and_reset(host: &str, port: u16) -> ClientResult<Self> {
        let client = Self::new(host, port)?;
        client.reset().await?;
        Ok(client)
    }

    /// Absolute URL for `endpoint` on this server.
    pub fn url(&self, endpoint: &str) -> String {
        format!("{}{endpoint}", self.base_url)
    }

    /// Register a policy from the raw wire shape.
    pub async fn register(&self, registration: &RegistrationRequest) -> ClientResult<()> {
        let response = self
            .http
            .post(self.url("/_register"))
            .json(registration)
            .send()
            .await?;
        expect_ok(response.status())
    }

    /// Register a fixed response: every request to `endpoint` answers with
    /// `code` and `payload`, indefinitely.
    pub async fn register_fixed(
        &self,
        endpoint: &str,
        http_method: &str,
        code: i32,
        payload: Map<String, Value>,
    ) -> ClientResult<()> {
        self.register(&RegistrationRequest {
            endpoint: endpoint.to_string(),
            http_method: http_method.to_string(),
            any: Some(ResponseSpec { code, payload }),
            ..Default::default()
        })
        .await
    }

    /// Register a scripted sequence, consumed one response per request.
    pub async fn register_sequence(
        &self,
        endpoint: &str,
        http_method: &str,
        responses: Vec<ResponseSpec>,
    ) -> ClientResult<()> {
        self.register(&RegistrationRequest {
            endpoint: endpoint.to_string(),
            http_method: http_method.to_string(),
            exactly: Some(responses),
            ..Default::default()
        })
        .await
    }

    /// Fetch the rolling request history, ascending by creation order.
    pub async fn history(&self) -> ClientResult<Vec<RequestEvent>> {
        let response = self.http.post(self.url("/_history")).send().await?;
        expect_ok(response.status())?;
        Ok(response.json().await?)
    }

    /// History filtered to one endpoint path.
    pub async fn history_for(&self, endpoint: &str) -> ClientResult<Vec<RequestEvent>> {
        Ok(self
            .history()
            .await?
            .into_iter()
            .filter(|event| event.endpoint == endpoint)
            .collect())
    }

    /// Flush every registration and recorded request.
    pub async fn reset(&self) -> ClientResult<()> {
        let response = self.http.post(self.url("/_reset")).send().await?;
        expect_ok(response.status())
    }
}

fn expect_ok(status: StatusCode) -> ClientResult<()> {
    if status == StatusCode::OK {
        Ok(())
    } else {
        Err(ClientError::UnexpectedStatus(status))
    }
}

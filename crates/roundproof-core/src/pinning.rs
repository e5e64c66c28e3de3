// Copyright (c) 2026 RoundProof Contributors
// SPDX-License-Identifier: Apache-2.0

//! HTTP contract with the pinning service and its public gateway.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_API_URL: &str = "https://api.pinata.cloud";
pub const DEFAULT_GATEWAY_URL: &str = "https://gateway.pinata.cloud";
pub const PIN_FILE_PATH: &str = "/pinning/pinFileToIPFS";
pub const AUTH_TEST_PATH: &str = "/data/testAuthentication";
pub const API_KEY_HEADER: &str = "pinata_api_key";
pub const SECRET_KEY_HEADER: &str = "pinata_secret_api_key";

const INVALID_CREDENTIALS_MARKER: &str = "INVALID_CREDENTIALS";
const RATE_LIMIT_MARKER: &str = "RATE_LIMIT";
const BODY_SNIPPET_BYTES: usize = 256;

#[derive(Clone, Default, PartialEq, Eq)]
pub struct PinningCredentials {
    pub api_key: String,
    pub secret_key: String,
}

impl PinningCredentials {
    pub fn new(api_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            secret_key: secret_key.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.api_key.is_empty() || self.secret_key.is_empty()
    }
}

impl fmt::Debug for PinningCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PinningCredentials")
            .field("api_key", &self.api_key)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

/// Outcome classes of one pinning request. Only `InvalidCredentials` is terminal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PinError {
    #[error("credentials rejected: {0}")]
    InvalidCredentials(String),
    #[error("rate limited: {0}")]
    RateLimited(String),
    #[error("transient failure: {0}")]
    Transient(String),
    #[error("request timed out")]
    Timeout,
}

impl PinError {
    pub fn is_retryable(&self) -> bool {
        !matches!(self, PinError::InvalidCredentials(_))
    }

    fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            PinError::Timeout
        } else {
            PinError::Transient(err.to_string())
        }
    }
}

#[derive(Debug, Deserialize)]
struct PinResponse {
    #[serde(rename = "IpfsHash", default)]
    ipfs_hash: String,
}

fn snippet(body: &str) -> &str {
    let mut end = body.len().min(BODY_SNIPPET_BYTES);
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    body[..end].trim()
}

/// Maps a pin response to a CID or an error class. The two distinguished markers are matched
/// anywhere in the body, whatever the status code.
pub fn classify_pin_response(status: u16, body: &str) -> Result<String, PinError> {
    if body.contains(INVALID_CREDENTIALS_MARKER) {
        return Err(PinError::InvalidCredentials(snippet(body).to_string()));
    }
    if body.contains(RATE_LIMIT_MARKER) || status == 429 {
        return Err(PinError::RateLimited(snippet(body).to_string()));
    }
    if status != 200 {
        return Err(PinError::Transient(format!("HTTP {status}: {}", snippet(body))));
    }
    match serde_json::from_str::<PinResponse>(body) {
        Ok(resp) if !resp.ipfs_hash.is_empty() => Ok(resp.ipfs_hash),
        Ok(_) => Err(PinError::Transient("response carried no IpfsHash".into())),
        Err(err) => Err(PinError::Transient(format!("malformed response: {err}"))),
    }
}

#[async_trait]
pub trait PinningService: Send + Sync {
    async fn pin_file(
        &self,
        path: &Path,
        file_name: &str,
        credentials: &PinningCredentials,
        timeout: Duration,
    ) -> Result<String, PinError>;

    async fn test_credentials(&self, credentials: &PinningCredentials) -> Result<bool, PinError>;

    /// `Ok(true)` when the public gateway serves `cid` with a success status.
    async fn fetch_from_gateway(&self, cid: &str) -> Result<bool, PinError>;
}

#[derive(Debug, Clone)]
pub struct PinataClient {
    http: reqwest::Client,
    api_url: String,
    gateway_url: String,
    request_timeout: Duration,
}

impl PinataClient {
    pub fn new(
        api_url: impl Into<String>,
        gateway_url: impl Into<String>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: api_url.into().trim_end_matches('/').to_string(),
            gateway_url: gateway_url.into().trim_end_matches('/').to_string(),
            request_timeout,
        }
    }

    pub fn gateway_link(&self, cid: &str) -> String {
        format!("{}/ipfs/{cid}", self.gateway_url)
    }
}

impl Default for PinataClient {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL, DEFAULT_GATEWAY_URL, Duration::from_secs(10))
    }
}

#[async_trait]
impl PinningService for PinataClient {
    async fn pin_file(
        &self,
        path: &Path,
        file_name: &str,
        credentials: &PinningCredentials,
        timeout: Duration,
    ) -> Result<String, PinError> {
        let unreadable =
            |err: std::io::Error| PinError::Transient(format!("{}: {err}", path.display()));
        let file = tokio::fs::File::open(path).await.map_err(unreadable)?;
        let len = file.metadata().await.map_err(unreadable)?.len();
        let part = Part::stream_with_length(reqwest::Body::from(file), len)
            .file_name(file_name.to_string());
        let form = Form::new().part("file", part);
        let response = self
            .http
            .post(format!("{}{PIN_FILE_PATH}", self.api_url))
            .header(API_KEY_HEADER, &credentials.api_key)
            .header(SECRET_KEY_HEADER, &credentials.secret_key)
            .multipart(form)
            .timeout(timeout)
            .send()
            .await
            .map_err(PinError::from_transport)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(PinError::from_transport)?;
        classify_pin_response(status, &body)
    }

    async fn test_credentials(&self, credentials: &PinningCredentials) -> Result<bool, PinError> {
        let response = self
            .http
            .get(format!("{}{AUTH_TEST_PATH}", self.api_url))
            .header(API_KEY_HEADER, &credentials.api_key)
            .header(SECRET_KEY_HEADER, &credentials.secret_key)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(PinError::from_transport)?;
        Ok(response.status().is_success())
    }

    async fn fetch_from_gateway(&self, cid: &str) -> Result<bool, PinError> {
        let response = self
            .http
            .get(self.gateway_link(cid))
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(PinError::from_transport)?;
        Ok(response.status().is_success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_body_yields_cid() {
        assert_eq!(
            classify_pin_response(200, r#"{"IpfsHash":"bafy1","PinSize":10}"#),
            Ok("bafy1".to_string())
        );
    }

    #[test]
    fn distinguished_markers_override_status() {
        assert!(matches!(
            classify_pin_response(401, r#"{"error":{"reason":"INVALID_CREDENTIALS"}}"#),
            Err(PinError::InvalidCredentials(_))
        ));
        assert!(matches!(
            classify_pin_response(200, "RATE_LIMITED"),
            Err(PinError::RateLimited(_))
        ));
        assert!(matches!(
            classify_pin_response(429, "slow down"),
            Err(PinError::RateLimited(_))
        ));
    }

    #[test]
    fn other_failures_are_transient() {
        assert!(matches!(
            classify_pin_response(502, "bad gateway"),
            Err(PinError::Transient(_))
        ));
        assert!(matches!(
            classify_pin_response(200, "{}"),
            Err(PinError::Transient(_))
        ));
        assert!(matches!(
            classify_pin_response(200, "not json"),
            Err(PinError::Transient(_))
        ));
        assert!(!PinError::InvalidCredentials(String::new()).is_retryable());
        assert!(PinError::Timeout.is_retryable());
    }

    #[test]
    fn long_bodies_are_clipped_on_char_boundaries() {
        let body = "é".repeat(400);
        match classify_pin_response(500, &body) {
            Err(PinError::Transient(msg)) => assert!(msg.len() < 300),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn debug_output_hides_secret() {
        let creds = PinningCredentials::new("key", "hunter2");
        assert!(!format!("{creds:?}").contains("hunter2"));
    }
}

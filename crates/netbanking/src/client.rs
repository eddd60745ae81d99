//! HTTP transport for the netbanking web API and its token endpoint.
//!
//! The engine talks to the network only through the [`Transport`] trait so the
//! token manager, discovery and aggregation can run against canned responses.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use serde_json::Value;

use crate::errors::{Error, Result};

/// Longest slice of an error body carried into an error message.
const ERROR_BODY_PREVIEW: usize = 200;

/// Network access used by the engine.
///
/// Calls are issued one at a time and awaited to completion; a slow upstream
/// simply lengthens the refresh cycle.
#[async_trait]
pub trait Transport: Send + Sync {
    /// POST a form-encoded body and parse the JSON response.
    async fn post_form(&self, url: &str, form: &[(&str, &str)]) -> Result<Value>;

    /// GET with extra request headers and parse the JSON response.
    async fn get_json(&self, url: &str, headers: &[(&str, &str)]) -> Result<Value>;
}

/// [`Transport`] backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Create a transport whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Request(format!("Failed to initialize HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    /// Parse an HTTP response, turning non-2xx statuses into errors.
    ///
    /// Bodies carrying credentials are only logged by size.
    async fn parse_response(response: reqwest::Response, secret_body: bool) -> Result<Value> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Request(format!("Failed to read response: {}", e)))?;

        debug!(
            "[Netbanking] HTTP {} response: {}",
            status,
            log_preview(&body, secret_body)
        );

        if !status.is_success() {
            return Err(Error::Request(format!(
                "HTTP {}: {}",
                status,
                body.chars().take(ERROR_BODY_PREVIEW).collect::<String>()
            )));
        }

        serde_json::from_str(&body)
            .map_err(|e| Error::Parse(format!("Failed to parse response: {}", e)))
    }
}

fn log_preview(body: &str, secret: bool) -> String {
    if secret {
        format!("<{} bytes redacted>", body.len())
    } else {
        body.to_string()
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn post_form(&self, url: &str, form: &[(&str, &str)]) -> Result<Value> {
        debug!("[Netbanking] POST {}", url);

        let response = self
            .client
            .post(url)
            .form(form)
            .send()
            .await
            .map_err(|e| Error::Request(format!("POST {} failed: {}", url, e)))?;

        Self::parse_response(response, true).await
    }

    async fn get_json(&self, url: &str, headers: &[(&str, &str)]) -> Result<Value> {
        debug!("[Netbanking] GET {}", url);

        let mut request = self.client.get(url);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::Request(format!("GET {} failed: {}", url, e)))?;

        Self::parse_response(response, false).await
    }
}

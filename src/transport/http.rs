//! HTTP sinks: a bundle API with bearer auth, and signed webhooks.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use tracing::{info, instrument, warn};

use super::signature::{self, SIGNATURE_HEADER};
use super::{BundleSink, Delivery};
use crate::domain::EvidenceBundle;
use crate::error::SealError;

/// Default request timeout for both sinks
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Posts bundles to `{api_url}/bundles`
pub struct ApiSink {
    /// API base URL
    base_url: String,
    /// Bearer token
    api_key: String,
    /// Request timeout
    timeout: Duration,
    /// HTTP client
    client: reqwest::Client,
}

impl ApiSink {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            timeout: DEFAULT_TIMEOUT,
            client: reqwest::Client::new(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn bundles_url(&self) -> String {
        format!("{}/bundles", self.base_url)
    }
}

#[async_trait]
impl BundleSink for ApiSink {
    fn name(&self) -> &str {
        "api"
    }

    #[instrument(skip(self, bundle), fields(bundle_id = %bundle.bundle_id(), url = %self.base_url))]
    async fn deliver(&self, bundle: &EvidenceBundle) -> Result<Delivery, SealError> {
        let url = self.bundles_url();
        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .bearer_auth(&self.api_key)
            .json(bundle)
            .send()
            .await
            .map_err(|e| SealError::Transport(format!("request to {} failed: {}", url, e)))?;

        let body = read_response(response, &url).await?;
        info!("Bundle posted");

        Ok(Delivery {
            sink: self.name().to_string(),
            location: url,
            response: body,
        })
    }
}

/// Posts bundles to a webhook, optionally signed
pub struct WebhookSink {
    url: String,
    headers: BTreeMap<String, String>,
    secret: Option<String>,
    timeout: Duration,
    client: reqwest::Client,
}

impl WebhookSink {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: BTreeMap::new(),
            secret: None,
            timeout: DEFAULT_TIMEOUT,
            client: reqwest::Client::new(),
        }
    }

    /// Extra headers sent with every request
    pub fn with_headers(mut self, headers: BTreeMap<String, String>) -> Self {
        self.headers = headers;
        self
    }

    /// Sign bodies with HMAC-SHA-256 under `secret`
    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl BundleSink for WebhookSink {
    fn name(&self) -> &str {
        "webhook"
    }

    #[instrument(skip(self, bundle), fields(bundle_id = %bundle.bundle_id(), signed = self.secret.is_some()))]
    async fn deliver(&self, bundle: &EvidenceBundle) -> Result<Delivery, SealError> {
        // Signature covers these exact bytes
        let body = serde_json::to_vec(bundle)
            .map_err(|e| SealError::Transport(format!("failed to serialize bundle: {}", e)))?;

        let mut request = self
            .client
            .post(&self.url)
            .timeout(self.timeout)
            .header(CONTENT_TYPE, "application/json");

        for (name, value) in &self.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        if let Some(secret) = &self.secret {
            let signature = signature::sign(secret.as_bytes(), &body)?;
            request = request.header(SIGNATURE_HEADER, signature);
        }

        let response = request
            .body(body)
            .send()
            .await
            .map_err(|e| SealError::Transport(format!("webhook request failed: {}", e)))?;

        let body = read_response(response, &self.url).await?;
        info!("Webhook delivered");

        Ok(Delivery {
            sink: self.name().to_string(),
            location: self.url.clone(),
            response: body,
        })
    }
}

/// Non-2xx is a failure; a JSON body is kept, anything else dropped
async fn read_response(response: reqwest::Response, url: &str) -> Result<Option<Value>, SealError> {
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| SealError::Transport(format!("failed to read response from {}: {}", url, e)))?;

    if !status.is_success() {
        warn!(%status, "Receiver rejected bundle");
        return Err(SealError::Transport(format!(
            "{} returned {}: {}",
            url,
            status,
            text.chars().take(200).collect::<String>()
        )));
    }

    Ok(serde_json::from_str(&text).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundles_url_normalized() {
        let sink = ApiSink::new("https://evidence.example/v1/", "key");
        assert_eq!(sink.bundles_url(), "https://evidence.example/v1/bundles");
        assert_eq!(sink.name(), "api");
    }

    #[test]
    fn test_webhook_builder() {
        let sink = WebhookSink::new("https://hooks.example/in")
            .with_headers(BTreeMap::from([("X-Tenant".to_string(), "acme".to_string())]))
            .with_secret("s3cret");
        assert_eq!(sink.headers.get("X-Tenant").map(String::as_str), Some("acme"));
        assert!(sink.secret.is_some());
        assert_eq!(sink.name(), "webhook");
    }
}

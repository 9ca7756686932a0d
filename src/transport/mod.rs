//! Delivery of sealed bundles.
//!
//! A sink receives a bundle only after sealing has fully succeeded. Sinks
//! never modify the bundle; what reaches disk or the wire is exactly what
//! the verifier will later check.

pub mod file;
pub mod http;
pub mod signature;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::domain::EvidenceBundle;
use crate::error::SealError;

pub use file::FileSink;
pub use http::{ApiSink, WebhookSink};

/// Trait for bundle destinations
#[async_trait]
pub trait BundleSink: Send + Sync {
    /// Sink kind ("file", "api", "webhook")
    fn name(&self) -> &str;

    /// Deliver one bundle
    async fn deliver(&self, bundle: &EvidenceBundle) -> Result<Delivery, SealError>;
}

/// Receipt for a delivered bundle
#[derive(Debug, Clone, Serialize)]
pub struct Delivery {
    /// Sink that accepted the bundle
    pub sink: String,
    /// File path or URL the bundle went to
    pub location: String,
    /// Parsed response body, when the receiver sent JSON back
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<Value>,
}

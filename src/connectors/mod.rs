//! Connector interface for source systems.
//!
//! A connector owns the connection to one source system and maps its raw
//! records into ordered evidence items. Per-source connectors (issue
//! trackers, document stores, chat) implement [`Connector`]; this crate
//! ships only the source-neutral [`JsonlConnector`].

pub mod filter;
pub mod jsonl;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use crate::domain::EvidenceItem;
use crate::error::SealError;

pub use filter::{ArtifactFilter, RiskTier};
pub use jsonl::JsonlConnector;

/// Trait for source-system connectors
#[async_trait]
pub trait Connector: Send + Sync {
    /// Configured connector name
    fn name(&self) -> &str;

    /// Source-system tag stamped on every item
    fn source(&self) -> &str;

    /// Establish the connection
    async fn connect(&mut self) -> Result<(), SealError>;

    /// Release the connection
    async fn disconnect(&mut self) -> Result<(), SealError>;

    /// Map one raw source record into an evidence item
    fn map_record(&self, record: Value) -> Result<EvidenceItem, SealError>;

    /// Items created after `checkpoint` (all items when `None`), in source
    /// order. Fails with `NotConnected` before `connect` has completed.
    async fn fetch_since(
        &self,
        checkpoint: Option<DateTime<Utc>>,
    ) -> Result<Vec<EvidenceItem>, SealError>;

    /// Health report
    async fn healthcheck(&self) -> Value {
        json!({
            "healthy": true,
            "connector": self.name(),
            "type": self.source(),
        })
    }
}

/// Connection lifecycle guard shared by connector implementations
#[derive(Debug, Clone, Default)]
pub struct ConnectorState {
    connected_at: Option<DateTime<Utc>>,
}

impl ConnectorState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_connected(&mut self) {
        self.connected_at = Some(Utc::now());
    }

    pub fn mark_disconnected(&mut self) {
        self.connected_at = None;
    }

    pub fn is_connected(&self) -> bool {
        self.connected_at.is_some()
    }

    pub fn connected_at(&self) -> Option<DateTime<Utc>> {
        self.connected_at
    }

    /// Gate for data retrieval
    pub fn ensure_connected(&self, connector: &str) -> Result<(), SealError> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(SealError::NotConnected {
                connector: connector.to_string(),
            })
        }
    }
}

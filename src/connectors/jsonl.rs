//! Source-neutral connector that replays records from a JSONL file.
//!
//! Each non-empty line is one raw record:
//!
//! ```json
//! {"id": "c-1", "kind": "commit", "created_at": "2024-03-01T12:00:00Z",
//!  "payload": {"sha": "abc"}, "tags": ["main"]}
//! ```
//!
//! Useful for exports from systems without a dedicated connector and for
//! replaying captured evidence.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};
use tokio::fs;
use tracing::{debug, info};

use super::{Connector, ConnectorState};
use crate::domain::EvidenceItem;
use crate::error::SealError;

/// Raw record schema
#[derive(Debug, Deserialize)]
struct RawRecord {
    id: String,
    kind: String,
    created_at: DateTime<Utc>,
    #[serde(default)]
    payload: Map<String, Value>,
    #[serde(default)]
    tags: BTreeSet<String>,
}

/// Connector over a newline-delimited JSON file
pub struct JsonlConnector {
    name: String,
    source: String,
    path: PathBuf,
    state: ConnectorState,
}

impl JsonlConnector {
    pub fn new(name: impl Into<String>, source: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            path: path.into(),
            state: ConnectorState::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn failure(&self, reason: impl std::fmt::Display) -> SealError {
        SealError::Connector {
            connector: self.name.clone(),
            reason: reason.to_string(),
        }
    }
}

#[async_trait]
impl Connector for JsonlConnector {
    fn name(&self) -> &str {
        &self.name
    }

    fn source(&self) -> &str {
        &self.source
    }

    async fn connect(&mut self) -> Result<(), SealError> {
        let metadata = fs::metadata(&self.path)
            .await
            .map_err(|e| self.failure(format!("cannot open {}: {}", self.path.display(), e)))?;

        if !metadata.is_file() {
            return Err(self.failure(format!("{} is not a file", self.path.display())));
        }

        self.state.mark_connected();
        info!(connector = %self.name, path = %self.path.display(), "Connected");
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), SealError> {
        self.state.mark_disconnected();
        Ok(())
    }

    fn map_record(&self, record: Value) -> Result<EvidenceItem, SealError> {
        let raw: RawRecord = serde_json::from_value(record).map_err(|e| self.failure(e))?;

        let mut item = EvidenceItem::new(raw.id, self.source.clone(), raw.kind, raw.payload)
            .with_created_at(raw.created_at);
        item.tags = raw.tags;
        Ok(item)
    }

    async fn fetch_since(
        &self,
        checkpoint: Option<DateTime<Utc>>,
    ) -> Result<Vec<EvidenceItem>, SealError> {
        self.state.ensure_connected(&self.name)?;

        let content = fs::read_to_string(&self.path)
            .await
            .map_err(|e| self.failure(format!("failed to read {}: {}", self.path.display(), e)))?;

        let mut items = Vec::new();
        for (line_no, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }

            let record: Value = serde_json::from_str(line)
                .map_err(|e| self.failure(format!("line {}: {}", line_no + 1, e)))?;
            let item = self
                .map_record(record)
                .map_err(|e| self.failure(format!("line {}: {}", line_no + 1, e)))?;

            if checkpoint.map_or(true, |since| item.created_at > since) {
                items.push(item);
            }
        }

        debug!(connector = %self.name, count = items.len(), "Fetched items");
        Ok(items)
    }

    async fn healthcheck(&self) -> Value {
        serde_json::json!({
            "healthy": self.state.is_connected() && self.path.is_file(),
            "connector": self.name,
            "type": self.source,
            "path": self.path.display().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_map_record() {
        let connector = JsonlConnector::new("replay", "export", "/dev/null");
        let item = connector
            .map_record(json!({
                "id": "r-1",
                "kind": "ticket",
                "created_at": "2024-03-01T12:00:00Z",
                "payload": {"title": "Fix login"},
                "tags": ["p1"]
            }))
            .unwrap();

        assert_eq!(item.id, "r-1");
        assert_eq!(item.source, "export");
        assert_eq!(item.kind, "ticket");
        assert_eq!(item.payload["title"], "Fix login");
        assert!(item.tags.contains("p1"));
    }

    #[test]
    fn test_map_record_rejects_missing_fields() {
        let connector = JsonlConnector::new("replay", "export", "/dev/null");
        let result = connector.map_record(json!({"id": "r-1"}));
        assert!(matches!(result, Err(SealError::Connector { .. })));
    }

    #[test]
    fn test_map_record_through_trait_object() {
        let connector: Box<dyn Connector> = Box::new(JsonlConnector::new("replay", "export", "/dev/null"));
        let item = connector
            .map_record(json!({
                "id": "r-2",
                "kind": "commit",
                "created_at": "2024-03-02T08:30:00Z"
            }))
            .unwrap();

        assert_eq!(item.id, "r-2");
        assert_eq!(item.source, "export");
        assert!(item.payload.is_empty());
        assert!(item.tags.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_before_connect_fails() {
        let connector = JsonlConnector::new("replay", "export", "/does/not/matter");
        let result = connector.fetch_since(None).await;
        assert!(matches!(result, Err(SealError::NotConnected { .. })));
    }

    #[tokio::test]
    async fn test_connect_missing_file_fails() {
        let mut connector = JsonlConnector::new("replay", "export", "/no/such/records.jsonl");
        let result = connector.connect().await;
        assert!(matches!(result, Err(SealError::Connector { .. })));
    }
}

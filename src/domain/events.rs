//! Change events reported by connectors.
//!
//! A change event, optionally paired with the diff it produced, becomes
//! the evidence items of one bundle: the diff first, then the event itself.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Timelike, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use uuid::Uuid;

use super::item::EvidenceItem;

/// Kind used for diff evidence items
pub const KIND_DIFF: &str = "diff";

/// Kind used for change-event evidence items
pub const KIND_AUDIT_EVENT: &str = "audit_event";

/// Types of change observed in a source system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    FileCreated,
    FileModified,
    FileDeleted,
    FileMoved,
    PermissionChanged,
    ApprovalRequested,
    ApprovalDecided,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::FileCreated => "file_created",
            EventType::FileModified => "file_modified",
            EventType::FileDeleted => "file_deleted",
            EventType::FileMoved => "file_moved",
            EventType::PermissionChanged => "permission_changed",
            EventType::ApprovalRequested => "approval_requested",
            EventType::ApprovalDecided => "approval_decided",
        }
    }
}

/// A change to an artifact in the source system
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Artifact identifier in the source system
    pub artifact_id: String,

    pub event_type: EventType,

    /// Version before the change (modifications only)
    pub from_version: Option<String>,

    /// Version after the change
    pub to_version: Option<String>,

    /// Human-readable change type
    pub change_type: String,

    pub actor_id: Option<String>,
    pub actor_name: Option<String>,
    pub actor_email: Option<String>,

    /// When the change occurred
    pub timestamp: DateTime<Utc>,

    /// Link to the artifact in the source system
    pub source_url: Option<String>,

    /// Source-specific extras
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl ChangeEvent {
    /// Create an event with the current timestamp
    pub fn new(artifact_id: impl Into<String>, event_type: EventType) -> Self {
        Self {
            artifact_id: artifact_id.into(),
            event_type,
            from_version: None,
            to_version: None,
            change_type: "unknown".to_string(),
            actor_id: None,
            actor_name: None,
            actor_email: None,
            timestamp: Utc::now(),
            source_url: None,
            metadata: Map::new(),
        }
    }

    /// Set the version range
    pub fn with_versions(mut self, from: Option<String>, to: Option<String>) -> Self {
        self.from_version = from;
        self.to_version = to;
        self
    }

    /// Set the acting user
    pub fn with_actor(mut self, id: impl Into<String>, name: Option<String>) -> Self {
        self.actor_id = Some(id.into());
        self.actor_name = name;
        self
    }

    /// Content payload for the audit-event item
    pub fn to_content(&self) -> Map<String, Value> {
        let value = json!({
            "artifact_id": self.artifact_id,
            "event_type": self.event_type.as_str(),
            "from_version": self.from_version,
            "to_version": self.to_version,
            "change_type": self.change_type,
            "actor_id": self.actor_id,
            "actor_name": self.actor_name,
            "actor_email": self.actor_email,
            "timestamp": iso_timestamp(&self.timestamp),
            "source_url": self.source_url,
            "metadata": self.metadata,
        });
        into_map(value)
    }

    /// Evidence items for this change, in bundle order
    pub fn to_items(&self, diff: Option<&DiffResult>, source: &str) -> Vec<EvidenceItem> {
        let mut items = Vec::with_capacity(2);

        if let Some(diff) = diff {
            items.push(
                EvidenceItem::new(Uuid::new_v4().to_string(), source, KIND_DIFF, diff.to_content())
                    .with_created_at(self.timestamp),
            );
        }

        items.push(
            EvidenceItem::new(
                Uuid::new_v4().to_string(),
                source,
                KIND_AUDIT_EVENT,
                self.to_content(),
            )
            .with_created_at(self.timestamp)
            .with_tag(self.event_type.as_str()),
        );

        items
    }
}

/// Diff between two versions of an artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffResult {
    pub artifact_id: String,
    pub from_version: String,
    pub to_version: String,

    /// "text", "binary" or "structured"
    pub diff_type: String,

    #[serde(default)]
    pub hunks: Vec<Value>,

    #[serde(default)]
    pub stats: BTreeMap<String, i64>,

    pub from_hash: Option<String>,
    pub to_hash: Option<String>,
}

impl DiffResult {
    /// Stable identifier: `artifact:from:to`
    pub fn diff_id(&self) -> String {
        format!("{}:{}:{}", self.artifact_id, self.from_version, self.to_version)
    }

    /// Content payload for the diff item
    pub fn to_content(&self) -> Map<String, Value> {
        let value = json!({
            "diff_id": self.diff_id(),
            "algorithm": "unified",
            "from_hash": self.from_hash,
            "to_hash": self.to_hash,
            "hunks": self.hunks,
            "stats": self.stats,
        });
        into_map(value)
    }
}

/// Evidence items for a change: the diff (when present) precedes the event
pub fn change_items(event: &ChangeEvent, diff: Option<&DiffResult>, source: &str) -> Vec<EvidenceItem> {
    event.to_items(diff, source)
}

/// ISO-8601 with `+00:00`, microsecond precision, fraction omitted when zero
pub fn iso_timestamp(ts: &DateTime<Utc>) -> String {
    let format = if ts.nanosecond() / 1_000 == 0 {
        SecondsFormat::Secs
    } else {
        SecondsFormat::Micros
    };
    ts.to_rfc3339_opts(format, false)
}

fn into_map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

//! Evidence items handed to the core by connectors.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One discrete record of activity pulled from a source system.
///
/// Only `payload` feeds the content hash; the other fields identify and
/// describe the record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceItem {
    /// Unique identifier within the source system
    pub id: String,

    /// Source-system tag (e.g. "github", "jira")
    pub source: String,

    /// Kind/category of evidence; becomes the link's content type
    pub kind: String,

    /// When the record was created in the source system
    pub created_at: DateTime<Utc>,

    /// Opaque content
    pub payload: Map<String, Value>,

    /// Free-text tags
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub tags: BTreeSet<String>,
}

impl EvidenceItem {
    /// Create an item stamped with the current time
    pub fn new(
        id: impl Into<String>,
        source: impl Into<String>,
        kind: impl Into<String>,
        payload: Map<String, Value>,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            kind: kind.into(),
            created_at: Utc::now(),
            payload,
            tags: BTreeSet::new(),
        }
    }

    /// Override the creation timestamp
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Add a tag
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }
}

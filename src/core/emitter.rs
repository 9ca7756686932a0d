//! Seal-then-deliver driver.
//!
//! Coordinates connectors, the sealer and a sink. A sink is only ever
//! called with a bundle whose proof was built in full.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};
use tracing::{debug, info, instrument, warn};

use super::sealer::{seal_bundle, Sealer};
use crate::connectors::{ArtifactFilter, Connector, RiskTier};
use crate::domain::{change_items, ChangeEvent, DiffResult, EvidenceBundle, EvidenceItem};
use crate::error::SealError;
use crate::transport::{BundleSink, Delivery};

/// Version stamped into bundle metadata
pub const KERNEL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Bundle-level context for a change emission
#[derive(Debug, Clone, Default)]
pub struct ChangeContext {
    pub risk_tier: RiskTier,
    /// Associated work item; defaults to `connector-<artifact_id>`
    pub bead_id: Option<String>,
    /// Artifact metadata from the source (title, owner, url, ...)
    pub artifact: Map<String, Value>,
    pub connector_name: Option<String>,
}

impl ChangeContext {
    pub fn new(risk_tier: RiskTier) -> Self {
        Self {
            risk_tier,
            ..Self::default()
        }
    }

    pub fn with_bead_id(mut self, bead_id: impl Into<String>) -> Self {
        self.bead_id = Some(bead_id.into());
        self
    }

    pub fn with_artifact(mut self, artifact: Map<String, Value>) -> Self {
        self.artifact = artifact;
        self
    }

    pub fn with_connector_name(mut self, name: impl Into<String>) -> Self {
        self.connector_name = Some(name.into());
        self
    }
}

/// A sealed bundle and its delivery receipt
#[derive(Debug, Clone)]
pub struct Emission {
    pub bundle: EvidenceBundle,
    pub delivery: Delivery,
}

/// Seals item batches and hands them to a sink
pub struct Emitter {
    sealer: Arc<dyn Sealer>,
    sink: Arc<dyn BundleSink>,
}

impl Emitter {
    pub fn new(sealer: Arc<dyn Sealer>, sink: Arc<dyn BundleSink>) -> Self {
        Self { sealer, sink }
    }

    pub fn sealer(&self) -> &dyn Sealer {
        self.sealer.as_ref()
    }

    pub fn sink(&self) -> &dyn BundleSink {
        self.sink.as_ref()
    }

    /// Seal `items` in order and deliver the bundle
    #[instrument(skip(self, items, metadata), fields(item_count = items.len(), sealer = self.sealer.name(), sink = self.sink.name()))]
    pub async fn emit_items(
        &self,
        items: &[EvidenceItem],
        metadata: Option<Map<String, Value>>,
    ) -> Result<Emission, SealError> {
        let bundle = seal_bundle(self.sealer.as_ref(), items, metadata).await?;
        let delivery = self.sink.deliver(&bundle).await?;

        info!(
            bundle_id = %bundle.bundle_id(),
            root_hash = %bundle.root_hash(),
            location = %delivery.location,
            "Bundle emitted"
        );

        Ok(Emission { bundle, delivery })
    }

    /// Emit one change event, preceded by its diff when there is one
    #[instrument(skip(self, event, diff, context), fields(artifact_id = %event.artifact_id, event_type = event.event_type.as_str()))]
    pub async fn emit_change(
        &self,
        source: &str,
        event: &ChangeEvent,
        diff: Option<&DiffResult>,
        context: &ChangeContext,
    ) -> Result<Emission, SealError> {
        let items = change_items(event, diff, source);
        let metadata = change_metadata(source, event, context);
        self.emit_items(&items, Some(metadata)).await
    }

    /// Pull everything after `checkpoint` from a connector and emit it as
    /// one bundle.
    ///
    /// Items are matched against `filter` by their `path` payload field,
    /// falling back to the item id. The bundle's risk tier is the highest
    /// tier among kept items. Returns `None` when nothing is left to seal.
    /// The connector is disconnected whether or not fetching succeeds.
    #[instrument(skip(self, connector, filter), fields(connector = connector.name()))]
    pub async fn run(
        &self,
        connector: &mut dyn Connector,
        filter: &ArtifactFilter,
        checkpoint: Option<DateTime<Utc>>,
    ) -> Result<Option<Emission>, SealError> {
        connector.connect().await?;
        let fetched = connector.fetch_since(checkpoint).await;
        if let Err(e) = connector.disconnect().await {
            warn!(error = %e, "Disconnect failed");
        }
        let fetched = fetched?;

        let total = fetched.len();
        let items: Vec<EvidenceItem> = fetched
            .into_iter()
            .filter(|item| filter.should_process(artifact_path(item)))
            .collect();
        debug!(fetched = total, kept = items.len(), "Filtered items");

        if items.is_empty() {
            info!("Nothing new to seal");
            return Ok(None);
        }

        let risk_tier = items
            .iter()
            .map(|item| filter.risk_tier(artifact_path(item)))
            .max()
            .unwrap_or_default();

        let metadata = base_metadata(connector.source(), Some(connector.name()), risk_tier);
        self.emit_items(&items, Some(metadata)).await.map(Some)
    }
}

fn artifact_path(item: &EvidenceItem) -> &str {
    item.payload
        .get("path")
        .and_then(Value::as_str)
        .unwrap_or(&item.id)
}

fn change_metadata(source: &str, event: &ChangeEvent, context: &ChangeContext) -> Map<String, Value> {
    let mut metadata = base_metadata(source, context.connector_name.as_deref(), context.risk_tier);

    let bead_id = context
        .bead_id
        .clone()
        .unwrap_or_else(|| format!("connector-{}", event.artifact_id));
    let title = context
        .artifact
        .get("title")
        .and_then(Value::as_str)
        .unwrap_or(&event.artifact_id);

    metadata.insert("bead_id".to_string(), json!(bead_id));
    metadata.insert("artifact_id".to_string(), json!(event.artifact_id));
    metadata.insert("event_type".to_string(), json!(event.event_type.as_str()));
    metadata.insert(
        "from_version_id".to_string(),
        json!(event.from_version.as_deref().unwrap_or("initial")),
    );
    metadata.insert(
        "to_version_id".to_string(),
        json!(event.to_version.as_deref().unwrap_or("current")),
    );
    metadata.insert(
        "assertion_text".to_string(),
        json!(format!("Evidence of change to {}", title)),
    );
    if !context.artifact.is_empty() {
        metadata.insert("artifact".to_string(), Value::Object(context.artifact.clone()));
    }
    metadata
}

fn base_metadata(source: &str, name: Option<&str>, risk_tier: RiskTier) -> Map<String, Value> {
    let mut metadata = Map::new();
    metadata.insert("connector_type".to_string(), json!(source));
    if let Some(name) = name {
        metadata.insert("connector_name".to_string(), json!(name));
    }
    metadata.insert("risk_tier".to_string(), json!(risk_tier.as_str()));
    metadata.insert("kernel_version".to_string(), json!(KERNEL_VERSION));
    metadata
}

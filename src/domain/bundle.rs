//! Hash chain links, immutability proofs and the bundle container.
//!
//! These types are produced in a single assembly pass and never mutated
//! afterwards: fields are private and only readable through accessors.
//! A changed evidence set is a new bundle.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::core::digest::Digest;

/// Wire schema version of [`EvidenceBundle`]
pub const SCHEMA_VERSION: &str = "0.2.0";

/// One position in the hash chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashChainLink {
    sequence: u64,
    item_id: String,
    content_type: String,
    content_hash: Digest,
    previous_hash: Digest,
    chain_hash: Digest,
}

impl HashChainLink {
    pub(crate) fn new(
        sequence: u64,
        item_id: String,
        content_type: String,
        content_hash: Digest,
        previous_hash: Digest,
        chain_hash: Digest,
    ) -> Self {
        Self {
            sequence,
            item_id,
            content_type,
            content_hash,
            previous_hash,
            chain_hash,
        }
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn item_id(&self) -> &str {
        &self.item_id
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn content_hash(&self) -> &Digest {
        &self.content_hash
    }

    pub fn previous_hash(&self) -> &Digest {
        &self.previous_hash
    }

    pub fn chain_hash(&self) -> &Digest {
        &self.chain_hash
    }
}

/// Ordered chain plus its root hash
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImmutabilityProof {
    hash_chain: Vec<HashChainLink>,
    root_hash: Digest,
}

impl ImmutabilityProof {
    pub(crate) fn new(hash_chain: Vec<HashChainLink>, root_hash: Digest) -> Self {
        Self {
            hash_chain,
            root_hash,
        }
    }

    pub fn hash_chain(&self) -> &[HashChainLink] {
        &self.hash_chain
    }

    pub fn root_hash(&self) -> &Digest {
        &self.root_hash
    }

    pub fn len(&self) -> usize {
        self.hash_chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hash_chain.is_empty()
    }
}

/// An evidence item as carried inside a bundle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleItem {
    item_id: String,
    sequence: u64,
    content_type: String,
    content: Map<String, Value>,
    content_hash: Digest,
    source: String,
    created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    tags: BTreeSet<String>,
}

impl BundleItem {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        item_id: String,
        sequence: u64,
        content_type: String,
        content: Map<String, Value>,
        content_hash: Digest,
        source: String,
        created_at: DateTime<Utc>,
        tags: BTreeSet<String>,
    ) -> Self {
        Self {
            item_id,
            sequence,
            content_type,
            content,
            content_hash,
            source,
            created_at,
            tags,
        }
    }

    pub fn item_id(&self) -> &str {
        &self.item_id
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn content(&self) -> &Map<String, Value> {
        &self.content
    }

    /// Content hash as stored; the verifier recomputes it
    pub fn content_hash(&self) -> &Digest {
        &self.content_hash
    }

    /// Provenance only, not covered by the chain
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Provenance only, not covered by the chain
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }
}

/// The externally visible, sealed artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceBundle {
    version: String,
    bundle_id: Uuid,
    created_at: DateTime<Utc>,
    items: Vec<BundleItem>,
    immutability_proof: ImmutabilityProof,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    metadata: Option<Map<String, Value>>,
}

impl EvidenceBundle {
    pub(crate) fn new(
        bundle_id: Uuid,
        created_at: DateTime<Utc>,
        items: Vec<BundleItem>,
        immutability_proof: ImmutabilityProof,
        metadata: Option<Map<String, Value>>,
    ) -> Self {
        Self {
            version: SCHEMA_VERSION.to_string(),
            bundle_id,
            created_at,
            items,
            immutability_proof,
            metadata,
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn bundle_id(&self) -> Uuid {
        self.bundle_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn items(&self) -> &[BundleItem] {
        &self.items
    }

    pub fn proof(&self) -> &ImmutabilityProof {
        &self.immutability_proof
    }

    pub fn root_hash(&self) -> &Digest {
        self.immutability_proof.root_hash()
    }

    pub fn metadata(&self) -> Option<&Map<String, Value>> {
        self.metadata.as_ref()
    }

    /// Pretty-printed wire JSON
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::digest::{empty_root, GENESIS};
    use serde_json::json;

    fn sample_bundle() -> EvidenceBundle {
        let link = HashChainLink::new(
            0,
            "i-0".to_string(),
            "note".to_string(),
            empty_root(),
            GENESIS,
            empty_root(),
        );
        let item = BundleItem::new(
            "i-0".to_string(),
            0,
            "note".to_string(),
            Map::new(),
            empty_root(),
            "test".to_string(),
            Utc::now(),
            BTreeSet::new(),
        );
        EvidenceBundle::new(
            Uuid::new_v4(),
            Utc::now(),
            vec![item],
            ImmutabilityProof::new(vec![link], empty_root()),
            None,
        )
    }

    #[test]
    fn test_wire_field_names() {
        let json = serde_json::to_value(sample_bundle()).unwrap();

        assert_eq!(json["version"], SCHEMA_VERSION);
        assert!(json["bundle_id"].is_string());
        assert!(json["created_at"].is_string());
        assert!(json.get("metadata").is_none());

        let item = &json["items"][0];
        for field in ["item_id", "sequence", "content_type", "content", "content_hash"] {
            assert!(item.get(field).is_some(), "missing item field {}", field);
        }

        let link = &json["immutability_proof"]["hash_chain"][0];
        for field in [
            "sequence",
            "item_id",
            "content_type",
            "content_hash",
            "previous_hash",
            "chain_hash",
        ] {
            assert!(link.get(field).is_some(), "missing link field {}", field);
        }
        assert_eq!(link["previous_hash"], json!("0".repeat(64)));
        assert!(json["immutability_proof"]["root_hash"].is_string());
    }

    #[test]
    fn test_bundle_serde_roundtrip_preserves_everything() {
        let bundle = sample_bundle();
        let text = bundle.to_json_pretty().unwrap();
        let parsed: EvidenceBundle = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, bundle);
    }
}

//! Independent bundle verification.
//!
//! Every hash is recomputed from item content; stored hashes are only ever
//! compared against, never trusted. Outcomes are values, not errors, so
//! bundles can be classified in bulk.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use super::chain::{content_hash, link_hash, root_hash};
use super::digest::{Digest, GENESIS};
use crate::domain::{EvidenceBundle, SCHEMA_VERSION};

/// Hash field where a link first diverged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkField {
    /// The item's own `content_hash` does not match its content
    ItemContentHash,
    /// The link's `content_hash` does not match the item content
    ContentHash,
    /// The link's `previous_hash` does not match the recomputed predecessor
    PreviousHash,
    /// The link's `chain_hash` does not match the recomputed value
    ChainHash,
}

/// Where verification first disagreed with the shipped proof
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "at", rename_all = "snake_case")]
pub enum Divergence {
    Link { sequence: u64, field: LinkField },
    /// All links match but the stored root does not
    Root,
}

impl Divergence {
    /// Sequence number of the first divergent link, if any
    pub fn sequence(&self) -> Option<u64> {
        match self {
            Divergence::Link { sequence, .. } => Some(*sequence),
            Divergence::Root => None,
        }
    }
}

/// Result of verifying one bundle
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Verification {
    /// Structure and every hash match
    Valid { root_hash: Digest, item_count: usize },
    /// Some hash differs from its recomputation
    Tampered { divergence: Divergence },
    /// A structural precondition does not hold
    Malformed { reason: String },
}

impl Verification {
    pub fn is_valid(&self) -> bool {
        matches!(self, Verification::Valid { .. })
    }

    pub fn is_tampered(&self) -> bool {
        matches!(self, Verification::Tampered { .. })
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, Verification::Malformed { .. })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Verification::Valid { .. } => "valid",
            Verification::Tampered { .. } => "tampered",
            Verification::Malformed { .. } => "malformed",
        }
    }

    fn malformed(reason: impl Into<String>) -> Self {
        Verification::Malformed {
            reason: reason.into(),
        }
    }

    fn tampered_at(sequence: u64, field: LinkField) -> Self {
        Verification::Tampered {
            divergence: Divergence::Link { sequence, field },
        }
    }
}

impl fmt::Display for Verification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verification::Valid {
                root_hash,
                item_count,
            } => write!(f, "valid ({} items, root {})", item_count, root_hash),
            Verification::Tampered {
                divergence: Divergence::Link { sequence, field },
            } => write!(f, "tampered at sequence {} ({:?})", sequence, field),
            Verification::Tampered {
                divergence: Divergence::Root,
            } => write!(f, "tampered root hash"),
            Verification::Malformed { reason } => write!(f, "malformed: {}", reason),
        }
    }
}

/// Verify a decoded bundle
pub fn verify(bundle: &EvidenceBundle) -> Verification {
    if bundle.version() != SCHEMA_VERSION {
        return Verification::malformed(format!(
            "unknown schema version '{}' (expected '{}')",
            bundle.version(),
            SCHEMA_VERSION
        ));
    }

    let items = bundle.items();
    let chain = bundle.proof().hash_chain();
    if items.len() != chain.len() {
        return Verification::malformed(format!(
            "{} items but {} chain links",
            items.len(),
            chain.len()
        ));
    }

    // Structure first, so a tamper report always refers to a well-formed chain
    for (position, (item, link)) in items.iter().zip(chain).enumerate() {
        let sequence = position as u64;
        if item.sequence() != sequence {
            return Verification::malformed(format!(
                "item at position {} has sequence {}",
                position,
                item.sequence()
            ));
        }
        if link.sequence() != sequence {
            return Verification::malformed(format!(
                "link at position {} has sequence {}",
                position,
                link.sequence()
            ));
        }
        if link.item_id() != item.item_id() {
            return Verification::malformed(format!(
                "link {} covers '{}' but item is '{}'",
                sequence,
                link.item_id(),
                item.item_id()
            ));
        }
        if link.content_type() != item.content_type() {
            return Verification::malformed(format!(
                "link {} has content type '{}' but item has '{}'",
                sequence,
                link.content_type(),
                item.content_type()
            ));
        }
    }

    let mut previous = GENESIS;
    let mut recomputed = Vec::with_capacity(chain.len());

    for (item, link) in items.iter().zip(chain) {
        let sequence = link.sequence();

        // Sealed content always canonicalizes, so a failure here is a payload edit
        let computed_content = match content_hash(item.content()) {
            Ok(hash) => hash,
            Err(_) => return Verification::tampered_at(sequence, LinkField::ItemContentHash),
        };

        if computed_content != *item.content_hash() {
            return Verification::tampered_at(sequence, LinkField::ItemContentHash);
        }
        if computed_content != *link.content_hash() {
            return Verification::tampered_at(sequence, LinkField::ContentHash);
        }
        if *link.previous_hash() != previous {
            return Verification::tampered_at(sequence, LinkField::PreviousHash);
        }

        let computed_chain = link_hash(&computed_content, &previous, sequence);
        if computed_chain != *link.chain_hash() {
            return Verification::tampered_at(sequence, LinkField::ChainHash);
        }

        recomputed.push(computed_chain);
        previous = computed_chain;
    }

    let computed_root = root_hash(&recomputed);
    if computed_root != *bundle.root_hash() {
        return Verification::Tampered {
            divergence: Divergence::Root,
        };
    }

    Verification::Valid {
        root_hash: computed_root,
        item_count: items.len(),
    }
}

/// Verify raw wire bytes.
///
/// Anything that does not decode into the current bundle shape is
/// `Malformed`, including the legacy `schemaVersion`/`proof` layout.
pub fn verify_json(bytes: &[u8]) -> Verification {
    let value: Value = match serde_json::from_slice(bytes) {
        Ok(value) => value,
        Err(e) => return Verification::malformed(format!("invalid JSON: {}", e)),
    };
    verify_value(value)
}

/// Verify an already-parsed JSON document
pub fn verify_value(value: Value) -> Verification {
    let Some(object) = value.as_object() else {
        return Verification::malformed("bundle is not a JSON object");
    };

    if object.contains_key("schemaVersion") || object.contains_key("proof") {
        return Verification::malformed("unsupported schema shape (schemaVersion/proof)");
    }

    match object.get("version").and_then(Value::as_str) {
        Some(SCHEMA_VERSION) => {}
        Some(other) => {
            return Verification::malformed(format!("unknown schema version '{}'", other));
        }
        None => return Verification::malformed("missing schema version"),
    }

    match serde_json::from_value::<EvidenceBundle>(value) {
        Ok(bundle) => verify(&bundle),
        Err(e) => Verification::malformed(format!("invalid bundle: {}", e)),
    }
}

/// Verify many bundles; one result per input, in order
pub fn verify_all<'a, I>(bundles: I) -> Vec<Verification>
where
    I: IntoIterator<Item = &'a EvidenceBundle>,
{
    bundles.into_iter().map(verify).collect()
}

//! Bundle assembly: items + proof -> sealed bundle.

use chrono::Utc;
use serde_json::{Map, Value};
use tracing::debug;
use uuid::Uuid;

use super::chain::build_proof;
use crate::domain::{BundleItem, EvidenceBundle, EvidenceItem, ImmutabilityProof};
use crate::error::SealError;

/// Package items and the proof built from them into a bundle.
///
/// Bundle id and creation time are generated here and are not part of the
/// chain. Items must line up with the chain by position; a mismatch means
/// the proof was built from different items and is a programming error.
pub fn assemble(
    items: &[EvidenceItem],
    proof: ImmutabilityProof,
    metadata: Option<Map<String, Value>>,
) -> Result<EvidenceBundle, SealError> {
    let chain = proof.hash_chain();

    if items.len() != chain.len() {
        return Err(SealError::BuilderContract(format!(
            "{} items but {} chain links",
            items.len(),
            chain.len()
        )));
    }

    let mut bundle_items = Vec::with_capacity(items.len());
    for (position, (item, link)) in items.iter().zip(chain).enumerate() {
        let sequence = position as u64;

        if link.sequence() != sequence {
            return Err(SealError::BuilderContract(format!(
                "link at position {} carries sequence {}",
                position,
                link.sequence()
            )));
        }
        if link.item_id() != item.id {
            return Err(SealError::BuilderContract(format!(
                "link {} covers item '{}' but item '{}' is at that position",
                sequence,
                link.item_id(),
                item.id
            )));
        }

        bundle_items.push(BundleItem::new(
            item.id.clone(),
            sequence,
            item.kind.clone(),
            item.payload.clone(),
            *link.content_hash(),
            item.source.clone(),
            item.created_at,
            item.tags.clone(),
        ));
    }

    let bundle = EvidenceBundle::new(Uuid::new_v4(), Utc::now(), bundle_items, proof, metadata);
    debug!(
        bundle_id = %bundle.bundle_id(),
        item_count = bundle.items().len(),
        root_hash = %bundle.root_hash(),
        "Assembled evidence bundle"
    );

    Ok(bundle)
}

/// Build the proof in-process and assemble in one step
pub fn seal_local(
    items: &[EvidenceItem],
    metadata: Option<Map<String, Value>>,
) -> Result<EvidenceBundle, SealError> {
    let proof = build_proof(items)?;
    assemble(items, proof, metadata)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn items() -> Vec<EvidenceItem> {
        vec![
            EvidenceItem::new("a", "test", "x", json!({"a": 1}).as_object().cloned().unwrap()),
            EvidenceItem::new("b", "test", "y", json!({"b": 2}).as_object().cloned().unwrap()),
        ]
    }

    #[test]
    fn test_assemble_carries_items_in_order() {
        let items = items();
        let bundle = seal_local(&items, None).unwrap();

        assert_eq!(bundle.items().len(), 2);
        assert_eq!(bundle.items()[0].item_id(), "a");
        assert_eq!(bundle.items()[1].sequence(), 1);
        assert_eq!(bundle.items()[1].content_type(), "y");
        assert_eq!(
            bundle.items()[1].content_hash(),
            bundle.proof().hash_chain()[1].content_hash()
        );
    }

    #[test]
    fn test_length_mismatch_is_contract_violation() {
        let items = items();
        let proof = build_proof(&items[..1]).unwrap();
        let result = assemble(&items, proof, None);
        assert!(matches!(result, Err(SealError::BuilderContract(_))));
    }

    #[test]
    fn test_identity_mismatch_is_contract_violation() {
        let items = items();
        let proof = build_proof(&items).unwrap();
        let swapped = vec![items[1].clone(), items[0].clone()];
        let result = assemble(&swapped, proof, None);
        assert!(matches!(result, Err(SealError::BuilderContract(_))));
    }

    #[test]
    fn test_fresh_identity_per_assembly() {
        let items = items();
        let first = seal_local(&items, None).unwrap();
        let second = seal_local(&items, None).unwrap();

        assert_ne!(first.bundle_id(), second.bundle_id());
        assert_eq!(first.proof(), second.proof());
    }

    #[test]
    fn test_metadata_is_carried() {
        let metadata = json!({"connector": "github"}).as_object().cloned();
        let bundle = seal_local(&items(), metadata).unwrap();
        assert_eq!(bundle.metadata().unwrap()["connector"], "github");
    }
}

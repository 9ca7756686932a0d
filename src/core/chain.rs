//! Hash chain construction.
//!
//! For the item at position `i`:
//!
//! ```text
//! content_hash[i]  = SHA256(jcs(payload[i]))
//! previous_hash[0] = GENESIS (32 zero bytes)
//! previous_hash[i] = chain_hash[i-1]
//! chain_hash[i]    = SHA256(content_hash[i] || previous_hash[i] || be_u64(i))
//! root_hash        = SHA256(chain_hash[0] || ... || chain_hash[n-1])
//! ```
//!
//! Concatenation is over raw digest bytes, so each link hashes exactly 72
//! bytes. An empty chain has `root_hash = SHA256("")`.
//!
//! Only item content and position feed the chain. Bundle ids and
//! timestamps stay out, so resealing identical content yields an identical
//! proof.

use serde_json::{Map, Value};
use sha2::{Digest as _, Sha256};

use super::canonical::canonicalize_payload;
use super::digest::{sha256, Digest, GENESIS};
use crate::domain::{EvidenceItem, HashChainLink, ImmutabilityProof};
use crate::error::SealError;

/// SHA-256 of the canonical payload bytes
pub fn content_hash(payload: &Map<String, Value>) -> Result<Digest, SealError> {
    Ok(sha256(&canonicalize_payload(payload)?))
}

/// Chain hash binding a content hash to its predecessor and position
pub fn link_hash(content_hash: &Digest, previous: &Digest, sequence: u64) -> Digest {
    let mut hasher = Sha256::new();
    hasher.update(content_hash.as_bytes());
    hasher.update(previous.as_bytes());
    hasher.update(sequence.to_be_bytes());

    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&hasher.finalize());
    Digest::from_bytes(bytes)
}

/// Root hash over chain hashes in link order
pub fn root_hash<'a, I>(chain_hashes: I) -> Digest
where
    I: IntoIterator<Item = &'a Digest>,
{
    let mut hasher = Sha256::new();
    for hash in chain_hashes {
        hasher.update(hash.as_bytes());
    }

    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&hasher.finalize());
    Digest::from_bytes(bytes)
}

/// Incremental chain builder.
///
/// Entries are appended in order; `finish` computes the root.
#[derive(Debug, Clone)]
pub struct ChainBuilder {
    links: Vec<HashChainLink>,
    previous: Digest,
}

impl Default for ChainBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ChainBuilder {
    pub fn new() -> Self {
        Self {
            links: Vec::new(),
            previous: GENESIS,
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            links: Vec::with_capacity(capacity),
            previous: GENESIS,
        }
    }

    /// Append the next entry and return its link
    pub fn push(
        &mut self,
        item_id: &str,
        content_type: &str,
        payload: &Map<String, Value>,
    ) -> Result<&HashChainLink, SealError> {
        let sequence = self.links.len() as u64;
        let content_hash = content_hash(payload).map_err(|e| e.for_item(item_id))?;
        let chain_hash = link_hash(&content_hash, &self.previous, sequence);

        self.links.push(HashChainLink::new(
            sequence,
            item_id.to_string(),
            content_type.to_string(),
            content_hash,
            self.previous,
            chain_hash,
        ));
        self.previous = chain_hash;

        Ok(&self.links[self.links.len() - 1])
    }

    /// Number of links so far
    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Seal the chain
    pub fn finish(self) -> ImmutabilityProof {
        let root = root_hash(self.links.iter().map(|link| link.chain_hash()));
        ImmutabilityProof::new(self.links, root)
    }
}

/// Build the proof for an ordered item sequence.
///
/// Any item that cannot be canonicalized aborts the whole proof.
pub fn build_proof(items: &[EvidenceItem]) -> Result<ImmutabilityProof, SealError> {
    let mut builder = ChainBuilder::with_capacity(items.len());
    for item in items {
        builder.push(&item.id, &item.kind, &item.payload)?;
    }
    Ok(builder.finish())
}

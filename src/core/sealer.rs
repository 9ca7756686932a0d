//! Pluggable proof construction.
//!
//! A sealer turns an ordered item sequence into an [`ImmutabilityProof`].
//! The local sealer runs the chain builder in-process; the remote sealer
//! delegates to a sealing service and accepts its answer only if it matches
//! the reference algorithm exactly.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};

use super::assembler::assemble;
use super::chain::build_proof;
use crate::domain::{EvidenceBundle, EvidenceItem, ImmutabilityProof};
use crate::error::SealError;

/// Trait for proof construction backends
#[async_trait]
pub trait Sealer: Send + Sync {
    /// Human-readable sealer name
    fn name(&self) -> &str;

    /// Build the proof for items in the given order
    async fn seal(&self, items: &[EvidenceItem]) -> Result<ImmutabilityProof, SealError>;
}

/// Seal with any backend and assemble the bundle.
///
/// No bundle is produced unless sealing succeeds.
pub async fn seal_bundle(
    sealer: &dyn Sealer,
    items: &[EvidenceItem],
    metadata: Option<Map<String, Value>>,
) -> Result<EvidenceBundle, SealError> {
    let proof = sealer.seal(items).await?;
    assemble(items, proof, metadata)
}

/// Default batch size above which local sealing moves to a blocking thread
pub const DEFAULT_BLOCKING_THRESHOLD: usize = 256;

/// In-process reference sealer
#[derive(Debug, Clone)]
pub struct LocalSealer {
    blocking_threshold: usize,
}

impl Default for LocalSealer {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalSealer {
    pub fn new() -> Self {
        Self {
            blocking_threshold: DEFAULT_BLOCKING_THRESHOLD,
        }
    }

    /// Batches larger than `threshold` are hashed on the blocking pool
    pub fn with_blocking_threshold(threshold: usize) -> Self {
        Self {
            blocking_threshold: threshold,
        }
    }
}

#[async_trait]
impl Sealer for LocalSealer {
    fn name(&self) -> &str {
        "local"
    }

    #[instrument(skip(self, items), fields(item_count = items.len()))]
    async fn seal(&self, items: &[EvidenceItem]) -> Result<ImmutabilityProof, SealError> {
        if items.len() <= self.blocking_threshold {
            return build_proof(items);
        }

        debug!("Sealing on blocking pool");
        let owned = items.to_vec();
        tokio::task::spawn_blocking(move || build_proof(&owned))
            .await
            .map_err(|e| SealError::SealingUnavailable(format!("sealing task failed: {}", e)))?
    }
}

/// Entry sent to a sealing service: just what the chain covers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SealEntry {
    pub item_id: String,
    pub content_type: String,
    pub content: Map<String, Value>,
}

/// Request body for `POST {url}/seal`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SealRequest {
    pub items: Vec<SealEntry>,
}

impl SealRequest {
    pub fn from_items(items: &[EvidenceItem]) -> Self {
        Self {
            items: items
                .iter()
                .map(|item| SealEntry {
                    item_id: item.id.clone(),
                    content_type: item.kind.clone(),
                    content: item.payload.clone(),
                })
                .collect(),
        }
    }
}

/// Client for an external sealing service.
///
/// The service answers with an `ImmutabilityProof` as JSON. Its proof is
/// recomputed locally and rejected on any difference.
pub struct RemoteSealer {
    /// Service base URL
    base_url: String,
    /// Request timeout
    timeout: Duration,
    /// HTTP client
    client: reqwest::Client,
}

impl RemoteSealer {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
            client: reqwest::Client::new(),
        }
    }

    fn seal_url(&self) -> String {
        format!("{}/seal", self.base_url)
    }

    async fn request_proof(&self, items: &[EvidenceItem]) -> Result<ImmutabilityProof, SealError> {
        let response = self
            .client
            .post(self.seal_url())
            .timeout(self.timeout)
            .json(&SealRequest::from_items(items))
            .send()
            .await
            .map_err(|e| SealError::SealingUnavailable(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SealError::SealingUnavailable(format!(
                "sealing service returned {}",
                status
            )));
        }

        response
            .json::<ImmutabilityProof>()
            .await
            .map_err(|e| SealError::SealingUnavailable(format!("incomplete proof: {}", e)))
    }
}

#[async_trait]
impl Sealer for RemoteSealer {
    fn name(&self) -> &str {
        "remote"
    }

    #[instrument(skip(self, items), fields(item_count = items.len(), url = %self.base_url))]
    async fn seal(&self, items: &[EvidenceItem]) -> Result<ImmutabilityProof, SealError> {
        // Fail on bad content before any network traffic
        let reference = build_proof(items)?;
        let proof = self.request_proof(items).await?;

        if proof.len() != reference.len() {
            warn!(
                expected = reference.len(),
                actual = proof.len(),
                "Remote proof has wrong length"
            );
            return Err(SealError::SealingUnavailable(format!(
                "incomplete proof: {} links for {} items",
                proof.len(),
                reference.len()
            )));
        }

        if let Some((remote, local)) = proof
            .hash_chain()
            .iter()
            .zip(reference.hash_chain())
            .find(|(remote, local)| remote != local)
        {
            warn!(sequence = local.sequence(), "Remote proof diverges from reference");
            return Err(SealError::SealingUnavailable(format!(
                "remote link {} diverges from reference (item '{}')",
                local.sequence(),
                remote.item_id()
            )));
        }

        if proof.root_hash() != reference.root_hash() {
            return Err(SealError::SealingUnavailable(
                "remote root hash diverges from reference".to_string(),
            ));
        }

        Ok(proof)
    }
}

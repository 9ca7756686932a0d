//! evidence-seal - Tamper-evident evidence bundles
//!
//! Collects records from source systems, seals them into an ordered
//! SHA-256 hash chain, and ships them as self-verifying JSON bundles.
//!
//! # Architecture
//!
//! Sealing is deterministic:
//! - Item content is serialized as RFC 8785 canonical JSON before hashing
//! - Each link commits to its content, its predecessor and its position
//! - The root hash commits to the whole chain
//! - Anyone holding a bundle can recompute every hash and locate the
//!   first divergence
//!
//! # Modules
//!
//! - `connectors`: Source-system interface, filters and risk tiers
//! - `core`: Canonicalization, hash chain, assembly, verification, sealers
//! - `domain`: Data structures (EvidenceItem, EvidenceBundle, ChangeEvent)
//! - `transport`: Bundle sinks (file, API, webhook) and signatures
//! - `config`: YAML configuration with environment overrides
//!
//! # Usage
//!
//! ```rust,ignore
//! use evidence_seal::{seal_local, verify, EvidenceItem};
//!
//! let bundle = seal_local(&items, None)?;
//! assert!(verify(&bundle).is_valid());
//! ```

pub mod config;
pub mod connectors;
pub mod core;
pub mod domain;
pub mod error;
pub mod transport;

pub use crate::connectors::{ArtifactFilter, Connector, ConnectorState, JsonlConnector, RiskTier};
pub use crate::core::{
    seal_bundle, seal_local, verify, verify_json, ChangeContext, Digest, Emission, Emitter, LocalSealer,
    RemoteSealer, Sealer, Verification,
};
pub use crate::domain::{ChangeEvent, DiffResult, EventType, EvidenceBundle, EvidenceItem};
pub use crate::error::SealError;
pub use crate::transport::{ApiSink, BundleSink, Delivery, FileSink, WebhookSink};

//! Domain types for evidence sealing.
//!
//! This module contains the core data structures:
//! - EvidenceItem: Records handed over by connectors
//! - Bundle: Chain links, proofs and the sealed container
//! - Events: Change events and diffs from source systems

pub mod bundle;
pub mod events;
pub mod item;

// Re-export commonly used types
pub use bundle::{BundleItem, EvidenceBundle, HashChainLink, ImmutabilityProof, SCHEMA_VERSION};
pub use events::{change_items, ChangeEvent, DiffResult, EventType, KIND_AUDIT_EVENT, KIND_DIFF};
pub use item::EvidenceItem;

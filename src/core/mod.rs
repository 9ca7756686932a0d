//! Sealing core.
//!
//! This module contains:
//! - Digest: SHA-256 values and hex encoding
//! - Canonical: Deterministic JSON serialization
//! - Chain: Hash chain construction
//! - Assembler: Items + proof into bundles
//! - Verifier: Independent recomputation
//! - Sealer: Local and remote proof backends
//! - Emitter: Seal-then-deliver driver

pub mod assembler;
pub mod canonical;
pub mod chain;
pub mod digest;
pub mod emitter;
pub mod sealer;
pub mod verifier;

// Re-export commonly used types
pub use assembler::{assemble, seal_local};
pub use canonical::{canonical_string, canonicalize, canonicalize_payload, MAX_DEPTH};
pub use chain::{build_proof, content_hash, link_hash, root_hash, ChainBuilder};
pub use digest::{empty_root, sha256, Digest, DigestError, GENESIS};
pub use emitter::{ChangeContext, Emission, Emitter, KERNEL_VERSION};
pub use sealer::{seal_bundle, LocalSealer, RemoteSealer, SealEntry, SealRequest, Sealer};
pub use verifier::{
    verify, verify_all, verify_json, verify_value, Divergence, LinkField, Verification,
};

//! SHA-256 digests as they appear in hash chains and on the wire.
//!
//! On the wire a digest is 64 lowercase hex characters with no prefix.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest as _, Sha256};
use thiserror::Error;

/// Width of every digest in bytes
pub const DIGEST_LEN: usize = 32;

/// Previous-hash sentinel for the first link of every chain
pub const GENESIS: Digest = Digest([0u8; DIGEST_LEN]);

/// A 32-byte SHA-256 value
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest([u8; DIGEST_LEN]);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DigestError {
    #[error("Invalid hex digest: {0}")]
    InvalidHex(String),

    #[error("Invalid digest length: expected {expected} hex chars, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

impl Digest {
    pub const fn from_bytes(bytes: [u8; DIGEST_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    /// Lowercase hex, no prefix
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse 64 hex characters (either case)
    pub fn from_hex(s: &str) -> Result<Self, DigestError> {
        if s.len() != DIGEST_LEN * 2 {
            return Err(DigestError::InvalidLength {
                expected: DIGEST_LEN * 2,
                actual: s.len(),
            });
        }

        let mut bytes = [0u8; DIGEST_LEN];
        hex::decode_to_slice(s, &mut bytes).map_err(|e| DigestError::InvalidHex(e.to_string()))?;
        Ok(Self(bytes))
    }

    pub fn is_genesis(&self) -> bool {
        *self == GENESIS
    }
}

/// SHA-256 of a byte string
pub fn sha256(data: &[u8]) -> Digest {
    let out = Sha256::digest(data);
    let mut bytes = [0u8; DIGEST_LEN];
    bytes.copy_from_slice(&out);
    Digest(bytes)
}

/// Root hash of a chain with no links: SHA-256 of the empty string
pub fn empty_root() -> Digest {
    sha256(b"")
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.to_hex())
    }
}

impl std::str::FromStr for Digest {
    type Err = DigestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for Digest {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

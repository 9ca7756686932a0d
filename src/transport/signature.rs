//! HMAC-SHA-256 webhook signatures.
//!
//! The header value is `sha256=<lowercase hex>` over the exact request body.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::SealError;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the signature
pub const SIGNATURE_HEADER: &str = "X-Signature-256";

const PREFIX: &str = "sha256=";

/// Signature header value for `body`
pub fn sign(secret: &[u8], body: &[u8]) -> Result<String, SealError> {
    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| SealError::Transport(format!("invalid signing key: {}", e)))?;
    mac.update(body);
    Ok(format!("{}{}", PREFIX, hex::encode(mac.finalize().into_bytes())))
}

/// Check a received header against `body` in constant time
pub fn verify(secret: &[u8], body: &[u8], header: &str) -> bool {
    let Some(encoded) = header.trim().strip_prefix(PREFIX) else {
        return false;
    };
    let Ok(expected) = hex::decode(encoded) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

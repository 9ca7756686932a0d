//! Error taxonomy for sealing, connectors and transports.
//!
//! Verification outcomes (tampered, malformed) are not errors; see
//! [`crate::core::verifier::Verification`].

use thiserror::Error;

/// Errors raised while producing or delivering an evidence bundle
#[derive(Debug, Clone, Error)]
pub enum SealError {
    /// Data retrieval was attempted before the connector connected
    #[error("Connector '{connector}' is not connected")]
    NotConnected { connector: String },

    /// A connector failed to connect, read or map a record
    #[error("Connector '{connector}' failed: {reason}")]
    Connector { connector: String, reason: String },

    /// Payload contains a value with no deterministic encoding
    #[error("Canonicalization failed{}: {reason}", item_suffix(.item_id))]
    Canonicalization {
        item_id: Option<String>,
        reason: String,
    },

    /// Items and proof do not line up (a programming error)
    #[error("Builder contract violated: {0}")]
    BuilderContract(String),

    /// The sealing backend is missing, unreachable or returned a bad proof
    #[error("Sealing unavailable: {0}")]
    SealingUnavailable(String),

    /// A bundle sink failed to deliver
    #[error("Transport failed: {0}")]
    Transport(String),
}

fn item_suffix(item_id: &Option<String>) -> String {
    match item_id {
        Some(id) => format!(" for item '{}'", id),
        None => String::new(),
    }
}

impl SealError {
    pub(crate) fn canonicalization(reason: impl Into<String>) -> Self {
        Self::Canonicalization {
            item_id: None,
            reason: reason.into(),
        }
    }

    /// Attach an item id to a canonicalization failure
    pub(crate) fn for_item(self, id: &str) -> Self {
        match self {
            Self::Canonicalization { reason, .. } => Self::Canonicalization {
                item_id: Some(id.to_string()),
                reason,
            },
            other => other,
        }
    }

    /// Whether retrying the same call can succeed without code changes
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NotConnected { .. } | Self::SealingUnavailable(_) | Self::Transport(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonicalization_message_names_item() {
        let err = SealError::canonicalization("depth exceeded").for_item("item-7");
        assert_eq!(
            err.to_string(),
            "Canonicalization failed for item 'item-7': depth exceeded"
        );

        let bare = SealError::canonicalization("depth exceeded");
        assert_eq!(bare.to_string(), "Canonicalization failed: depth exceeded");
    }

    #[test]
    fn test_retryable_classification() {
        assert!(SealError::NotConnected {
            connector: "x".to_string()
        }
        .is_retryable());
        assert!(!SealError::BuilderContract("len".to_string()).is_retryable());
        assert!(!SealError::canonicalization("nan").is_retryable());
    }
}

//! Error types for the En-Buddy client.

use serde::Serialize;
use thiserror::Error;

/// A shared error type for the whole En-Buddy workspace.
///
/// Variants follow the failure taxonomy of the client core: validation
/// errors are raised before any request is made, transport errors come from
/// a failed request or a non-success status, mid-stream errors come from a
/// body that broke off after delivery started, and storage errors come from
/// a failed write-back of the local record store.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
pub enum EnBuddyError {
    /// Required input was blank or missing. No request was issued.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The server answered with a non-success status.
    #[error("HTTP error {status}: {message}")]
    Http { status: u16, message: String },

    /// The request could not be sent or no response arrived.
    #[error("Network error: {0}")]
    Network(String),

    /// The response body broke off after streaming had started.
    #[error("Stream interrupted: {0}")]
    StreamInterrupted(String),

    /// Write-back to persistent storage failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Entity not found error with type information
    #[error("Entity not found: {entity_type} '{id}'")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization {
        format: String, // "TOML", "JSON", etc.
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl EnBuddyError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a Validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Creates an Http error
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }

    /// Creates a Network error
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    /// Creates a StreamInterrupted error
    pub fn stream_interrupted(message: impl Into<String>) -> Self {
        Self::StreamInterrupted(message.into())
    }

    /// Creates a Storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    /// Creates a NotFound error
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    /// Creates an IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Check if the request itself failed (bad status or no response).
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Http { .. } | Self::Network(_))
    }

    /// Check if the stream broke off after it had started.
    pub fn is_mid_stream(&self) -> bool {
        matches!(self, Self::StreamInterrupted(_))
    }

    /// Check if this is a storage write-back error
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_))
    }

    /// Check if this is a NotFound error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns the HTTP status code carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for EnBuddyError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for EnBuddyError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for EnBuddyError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for EnBuddyError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => Self::http(status.as_u16(), err.to_string()),
            None if err.is_decode() => Self::Serialization {
                format: "JSON".to_string(),
                message: err.to_string(),
            },
            None => Self::Network(err.to_string()),
        }
    }
}

/// A type alias for `Result<T, EnBuddyError>`.
pub type Result<T> = std::result::Result<T, EnBuddyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EnBuddyError::http(502, "bad gateway");
        assert_eq!(err.to_string(), "HTTP error 502: bad gateway");
        assert_eq!(err.status(), Some(502));
    }

    #[test]
    fn test_taxonomy_predicates() {
        assert!(EnBuddyError::validation("empty").is_validation());
        assert!(EnBuddyError::network("refused").is_transport());
        assert!(EnBuddyError::http(500, "boom").is_transport());
        assert!(EnBuddyError::stream_interrupted("reset").is_mid_stream());
        assert!(!EnBuddyError::stream_interrupted("reset").is_transport());
        assert!(EnBuddyError::storage("disk full").is_storage());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: EnBuddyError = io_err.into();
        assert!(matches!(err, EnBuddyError::Io { .. }));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: EnBuddyError = json_err.into();
        assert!(matches!(err, EnBuddyError::Serialization { ref format, .. } if format == "JSON"));
    }
}

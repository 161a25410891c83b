//! Common error types for the reading environment

use thiserror::Error;

/// Common result type for EPE operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy shared by the record store, the alignment engine and the
/// import parser. None of these are retried internally.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed or missing required field
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Uniqueness violation on create
    #[error("Duplicate id: {0}")]
    DuplicateId(String),

    /// Requested record does not resolve
    #[error("Not found: {0}")]
    NotFound(String),

    /// Alignment requested against an unknown witness
    #[error("Witness not found: {0}")]
    WitnessNotFound(String),

    /// Alignment requested against an unknown (or absent) section
    #[error("Section not found: {0}")]
    SectionNotFound(String),

    /// Alignment import with no rows
    #[error("Empty input: alignment table has no rows")]
    EmptyInput,

    /// Payload is not valid UTF-8 text
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding/decoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True for the caller-correctable kinds (bad ids, bad payloads).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidInput(_)
                | Error::DuplicateId(_)
                | Error::NotFound(_)
                | Error::WitnessNotFound(_)
                | Error::SectionNotFound(_)
                | Error::EmptyInput
                | Error::Encoding(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_offending_id() {
        let err = Error::DuplicateId("w1".to_string());
        assert_eq!(err.to_string(), "Duplicate id: w1");

        let err = Error::SectionNotFound("sec_9 in witness w1".to_string());
        assert!(err.to_string().contains("sec_9"));
    }

    #[test]
    fn test_client_error_classification() {
        assert!(Error::EmptyInput.is_client_error());
        assert!(Error::NotFound("7".to_string()).is_client_error());
        assert!(!Error::Internal("boom".to_string()).is_client_error());

        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk");
        assert!(!Error::from(io).is_client_error());
    }
}

//! services/ingest/src/error.rs
//!
//! Defines the primary error type for the ingestion service.

use crate::config::ConfigError;
use content_ingest_core::{IngestError, PortError};

/// The primary error type for the `ingest` service.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// An upload or hierarchy operation failed in the core.
    #[error("Ingest error: {0}")]
    Ingest(#[from] IngestError),

    /// Represents an error that propagated up from one of the core service ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// The HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// Represents a standard Input/Output error (e.g., reading a file from disk).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServiceError {
    /// Whether an operator may retry the operation that produced this error.
    pub fn is_retryable(&self) -> bool {
        match self {
            ServiceError::Ingest(e) => e.is_retryable(),
            ServiceError::Port(PortError::Unreachable(_)) => true,
            _ => false,
        }
    }
}

/// A convenience type alias for `Result<T, ServiceError>`.
pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transient_failures_are_retryable() {
        assert!(ServiceError::from(IngestError::Network("reset".into())).is_retryable());
        assert!(ServiceError::from(IngestError::Credential("expired".into())).is_retryable());
        assert!(ServiceError::from(PortError::Unreachable("dns".into())).is_retryable());

        assert!(!ServiceError::from(IngestError::Validation("too big".into())).is_retryable());
        assert!(!ServiceError::from(PortError::Unauthorized).is_retryable());
        assert!(!ServiceError::from(ConfigError::MissingVar("X".into())).is_retryable());
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert!(!ServiceError::from(io).is_retryable());
    }
}

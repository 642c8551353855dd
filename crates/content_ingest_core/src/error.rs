//! crates/content_ingest_core/src/error.rs
//!
//! The error taxonomy shared by the upload router and the content hierarchy.

/// Every failure the ingestion core can report to its caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IngestError {
    /// Detected on the client before any network call (oversized file, blank name, ...).
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The backend declined to issue an upload credential.
    #[error("Upload credential was not issued: {0}")]
    Credential(String),

    /// The network call completed but the remote side reported failure.
    #[error("Transfer failed: {0}")]
    Transfer(String),

    /// No response was received at all.
    #[error("Network failure: {0}")]
    Network(String),

    /// A hierarchy depth or targeting violation.
    #[error("Structural violation: {0}")]
    Structural(String),

    /// A structural reference that is stale or out of range.
    #[error("Index {index} is out of range for {what} (len {len})")]
    Index {
        what: &'static str,
        index: usize,
        len: usize,
    },
}

impl IngestError {
    /// Whether the operator may simply retry the same action.
    ///
    /// Validation, structural and index failures must be corrected first.
    /// Nothing in this crate retries on its own either way.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            IngestError::Credential(_) | IngestError::Transfer(_) | IngestError::Network(_)
        )
    }
}

/// A convenience type alias for `Result<T, IngestError>`.
pub type IngestResult<T> = Result<T, IngestError>;

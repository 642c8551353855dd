//! crates/content_ingest_core/src/ports.rs
//!
//! Defines the service contracts (traits) the ingestion core depends on.
//! These traits form the boundary of the hexagonal architecture: the backend
//! API and object storage are reached only through them, so the core stays
//! independent of any HTTP client.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::domain::{AssetDescriptor, CourseDraft, UploadFile};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors of the transport underneath.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    /// The remote side answered but refused (non-success status or `success: false`).
    #[error("Rejected by remote service: {0}")]
    Rejected(String),
    /// No response was received.
    #[error("Remote service unreachable: {0}")]
    Unreachable(String),
    /// A response arrived but could not be understood.
    #[error("Malformed response: {0}")]
    Malformed(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Item not found: {0}")]
    NotFound(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Upload Wire Types
//=========================================================================================

/// What the backend needs to issue a direct-upload credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialRequest {
    pub filename: String,
    pub folder: String,
    pub content_type: String,
}

/// A time-limited write credential plus the final location of the asset.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadCredential {
    pub upload_url: String,
    pub url: String,
    pub file_id: String,
}

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait UploadBackend: Send + Sync {
    /// Asks the backend for a presigned write credential.
    async fn request_credential(&self, request: &CredentialRequest)
        -> PortResult<UploadCredential>;

    /// Writes the raw bytes to the storage endpoint named by a credential.
    async fn write_to_storage(
        &self,
        upload_url: &str,
        content_type: &str,
        body: Bytes,
    ) -> PortResult<()>;

    /// Sends the file through the backend, which stores it and describes the result.
    async fn upload_through_backend(
        &self,
        file: &UploadFile,
        folder: &str,
    ) -> PortResult<AssetDescriptor>;
}

#[async_trait]
pub trait CourseStore: Send + Sync {
    async fn fetch_course(&self, course_id: &str) -> PortResult<CourseDraft>;

    /// Creates a course; the response carries the ids the backend assigned.
    async fn create_course(&self, course: &CourseDraft) -> PortResult<CourseDraft>;

    async fn update_course(&self, course_id: &str, course: &CourseDraft)
        -> PortResult<CourseDraft>;
}

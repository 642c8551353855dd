//! crates/content_ingest_core/src/upload/direct.rs
//!
//! Large files: ask the backend for a presigned credential, then write the
//! bytes straight to the storage endpoint it names.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use super::{credential_failure, transfer_failure, UploadPhase, UploadSession, UploadStrategy};
use crate::domain::{AssetDescriptor, UploadFile};
use crate::error::{IngestError, IngestResult};
use crate::ports::{CredentialRequest, UploadBackend};

#[derive(Clone)]
pub struct DirectUpload {
    backend: Arc<dyn UploadBackend>,
}

impl DirectUpload {
    pub fn new(backend: Arc<dyn UploadBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl UploadStrategy for DirectUpload {
    async fn transfer(
        &self,
        file: &UploadFile,
        folder: &str,
        session: &UploadSession<'_>,
    ) -> IngestResult<AssetDescriptor> {
        // --- 1. Credential ---
        session.advance(UploadPhase::RequestingCredential);
        let request = CredentialRequest {
            filename: file.name().to_string(),
            folder: folder.to_string(),
            content_type: file.content_type().to_string(),
        };
        let credential = self
            .backend
            .request_credential(&request)
            .await
            .map_err(credential_failure)?;
        if credential.upload_url.trim().is_empty() || credential.file_id.trim().is_empty() {
            return Err(IngestError::Credential(
                "credential response has no usable upload URL or file id".to_string(),
            ));
        }

        // --- 2. Storage write, with the content type the credential was issued for ---
        session.advance(UploadPhase::Transferring);
        info!(
            session = %session.id,
            file = %file.name(),
            size = file.size(),
            "Writing directly to storage."
        );
        self.backend
            .write_to_storage(&credential.upload_url, &request.content_type, file.body().clone())
            .await
            .map_err(transfer_failure)?;
        session.advance(UploadPhase::Finalizing);

        // --- 3. The credential already names the final asset ---
        Ok(AssetDescriptor::new(credential.url, credential.file_id, file.name()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{PortError, UploadCredential};
    use crate::upload::testing::{Call, FakeBackend};
    use crate::upload::{FileInput, SizeClass};

    fn big_video() -> UploadFile {
        UploadFile::new("lecture.mp4", "video/mp4", vec![0u8; 64])
    }

    async fn run(backend: Arc<FakeBackend>) -> (IngestResult<AssetDescriptor>, FileInput) {
        let input = FileInput::new();
        let strategy = DirectUpload::new(backend);
        let file = big_video();
        let result = {
            let progress = input.progress_sender();
            let session = UploadSession::start(&file, "courses/rust", SizeClass::Direct, progress);
            strategy.transfer(&file, "courses/rust", &session).await
        };
        (result, input)
    }

    #[tokio::test]
    async fn credential_then_one_write_with_the_same_content_type() {
        let backend = Arc::new(FakeBackend::new());
        let (result, input) = run(backend.clone()).await;

        assert_eq!(result.unwrap(), AssetDescriptor::new("https://cdn/x", "abc", "lecture.mp4"));
        assert_eq!(
            backend.calls(),
            vec![
                Call::Credential(CredentialRequest {
                    filename: "lecture.mp4".into(),
                    folder: "courses/rust".into(),
                    content_type: "video/mp4".into(),
                }),
                Call::Storage {
                    upload_url: "https://store/x".into(),
                    content_type: "video/mp4".into(),
                    len: 64,
                },
            ]
        );
        assert_eq!(input.progress().percent, 90);
    }

    #[tokio::test]
    async fn declined_credential_skips_the_write() {
        let backend = Arc::new(FakeBackend::new().failing_credential(PortError::Unauthorized));
        let (result, _) = run(backend.clone()).await;

        assert!(matches!(result, Err(IngestError::Credential(_))));
        assert_eq!(backend.calls().len(), 1);
    }

    #[tokio::test]
    async fn credential_without_upload_url_is_a_credential_error() {
        let backend = FakeBackend::new();
        *backend.credential.lock().unwrap() = Ok(UploadCredential {
            upload_url: String::new(),
            url: "https://cdn/x".into(),
            file_id: "abc".into(),
        });
        let backend = Arc::new(backend);
        let (result, _) = run(backend.clone()).await;

        assert!(matches!(result, Err(IngestError::Credential(_))));
        assert_eq!(backend.calls().len(), 1);
    }

    #[tokio::test]
    async fn rejected_write_is_a_transfer_error() {
        let backend =
            Arc::new(FakeBackend::new().failing_storage(PortError::Rejected("HTTP 403".into())));
        let (result, _) = run(backend).await;
        assert!(matches!(result, Err(IngestError::Transfer(_))));
    }

    #[tokio::test]
    async fn unreachable_storage_is_a_network_error() {
        let backend =
            Arc::new(FakeBackend::new().failing_storage(PortError::Unreachable("reset".into())));
        let (result, _) = run(backend).await;
        assert_eq!(result, Err(IngestError::Network("reset".into())));
    }
}

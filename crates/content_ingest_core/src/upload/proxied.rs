//! crates/content_ingest_core/src/upload/proxied.rs
//!
//! Small files: one request through the backend, which performs the storage
//! write itself. No chunking and no resume.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use super::{transfer_failure, UploadPhase, UploadSession, UploadStrategy};
use crate::domain::{AssetDescriptor, UploadFile};
use crate::error::IngestResult;
use crate::ports::UploadBackend;

#[derive(Clone)]
pub struct ProxiedUpload {
    backend: Arc<dyn UploadBackend>,
}

impl ProxiedUpload {
    pub fn new(backend: Arc<dyn UploadBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl UploadStrategy for ProxiedUpload {
    async fn transfer(
        &self,
        file: &UploadFile,
        folder: &str,
        session: &UploadSession<'_>,
    ) -> IngestResult<AssetDescriptor> {
        session.advance(UploadPhase::Transferring);
        info!(
            session = %session.id,
            file = %file.name(),
            size = file.size(),
            "Uploading through the backend."
        );
        let asset = self
            .backend
            .upload_through_backend(file, folder)
            .await
            .map_err(transfer_failure)?;
        session.advance(UploadPhase::Finalizing);

        if asset.display_name().is_empty() {
            return Ok(AssetDescriptor::new(asset.url(), asset.id(), file.name()));
        }
        Ok(asset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IngestError;
    use crate::ports::PortError;
    use crate::upload::testing::{Call, FakeBackend};
    use crate::upload::{FileInput, SizeClass};

    async fn run(backend: Arc<FakeBackend>, file: UploadFile) -> IngestResult<AssetDescriptor> {
        let input = FileInput::new();
        let progress = input.progress_sender();
        let session = UploadSession::start(&file, "docs", SizeClass::Proxied, progress);
        ProxiedUpload::new(backend).transfer(&file, "docs", &session).await
    }

    #[tokio::test]
    async fn one_request_returns_the_backend_descriptor() {
        let backend = Arc::new(FakeBackend::new());
        let file = UploadFile::new("small.pdf", "application/pdf", vec![1u8; 8]);

        let asset = run(backend.clone(), file).await.unwrap();

        assert_eq!(asset, AssetDescriptor::new("https://cdn/p", "p1", "small.pdf"));
        assert_eq!(
            backend.calls(),
            vec![Call::Proxied { file_name: "small.pdf".into(), folder: "docs".into() }]
        );
    }

    #[tokio::test]
    async fn nameless_descriptor_takes_the_file_name() {
        let backend = FakeBackend::new();
        *backend.proxied.lock().unwrap() = Ok(AssetDescriptor::new("https://cdn/p", "p1", ""));
        let file = UploadFile::new("notes.pdf", "application/pdf", vec![1u8; 8]);

        let asset = run(Arc::new(backend), file).await.unwrap();
        assert_eq!(asset.display_name(), "notes.pdf");
    }

    #[tokio::test]
    async fn backend_refusal_and_silence_are_distinct() {
        let file = UploadFile::new("a.pdf", "application/pdf", vec![1u8; 8]);

        let refusal = PortError::Rejected("success: false".into());
        let refused = Arc::new(FakeBackend::new().failing_proxied(refusal));
        assert!(matches!(run(refused, file.clone()).await, Err(IngestError::Transfer(_))));

        let silent =
            Arc::new(FakeBackend::new().failing_proxied(PortError::Unreachable("timeout".into())));
        assert!(matches!(run(silent, file).await, Err(IngestError::Network(_))));
    }
}

//! crates/content_ingest_core/src/upload/router.rs
//!
//! The single entry point for uploads. The router validates a file, picks a
//! strategy by size, and hands back the asset descriptor. Placing that
//! descriptor in the content hierarchy is the caller's job.

use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

use super::{
    DirectUpload, FileInput, ProxiedUpload, SizeClass, UploadLimits, UploadProgress,
    UploadSession, UploadStrategy,
};
use crate::domain::{AssetDescriptor, MediaKind, UploadFile};
use crate::error::{IngestError, IngestResult};
use crate::ports::UploadBackend;

/// Where inline editor images are stored unless configured otherwise.
pub const DEFAULT_EDITOR_IMAGE_FOLDER: &str = "editor-images";

#[derive(Clone)]
pub struct UploadRouter {
    limits: UploadLimits,
    direct: DirectUpload,
    proxied: ProxiedUpload,
    editor_image_folder: String,
}

impl UploadRouter {
    /// Creates a router with the default limits.
    pub fn new(backend: Arc<dyn UploadBackend>) -> Self {
        Self {
            limits: UploadLimits::default(),
            direct: DirectUpload::new(backend.clone()),
            proxied: ProxiedUpload::new(backend),
            editor_image_folder: DEFAULT_EDITOR_IMAGE_FOLDER.to_string(),
        }
    }

    pub fn with_limits(mut self, limits: UploadLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_editor_image_folder(mut self, folder: impl Into<String>) -> Self {
        self.editor_image_folder = folder.into();
        self
    }

    pub fn limits(&self) -> &UploadLimits {
        &self.limits
    }

    /// Uploads `file` into `destination_folder` without an observing control.
    pub async fn upload(
        &self,
        file: &UploadFile,
        destination_folder: &str,
    ) -> IngestResult<AssetDescriptor> {
        let (progress, _) = watch::channel(UploadProgress::idle());
        self.route(file, destination_folder, &progress).await
    }

    /// Uploads whatever `input` has selected. The selection is cleared whatever
    /// the outcome, so the same file can be picked again straight away.
    pub async fn upload_from(
        &self,
        input: &mut FileInput,
        destination_folder: &str,
    ) -> IngestResult<AssetDescriptor> {
        let Some(file) = input.take() else {
            input.progress_sender().send_replace(UploadProgress::failed());
            return Err(IngestError::Validation("no file selected".to_string()));
        };
        self.route(&file, destination_folder, input.progress_sender()).await
    }

    /// Uploads an image pasted or dropped into the rich-text editor. These
    /// always go through the backend into the editor image folder.
    pub async fn upload_inline_image(&self, file: &UploadFile) -> IngestResult<AssetDescriptor> {
        if file.kind() != MediaKind::Image {
            return Err(IngestError::Validation(format!(
                "'{}' is not an image",
                file.name()
            )));
        }
        self.limits.classify(file)?;

        let (progress, _) = watch::channel(UploadProgress::idle());
        let session =
            UploadSession::start(file, &self.editor_image_folder, SizeClass::Proxied, &progress);
        self.finish(&self.proxied, file, &session).await
    }

    async fn route(
        &self,
        file: &UploadFile,
        folder: &str,
        progress: &watch::Sender<UploadProgress>,
    ) -> IngestResult<AssetDescriptor> {
        let size_class = match self.limits.classify(file) {
            Ok(class) => class,
            Err(e) => {
                warn!(
                    file = %file.name(),
                    size = file.size(),
                    "Upload rejected before transfer: {}",
                    e
                );
                progress.send_replace(UploadProgress::failed());
                return Err(e);
            }
        };

        let session = UploadSession::start(file, folder, size_class, progress);
        info!(
            session = %session.id,
            file = %file.name(),
            size = file.size(),
            ?size_class,
            folder,
            "Upload started."
        );
        match size_class {
            SizeClass::Proxied => self.finish(&self.proxied, file, &session).await,
            SizeClass::Direct => self.finish(&self.direct, file, &session).await,
        }
    }

    async fn finish(
        &self,
        strategy: &dyn UploadStrategy,
        file: &UploadFile,
        session: &UploadSession<'_>,
    ) -> IngestResult<AssetDescriptor> {
        match strategy.transfer(file, &session.target_folder, session).await {
            Ok(asset) => {
                session.complete();
                info!(
                    session = %session.id,
                    file_id = %asset.id(),
                    elapsed_ms = session.elapsed_ms(),
                    "Upload complete."
                );
                Ok(asset)
            }
            Err(e) => {
                session.fail();
                warn!(session = %session.id, file = %file.name(), "Upload failed: {}", e);
                Err(e)
            }
        }
    }
}

//! services/ingest/src/authoring.rs
//!
//! The authoring session: one course draft, edited in memory and saved as a
//! whole. Uploads resolve to descriptors first; only then is the tree touched.

use content_ingest_core::{
    domain::{AssetDescriptor, ContentItem, CourseDraft, ExternalVideo, TextBlock, UploadFile},
    fragment::RichText,
    hierarchy::{ContentTree, Target},
    ports::{CourseStore, UploadBackend},
    sanitizer::{sanitizer, SanitizedHtml},
    upload::{FileInput, UploadRouter},
};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::adapters::{BackendClient, HttpCourseStore, HttpUploadBackend};
use crate::config::Config;
use crate::error::ServiceResult;

//=========================================================================================
// Wiring
//=========================================================================================

/// The adapters an editor needs, built once per process.
#[derive(Clone)]
pub struct Services {
    pub router: UploadRouter,
    pub store: Arc<dyn CourseStore>,
}

impl Services {
    /// Builds the HTTP adapters and the upload router from the loaded configuration.
    pub fn from_config(config: &Config) -> ServiceResult<Self> {
        let client = BackendClient::from_config(config)?;
        let backend: Arc<dyn UploadBackend> = Arc::new(HttpUploadBackend::new(client.clone()));
        let router = UploadRouter::new(backend)
            .with_limits(config.upload_limits())
            .with_editor_image_folder(config.editor_image_folder.clone());
        info!(backend = %client.base_url(), "Ingest services ready.");
        Ok(Self {
            router,
            store: Arc::new(HttpCourseStore::new(client)),
        })
    }
}

//=========================================================================================
// CourseEditor
//=========================================================================================

pub struct CourseEditor {
    draft: CourseDraft,
    /// The draft as last loaded or saved.
    saved: CourseDraft,
    router: UploadRouter,
    store: Arc<dyn CourseStore>,
}

impl CourseEditor {
    /// Starts a new, unsaved course.
    pub fn new_course(title: impl Into<String>, services: Services) -> Self {
        let draft = CourseDraft::new(title);
        Self {
            saved: draft.clone(),
            draft,
            router: services.router,
            store: services.store,
        }
    }

    /// Loads an existing course for editing.
    pub async fn open(course_id: &str, services: Services) -> ServiceResult<Self> {
        let draft = services.store.fetch_course(course_id).await?;
        info!(course_id, folders = draft.folders.folder_count(), "Course opened.");
        Ok(Self {
            saved: draft.clone(),
            draft,
            router: services.router,
            store: services.store,
        })
    }

    pub fn draft(&self) -> &CourseDraft {
        &self.draft
    }

    pub fn tree(&self) -> &ContentTree {
        &self.draft.folders
    }

    /// Structural edits go straight to the tree.
    pub fn tree_mut(&mut self) -> &mut ContentTree {
        &mut self.draft.folders
    }

    pub fn router(&self) -> &UploadRouter {
        &self.router
    }

    /// Whether the draft differs from what was last loaded or saved.
    pub fn is_dirty(&self) -> bool {
        self.draft != self.saved
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.draft.title = title.into();
    }

    pub fn set_description(&mut self, html: &str) {
        let description = sanitizer().sanitize_html(html);
        self.draft.description = (!description.is_empty()).then_some(description);
    }

    /// Reads a file from disk, guessing its content type from the extension.
    pub async fn load_file(path: impl AsRef<Path>) -> ServiceResult<UploadFile> {
        Ok(UploadFile::from_path(path).await?)
    }

    /// Uploads the file selected in `input` into `storage_folder` and places
    /// the resulting item at `folder_index`/`target`. The target is checked
    /// before anything is sent, and the tree is untouched if the upload fails.
    pub async fn upload_into(
        &mut self,
        input: &mut FileInput,
        folder_index: usize,
        target: Target,
        storage_folder: &str,
    ) -> ServiceResult<AssetDescriptor> {
        self.draft.folders.check_target(folder_index, target)?;
        let kind = input.selected().map(UploadFile::kind);

        let asset = self.router.upload_from(input, storage_folder).await?;
        // upload_from fails on an empty control, so the kind is known here.
        if let Some(kind) = kind {
            let item = ContentItem::from_upload(kind, asset.clone());
            let position = self.draft.folders.add_item(folder_index, item, target)?;
            info!(file_id = %asset.id(), folder_index, ?target, position, "Uploaded item placed.");
        }
        Ok(asset)
    }

    /// Adds a link to a video hosted elsewhere. Nothing is uploaded.
    pub fn add_external_video(
        &mut self,
        folder_index: usize,
        target: Target,
        title: &str,
        url: &str,
    ) -> ServiceResult<usize> {
        let item = ContentItem::ExternalVideo(ExternalVideo::new(title, url));
        Ok(self.draft.folders.add_item(folder_index, item, target)?)
    }

    pub fn add_text_block(
        &mut self,
        folder_index: usize,
        target: Target,
        title: &str,
        content: &RichText,
    ) -> ServiceResult<usize> {
        let item = ContentItem::TextBlock(TextBlock {
            title: title.to_string(),
            content: content.to_html(),
        });
        Ok(self.draft.folders.add_item(folder_index, item, target)?)
    }

    /// Uploads an image for the rich-text editor and inserts it at `cursor`.
    /// Returns the cursor just after the image.
    pub async fn insert_inline_image(
        &self,
        text: &mut RichText,
        cursor: usize,
        file: &UploadFile,
    ) -> ServiceResult<usize> {
        let asset = self.router.upload_inline_image(file).await?;
        let image = RichText::image(asset.url(), asset.display_name());
        Ok(text.insert_fragment_at_cursor(cursor, image))
    }

    /// Persists the whole draft and adopts the server's copy, which carries
    /// any ids the backend assigned.
    pub async fn save(&mut self) -> ServiceResult<&CourseDraft> {
        let stored = match self.draft.id.as_deref() {
            Some(id) => self.store.update_course(id, &self.draft).await?,
            None => self.store.create_course(&self.draft).await?,
        };
        info!(course_id = ?stored.id, title = %stored.title, "Course saved.");
        self.saved = stored.clone();
        self.draft = stored;
        Ok(&self.draft)
    }

    /// Throws away unsaved edits.
    pub fn discard(&mut self) {
        self.draft = self.saved.clone();
    }

    pub fn description(&self) -> Option<&SanitizedHtml> {
        self.draft.description.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use content_ingest_core::{
        domain::MediaKind,
        ports::{CredentialRequest, PortError, PortResult, UploadCredential},
        IngestError,
    };
    use crate::error::ServiceError;
    use std::sync::Mutex;

    struct StubBackend;

    #[async_trait]
    impl UploadBackend for StubBackend {
        async fn request_credential(&self, _: &CredentialRequest) -> PortResult<UploadCredential> {
            Err(PortError::Unreachable("offline".into()))
        }

        async fn write_to_storage(&self, _: &str, _: &str, _: Bytes) -> PortResult<()> {
            Err(PortError::Unreachable("offline".into()))
        }

        async fn upload_through_backend(
            &self,
            file: &UploadFile,
            _: &str,
        ) -> PortResult<AssetDescriptor> {
            Ok(AssetDescriptor::new(format!("https://cdn/{}", file.name()), "f1", file.name()))
        }
    }

    #[derive(Default)]
    struct MemoryStore {
        saved: Mutex<Vec<CourseDraft>>,
    }

    #[async_trait]
    impl CourseStore for MemoryStore {
        async fn fetch_course(&self, course_id: &str) -> PortResult<CourseDraft> {
            Err(PortError::NotFound(course_id.to_string()))
        }

        async fn create_course(&self, course: &CourseDraft) -> PortResult<CourseDraft> {
            let mut stored = course.clone();
            stored.id = Some("c1".to_string());
            self.saved.lock().unwrap().push(stored.clone());
            Ok(stored)
        }

        async fn update_course(&self, _: &str, course: &CourseDraft) -> PortResult<CourseDraft> {
            self.saved.lock().unwrap().push(course.clone());
            Ok(course.clone())
        }
    }

    fn editor(store: Arc<MemoryStore>) -> CourseEditor {
        let services = Services {
            router: UploadRouter::new(Arc::new(StubBackend)),
            store,
        };
        CourseEditor::new_course("Rust 101", services)
    }

    #[tokio::test]
    async fn uploaded_file_lands_in_the_addressed_subfolder() {
        let mut editor = editor(Arc::default());
        editor.tree_mut().create_folder("Week 1").unwrap();
        editor.tree_mut().create_subfolder(0, "Part A").unwrap();
        let mut input = FileInput::new();
        input.select(UploadFile::new("slides.pdf", "application/pdf", vec![1u8; 10]));

        editor
            .upload_into(&mut input, 0, Target::Subfolder(0), "week-1")
            .await
            .unwrap();

        let part_a = editor.tree().subfolder(0, 0).unwrap();
        assert_eq!(part_a.items().documents.len(), 1);
        assert!(editor.tree().folder(0).unwrap().items().is_empty());
        assert!(editor.is_dirty());
    }

    #[tokio::test]
    async fn bad_target_fails_before_any_upload() {
        let mut editor = editor(Arc::default());
        editor.tree_mut().create_folder("Week 1").unwrap();
        let mut input = FileInput::new();
        input.select(UploadFile::new("clip.mp4", "video/mp4", vec![1u8; 10]));

        let err = editor
            .upload_into(&mut input, 0, Target::Subfolder(3), "week-1")
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::Ingest(IngestError::Index { .. })));
        assert!(input.selected().is_some());
    }

    #[tokio::test]
    async fn inline_image_is_uploaded_then_inserted() {
        let editor = editor(Arc::default());
        let mut text = RichText::from_html(&sanitizer().sanitize_html("ab"));
        let file = UploadFile::new("pic.png", "image/png", vec![1u8; 4]);
        assert_eq!(file.kind(), MediaKind::Image);

        let cursor = editor.insert_inline_image(&mut text, 1, &file).await.unwrap();

        assert_eq!(cursor, 2);
        assert!(text.to_html().as_str().contains("https://cdn/pic.png"));
    }

    #[tokio::test]
    async fn save_adopts_the_backend_id_and_discard_reverts() {
        let store = Arc::new(MemoryStore::default());
        let mut editor = editor(store.clone());
        editor.tree_mut().create_folder("Week 1").unwrap();

        editor.save().await.unwrap();
        assert_eq!(editor.draft().id.as_deref(), Some("c1"));
        assert!(!editor.is_dirty());

        editor.tree_mut().create_folder("Week 2").unwrap();
        editor.set_description("<p>Intro<script>x()</script></p>");
        editor.discard();
        assert_eq!(editor.tree().folder_count(), 1);
        assert!(editor.description().is_none());

        editor.tree_mut().delete_folder(0).unwrap();
        editor.save().await.unwrap();
        assert_eq!(store.saved.lock().unwrap().len(), 2);
        assert!(editor.tree().is_empty());
    }

    #[tokio::test]
    async fn files_load_from_disk_and_missing_ones_are_io_errors() {
        let path = std::env::temp_dir().join("ingest-authoring-notes.pdf");
        tokio::fs::write(&path, b"%PDF-1.4").await.unwrap();
        let file = CourseEditor::load_file(&path).await.unwrap();
        tokio::fs::remove_file(&path).await.unwrap();
        assert_eq!(file.content_type(), "application/pdf");

        let missing = std::env::temp_dir().join("ingest-authoring-missing.pdf");
        let err = CourseEditor::load_file(&missing).await.unwrap_err();
        assert!(matches!(err, ServiceError::Io(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn external_videos_and_text_blocks_need_no_upload() {
        let mut editor = editor(Arc::default());
        editor.tree_mut().create_folder("Week 1").unwrap();

        editor
            .add_external_video(0, Target::Folder, "Intro", "https://youtu.be/abc")
            .unwrap();
        let text = RichText::from_html(&sanitizer().sanitize_html("<b>Read this</b>"));
        editor.add_text_block(0, Target::Folder, "Notes", &text).unwrap();

        let items = editor.tree().folder(0).unwrap().items();
        assert_eq!(items.external_videos.len(), 1);
        assert_eq!(items.text_blocks.len(), 1);
    }
}

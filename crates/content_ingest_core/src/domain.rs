//! crates/content_ingest_core/src/domain.rs
//!
//! Defines the core data structures for course content: uploaded files, the
//! asset descriptors they turn into, and the typed items a folder holds.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::IngestError;
use crate::hierarchy::ContentTree;
use crate::sanitizer::SanitizedHtml;

//=========================================================================================
// Uploads
//=========================================================================================

/// The broad kind of media a file declares. Only `Image` changes validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    Document,
}

impl MediaKind {
    /// Classifies a MIME type. Anything that is not an image or a video is a document.
    pub fn from_content_type(content_type: &str) -> Self {
        let essence = content_type.trim().to_ascii_lowercase();
        if essence.starts_with("image/") {
            MediaKind::Image
        } else if essence.starts_with("video/") {
            MediaKind::Video
        } else {
            MediaKind::Document
        }
    }
}

/// A file the operator selected, held entirely in memory.
#[derive(Debug, Clone)]
pub struct UploadFile {
    name: String,
    content_type: String,
    kind: MediaKind,
    body: Bytes,
}

impl UploadFile {
    /// Creates a file; its media kind is derived from `content_type`.
    pub fn new(
        name: impl Into<String>,
        content_type: impl Into<String>,
        body: impl Into<Bytes>,
    ) -> Self {
        let content_type = content_type.into();
        Self {
            name: name.into(),
            kind: MediaKind::from_content_type(&content_type),
            content_type,
            body: body.into(),
        }
    }

    /// Overrides the declared media kind.
    pub fn with_kind(mut self, kind: MediaKind) -> Self {
        self.kind = kind;
        self
    }

    /// Reads a file from disk, guessing its content type from the extension.
    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let body = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let content_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Ok(Self::new(name, content_type, body))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Size of the file in bytes.
    pub fn size(&self) -> u64 {
        self.body.len() as u64
    }
}

/// Identifies one uploaded binary. Produced once per successful upload and
/// never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetDescriptor {
    url: String,
    #[serde(rename = "fileId")]
    id: String,
    #[serde(rename = "name", default)]
    display_name: String,
}

impl AssetDescriptor {
    pub fn new(
        url: impl Into<String>,
        id: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            id: id.into(),
            display_name: display_name.into(),
        }
    }

    /// The public URL the asset is served from.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The stable storage id.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }
}

//=========================================================================================
// Content Items
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Video {
    #[serde(flatten)]
    pub asset: AssetDescriptor,
    /// Running time in seconds, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    #[serde(flatten)]
    pub asset: AssetDescriptor,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    #[serde(flatten)]
    pub asset: AssetDescriptor,
}

/// A block of rich text. The markup has always been through the sanitizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextBlock {
    pub title: String,
    pub content: SanitizedHtml,
}

/// Where an externally hosted video lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoPlatform {
    YouTube,
    Vimeo,
    Other,
}

impl VideoPlatform {
    /// Guesses the platform from the host part of a URL.
    pub fn detect(url: &str) -> Self {
        let rest = url
            .split_once("://")
            .map(|(_, rest)| rest)
            .unwrap_or(url);
        let host = rest
            .split(['/', '?', '#'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        let host = host.trim_start_matches("www.").trim_start_matches("m.");

        if host == "youtu.be" || host == "youtube.com" || host.ends_with(".youtube.com") {
            VideoPlatform::YouTube
        } else if host == "vimeo.com" || host.ends_with(".vimeo.com") {
            VideoPlatform::Vimeo
        } else {
            VideoPlatform::Other
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalVideo {
    pub title: String,
    pub url: String,
    pub platform: VideoPlatform,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ExternalVideo {
    /// Builds a reference whose platform is detected from `url`.
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            title: title.into(),
            platform: VideoPlatform::detect(&url),
            url,
            description: None,
        }
    }
}

/// Any item that can be placed into a folder or subfolder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentItem {
    Video(Video),
    Document(Document),
    Image(Image),
    TextBlock(TextBlock),
    ExternalVideo(ExternalVideo),
}

impl ContentItem {
    /// Wraps a freshly uploaded asset into the item matching its media kind.
    pub fn from_upload(kind: MediaKind, asset: AssetDescriptor) -> Self {
        match kind {
            MediaKind::Image => ContentItem::Image(Image { asset }),
            MediaKind::Video => ContentItem::Video(Video { asset, duration: None }),
            MediaKind::Document => ContentItem::Document(Document { asset }),
        }
    }

    /// The collection of a node this item belongs in.
    pub fn collection(&self) -> ItemCollection {
        match self {
            ContentItem::Video(_) => ItemCollection::Videos,
            ContentItem::Document(_) => ItemCollection::Documents,
            ContentItem::Image(_) => ItemCollection::Images,
            ContentItem::TextBlock(_) => ItemCollection::TextBlocks,
            ContentItem::ExternalVideo(_) => ItemCollection::ExternalVideos,
        }
    }
}

/// Names one of the typed, ordered collections inside a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemCollection {
    Videos,
    Documents,
    Images,
    TextBlocks,
    ExternalVideos,
}

impl ItemCollection {
    /// The field name used for this collection in the course document.
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemCollection::Videos => "videos",
            ItemCollection::Documents => "documents",
            ItemCollection::Images => "images",
            ItemCollection::TextBlocks => "textBlocks",
            ItemCollection::ExternalVideos => "externalVideos",
        }
    }
}

impl fmt::Display for ItemCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemCollection {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "videos" => Ok(ItemCollection::Videos),
            "documents" => Ok(ItemCollection::Documents),
            "images" => Ok(ItemCollection::Images),
            "textBlocks" => Ok(ItemCollection::TextBlocks),
            "externalVideos" => Ok(ItemCollection::ExternalVideos),
            other => Err(IngestError::Validation(format!(
                "unknown item collection '{}'",
                other
            ))),
        }
    }
}

//=========================================================================================
// Courses
//=========================================================================================

/// The document an authoring session edits and saves as a whole.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseDraft {
    /// Assigned by the backend on first save.
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<SanitizedHtml>,
    #[serde(default)]
    pub folders: ContentTree,
}

impl CourseDraft {
    /// A new, unsaved course with an empty hierarchy.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }
}

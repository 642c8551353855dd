pub mod domain;
pub mod error;
pub mod fragment;
pub mod hierarchy;
pub mod ports;
pub mod sanitizer;
pub mod upload;

pub use domain::{
    AssetDescriptor, ContentItem, CourseDraft, Document, ExternalVideo, Image, ItemCollection,
    MediaKind, TextBlock, UploadFile, Video, VideoPlatform,
};
pub use error::{IngestError, IngestResult};
pub use fragment::{InlineRun, InlineStyle, RichText, StylePatch};
pub use hierarchy::{ContentTree, FolderDocument, FolderNode, ItemCollections, NodeId, Target};
pub use ports::{
    CourseStore, CredentialRequest, PortError, PortResult, UploadBackend, UploadCredential,
};
pub use sanitizer::{sanitizer, ClipboardPayload, ContentSanitizer, SanitizedHtml};
pub use upload::{
    FileInput, SizeClass, UploadLimits, UploadPhase, UploadProgress, UploadRouter, UploadSession,
};

//! crates/content_ingest_core/src/upload/mod.rs
//!
//! Moving operator-selected files into durable storage.
//!
//! The router validates a file, picks the proxied or the direct strategy from
//! its size alone, and reports coarse progress through an `UploadSession`.

pub mod direct;
pub mod proxied;
pub mod router;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

use async_trait::async_trait;

use crate::domain::{AssetDescriptor, MediaKind, UploadFile};
use crate::error::{IngestError, IngestResult};
use crate::ports::PortError;

pub use direct::DirectUpload;
pub use proxied::ProxiedUpload;
pub use router::UploadRouter;
pub use session::{FileInput, UploadPhase, UploadProgress, UploadSession};

pub const MIB: u64 = 1024 * 1024;

//=========================================================================================
// Size Classification
//=========================================================================================

/// Which transfer path a file takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeClass {
    /// Through the backend, which writes to storage itself.
    Proxied,
    /// Straight to storage with a presigned credential.
    Direct,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadLimits {
    /// Largest image accepted at all.
    pub image_max_bytes: u64,
    /// Files up to and including this size are proxied.
    pub proxy_threshold_bytes: u64,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            image_max_bytes: 15 * MIB,
            proxy_threshold_bytes: 50 * MIB,
        }
    }
}

impl UploadLimits {
    /// Validates a file and picks its path. Runs before any network call.
    pub fn classify(&self, file: &UploadFile) -> IngestResult<SizeClass> {
        if file.name().trim().is_empty() {
            return Err(IngestError::Validation("file has no name".to_string()));
        }
        let size = file.size();
        if size == 0 {
            return Err(IngestError::Validation(format!("'{}' is empty", file.name())));
        }
        if file.kind() == MediaKind::Image && size > self.image_max_bytes {
            return Err(IngestError::Validation(format!(
                "image '{}' is {} bytes, the limit is {} bytes",
                file.name(),
                size,
                self.image_max_bytes
            )));
        }
        Ok(self.size_class(size))
    }

    /// The path for a file of `size` bytes, whatever its type.
    pub fn size_class(&self, size: u64) -> SizeClass {
        if size <= self.proxy_threshold_bytes {
            SizeClass::Proxied
        } else {
            SizeClass::Direct
        }
    }
}

//=========================================================================================
// Strategy Seam
//=========================================================================================

/// One way of getting a file into storage.
#[async_trait]
pub trait UploadStrategy: Send + Sync {
    async fn transfer(
        &self,
        file: &UploadFile,
        folder: &str,
        session: &UploadSession<'_>,
    ) -> IngestResult<AssetDescriptor>;
}

/// Maps a failed credential request onto the taxonomy.
pub(crate) fn credential_failure(err: PortError) -> IngestError {
    match err {
        PortError::Unreachable(msg) => IngestError::Network(msg),
        other => IngestError::Credential(other.to_string()),
    }
}

/// Maps a failed transfer onto the taxonomy.
pub(crate) fn transfer_failure(err: PortError) -> IngestError {
    match err {
        PortError::Unreachable(msg) => IngestError::Network(msg),
        other => IngestError::Transfer(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(kind: &str, size: usize) -> UploadFile {
        UploadFile::new("f", kind, vec![0u8; size])
    }

    #[test]
    fn size_alone_picks_the_path() {
        let limits = UploadLimits::default();
        assert_eq!(limits.size_class(50 * MIB), SizeClass::Proxied);
        assert_eq!(limits.size_class(50 * MIB + 1), SizeClass::Direct);
        assert_eq!(limits.size_class(1), SizeClass::Proxied);
    }

    #[test]
    fn pdf_and_video_of_equal_size_take_the_same_path() {
        let limits = UploadLimits { image_max_bytes: 10, proxy_threshold_bytes: 100 };
        assert_eq!(
            limits.classify(&file("application/pdf", 101)).unwrap(),
            limits.classify(&file("video/mp4", 101)).unwrap()
        );
    }

    #[test]
    fn oversized_images_fail_validation() {
        let limits = UploadLimits { image_max_bytes: 10, proxy_threshold_bytes: 100 };
        assert!(matches!(
            limits.classify(&file("image/png", 11)),
            Err(IngestError::Validation(_))
        ));
        assert_eq!(limits.classify(&file("image/png", 10)).unwrap(), SizeClass::Proxied);
        assert_eq!(limits.classify(&file("video/mp4", 11)).unwrap(), SizeClass::Proxied);
    }

    #[test]
    fn empty_or_nameless_files_fail_validation() {
        let limits = UploadLimits::default();
        assert!(matches!(
            limits.classify(&file("video/mp4", 0)),
            Err(IngestError::Validation(_))
        ));
        let nameless = UploadFile::new(" ", "video/mp4", vec![1u8]);
        assert!(matches!(limits.classify(&nameless), Err(IngestError::Validation(_))));
    }

    #[test]
    fn unreachable_ports_become_network_errors() {
        assert_eq!(
            credential_failure(PortError::Unreachable("dns".into())),
            IngestError::Network("dns".into())
        );
        assert!(matches!(
            credential_failure(PortError::Unauthorized),
            IngestError::Credential(_)
        ));
        assert!(matches!(
            transfer_failure(PortError::Rejected("403".into())),
            IngestError::Transfer(_)
        ));
    }
}

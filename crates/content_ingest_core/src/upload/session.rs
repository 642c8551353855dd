//! crates/content_ingest_core/src/upload/session.rs
//!
//! Per-transfer state and the file-input control that owns it.

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::debug;
use uuid::Uuid;

use super::SizeClass;
use crate::domain::UploadFile;

/// Where a transfer currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadPhase {
    Idle,
    RequestingCredential,
    Transferring,
    Finalizing,
    Complete,
    Failed,
}

impl UploadPhase {
    /// The coarse progress figure reported on entering this phase.
    pub fn percent(&self) -> u8 {
        match self {
            UploadPhase::Idle | UploadPhase::Failed => 0,
            UploadPhase::RequestingCredential => 10,
            UploadPhase::Transferring => 25,
            UploadPhase::Finalizing => 90,
            UploadPhase::Complete => 100,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadProgress {
    pub phase: UploadPhase,
    pub percent: u8,
}

impl UploadProgress {
    pub fn idle() -> Self {
        Self { phase: UploadPhase::Idle, percent: 0 }
    }

    pub fn failed() -> Self {
        Self { phase: UploadPhase::Failed, percent: 0 }
    }
}

impl Default for UploadProgress {
    fn default() -> Self {
        Self::idle()
    }
}

//=========================================================================================
// UploadSession (One Transfer)
//=========================================================================================

/// The ephemeral state of one in-flight transfer. Dropped once the caller
/// has the result.
pub struct UploadSession<'a> {
    pub id: Uuid,
    pub file_name: String,
    pub target_folder: String,
    pub size_class: SizeClass,
    pub started_at: DateTime<Utc>,
    progress: &'a watch::Sender<UploadProgress>,
}

impl<'a> UploadSession<'a> {
    pub fn start(
        file: &UploadFile,
        target_folder: &str,
        size_class: SizeClass,
        progress: &'a watch::Sender<UploadProgress>,
    ) -> Self {
        progress.send_replace(UploadProgress::idle());
        Self {
            id: Uuid::new_v4(),
            file_name: file.name().to_string(),
            target_folder: target_folder.to_string(),
            size_class,
            started_at: Utc::now(),
            progress,
        }
    }

    pub fn phase(&self) -> UploadPhase {
        self.progress.borrow().phase
    }

    pub fn percent(&self) -> u8 {
        self.progress.borrow().percent
    }

    /// Moves to `phase`. The percentage never goes down while the transfer runs.
    pub fn advance(&self, phase: UploadPhase) {
        self.progress.send_modify(|progress| {
            progress.phase = phase;
            progress.percent = progress.percent.max(phase.percent());
        });
        debug!(session = %self.id, file = %self.file_name, ?phase, "Upload phase changed.");
    }

    pub fn complete(&self) {
        self.advance(UploadPhase::Complete);
    }

    /// Marks the transfer failed and resets progress so the control is reusable.
    pub fn fail(&self) {
        self.progress.send_replace(UploadProgress::failed());
    }

    pub fn elapsed_ms(&self) -> i64 {
        (Utc::now() - self.started_at).num_milliseconds()
    }
}

//=========================================================================================
// FileInput (One Control)
//=========================================================================================

/// A file-selection control. Uploading from it needs `&mut` access, so a
/// control can never have two transfers in flight.
pub struct FileInput {
    selected: Option<UploadFile>,
    progress: watch::Sender<UploadProgress>,
}

impl FileInput {
    pub fn new() -> Self {
        let (progress, _) = watch::channel(UploadProgress::idle());
        Self { selected: None, progress }
    }

    /// Selects a file, replacing any previous selection.
    pub fn select(&mut self, file: UploadFile) {
        self.progress.send_replace(UploadProgress::idle());
        self.selected = Some(file);
    }

    pub fn selected(&self) -> Option<&UploadFile> {
        self.selected.as_ref()
    }

    /// Clears the selection, returning what was selected.
    pub fn take(&mut self) -> Option<UploadFile> {
        self.selected.take()
    }

    pub fn progress(&self) -> UploadProgress {
        *self.progress.borrow()
    }

    /// A receiver for following this control's progress.
    pub fn subscribe(&self) -> watch::Receiver<UploadProgress> {
        self.progress.subscribe()
    }

    pub(crate) fn progress_sender(&self) -> &watch::Sender<UploadProgress> {
        &self.progress
    }
}

impl Default for FileInput {
    fn default() -> Self {
        Self::new()
    }
}

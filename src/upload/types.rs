//! Type definitions for batch uploads.
//!
//! Defines the file selection, batch, per-batch result and session state.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// One selected photo or video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileItem {
    pub name: String,
    pub byte_size: u64,
    /// Where the bytes are read from when the batch is transferred.
    pub path: PathBuf,
}

impl FileItem {
    pub fn new(name: impl Into<String>, byte_size: u64, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            byte_size,
            path: path.into(),
        }
    }
}

/// Files sent together in one multipart request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Batch {
    files: Vec<FileItem>,
    total_bytes: u64,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, file: FileItem) {
        self.total_bytes = self.total_bytes.saturating_add(file.byte_size);
        self.files.push(file);
    }

    pub fn files(&self) -> &[FileItem] {
        &self.files
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub fn item_count(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl FromIterator<FileItem> for Batch {
    fn from_iter<I: IntoIterator<Item = FileItem>>(iter: I) -> Self {
        let mut batch = Batch::new();
        for file in iter {
            batch.push(file);
        }
        batch
    }
}

/// Byte and count ceilings for one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchLimits {
    pub max_bytes: u64,
    pub max_count: usize,
}

/// What the ingest endpoint reported for one batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchResult {
    pub log_lines: Vec<String>,
    pub success_count: u64,
    pub raw_message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    #[default]
    Idle,
    Uploading,
    Done,
}

/// Observable state of the current (or last) upload session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub session_id: Option<Uuid>,
    pub phase: SessionPhase,
    pub progress_percent: u8,
    pub status_message: String,
    pub combined_log: Vec<String>,
    pub batches_total: usize,
    pub batches_completed: usize,
    pub batches_failed: usize,
    pub files_total: usize,
    pub files_processed: usize,
    pub aggregate_success_count: u64,
}

/// Shared handle to the orchestrator's [`SessionState`].
pub type SessionHandle = Arc<Mutex<SessionState>>;

/// Summary returned once every batch has been attempted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionOutcome {
    pub session_id: Option<Uuid>,
    pub files_total: usize,
    pub ingested: u64,
    pub batches_total: usize,
    pub batches_failed: usize,
    pub status_message: String,
}

impl SessionOutcome {
    pub fn from_state(state: &SessionState) -> Self {
        Self {
            session_id: state.session_id,
            files_total: state.files_total,
            ingested: state.aggregate_success_count,
            batches_total: state.batches_total,
            batches_failed: state.batches_failed,
            status_message: state.status_message.clone(),
        }
    }
}

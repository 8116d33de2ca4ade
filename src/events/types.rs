use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Sequence number for ordering events
pub type EventSequence = u64;

/// Catalog data-change notifications published by the upload orchestrator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncEvent {
    pub sequence: EventSequence,
    pub timestamp: DateTime<Utc>,
    pub source: String,
    pub payload: SyncEventPayload,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SyncEventPayload {
    /// One batch was accepted by the ingest endpoint
    BatchIngested {
        session_id: Uuid,
        /// Zero-based; user-facing text numbers batches from 1
        batch_index: usize,
        batches_total: usize,
        accepted: u64,
    },

    /// One batch failed; the session carries on with the next one
    BatchFailed {
        session_id: Uuid,
        batch_index: usize,
        reason: String,
    },

    /// Every batch of the session has been attempted
    SessionCompleted {
        session_id: Uuid,
        ingested: u64,
        files_total: usize,
    },
}

impl SyncEvent {
    pub fn new(sequence: EventSequence, source: &str, payload: SyncEventPayload) -> Self {
        Self {
            sequence,
            timestamp: Utc::now(),
            source: source.to_string(),
            payload,
        }
    }

    pub fn session_id(&self) -> Uuid {
        match &self.payload {
            SyncEventPayload::BatchIngested { session_id, .. } => *session_id,
            SyncEventPayload::BatchFailed { session_id, .. } => *session_id,
            SyncEventPayload::SessionCompleted { session_id, .. } => *session_id,
        }
    }

    pub fn payload_type(&self) -> &str {
        match &self.payload {
            SyncEventPayload::BatchIngested { .. } => "batch_ingested",
            SyncEventPayload::BatchFailed { .. } => "batch_failed",
            SyncEventPayload::SessionCompleted { .. } => "session_completed",
        }
    }

    /// True when catalog contents may have changed server-side.
    pub fn is_data_change(&self) -> bool {
        matches!(
            self.payload,
            SyncEventPayload::BatchIngested { .. } | SyncEventPayload::SessionCompleted { .. }
        )
    }
}

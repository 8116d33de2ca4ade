//! Batch upload of photo and video selections.
//!
//! `planner` splits a selection into bounded batches, `transfer` sends one
//! batch as a multipart request, and `orchestrator` runs a whole session.

mod orchestrator;
mod planner;
mod progress;
mod response;
mod retry;
mod selection;
mod transfer;
mod types;

pub use orchestrator::{UploadOrchestrator, NO_FILE_SELECTED};
pub use planner::plan;
pub use progress::ProgressTracker;
pub use response::{parse_ingest_response, parse_leading_count};
pub use retry::{RetryStrategy, RetryingTransfer};
pub use selection::{collect_files, is_media_file, MEDIA_EXTENSIONS};
pub use transfer::{HttpTransfer, ProgressFn, TransferExecutor};
pub use types::*;

use crate::config::ClientConfig;
use crate::error::PhotoTrailsError;

impl BatchLimits {
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            max_bytes: config.max_batch_bytes,
            max_count: config.max_files_per_batch,
        }
    }
}

/// HTTP transfer wrapped in the configured retry policy.
pub fn http_executor(config: &ClientConfig) -> Result<RetryingTransfer<HttpTransfer>, PhotoTrailsError> {
    Ok(RetryingTransfer::new(
        HttpTransfer::from_config(config)?,
        RetryStrategy::from_config(config),
    ))
}

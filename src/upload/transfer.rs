//! Single-batch transfer to the ingest endpoint.
//!
//! Packs every file of a batch into one multipart request. File bodies are
//! streamed from disk and each chunk handed to reqwest advances the progress
//! counter.

use super::response::parse_ingest_response;
use super::types::{Batch, BatchResult};
use crate::config::{ClientConfig, UPLOAD_ENDPOINT, UPLOAD_FIELD_NAME};
use crate::error::PhotoTrailsError;
use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio_util::io::ReaderStream;
use tracing::debug;
use url::Url;

/// Progress callback: `(bytes_sent, bytes_total)` for the current batch.
pub type ProgressFn = Arc<dyn Fn(u64, u64) + Send + Sync>;

/// Performs the network transfer of one batch.
///
/// Callers never run two transfers on the same executor at once.
#[async_trait]
pub trait TransferExecutor: Send + Sync {
    async fn transfer(&self, batch: &Batch, on_progress: ProgressFn) -> Result<BatchResult, PhotoTrailsError>;
}

/// Multipart upload over HTTP.
#[derive(Debug, Clone)]
pub struct HttpTransfer {
    client: Client,
    upload_url: Url,
}

impl HttpTransfer {
    pub fn new(client: Client, upload_url: Url) -> Self {
        Self { client, upload_url }
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, PhotoTrailsError> {
        let client = Client::builder().timeout(config.request_timeout()).build()?;
        Ok(Self::new(client, config.endpoint(UPLOAD_ENDPOINT)?))
    }

    async fn build_form(&self, batch: &Batch, on_progress: &ProgressFn) -> Result<Form, PhotoTrailsError> {
        let bytes_total = batch.total_bytes();
        let sent = Arc::new(AtomicU64::new(0));
        let mut form = Form::new();

        for file in batch.files() {
            let handle = tokio::fs::File::open(&file.path).await.map_err(|e| {
                PhotoTrailsError::transfer(None, format!("Failed to open {}: {}", file.path.display(), e))
            })?;

            let sent = Arc::clone(&sent);
            let on_progress = Arc::clone(on_progress);
            let stream = ReaderStream::new(handle).map(move |chunk| {
                if let Ok(bytes) = &chunk {
                    let now = sent.fetch_add(bytes.len() as u64, Ordering::SeqCst) + bytes.len() as u64;
                    on_progress(now.min(bytes_total), bytes_total);
                }
                chunk
            });

            let part = Part::stream_with_length(Body::wrap_stream(stream), file.byte_size)
                .file_name(file.name.clone());
            form = form.part(UPLOAD_FIELD_NAME, part);
        }

        Ok(form)
    }
}

#[async_trait]
impl TransferExecutor for HttpTransfer {
    async fn transfer(&self, batch: &Batch, on_progress: ProgressFn) -> Result<BatchResult, PhotoTrailsError> {
        let form = self.build_form(batch, &on_progress).await?;

        debug!(
            files = batch.item_count(),
            bytes = batch.total_bytes(),
            url = %self.upload_url,
            "Sending batch"
        );

        let response = self
            .client
            .post(self.upload_url.clone())
            .multipart(form)
            .send()
            .await
            .map_err(PhotoTrailsError::from_send)?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PhotoTrailsError::transfer(Some(status.as_u16()), format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(PhotoTrailsError::transfer(
                Some(status.as_u16()),
                format!("Upload failed with status {}: {}", status, body.trim()),
            ));
        }

        parse_ingest_response(status.as_u16(), &body, batch.item_count())
    }
}

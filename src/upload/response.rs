//! Ingest endpoint response parsing.
//!
//! The accepted count is a structured `accepted` field on newer servers.
//! Older servers only report it as the leading number of `message`
//! ("7 of 10 ingested"), so that is kept as a fallback.

use super::types::BatchResult;
use crate::error::PhotoTrailsError;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct IngestResponse {
    message: String,
    #[serde(default)]
    log: Vec<String>,
    #[serde(default)]
    accepted: Option<u64>,
}

/// Parse an ingest response body into a [`BatchResult`].
///
/// `item_count` caps the reported count so a session never claims more
/// ingested files than it sent.
pub fn parse_ingest_response(
    status: u16,
    body: &str,
    item_count: usize,
) -> Result<BatchResult, PhotoTrailsError> {
    let response: IngestResponse = serde_json::from_str(body).map_err(|e| {
        PhotoTrailsError::transfer(Some(status), format!("Malformed ingest response: {}", e))
    })?;

    let reported = response
        .accepted
        .unwrap_or_else(|| parse_leading_count(&response.message));

    Ok(BatchResult {
        log_lines: response.log,
        success_count: reported.min(item_count as u64),
        raw_message: response.message,
    })
}

/// Leading decimal digits of `message`, or 0 when there are none.
pub fn parse_leading_count(message: &str) -> u64 {
    let digits: String = message
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();

    digits.parse().unwrap_or(0)
}

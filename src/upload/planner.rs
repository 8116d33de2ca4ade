//! Splits a file selection into size- and count-bounded batches.

use super::types::{Batch, BatchLimits, FileItem};

/// Partition `files` into batches, preserving selection order.
///
/// A batch is closed when the next file would push it past either ceiling.
/// A file larger than `max_bytes` still gets a batch of its own.
pub fn plan(files: Vec<FileItem>, limits: BatchLimits) -> Vec<Batch> {
    let max_count = limits.max_count.max(1);
    let mut batches = Vec::new();
    let mut current = Batch::new();

    for file in files {
        let over_bytes = current.total_bytes().saturating_add(file.byte_size) > limits.max_bytes;
        let over_count = current.item_count() + 1 > max_count;

        if !current.is_empty() && (over_bytes || over_count) {
            batches.push(std::mem::take(&mut current));
        }
        current.push(file);
    }

    if !current.is_empty() {
        batches.push(current);
    }

    batches
}

//! Session-wide progress across sequential batches.

/// Maps per-batch byte counts onto one monotonic 0..=100 percentage.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    total_bytes: u64,
    prior_bytes: u64,
    percent: u8,
}

impl ProgressTracker {
    /// `total_bytes` of zero is treated as 1 so empty files still make progress.
    pub fn new(total_bytes: u64) -> Self {
        Self {
            total_bytes: total_bytes.max(1),
            prior_bytes: 0,
            percent: 0,
        }
    }

    /// Record `sent` bytes of the current batch; returns the session percent.
    ///
    /// Never decreases, even if a retried batch restarts its byte count.
    pub fn update(&mut self, sent: u64) -> u8 {
        let done = self.prior_bytes.saturating_add(sent);
        let ratio = done as f64 * 100.0 / self.total_bytes as f64;
        let candidate = ratio.round().clamp(0.0, 100.0) as u8;
        self.percent = self.percent.max(candidate);
        self.percent
    }

    /// Close the current batch, whether it succeeded or not.
    pub fn finish_batch(&mut self, batch_bytes: u64) -> u8 {
        self.prior_bytes = self.prior_bytes.saturating_add(batch_bytes);
        self.update(0)
    }

    /// Pin to 100 once every batch has been attempted.
    pub fn complete(&mut self) -> u8 {
        self.percent = 100;
        self.percent
    }
}

//! Upload session driver.
//!
//! Plans the selection into batches and sends them one at a time. A failed
//! batch is logged and skipped; the session always runs to the last batch.

use super::planner::plan;
use super::progress::ProgressTracker;
use super::transfer::{ProgressFn, TransferExecutor};
use super::types::{
    Batch, BatchLimits, BatchResult, FileItem, SessionHandle, SessionOutcome, SessionPhase, SessionState,
};
use crate::catalog::CatalogPreview;
use crate::error::PhotoTrailsError;
use crate::events::{EventBus, EventReceiver, SyncEventPayload};
use crate::logging::DebugLog;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

const EVENT_SOURCE: &str = "upload";

pub const NO_FILE_SELECTED: &str = "No file selected.";

/// Drives one upload session at a time.
#[derive(Clone)]
pub struct UploadOrchestrator {
    state: SessionHandle,
    executor: Arc<dyn TransferExecutor>,
    limits: BatchLimits,
    events: EventBus,
    debug_log: DebugLog,
    catalog: Option<CatalogPreview>,
    progress_reset_delay: Duration,
}

impl UploadOrchestrator {
    pub fn new(
        executor: Arc<dyn TransferExecutor>,
        limits: BatchLimits,
        events: EventBus,
        debug_log: DebugLog,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(SessionState::default())),
            executor,
            limits,
            events,
            debug_log,
            catalog: None,
            progress_reset_delay: Duration::from_millis(crate::config::DEFAULT_PROGRESS_RESET_DELAY_MS),
        }
    }

    /// Refresh this preview after every successful batch.
    pub fn with_catalog_preview(mut self, catalog: CatalogPreview) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn with_progress_reset_delay(mut self, delay: Duration) -> Self {
        self.progress_reset_delay = delay;
        self
    }

    /// Observe per-batch data changes and session completion.
    pub fn subscribe(&self) -> EventReceiver {
        self.events.subscribe()
    }

    pub fn session(&self) -> SessionHandle {
        Arc::clone(&self.state)
    }

    /// Snapshot of the current session state.
    pub fn state(&self) -> Result<SessionState, PhotoTrailsError> {
        Ok(self.state.lock()?.clone())
    }

    fn update<R>(&self, f: impl FnOnce(&mut SessionState) -> R) -> Result<R, PhotoTrailsError> {
        let mut state = self.state.lock()?;
        Ok(f(&mut state))
    }

    /// Upload `files` in planned batches.
    ///
    /// The selection is consumed. An empty selection only sets the status
    /// message. Calling this while a session is uploading returns
    /// [`PhotoTrailsError::SessionBusy`].
    pub async fn upload(&self, files: Vec<FileItem>) -> Result<SessionOutcome, PhotoTrailsError> {
        if files.is_empty() {
            return self.update(|state| {
                if state.phase != SessionPhase::Uploading {
                    state.status_message = NO_FILE_SELECTED.to_string();
                    state.combined_log.clear();
                }
                SessionOutcome::from_state(state)
            });
        }

        let session_id = Uuid::new_v4();
        let files_total = files.len();
        let total_bytes: u64 = files.iter().map(|f| f.byte_size).sum();
        let batches = plan(files, self.limits);
        let batches_total = batches.len();

        self.update(|state| {
            if state.phase == SessionPhase::Uploading {
                return Err(PhotoTrailsError::SessionBusy);
            }
            *state = SessionState {
                session_id: Some(session_id),
                phase: SessionPhase::Uploading,
                batches_total,
                files_total,
                status_message: format!("Uploading {} file(s) in {} batch(es)...", files_total, batches_total),
                ..SessionState::default()
            };
            Ok(())
        })??;

        info!(%session_id, files_total, batches_total, total_bytes, "Upload session started");

        let tracker = Arc::new(Mutex::new(ProgressTracker::new(total_bytes)));

        for (index, batch) in batches.iter().enumerate() {
            let on_progress = self.progress_callback(Arc::clone(&tracker));
            let outcome = self.executor.transfer(batch, on_progress).await;

            let percent = tracker
                .lock()
                .map(|mut t| t.finish_batch(batch.total_bytes()))
                .unwrap_or(0);
            self.update(|state| state.progress_percent = state.progress_percent.max(percent))?;

            match outcome {
                Ok(result) => self.record_success(session_id, index, batch, result)?,
                Err(err) => self.record_failure(session_id, index, batch, &err)?,
            }
        }

        let percent = tracker.lock()?.complete();
        let outcome = self.update(|state| {
            state.phase = SessionPhase::Done;
            state.progress_percent = percent;
            state.status_message = format!(
                "{} of {} file(s) ingested.",
                state.aggregate_success_count, state.files_total
            );
            SessionOutcome::from_state(state)
        })?;

        info!(
            %session_id,
            ingested = outcome.ingested,
            files_total,
            batches_failed = outcome.batches_failed,
            "Upload session finished"
        );

        self.publish(SyncEventPayload::SessionCompleted {
            session_id,
            ingested: outcome.ingested,
            files_total,
        });
        self.schedule_reset(session_id);

        Ok(outcome)
    }

    fn progress_callback(&self, tracker: Arc<Mutex<ProgressTracker>>) -> ProgressFn {
        let state = Arc::clone(&self.state);
        Arc::new(move |sent: u64, _total: u64| {
            let percent = match tracker.lock() {
                Ok(mut tracker) => tracker.update(sent),
                Err(_) => return,
            };
            if let Ok(mut state) = state.lock() {
                state.progress_percent = state.progress_percent.max(percent);
            }
        })
    }

    fn record_success(
        &self,
        session_id: Uuid,
        index: usize,
        batch: &Batch,
        result: BatchResult,
    ) -> Result<(), PhotoTrailsError> {
        let accepted = result.success_count.min(batch.item_count() as u64);
        debug!(%session_id, batch = index + 1, accepted, message = %result.raw_message, "Batch ingested");
        self.debug_log.extend(EVENT_SOURCE, result.log_lines.iter().cloned());

        let batches_total = self.update(|state| {
            state.combined_log.extend(result.log_lines);
            state.aggregate_success_count += accepted;
            state.files_processed += batch.item_count();
            state.batches_completed += 1;
            state.status_message = format!(
                "Uploaded batch {}/{} ({}/{} files)",
                index + 1,
                state.batches_total,
                state.files_processed,
                state.files_total
            );
            state.batches_total
        })?;

        if let Some(catalog) = &self.catalog {
            catalog.spawn_refresh();
        }
        self.publish(SyncEventPayload::BatchIngested {
            session_id,
            batch_index: index,
            batches_total,
            accepted,
        });
        Ok(())
    }

    fn record_failure(
        &self,
        session_id: Uuid,
        index: usize,
        batch: &Batch,
        err: &PhotoTrailsError,
    ) -> Result<(), PhotoTrailsError> {
        warn!(%session_id, batch = index + 1, files = batch.item_count(), error = %err, "Batch failed");
        let line = format!("Batch {} failed: {}", index + 1, err);
        self.debug_log.push(EVENT_SOURCE, line.clone());

        self.update(|state| {
            state.combined_log.push(line);
            state.batches_completed += 1;
            state.batches_failed += 1;
            state.status_message = format!(
                "Batch {}/{} failed ({}/{} files)",
                index + 1,
                state.batches_total,
                state.files_processed,
                state.files_total
            );
        })?;

        self.publish(SyncEventPayload::BatchFailed {
            session_id,
            batch_index: index,
            reason: err.to_string(),
        });
        Ok(())
    }

    fn publish(&self, payload: SyncEventPayload) {
        if let Err(e) = self.events.publish(EVENT_SOURCE, payload) {
            debug!(error = %e, "No listeners for upload event");
        }
    }

    /// Hold the bar at 100 briefly, then return to idle unless a newer
    /// session has started meanwhile.
    fn schedule_reset(&self, session_id: Uuid) {
        let state = Arc::clone(&self.state);
        let delay = self.progress_reset_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Ok(mut state) = state.lock() {
                if state.session_id == Some(session_id) && state.phase == SessionPhase::Done {
                    state.progress_percent = 0;
                    state.phase = SessionPhase::Idle;
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;

    const MB: u64 = 1024 * 1024;

    /// Replays scripted replies and records the session progress seen after
    /// every callback.
    struct FakeTransfer {
        replies: Mutex<VecDeque<Result<BatchResult, PhotoTrailsError>>>,
        session: Mutex<Option<SessionHandle>>,
        seen_percent: Mutex<Vec<u8>>,
        batch_sizes: Mutex<Vec<usize>>,
    }

    impl FakeTransfer {
        fn new(replies: Vec<Result<BatchResult, PhotoTrailsError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                session: Mutex::new(None),
                seen_percent: Mutex::new(Vec::new()),
                batch_sizes: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl TransferExecutor for FakeTransfer {
        async fn transfer(&self, batch: &Batch, on_progress: ProgressFn) -> Result<BatchResult, PhotoTrailsError> {
            self.batch_sizes.lock().unwrap().push(batch.item_count());
            let total = batch.total_bytes();
            for step in 1..=4 {
                on_progress(total * step / 4, total);
                if let Some(session) = self.session.lock().unwrap().as_ref() {
                    let percent = session.lock().unwrap().progress_percent;
                    self.seen_percent.lock().unwrap().push(percent);
                }
            }
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(ok(batch.item_count() as u64, &[])))
        }
    }

    fn ok(accepted: u64, log: &[&str]) -> BatchResult {
        BatchResult {
            log_lines: log.iter().map(|s| s.to_string()).collect(),
            success_count: accepted,
            raw_message: format!("{} files ingested", accepted),
        }
    }

    fn files(count: usize, size: u64) -> Vec<FileItem> {
        (0..count)
            .map(|i| FileItem::new(format!("IMG_{}.jpg", i), size, format!("/photos/IMG_{}.jpg", i)))
            .collect()
    }

    fn orchestrator(fake: &Arc<FakeTransfer>, max_bytes: u64, max_count: usize) -> UploadOrchestrator {
        let orchestrator = UploadOrchestrator::new(
            fake.clone(),
            BatchLimits { max_bytes, max_count },
            EventBus::new(64),
            DebugLog::new(),
        )
        .with_progress_reset_delay(Duration::from_millis(10));
        *fake.session.lock().unwrap() = Some(orchestrator.session());
        orchestrator
    }

    #[tokio::test]
    async fn test_empty_selection_is_noop() {
        let fake = FakeTransfer::new(vec![]);
        let orchestrator = orchestrator(&fake, 40 * MB, 16);

        let outcome = orchestrator.upload(Vec::new()).await.unwrap();

        let state = orchestrator.state().unwrap();
        assert_eq!(state.phase, SessionPhase::Idle);
        assert_eq!(state.status_message, NO_FILE_SELECTED);
        assert_eq!(outcome.files_total, 0);
        assert!(fake.batch_sizes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_forty_files_three_batches() {
        let fake = FakeTransfer::new(vec![]);
        let orchestrator = orchestrator(&fake, 40 * MB, 16);

        let outcome = orchestrator.upload(files(40, MB)).await.unwrap();

        assert_eq!(*fake.batch_sizes.lock().unwrap(), vec![16, 16, 8]);
        assert_eq!(outcome.batches_total, 3);
        assert_eq!(outcome.ingested, 40);
        assert_eq!(outcome.status_message, "40 of 40 file(s) ingested.");

        let state = orchestrator.state().unwrap();
        assert_eq!(state.batches_completed, 3);
        assert_eq!(state.files_processed, 40);
        assert_eq!(state.progress_percent, 100);
        assert_eq!(state.phase, SessionPhase::Done);
    }

    #[tokio::test]
    async fn test_progress_is_monotonic() {
        let fake = FakeTransfer::new(vec![]);
        let orchestrator = orchestrator(&fake, 3 * MB, 16);

        orchestrator.upload(files(10, MB)).await.unwrap();

        let seen = fake.seen_percent.lock().unwrap().clone();
        assert_eq!(seen.len(), 4 * 4);
        assert!(seen.windows(2).all(|w| w[0] <= w[1]), "progress went backwards: {:?}", seen);
        assert_eq!(*seen.last().unwrap(), 100);
    }

    #[tokio::test]
    async fn test_failed_batch_does_not_stop_session() {
        let fake = FakeTransfer::new(vec![
            Ok(ok(7, &["a", "b"])),
            Err(PhotoTrailsError::transfer(Some(500), "Upload failed with status 500")),
            Ok(ok(2, &["c"])),
        ]);
        let orchestrator = orchestrator(&fake, 40 * MB, 10);
        let mut rx = orchestrator.subscribe();

        let outcome = orchestrator.upload(files(22, MB)).await.unwrap();

        assert_eq!(*fake.batch_sizes.lock().unwrap(), vec![10, 10, 2]);
        assert_eq!(outcome.ingested, 9);
        assert_eq!(outcome.batches_failed, 1);

        let state = orchestrator.state().unwrap();
        assert_eq!(state.batches_completed, state.batches_total);
        assert_eq!(state.files_processed, 12);
        assert_eq!(state.combined_log[..2], ["a".to_string(), "b".to_string()]);
        assert_eq!(state.combined_log[2], "Batch 2 failed: Transfer error: Upload failed with status 500");
        assert_eq!(state.combined_log[3], "c");
        assert_eq!(state.status_message, "9 of 22 file(s) ingested.");

        let mut kinds = Vec::new();
        while let Ok(event) = rx.try_recv() {
            kinds.push(event.payload_type().to_string());
        }
        assert_eq!(
            kinds,
            vec!["batch_ingested", "batch_failed", "batch_ingested", "session_completed"]
        );
    }

    #[tokio::test]
    async fn test_reported_count_scenario() {
        let fake = FakeTransfer::new(vec![Ok(ok(7, &["a", "b"]))]);
        let orchestrator = orchestrator(&fake, 40 * MB, 16);

        let outcome = orchestrator.upload(files(10, MB)).await.unwrap();

        assert_eq!(outcome.ingested, 7);
        assert_eq!(orchestrator.state().unwrap().combined_log, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_over_reporting_server_is_capped() {
        let fake = FakeTransfer::new(vec![Ok(ok(50, &[]))]);
        let orchestrator = orchestrator(&fake, 40 * MB, 16);

        let outcome = orchestrator.upload(files(3, MB)).await.unwrap();
        assert_eq!(outcome.ingested, 3);
        assert!(outcome.ingested <= outcome.files_total as u64);
    }

    #[tokio::test]
    async fn test_zero_byte_files_reach_hundred() {
        let fake = FakeTransfer::new(vec![]);
        let orchestrator = orchestrator(&fake, 40 * MB, 16);

        orchestrator.upload(files(3, 0)).await.unwrap();
        assert_eq!(orchestrator.state().unwrap().progress_percent, 100);
    }

    #[tokio::test]
    async fn test_resets_to_idle_after_delay() {
        let fake = FakeTransfer::new(vec![]);
        let orchestrator = orchestrator(&fake, 40 * MB, 16);

        orchestrator.upload(files(2, MB)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;

        let state = orchestrator.state().unwrap();
        assert_eq!(state.phase, SessionPhase::Idle);
        assert_eq!(state.progress_percent, 0);
        assert_eq!(state.status_message, "2 of 2 file(s) ingested.");
    }

    #[tokio::test]
    async fn test_busy_session_rejected() {
        let fake = FakeTransfer::new(vec![]);
        let orchestrator = orchestrator(&fake, 40 * MB, 16);
        orchestrator.session().lock().unwrap().phase = SessionPhase::Uploading;

        let err = orchestrator.upload(files(1, MB)).await.unwrap_err();
        assert!(matches!(err, PhotoTrailsError::SessionBusy));
        assert!(fake.batch_sizes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_event_batch_index_matches_log_numbering() {
        let fake = FakeTransfer::new(vec![
            Ok(ok(2, &[])),
            Err(PhotoTrailsError::Network("reset".to_string())),
        ]);
        let orchestrator = orchestrator(&fake, 40 * MB, 2);
        let mut rx = orchestrator.subscribe();

        orchestrator.upload(files(4, MB)).await.unwrap();

        let mut indices = Vec::new();
        while let Ok(event) = rx.try_recv() {
            match event.payload {
                SyncEventPayload::BatchIngested { batch_index, batches_total, .. } => {
                    assert_eq!(batches_total, 2);
                    indices.push(batch_index);
                }
                SyncEventPayload::BatchFailed { batch_index, .. } => indices.push(batch_index),
                SyncEventPayload::SessionCompleted { .. } => {}
            }
        }
        // Zero-based in events, one-based in the log
        assert_eq!(indices, vec![0, 1]);
        assert!(orchestrator.state().unwrap().combined_log[0].starts_with("Batch 2 failed"));
    }

    #[test]
    fn test_poisoned_state_is_reported() {
        let fake = FakeTransfer::new(vec![]);
        let orchestrator = UploadOrchestrator::new(
            fake,
            BatchLimits { max_bytes: MB, max_count: 1 },
            EventBus::new(4),
            DebugLog::new(),
        );
        let session = orchestrator.session();
        let _ = std::thread::spawn(move || {
            let _guard = session.lock().unwrap();
            panic!("writer died holding the session lock");
        })
        .join();

        assert!(matches!(orchestrator.state(), Err(PhotoTrailsError::LockPoisoned(_))));
    }
}

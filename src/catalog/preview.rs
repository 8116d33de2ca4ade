//! Catalog preview table: the latest full snapshot of the catalog.

use super::client::CatalogSource;
use super::types::PhotoRecord;
use crate::logging::DebugLog;
use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub const CLEAR_OK_MESSAGE: &str = "Database cleared.";
pub const CLEAR_FAILED_MESSAGE: &str = "Failed to clear database.";

/// Holds the rows shown in the preview table.
///
/// Refreshes are best-effort: a failed fetch keeps the previous rows. Each
/// refresh takes a generation when it starts, and only the newest one may
/// write, so a slow older fetch never overwrites a newer snapshot.
#[derive(Clone)]
pub struct CatalogPreview {
    source: Arc<dyn CatalogSource>,
    rows: Arc<Mutex<Vec<PhotoRecord>>>,
    generation: Arc<AtomicU64>,
    debug_log: DebugLog,
}

impl CatalogPreview {
    pub fn new(source: Arc<dyn CatalogSource>, debug_log: DebugLog) -> Self {
        Self {
            source,
            rows: Arc::new(Mutex::new(Vec::new())),
            generation: Arc::new(AtomicU64::new(0)),
            debug_log,
        }
    }

    pub fn rows(&self) -> Vec<PhotoRecord> {
        self.rows.lock().map(|rows| rows.clone()).unwrap_or_default()
    }

    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Fetch a fresh snapshot. Returns false if the rows were not replaced.
    pub async fn refresh(&self) -> bool {
        let generation = self.next_generation();
        self.refresh_as(generation).await
    }

    async fn refresh_as(&self, generation: u64) -> bool {
        let records = match self.source.fetch_all().await {
            Ok(records) => records,
            Err(e) => {
                warn!(error = %e, "Catalog refresh failed, keeping previous rows");
                return false;
            }
        };

        let mut rows = match self.rows.lock() {
            Ok(rows) => rows,
            Err(_) => return false,
        };
        // Checked under the rows lock so a newer refresh cannot write in between
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!(generation, "Catalog refresh superseded, dropping snapshot");
            return false;
        }
        *rows = records;
        true
    }

    /// Fire-and-forget refresh. Ordering follows call order, not completion order.
    pub fn spawn_refresh(&self) -> JoinHandle<()> {
        let generation = self.next_generation();
        let preview = self.clone();
        tokio::spawn(async move {
            preview.refresh_as(generation).await;
        })
    }

    /// Run the administrative clear action, then refresh on success.
    pub async fn clear_and_refresh(&self) -> String {
        match self.source.clear().await {
            Ok(()) => {
                self.debug_log.push("catalog", CLEAR_OK_MESSAGE);
                self.refresh().await;
                CLEAR_OK_MESSAGE.to_string()
            }
            Err(e) => {
                warn!(error = %e, "Clear action failed");
                self.debug_log.push("catalog", CLEAR_FAILED_MESSAGE);
                CLEAR_FAILED_MESSAGE.to_string()
            }
        }
    }
}

fn format_coordinate(value: Option<f64>) -> String {
    value.map(|v| format!("{:.6}", v)).unwrap_or_else(|| "-".to_string())
}

fn format_people(people: &[String]) -> String {
    if people.is_empty() {
        "-".to_string()
    } else {
        people.join(", ")
    }
}

/// Plain-text table of `rows`: id, file path, coordinates, people, description.
pub fn render_table(rows: &[PhotoRecord]) -> String {
    let path_width = rows
        .iter()
        .map(|r| r.file_path.chars().count())
        .max()
        .unwrap_or(0)
        .max("File".len());
    let people_width = rows
        .iter()
        .map(|r| format_people(&r.people).chars().count())
        .max()
        .unwrap_or(0)
        .max("People".len());

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>6}  {:<path_width$}  {:>11}  {:>11}  {:<people_width$}  {}",
        "ID", "File", "Latitude", "Longitude", "People", "Description"
    );
    for row in rows {
        let _ = writeln!(
            out,
            "{:>6}  {:<path_width$}  {:>11}  {:>11}  {:<people_width$}  {}",
            row.id,
            row.file_path,
            format_coordinate(row.latitude),
            format_coordinate(row.longitude),
            format_people(&row.people),
            row.description.as_deref().unwrap_or("-"),
        );
    }
    let _ = writeln!(out, "{} photo(s)", rows.len());
    out
}

//! Paged loader for geotagged catalog records.
//!
//! Each `load_all` builds a fresh [`GeoLoadState`] and installs it into the
//! map only if no newer load has started meanwhile. A failed page abandons
//! the load and leaves the current markers in place.

use super::bounds::{BoundsAccumulator, GeoBounds};
use super::view::{MapView, Marker};
use crate::catalog::{CatalogSource, PhotoRecord};
use crate::logging::DebugLog;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Visual padding applied when fitting the view to loaded markers.
pub const FIT_PADDING_PX: u32 = 20;

/// Markers and cursor accumulated by one load.
#[derive(Debug, Clone)]
pub struct GeoLoadState {
    pub markers: Vec<Marker>,
    pub bounds: BoundsAccumulator,
    pub page_offset: u64,
    pub page_limit: u64,
    pub has_more: bool,
}

impl GeoLoadState {
    pub fn new(page_limit: u64) -> Self {
        Self {
            markers: Vec::new(),
            bounds: BoundsAccumulator::default(),
            page_offset: 0,
            page_limit,
            has_more: true,
        }
    }

    /// Add every record that has both coordinates.
    pub fn absorb(&mut self, records: Vec<PhotoRecord>) {
        for record in records {
            if let Some((lat, lng)) = record.coordinates() {
                self.bounds.add(lat, lng);
                self.markers.push(Marker { lat, lng, record });
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    Installed {
        markers: usize,
        pages: usize,
        bounds: Option<GeoBounds>,
    },
    /// A newer load started; this one's results were dropped.
    Superseded,
    /// A page request failed; the previous markers are still shown.
    Failed(String),
}

pub struct GeoPageLoader {
    source: Arc<dyn CatalogSource>,
    view: Arc<dyn MapView>,
    page_size: u64,
    generation: AtomicU64,
    install_lock: Mutex<()>,
    debug_log: DebugLog,
}

impl GeoPageLoader {
    pub fn new(source: Arc<dyn CatalogSource>, view: Arc<dyn MapView>, page_size: u64, debug_log: DebugLog) -> Self {
        Self {
            source,
            view,
            page_size: page_size.max(1),
            generation: AtomicU64::new(0),
            install_lock: Mutex::new(()),
            debug_log,
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    /// Fetch every page of geotagged records and swap them into the view.
    pub async fn load_all(&self) -> LoadOutcome {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let mut state = GeoLoadState::new(self.page_size);
        let mut pages = 0;

        while state.has_more {
            let page = match self.source.fetch_geo_page(state.page_offset, state.page_limit).await {
                Ok(page) => page,
                Err(e) if !self.is_current(generation) => {
                    debug!(generation, error = %e, "Superseded geo load failed");
                    return LoadOutcome::Superseded;
                }
                Err(e) => {
                    warn!(generation, offset = state.page_offset, error = %e, "Geo load aborted");
                    self.debug_log.push("map", format!("Map refresh failed: {}", e));
                    return LoadOutcome::Failed(e.to_string());
                }
            };
            pages += 1;

            if !self.is_current(generation) {
                debug!(generation, "Geo load superseded while paging");
                return LoadOutcome::Superseded;
            }

            state.has_more = page.has_more;
            let step = page.limit.filter(|limit| *limit > 0).unwrap_or(state.page_limit);
            state.absorb(page.items);
            if state.has_more {
                state.page_offset += step;
            }
        }

        let bounds = state.bounds.bounds();
        let markers = state.markers.len();

        let _guard = match self.install_lock.lock() {
            Ok(guard) => guard,
            Err(_) => return LoadOutcome::Failed("marker layer lock poisoned".to_string()),
        };
        if !self.is_current(generation) {
            debug!(generation, "Geo load superseded before install");
            return LoadOutcome::Superseded;
        }

        self.view.replace_markers(state.markers);
        if let Some(bounds) = bounds {
            self.view.fit_bounds(bounds, FIT_PADDING_PX);
        }

        info!(generation, markers, pages, "Map markers installed");
        LoadOutcome::Installed { markers, pages, bounds }
    }
}

use super::bounds::GeoBounds;
use crate::catalog::PhotoRecord;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// A map pin for one geotagged record.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub lat: f64,
    pub lng: f64,
    pub record: PhotoRecord,
}

impl Marker {
    /// Preview image shown on hover, when the catalog provides one.
    pub fn tooltip_url(&self) -> Option<&str> {
        self.record.url.as_deref()
    }
}

/// Rendering side of the map (tiles, clustering and drawing live behind it).
pub trait MapView: Send + Sync {
    /// Remove every current marker and install `markers` in one step.
    fn replace_markers(&self, markers: Vec<Marker>);

    fn fit_bounds(&self, bounds: GeoBounds, padding_px: u32);
}

/// In-memory marker layer.
#[derive(Debug, Default)]
pub struct MarkerLayer {
    markers: Mutex<Vec<Marker>>,
    fitted: Mutex<Option<(GeoBounds, u32)>>,
    installs: AtomicUsize,
}

impl MarkerLayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn markers(&self) -> Vec<Marker> {
        self.markers.lock().map(|m| m.clone()).unwrap_or_default()
    }

    pub fn marker_count(&self) -> usize {
        self.markers.lock().map(|m| m.len()).unwrap_or(0)
    }

    /// Last bounds the view was fitted to, with the padding used.
    pub fn fitted_bounds(&self) -> Option<(GeoBounds, u32)> {
        self.fitted.lock().ok().and_then(|f| *f)
    }

    /// How many marker sets have been installed.
    pub fn installs(&self) -> usize {
        self.installs.load(Ordering::SeqCst)
    }
}

impl MapView for MarkerLayer {
    fn replace_markers(&self, markers: Vec<Marker>) {
        if let Ok(mut current) = self.markers.lock() {
            *current = markers;
            self.installs.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn fit_bounds(&self, bounds: GeoBounds, padding_px: u32) {
        if let Ok(mut fitted) = self.fitted.lock() {
            *fitted = Some((bounds, padding_px));
        }
    }
}

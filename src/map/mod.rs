//! Geotagged photo map: paged marker loading and view fitting.

mod bounds;
mod loader;
mod view;

pub use bounds::{BoundsAccumulator, GeoBounds};
pub use loader::{GeoLoadState, GeoPageLoader, LoadOutcome, FIT_PADDING_PX};
pub use view::{MapView, Marker, MarkerLayer};

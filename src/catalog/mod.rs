//! Catalog reads: full snapshot for the preview table and paged geo listing.

mod client;
mod preview;
mod types;

pub use client::{CatalogClient, CatalogSource};
pub use preview::{render_table, CatalogPreview, CLEAR_FAILED_MESSAGE, CLEAR_OK_MESSAGE};
pub use types::{GeoPage, PhotoRecord};

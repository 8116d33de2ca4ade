// Library exports for the CLI binary and integration tests

pub mod catalog;
pub mod config;
pub mod error;
pub mod events;
pub mod logging;
pub mod map;
pub mod shutdown;
pub mod upload;

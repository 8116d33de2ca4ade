use super::{EventBus, SyncEvent};
use crate::map::{GeoPageLoader, LoadOutcome};
use crate::shutdown::ShutdownCoordinator;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Handler that reloads map markers whenever the catalog changes
pub struct MapRefreshHandler {
    loader: Arc<GeoPageLoader>,
    event_bus: EventBus,
    shutdown: ShutdownCoordinator,
}

impl MapRefreshHandler {
    pub fn new(loader: Arc<GeoPageLoader>, event_bus: EventBus, shutdown: ShutdownCoordinator) -> Self {
        Self {
            loader,
            event_bus,
            shutdown,
        }
    }

    /// Subscribe now and process events on a background task until shutdown.
    pub fn start(self) -> JoinHandle<()> {
        let mut rx = self.event_bus.subscribe();
        let mut shutdown_rx = self.shutdown.subscribe();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = rx.recv() => {
                        match result {
                            Ok(event) => self.handle_event(&event).await,
                            Err(broadcast::error::RecvError::Closed) => {
                                info!("Map refresh handler stopped (event bus closed)");
                                break;
                            }
                            Err(broadcast::error::RecvError::Lagged(n)) => {
                                // Missed events may have been data changes.
                                warn!(missed = n, "Map refresh handler lagged, reloading");
                                self.reload().await;
                            }
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        info!("Map refresh handler gracefully shutting down");
                        break;
                    }
                }
            }
        })
    }

    async fn handle_event(&self, event: &SyncEvent) {
        if !event.is_data_change() {
            debug!(sequence = event.sequence, kind = event.payload_type(), "Ignoring event");
            return;
        }
        debug!(
            sequence = event.sequence,
            session_id = %event.session_id(),
            kind = event.payload_type(),
            "Catalog changed, reloading map"
        );
        self.reload().await;
    }

    async fn reload(&self) {
        match self.loader.load_all().await {
            LoadOutcome::Installed { markers, .. } => debug!(markers, "Map refreshed"),
            LoadOutcome::Superseded => debug!("Map refresh superseded"),
            LoadOutcome::Failed(reason) => warn!(%reason, "Map refresh failed"),
        }
    }
}

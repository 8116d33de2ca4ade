use tokio::sync::broadcast;

/// Coordinates graceful shutdown across background handlers
///
/// Usage:
/// ```no_run
/// use photo_trails_sync::events::EventBus;
/// use photo_trails_sync::shutdown::ShutdownCoordinator;
///
/// # async fn example() {
/// let coordinator = ShutdownCoordinator::new();
/// let bus = EventBus::default();
///
/// let mut shutdown_rx = coordinator.subscribe();
/// let mut event_rx = bus.subscribe();
/// loop {
///     tokio::select! {
///         _event = event_rx.recv() => { /* reload markers */ }
///         _ = shutdown_rx.recv() => break,
///     }
/// }
///
/// // Elsewhere, to stop every handler:
/// coordinator.shutdown();
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct ShutdownCoordinator {
    shutdown_tx: broadcast::Sender<()>,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        let (shutdown_tx, _) = broadcast::channel(4);
        Self { shutdown_tx }
    }

    /// Receiver that yields once shutdown is initiated
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Signal every subscriber. A no-op when nobody is listening.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    pub fn has_subscribers(&self) -> bool {
        self.shutdown_tx.receiver_count() > 0
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

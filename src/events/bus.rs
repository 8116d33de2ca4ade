use super::types::{EventSequence, SyncEvent, SyncEventPayload};
use crate::error::PhotoTrailsError;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

pub type EventReceiver = broadcast::Receiver<SyncEvent>;
pub type EventSender = broadcast::Sender<SyncEvent>;

pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Fan-out of upload progress and catalog-change events.
///
/// The orchestrator publishes; the map refresh handler and the CLI reporter
/// subscribe. Receivers that fall more than `capacity` events behind see
/// `RecvError::Lagged` and should treat the catalog as changed.
#[derive(Clone, Debug)]
pub struct EventBus {
    sender: EventSender,
    next_sequence: Arc<AtomicU64>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            next_sequence: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Stamp `payload` with the next sequence number and broadcast it.
    ///
    /// The sequence is consumed even when nobody is listening, so gaps are
    /// possible but ordering is not.
    pub fn publish(&self, source: &str, payload: SyncEventPayload) -> Result<EventSequence, PhotoTrailsError> {
        let sequence = self.next_sequence.fetch_add(1, Ordering::SeqCst);
        let event = SyncEvent::new(sequence, source, payload);
        let kind = event.payload_type().to_string();

        self.sender
            .send(event)
            .map(|_| sequence)
            .map_err(|_| PhotoTrailsError::NoSubscribers(kind))
    }

    pub fn subscribe(&self) -> EventReceiver {
        self.sender.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

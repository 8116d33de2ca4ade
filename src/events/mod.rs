mod bus;
mod handlers;
mod types;

pub use bus::{EventBus, EventReceiver, EventSender, DEFAULT_EVENT_CAPACITY};
pub use handlers::MapRefreshHandler;
pub use types::{EventSequence, SyncEvent, SyncEventPayload};

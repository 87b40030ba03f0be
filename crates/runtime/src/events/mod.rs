//! Topic-based event bus for runtime events.
//!
//! The server session publishes what each command changed; consumers
//! subscribe only to the topics they need.

mod bus;
mod types;

pub use bus::{Event, EventBus, Topic};
pub use types::{EquipmentChanged, ItemsChanged, ReplicationEvent};

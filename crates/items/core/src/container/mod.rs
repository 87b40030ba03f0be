//! Containers: slot-addressable item lists governed by rules.
pub mod definition;
pub mod item_container;
pub mod list;
pub mod plan;
pub mod slots;

pub use definition::{ContainerDefinition, SlotLimit};
pub use item_container::ItemContainer;
pub use list::{ItemList, ItemListEntry, ItemListError};
pub use plan::AddPlan;
pub use slots::SlotChangeTracker;

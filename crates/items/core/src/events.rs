//! Notifications produced by containers and items.
//!
//! A collection queues events in firing order; listeners drain the queue
//! after each operation. Removal events are queued before the item leaves
//! the store, add events after the entry is live.

use crate::item::ItemId;
use crate::rules::RuleKind;
use crate::tag::Tag;

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ContainerEvent {
    ItemAdded {
        container: Tag,
        item: ItemId,
        slot: usize,
    },
    ItemRemoved {
        container: Tag,
        item: ItemId,
        slot: usize,
    },
    /// A single slot changed.
    SlotChanged { container: Tag, slot: usize },
    /// A contiguous, inclusive range of slots changed.
    SlotsChanged {
        container: Tag,
        start: usize,
        end: usize,
    },
    NumSlotsChanged {
        container: Tag,
        new: usize,
        old: usize,
    },
    RuleAdded { container: Tag, rule: RuleKind },
    RuleRemoved { container: Tag, rule: RuleKind },
}

impl ContainerEvent {
    pub fn container(&self) -> &Tag {
        match self {
            ContainerEvent::ItemAdded { container, .. }
            | ContainerEvent::ItemRemoved { container, .. }
            | ContainerEvent::SlotChanged { container, .. }
            | ContainerEvent::SlotsChanged { container, .. }
            | ContainerEvent::NumSlotsChanged { container, .. }
            | ContainerEvent::RuleAdded { container, .. }
            | ContainerEvent::RuleRemoved { container, .. } => container,
        }
    }

    /// True when `slot` is covered by this slot event.
    pub fn covers_slot(&self, slot: usize) -> bool {
        match self {
            ContainerEvent::SlotChanged { slot: changed, .. } => *changed == slot,
            ContainerEvent::SlotsChanged { start, end, .. } => (*start..=*end).contains(&slot),
            _ => false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ItemEvent {
    CountChanged {
        item: ItemId,
        new: u32,
        old: u32,
    },
    TagStatChanged {
        item: ItemId,
        tag: Tag,
        new: i32,
        old: i32,
    },
    /// The item now occupies `new_slot` of `container`.
    Slotted {
        item: ItemId,
        container: Tag,
        new_slot: usize,
        old_slot: Option<usize>,
    },
    Unslotted {
        item: ItemId,
        container: Tag,
        old_slot: usize,
    },
}

impl ItemEvent {
    pub fn item(&self) -> ItemId {
        match self {
            ItemEvent::CountChanged { item, .. }
            | ItemEvent::TagStatChanged { item, .. }
            | ItemEvent::Slotted { item, .. }
            | ItemEvent::Unslotted { item, .. } => *item,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ItemsEvent {
    Container(ContainerEvent),
    Item(ItemEvent),
}

impl From<ContainerEvent> for ItemsEvent {
    fn from(event: ContainerEvent) -> Self {
        ItemsEvent::Container(event)
    }
}

impl From<ItemEvent> for ItemsEvent {
    fn from(event: ItemEvent) -> Self {
        ItemsEvent::Item(event)
    }
}

use std::fmt;
use std::sync::Arc;

use super::definition::{ItemDefId, ItemDefinition};
use super::fragment::ItemFragment;
use super::tag_stack::TagStackContainer;
use crate::events::ItemEvent;
use crate::tag::{Tag, TagSet};

/// Identifier of an item instance inside one [`super::ItemStore`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ItemId(pub u64);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "item#{}", self.0)
    }
}

/// A stack of one item definition.
///
/// Counts and tag stats change through setters that report the change as an
/// [`ItemEvent`]; the owning collection forwards those events to listeners.
#[derive(Clone, Debug)]
pub struct ItemInstance {
    id: ItemId,
    def: Arc<ItemDefinition>,
    count: u32,
    tag_stats: TagStackContainer,
    containers: Vec<Tag>,
}

impl ItemInstance {
    pub(crate) fn new(id: ItemId, def: Arc<ItemDefinition>, count: u32) -> Self {
        Self {
            id,
            def,
            count,
            tag_stats: TagStackContainer::new(),
            containers: Vec::new(),
        }
    }

    pub fn id(&self) -> ItemId {
        self.id
    }

    pub fn def(&self) -> &Arc<ItemDefinition> {
        &self.def
    }

    pub fn def_id(&self) -> &ItemDefId {
        &self.def.id
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    /// Tags of the definition.
    pub fn owned_tags(&self) -> &TagSet {
        &self.def.owned_tags
    }

    /// Ids of every container currently listing this item.
    pub fn containers(&self) -> &[Tag] {
        &self.containers
    }

    pub fn set_count(&mut self, count: u32) -> Option<ItemEvent> {
        let old = self.count;
        if old == count {
            return None;
        }
        self.count = count;
        Some(ItemEvent::CountChanged {
            item: self.id,
            new: count,
            old,
        })
    }

    pub fn tag_stat(&self, tag: &Tag) -> i32 {
        self.tag_stats.count(tag)
    }

    pub fn tag_stats(&self) -> &TagStackContainer {
        &self.tag_stats
    }

    pub fn add_tag_stat(&mut self, tag: &Tag, delta: i32) -> Option<ItemEvent> {
        let (new, old) = self.tag_stats.add_stack(tag, delta)?;
        Some(self.tag_stat_event(tag, new, old))
    }

    pub fn remove_tag_stat(&mut self, tag: &Tag, delta: i32) -> Option<ItemEvent> {
        let (new, old) = self.tag_stats.remove_stack(tag, delta)?;
        Some(self.tag_stat_event(tag, new, old))
    }

    /// Same definition and no fragment vetoes stacking.
    pub fn is_matching(&self, other: &ItemInstance) -> bool {
        self.def.id == other.def.id
            && !self
                .def
                .fragments
                .iter()
                .any(|fragment| fragment.vetoes_match(self, other))
    }

    /// Copies count and tag stats. Identity and container membership stay.
    pub fn copy_properties_from(&mut self, other: &ItemInstance) -> Vec<ItemEvent> {
        let mut events = Vec::new();
        events.extend(self.set_count(other.count));

        // Go through the stack setters so replication ids stay owned by this item.
        let stale: Vec<(Tag, i32)> = self
            .tag_stats
            .iter()
            .filter(|(tag, _)| !other.tag_stats.contains(tag))
            .map(|(tag, count)| (tag.clone(), count))
            .collect();
        for (tag, count) in stale {
            events.extend(self.remove_tag_stat(&tag, count));
        }
        for (tag, target) in other.tag_stats.iter() {
            let current = self.tag_stats.count(tag);
            let event = if target > current {
                self.add_tag_stat(tag, target - current)
            } else {
                self.remove_tag_stat(tag, current - target)
            };
            events.extend(event);
        }
        events
    }

    pub(crate) fn tag_stats_mut(&mut self) -> &mut TagStackContainer {
        &mut self.tag_stats
    }

    pub(crate) fn attach(&mut self, container: &Tag) {
        if !self.containers.contains(container) {
            self.containers.push(container.clone());
        }
    }

    pub(crate) fn detach(&mut self, container: &Tag) {
        self.containers.retain(|c| c != container);
    }

    fn tag_stat_event(&self, tag: &Tag, new: i32, old: i32) -> ItemEvent {
        ItemEvent::TagStatChanged {
            item: self.id,
            tag: tag.clone(),
            new,
            old,
        }
    }
}

impl fmt::Display for ItemInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({} x{})", self.id, self.def.id, self.count)
    }
}

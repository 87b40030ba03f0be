//! Equipment instances and the replicated equipment list.

use std::fmt;

use crate::item::{ItemId, TagStackContainer};
use crate::replication::{
    FastArrayDelta, FastArrayItem, FastArrayObserver, ReplicationId, ReplicationIdAllocator,
    apply_fast_array, diff_fast_array,
};
use crate::tag::Tag;

use super::EquipmentDefId;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EquipmentId(pub u32);

impl fmt::Display for EquipmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "equipment#{}", self.0)
    }
}

/// What to grant: a definition plus the tag stats copied from the granting
/// item, so equipment can be applied without replicating the item itself.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EquipmentSpec {
    pub def: EquipmentDefId,
    #[cfg_attr(feature = "serde", serde(default))]
    pub tag_stats: Vec<(Tag, i32)>,
}

impl EquipmentSpec {
    pub fn new(def: impl Into<EquipmentDefId>) -> Self {
        Self {
            def: def.into(),
            tag_stats: Vec::new(),
        }
    }

    pub fn from_tag_stats(def: EquipmentDefId, stats: &TagStackContainer) -> Self {
        Self {
            def,
            tag_stats: stats.iter().map(|(tag, count)| (tag.clone(), count)).collect(),
        }
    }
}

/// One applied piece of equipment.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Equipment {
    pub id: EquipmentId,
    pub def: EquipmentDefId,
    pub tag_stats: Vec<(Tag, i32)>,
    pub instigator: Option<ItemId>,
    /// Local state; each side equips according to its own component.
    #[cfg_attr(feature = "serde", serde(skip))]
    pub equipped: bool,
    pub replication_key: u32,
}

impl Equipment {
    pub fn tag_stat(&self, tag: &Tag) -> i32 {
        self.tag_stats
            .iter()
            .find(|(stat, _)| stat == tag)
            .map_or(0, |(_, count)| *count)
    }
}

impl FastArrayItem for Equipment {
    fn replication_id(&self) -> ReplicationId {
        ReplicationId(self.id.0)
    }

    fn replication_key(&self) -> u32 {
        self.replication_key
    }
}

#[derive(Clone, Debug, Default)]
pub struct EquipmentList {
    entries: Vec<Equipment>,
    ids: ReplicationIdAllocator,
}

impl EquipmentList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[Equipment] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: EquipmentId) -> Option<&Equipment> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub(crate) fn get_mut(&mut self, id: EquipmentId) -> Option<&mut Equipment> {
        self.entries.iter_mut().find(|e| e.id == id)
    }

    pub(crate) fn add_entry(&mut self, spec: EquipmentSpec, instigator: Option<ItemId>) -> EquipmentId {
        let id = EquipmentId(self.ids.allocate().0);
        self.entries.push(Equipment {
            id,
            def: spec.def,
            tag_stats: spec.tag_stats,
            instigator,
            equipped: false,
            replication_key: 0,
        });
        id
    }

    pub(crate) fn remove_entry(&mut self, id: EquipmentId) -> Option<Equipment> {
        let index = self.entries.iter().position(|e| e.id == id)?;
        Some(self.entries.remove(index))
    }

    pub fn diff(&self, baseline: &[Equipment]) -> FastArrayDelta<Equipment> {
        diff_fast_array(baseline, &self.entries)
    }

    pub(crate) fn apply_delta<O>(&mut self, delta: FastArrayDelta<Equipment>, observer: &mut O)
    where
        O: FastArrayObserver<Equipment> + ?Sized,
    {
        for entry in delta.added.iter().chain(delta.changed.iter()) {
            self.ids.observe(entry.replication_id());
        }
        apply_fast_array(&mut self.entries, delta, observer);
    }
}

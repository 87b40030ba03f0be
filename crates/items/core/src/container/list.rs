//! Slot-addressable item list with fast-array replication.
//!
//! Each entry pairs a slot with an item id. A slot without an entry is empty.
//! The list never reorders or compacts on its own; callers decide whether a
//! removal collapses the slots above it (unlimited containers) or leaves a
//! hole (slot-limited containers).

use crate::error::{ErrorSeverity, ItemsError};
use crate::item::ItemId;
use crate::replication::{
    FastArrayDelta, FastArrayItem, FastArrayObserver, ReplicationId, ReplicationIdAllocator,
    apply_fast_array, diff_fast_array,
};

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ItemListError {
    /// Target slot already holds an item.
    #[error("slot {slot} is occupied by {occupant}")]
    SlotOccupied {
        /// The requested slot.
        slot: usize,
        /// Item already in the slot.
        occupant: ItemId,
    },

    /// The item is already listed.
    #[error("{item} is already listed at slot {slot}")]
    AlreadyListed {
        /// The item.
        item: ItemId,
        /// Slot it occupies.
        slot: usize,
    },
}

impl ItemsError for ItemListError {
    fn severity(&self) -> ErrorSeverity {
        use ItemListError::*;
        match self {
            SlotOccupied { .. } => ErrorSeverity::Recoverable,
            AlreadyListed { .. } => ErrorSeverity::Internal,
        }
    }

    fn error_code(&self) -> &'static str {
        use ItemListError::*;
        match self {
            SlotOccupied { .. } => "ITEM_LIST_SLOT_OCCUPIED",
            AlreadyListed { .. } => "ITEM_LIST_ALREADY_LISTED",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ItemListEntry {
    pub slot: usize,
    pub item: ItemId,
    pub replication_id: ReplicationId,
    pub replication_key: u32,
    /// Slot the replica last reported for this entry.
    #[cfg_attr(feature = "serde", serde(skip))]
    pub last_known_slot: Option<usize>,
}

impl ItemListEntry {
    fn mark_dirty(&mut self) {
        self.replication_key = self.replication_key.wrapping_add(1);
    }
}

impl FastArrayItem for ItemListEntry {
    fn replication_id(&self) -> ReplicationId {
        self.replication_id
    }

    fn replication_key(&self) -> u32 {
        self.replication_key
    }
}

#[derive(Clone, Debug, Default)]
pub struct ItemList {
    entries: Vec<ItemListEntry>,
    ids: ReplicationIdAllocator,
}

impl ItemList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of listed items.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[ItemListEntry] {
        &self.entries
    }

    /// Places `item` at `slot`, or at `len()` when no slot is given.
    pub fn add_entry_at(&mut self, item: ItemId, slot: Option<usize>) -> Result<usize, ItemListError> {
        if let Some(existing) = self.slot_of(item) {
            return Err(ItemListError::AlreadyListed {
                item,
                slot: existing,
            });
        }
        let slot = slot.unwrap_or(self.entries.len());
        if let Some(occupant) = self.item_at(slot) {
            return Err(ItemListError::SlotOccupied { slot, occupant });
        }

        let replication_id = self.ids.allocate();
        self.entries.push(ItemListEntry {
            slot,
            item,
            replication_id,
            replication_key: 0,
            last_known_slot: Some(slot),
        });
        Ok(slot)
    }

    /// Removes the first entry listing `item`.
    pub fn remove_entry(&mut self, item: ItemId) -> bool {
        match self.entries.iter().position(|e| e.item == item) {
            Some(index) => {
                self.entries.remove(index);
                true
            }
            None => false,
        }
    }

    /// Removes the entry at `slot`.
    ///
    /// With `collapse`, every entry above `slot` moves down by one.
    pub fn remove_entry_at(&mut self, slot: usize, collapse: bool) -> Option<ItemId> {
        let index = self.entries.iter().position(|e| e.slot == slot)?;
        let removed = self.entries.remove(index);
        if collapse {
            for entry in self.entries.iter_mut().filter(|e| e.slot > slot) {
                entry.slot -= 1;
                entry.last_known_slot = Some(entry.slot);
                entry.mark_dirty();
            }
        }
        Some(removed.item)
    }

    /// Exchanges the contents of two slots. Returns false if both are empty.
    pub fn swap_entries(&mut self, a: usize, b: usize) -> bool {
        let index_a = self.entries.iter().position(|e| e.slot == a);
        let index_b = self.entries.iter().position(|e| e.slot == b);
        if index_a.is_none() && index_b.is_none() {
            return false;
        }
        for (index, slot) in [(index_a, b), (index_b, a)] {
            if let Some(index) = index {
                let entry = &mut self.entries[index];
                entry.slot = slot;
                entry.last_known_slot = Some(slot);
                entry.mark_dirty();
            }
        }
        true
    }

    /// Removes every entry, returning `(slot, item)` pairs in slot order.
    pub fn reset(&mut self) -> Vec<(usize, ItemId)> {
        let mut removed: Vec<_> = self.entries.drain(..).map(|e| (e.slot, e.item)).collect();
        removed.sort_unstable_by_key(|(slot, _)| *slot);
        removed
    }

    pub fn item_at(&self, slot: usize) -> Option<ItemId> {
        self.entries.iter().find(|e| e.slot == slot).map(|e| e.item)
    }

    pub fn has_item_in_slot(&self, slot: usize) -> bool {
        self.entries.iter().any(|e| e.slot == slot)
    }

    pub fn slot_of(&self, item: ItemId) -> Option<usize> {
        self.entries.iter().find(|e| e.item == item).map(|e| e.slot)
    }

    pub fn contains(&self, item: ItemId) -> bool {
        self.entries.iter().any(|e| e.item == item)
    }

    /// Occupied slots in ascending order.
    pub fn slots(&self) -> Vec<usize> {
        let mut slots: Vec<_> = self.entries.iter().map(|e| e.slot).collect();
        slots.sort_unstable();
        slots
    }

    /// Items in slot order, skipping empty slots.
    pub fn all_items(&self) -> Vec<ItemId> {
        self.sorted_entries().into_iter().map(|e| e.item).collect()
    }

    /// `(slot, item)` pairs in slot order.
    pub fn slot_items(&self) -> Vec<(usize, ItemId)> {
        self.sorted_entries()
            .into_iter()
            .map(|e| (e.slot, e.item))
            .collect()
    }

    pub fn diff(&self, baseline: &[ItemListEntry]) -> FastArrayDelta<ItemListEntry> {
        diff_fast_array(baseline, &self.entries)
    }

    /// Applies an authority delta. `observer` sees removals before the entries
    /// are dropped and additions/changes once they are live, with each entry's
    /// previous slot still in `last_known_slot`.
    pub fn apply_delta<O>(&mut self, delta: FastArrayDelta<ItemListEntry>, observer: &mut O)
    where
        O: FastArrayObserver<ItemListEntry> + ?Sized,
    {
        let previous: Vec<(ReplicationId, Option<usize>)> = self
            .entries
            .iter()
            .map(|e| (e.replication_id, e.last_known_slot))
            .collect();
        for entry in delta.added.iter().chain(delta.changed.iter()) {
            self.ids.observe(entry.replication_id);
        }

        let mut delta = delta;
        for entry in delta.added.iter_mut().chain(delta.changed.iter_mut()) {
            entry.last_known_slot = previous
                .iter()
                .find(|(id, _)| *id == entry.replication_id)
                .and_then(|(_, slot)| *slot);
        }

        apply_fast_array(&mut self.entries, delta, observer);

        for entry in &mut self.entries {
            entry.last_known_slot = Some(entry.slot);
        }
    }

    fn sorted_entries(&self) -> Vec<&ItemListEntry> {
        let mut entries: Vec<_> = self.entries.iter().collect();
        entries.sort_unstable_by_key(|e| e.slot);
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_uses_len_when_no_slot_given() {
        let mut list = ItemList::new();
        assert_eq!(list.add_entry_at(ItemId(1), None), Ok(0));
        assert_eq!(list.add_entry_at(ItemId(2), None), Ok(1));
        assert_eq!(list.all_items(), vec![ItemId(1), ItemId(2)]);
    }

    #[test]
    fn occupied_slot_is_rejected() {
        let mut list = ItemList::new();
        list.add_entry_at(ItemId(1), Some(2)).unwrap();
        assert_eq!(
            list.add_entry_at(ItemId(2), Some(2)),
            Err(ItemListError::SlotOccupied {
                slot: 2,
                occupant: ItemId(1)
            })
        );
        assert!(matches!(
            list.add_entry_at(ItemId(1), Some(4)),
            Err(ItemListError::AlreadyListed { .. })
        ));
    }

    #[test]
    fn items_come_back_in_slot_order() {
        let mut list = ItemList::new();
        list.add_entry_at(ItemId(7), Some(3)).unwrap();
        list.add_entry_at(ItemId(8), Some(0)).unwrap();
        assert_eq!(list.all_items(), vec![ItemId(8), ItemId(7)]);
        assert_eq!(list.slots(), vec![0, 3]);
    }

    #[test]
    fn remove_at_leaves_hole_or_collapses() {
        let mut list = ItemList::new();
        for id in 1..=3 {
            list.add_entry_at(ItemId(id), None).unwrap();
        }
        assert_eq!(list.remove_entry_at(0, false), Some(ItemId(1)));
        assert_eq!(list.slots(), vec![1, 2]);

        assert_eq!(list.remove_entry_at(1, true), Some(ItemId(2)));
        assert_eq!(list.slot_items(), vec![(1, ItemId(3))]);
        assert_eq!(list.remove_entry_at(9, true), None);
    }

    #[test]
    fn remove_by_identity() {
        let mut list = ItemList::new();
        list.add_entry_at(ItemId(4), None).unwrap();
        assert!(list.remove_entry(ItemId(4)));
        assert!(!list.remove_entry(ItemId(4)));
    }

    #[test]
    fn swap_moves_into_empty_slot() {
        let mut list = ItemList::new();
        list.add_entry_at(ItemId(1), Some(0)).unwrap();
        assert!(list.swap_entries(0, 3));
        assert_eq!(list.item_at(3), Some(ItemId(1)));
        assert!(!list.swap_entries(5, 6));
    }

    #[derive(Default)]
    struct SlotRecorder {
        removed: Vec<(ItemId, usize)>,
        added: Vec<(ItemId, usize)>,
        moved: Vec<(ItemId, Option<usize>, usize)>,
    }

    impl FastArrayObserver<ItemListEntry> for SlotRecorder {
        fn pre_replicated_remove(&mut self, indices: &[usize], items: &[ItemListEntry]) {
            self.removed
                .extend(indices.iter().map(|&i| (items[i].item, items[i].slot)));
        }

        fn post_replicated_add(&mut self, indices: &[usize], items: &[ItemListEntry]) {
            self.added
                .extend(indices.iter().map(|&i| (items[i].item, items[i].slot)));
        }

        fn post_replicated_change(&mut self, indices: &[usize], items: &[ItemListEntry]) {
            self.moved.extend(
                indices
                    .iter()
                    .map(|&i| (items[i].item, items[i].last_known_slot, items[i].slot)),
            );
        }
    }

    #[test]
    fn replica_tracks_adds_removes_and_moves() {
        let mut authority = ItemList::new();
        authority.add_entry_at(ItemId(1), Some(0)).unwrap();
        authority.add_entry_at(ItemId(2), Some(1)).unwrap();

        let mut replica = ItemList::new();
        replica.apply_delta(authority.diff(&[]), &mut SlotRecorder::default());
        let baseline = authority.entries().to_vec();

        authority.remove_entry_at(0, false);
        authority.swap_entries(1, 4);
        authority.add_entry_at(ItemId(3), Some(0)).unwrap();

        let mut recorder = SlotRecorder::default();
        replica.apply_delta(authority.diff(&baseline), &mut recorder);

        assert_eq!(recorder.removed, vec![(ItemId(1), 0)]);
        assert_eq!(recorder.added, vec![(ItemId(3), 0)]);
        assert_eq!(recorder.moved, vec![(ItemId(2), Some(1), 4)]);
        assert_eq!(replica.slot_items(), authority.slot_items());
    }
}

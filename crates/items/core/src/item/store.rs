use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use super::definition::ItemDefinition;
use super::fragment::ItemFragment;
use super::instance::{ItemId, ItemInstance};
use crate::tag::Tag;

/// Arena owning every item instance of a collection.
///
/// Containers refer to items by [`ItemId`]. An item that leaves its last
/// container is marked detached and destroyed by [`ItemStore::prune_detached`]
/// unless it was re-added in the meantime. Items that were never listed are
/// left alone so callers can create an item first and place it later.
#[derive(Clone, Debug, Default)]
pub struct ItemStore {
    items: BTreeMap<ItemId, ItemInstance>,
    detached: BTreeSet<ItemId>,
    next_id: u64,
}

impl ItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: ItemId) -> Option<&ItemInstance> {
        self.items.get(&id)
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.items.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ItemInstance> {
        self.items.values()
    }

    pub(crate) fn get_mut(&mut self, id: ItemId) -> Option<&mut ItemInstance> {
        self.items.get_mut(&id)
    }

    /// Creates an item and runs every fragment's creation hook in order.
    pub(crate) fn create(&mut self, def: Arc<ItemDefinition>, count: u32) -> ItemId {
        let id = self.allocate_id();
        let mut item = ItemInstance::new(id, Arc::clone(&def), count);
        for fragment in &def.fragments {
            fragment.on_item_created(&mut item);
        }
        self.items.insert(id, item);
        id
    }

    /// Creates an item without running creation hooks, for state that was
    /// already initialized once (save data).
    pub(crate) fn restore(&mut self, def: Arc<ItemDefinition>, count: u32) -> ItemId {
        let id = self.allocate_id();
        self.items.insert(id, ItemInstance::new(id, def, count));
        id
    }

    /// Copies definition, count and tag stats into a new item.
    ///
    /// Creation hooks are not re-run. A non-zero `count` overrides the copied
    /// count.
    pub(crate) fn duplicate(&mut self, source: ItemId, count: u32) -> Option<ItemId> {
        let original = self.items.get(&source)?.clone();
        let id = self.allocate_id();
        let mut item = ItemInstance::new(id, Arc::clone(original.def()), original.count());
        item.copy_properties_from(&original);
        if count > 0 {
            item.set_count(count);
        }
        self.items.insert(id, item);
        Some(id)
    }

    /// Inserts an instance with a known id, as received from the authority.
    pub(crate) fn insert(&mut self, item: ItemInstance) {
        self.next_id = self.next_id.max(item.id().0);
        self.detached.remove(&item.id());
        self.items.insert(item.id(), item);
    }

    pub(crate) fn remove(&mut self, id: ItemId) -> Option<ItemInstance> {
        self.detached.remove(&id);
        self.items.remove(&id)
    }

    pub(crate) fn attach(&mut self, id: ItemId, container: &Tag) {
        if let Some(item) = self.items.get_mut(&id) {
            item.attach(container);
            self.detached.remove(&id);
        }
    }

    pub(crate) fn detach(&mut self, id: ItemId, container: &Tag) {
        if let Some(item) = self.items.get_mut(&id) {
            item.detach(container);
            if item.containers().is_empty() {
                self.detached.insert(id);
            }
        }
    }

    /// Queues an unlisted item for destruction at the next prune.
    pub(crate) fn mark_detached(&mut self, id: ItemId) {
        if self.items.get(&id).is_some_and(|item| item.containers().is_empty()) {
            self.detached.insert(id);
        }
    }

    /// Destroys detached items that no container picked up again.
    pub(crate) fn prune_detached(&mut self) -> Vec<ItemId> {
        let detached = std::mem::take(&mut self.detached);
        let mut pruned = Vec::new();
        for id in detached {
            let orphaned = self
                .items
                .get(&id)
                .is_some_and(|item| item.containers().is_empty());
            if orphaned {
                self.items.remove(&id);
                pruned.push(id);
            }
        }
        pruned
    }

    fn allocate_id(&mut self) -> ItemId {
        self.next_id += 1;
        ItemId(self.next_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::fragment::{Fragment, TagStatsFragment};

    fn sword() -> Arc<ItemDefinition> {
        Arc::new(
            ItemDefinition::new("sword", "Sword").with_fragment(Fragment::TagStats(TagStatsFragment {
                default_stats: vec![(Tag::from("Stat.Damage"), 7)],
                stack_only_with_equal_stats: false,
            })),
        )
    }

    #[test]
    fn creation_runs_fragment_hooks() {
        let mut store = ItemStore::new();
        let id = store.create(sword(), 1);
        let item = store.get(id).unwrap();
        assert_eq!(item.tag_stat(&Tag::from("Stat.Damage")), 7);
    }

    #[test]
    fn duplicate_is_independent() {
        let mut store = ItemStore::new();
        let original = store.create(sword(), 2);
        let copy = store.duplicate(original, 0).unwrap();

        store
            .get_mut(copy)
            .unwrap()
            .add_tag_stat(&Tag::from("Stat.Damage"), 1);

        assert_eq!(store.get(copy).unwrap().count(), 2);
        assert_eq!(store.get(copy).unwrap().tag_stat(&Tag::from("Stat.Damage")), 8);
        assert_eq!(store.get(original).unwrap().tag_stat(&Tag::from("Stat.Damage")), 7);
    }

    #[test]
    fn duplicate_count_override() {
        let mut store = ItemStore::new();
        let original = store.create(sword(), 5);
        let copy = store.duplicate(original, 2).unwrap();
        assert_eq!(store.get(copy).unwrap().count(), 2);
    }

    #[test]
    fn only_detached_items_are_pruned() {
        let mut store = ItemStore::new();
        let loose = store.create(sword(), 1);
        let listed = store.create(sword(), 1);
        let bag = Tag::from("Container.Bag");

        store.attach(listed, &bag);
        store.detach(listed, &bag);
        assert_eq!(store.prune_detached(), vec![listed]);
        assert!(store.contains(loose));
        assert!(!store.contains(listed));
    }

    #[test]
    fn re_added_items_survive_pruning() {
        let mut store = ItemStore::new();
        let id = store.create(sword(), 1);
        let bag = Tag::from("Container.Bag");
        let chest = Tag::from("Container.Chest");

        store.attach(id, &bag);
        store.detach(id, &bag);
        store.attach(id, &chest);
        assert!(store.prune_detached().is_empty());
        assert!(store.contains(id));
    }
}

//! Item subsystem: creation helpers and item moves between containers.
//!
//! The subsystem is constructed once with [`ItemSettings`] and handed to
//! whoever needs it; nothing here is global.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::collection::ContainerCollection;
use crate::config::ItemSettings;
use crate::item::{Fragment, FragmentKind, ItemDefId, ItemDefinition, ItemDefinitions, ItemId};
use crate::tag::Tag;

#[derive(Clone, Debug, Default)]
pub struct ItemSubsystem {
    settings: ItemSettings,
}

impl ItemSubsystem {
    pub fn new(settings: ItemSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ItemSettings {
        &self.settings
    }

    /// Creates an empty authoritative collection that uses these settings.
    pub fn create_collection(
        &self,
        owner: impl Into<String>,
        definitions: Arc<dyn ItemDefinitions>,
    ) -> ContainerCollection {
        ContainerCollection::new(owner, self.settings.clone(), definitions)
    }

    pub fn create_item(
        &self,
        collection: &mut ContainerCollection,
        def: &ItemDefId,
        count: u32,
    ) -> Option<ItemId> {
        collection.create_item(def, count)
    }

    pub fn create_item_in_container(
        &self,
        collection: &mut ContainerCollection,
        container: &Tag,
        def: &ItemDefId,
        count: u32,
    ) -> Vec<ItemId> {
        collection.create_item_in_container(container, def, count)
    }

    /// Copies an item; a non-zero `count` overrides the copied count.
    pub fn duplicate_item(
        &self,
        collection: &mut ContainerCollection,
        item: ItemId,
        count: u32,
    ) -> Option<ItemId> {
        collection.duplicate_item(item, count)
    }

    /// Moves `count` units into a new item. `None` unless the item holds
    /// more than `count`.
    pub fn split_item(
        &self,
        collection: &mut ContainerCollection,
        item: ItemId,
        count: u32,
    ) -> Option<ItemId> {
        collection.split_item(item, count)
    }

    /// First fragment of `kind` on `def`.
    pub fn find_fragment<'a>(&self, def: &'a ItemDefinition, kind: FragmentKind) -> Option<&'a Fragment> {
        def.find_fragment(kind)
    }

    // ------------------------------------------------------------------
    // Moves within one collection
    // ------------------------------------------------------------------

    /// Moves `item` from one container to another.
    ///
    /// The destination plans the add first. Nothing moves when the plan adds
    /// nothing, or when it would add only part of the item and
    /// `allow_partial` is unset. A partial move splits the item and moves the
    /// split part; a full move removes the item from its source first.
    pub fn move_item(
        &self,
        collection: &mut ContainerCollection,
        from: &Tag,
        to: &Tag,
        item: ItemId,
        slot: Option<usize>,
        allow_partial: bool,
    ) -> Vec<ItemId> {
        if !collection.container(from).is_some_and(|c| c.contains(item)) {
            return Vec::new();
        }
        let Some(plan) = collection
            .view(to)
            .map(|view| view.check_add_item(item, slot, Some(from)))
        else {
            return Vec::new();
        };
        if plan.delta_count == 0 {
            debug!(from = %from, to = %to, item = %item, "nothing to move");
            return Vec::new();
        }
        if !allow_partial && !plan.will_add_full_amount {
            debug!(from = %from, to = %to, item = %item, remainder = plan.remainder_count, "partial move not allowed");
            return Vec::new();
        }

        collection.batch(|collection| {
            let moving = if plan.remainder_count > 0 {
                match collection.split_item(item, plan.delta_count) {
                    Some(split) => split,
                    None => return Vec::new(),
                }
            } else {
                collection.remove_item(from, item);
                item
            };
            collection.add_item(to, moving, slot)
        })
    }

    pub fn move_items(
        &self,
        collection: &mut ContainerCollection,
        from: &Tag,
        to: &Tag,
        items: &[ItemId],
        allow_partial: bool,
    ) -> Vec<ItemId> {
        items
            .iter()
            .flat_map(|&item| self.move_item(collection, from, to, item, None, allow_partial))
            .collect()
    }

    pub fn move_all_items(
        &self,
        collection: &mut ContainerCollection,
        from: &Tag,
        to: &Tag,
        allow_partial: bool,
    ) -> Vec<ItemId> {
        let Some(items) = collection.container(from).map(|c| c.all_items()) else {
            return Vec::new();
        };
        self.move_items(collection, from, to, &items, allow_partial)
    }

    // ------------------------------------------------------------------
    // Moves between collections
    // ------------------------------------------------------------------

    /// Moves `item` into a container of another collection.
    ///
    /// The destination receives a copy of the moved units; the source keeps
    /// any remainder. Both collections must be authoritative.
    #[allow(clippy::too_many_arguments)]
    pub fn transfer_item(
        &self,
        source: &mut ContainerCollection,
        from: &Tag,
        target: &mut ContainerCollection,
        to: &Tag,
        item: ItemId,
        slot: Option<usize>,
        allow_partial: bool,
    ) -> Vec<ItemId> {
        if !source.role().has_authority() || !target.role().has_authority() {
            warn!(source = %source.owner(), target = %target.owner(), "transfers require authority on both collections");
            return Vec::new();
        }
        if !source.container(from).is_some_and(|c| c.contains(item)) {
            return Vec::new();
        }
        let Some(instance) = source.item(item) else {
            return Vec::new();
        };
        let Some(plan) = target
            .view(to)
            .map(|view| view.add_item_plan(instance, slot, false, true))
        else {
            return Vec::new();
        };
        if plan.delta_count == 0 || (!allow_partial && !plan.will_add_full_amount) {
            return Vec::new();
        }

        let copy = target.adopt_item(instance, plan.delta_count);
        if plan.remainder_count > 0 {
            source.set_item_count(item, plan.remainder_count);
        } else {
            source.remove_item(from, item);
        }
        debug!(source = %source.owner(), target = %target.owner(), item = %item, copy = %copy, count = plan.delta_count, "transferred item");
        target.add_item(to, copy, slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::ContainerDefinition;
    use crate::item::{ItemCatalog, ItemStockRule, StockLimit};

    fn catalog() -> Arc<ItemCatalog> {
        Arc::new(
            [
                ItemDefinition::new("arrow", "Arrow").with_stock(ItemStockRule {
                    stack_max_count: StockLimit::Limited(10),
                    ..ItemStockRule::default()
                }),
                ItemDefinition::new("sword", "Sword").with_stock(ItemStockRule::non_stackable()),
            ]
            .into_iter()
            .collect(),
        )
    }

    fn setup() -> (ItemSubsystem, ContainerCollection) {
        let subsystem = ItemSubsystem::new(ItemSettings::new());
        let mut items = subsystem.create_collection("player", catalog());
        items
            .add_container(
                "Container.Bag",
                Arc::new(ContainerDefinition::new("bag").with_slot_limit(4)),
            )
            .unwrap();
        items
            .add_container(
                "Container.Quiver",
                Arc::new(ContainerDefinition::new("quiver").with_slot_limit(1)),
            )
            .unwrap();
        (subsystem, items)
    }

    fn bag() -> Tag {
        Tag::from("Container.Bag")
    }

    fn quiver() -> Tag {
        Tag::from("Container.Quiver")
    }

    #[test]
    fn full_move_keeps_the_item() {
        let (subsystem, mut items) = setup();
        let sword = items.create_item(&"sword".into(), 1).unwrap();
        items.add_item(&bag(), sword, None);

        let moved = subsystem.move_item(&mut items, &bag(), &quiver(), sword, None, false);

        assert_eq!(moved, vec![sword]);
        assert!(items.container(&bag()).unwrap().is_empty());
        assert_eq!(items.container(&quiver()).unwrap().item_at(0), Some(sword));
        assert!(items.item(sword).is_some());
    }

    #[test]
    fn partial_move_splits() {
        let (subsystem, mut items) = setup();
        let arrows = items.create_item(&"arrow".into(), 10).unwrap();
        items.add_item(&bag(), arrows, None);
        let quiver_stack = items.create_item(&"arrow".into(), 6).unwrap();
        items.add_item(&quiver(), quiver_stack, None);

        assert!(subsystem
            .move_item(&mut items, &bag(), &quiver(), arrows, None, false)
            .is_empty());

        let moved = subsystem.move_item(&mut items, &bag(), &quiver(), arrows, None, true);
        assert_eq!(moved, vec![quiver_stack]);
        assert_eq!(items.item(quiver_stack).unwrap().count(), 10);
        assert_eq!(items.item(arrows).unwrap().count(), 6);
    }

    #[test]
    fn move_all_items_moves_what_fits() {
        let (subsystem, mut items) = setup();
        for _ in 0..2 {
            let sword = items.create_item(&"sword".into(), 1).unwrap();
            items.add_item(&bag(), sword, None);
        }
        let moved = subsystem.move_all_items(&mut items, &bag(), &quiver(), true);
        assert_eq!(moved.len(), 1);
        assert_eq!(items.container(&bag()).unwrap().num_items(), 1);
    }

    #[test]
    fn transfer_between_collections() {
        let (subsystem, mut player) = setup();
        let (_, mut chest) = setup();
        let arrows = player.create_item(&"arrow".into(), 8).unwrap();
        player.add_item(&bag(), arrows, None);

        let received = subsystem.transfer_item(&mut player, &bag(), &mut chest, &quiver(), arrows, None, true);

        assert_eq!(received.len(), 1);
        assert_eq!(chest.item(received[0]).unwrap().count(), 8);
        assert!(player.item(arrows).is_none());
    }
}

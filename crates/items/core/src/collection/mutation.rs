//! Container and item mutations.
//!
//! Public methods compute the net execution plan for the call, queue a
//! [`ContainerCommand`] when the server must run it and execute locally only
//! when the plan allows. `execute_*` methods assume local execution; link
//! reactions and the authority's command replay call them directly.

use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::command::ContainerCommand;
use crate::config::ZeroCountPolicy;
use crate::container::AddPlan;
use crate::events::{ContainerEvent, ItemEvent};
use crate::item::{ItemDefId, ItemId, ItemInstance};
use crate::rules::{ContainerRule, RuleKind};
use crate::tag::Tag;

use super::ContainerCollection;

impl ContainerCollection {
    // ------------------------------------------------------------------
    // Item creation
    // ------------------------------------------------------------------

    /// Creates an unlisted item. Only the authority creates items.
    pub fn create_item(&mut self, def: &ItemDefId, count: u32) -> Option<ItemId> {
        if !self.role().has_authority() {
            self.authority_violation("create_item");
            return None;
        }
        let Some(definition) = self.definitions().definition(def) else {
            warn!(owner = %self.owner(), def = %def, "unknown item definition");
            return None;
        };
        let id = self.items.create(definition, count);
        trace!(owner = %self.owner(), item = %id, def = %def, count, "created item");
        Some(id)
    }

    /// Creates an item and adds it to `container`. Returns the items that
    /// received units; an item that fit nowhere is discarded.
    pub fn create_item_in_container(
        &mut self,
        container: &Tag,
        def: &ItemDefId,
        count: u32,
    ) -> Vec<ItemId> {
        let Some(item) = self.create_item(def, count) else {
            return Vec::new();
        };
        let added = self.execute_add_item(container, item, None);
        if !added.contains(&item) {
            self.discard_item(item);
        }
        added
    }

    /// Destroys an item that is not listed in any container.
    pub fn discard_item(&mut self, item: ItemId) -> bool {
        let unlisted = self
            .items
            .get(item)
            .is_some_and(|instance| instance.containers().is_empty());
        if unlisted {
            self.items.remove(item);
        } else {
            debug!(owner = %self.owner(), item = %item, "not discarding a listed item");
        }
        unlisted
    }

    /// Copies an item's definition, count and tag stats into a new unlisted
    /// item. A non-zero `count` overrides the copied count.
    pub fn duplicate_item(&mut self, item: ItemId, count: u32) -> Option<ItemId> {
        if !self.role().has_authority() {
            self.authority_violation("duplicate_item");
            return None;
        }
        self.items.duplicate(item, count)
    }

    /// Copies an item owned by another collection into this one with
    /// `count` units. Creation hooks are not re-run.
    pub(crate) fn adopt_item(&mut self, source: &ItemInstance, count: u32) -> ItemId {
        let id = self.items.restore(Arc::clone(source.def()), count);
        if let Some(item) = self.items.get_mut(id) {
            item.copy_properties_from(source);
            item.set_count(count);
        }
        id
    }

    /// Moves `count` units of `item` into a new unlisted item.
    ///
    /// Returns `None` unless the item holds more than `count` units.
    pub fn split_item(&mut self, item: ItemId, count: u32) -> Option<ItemId> {
        if !self.role().has_authority() {
            self.authority_violation("split_item");
            return None;
        }
        let current = self.items.get(item)?.count();
        if count == 0 || current <= count {
            return None;
        }
        let split = self.items.duplicate(item, count)?;
        self.execute_set_item_count(item, current - count);
        Some(split)
    }

    // ------------------------------------------------------------------
    // Container mutations
    // ------------------------------------------------------------------

    pub fn add_item(&mut self, container: &Tag, item: ItemId, slot: Option<usize>) -> Vec<ItemId> {
        if !self.route(container, || ContainerCommand::AddItem {
            container: container.clone(),
            item,
            slot,
        }) {
            return Vec::new();
        }
        self.execute_add_item(container, item, slot)
    }

    pub fn add_items(&mut self, container: &Tag, items: &[ItemId]) -> Vec<ItemId> {
        if !self.route(container, || ContainerCommand::AddItems {
            container: container.clone(),
            items: items.to_vec(),
        }) {
            return Vec::new();
        }
        self.execute_add_items(container, items)
    }

    pub fn remove_item(&mut self, container: &Tag, item: ItemId) -> bool {
        if !self.route(container, || ContainerCommand::RemoveItem {
            container: container.clone(),
            item,
        }) {
            return false;
        }
        self.execute_remove_item(container, item)
    }

    pub fn remove_items(&mut self, container: &Tag, items: &[ItemId]) -> Vec<ItemId> {
        if !self.route(container, || ContainerCommand::RemoveItems {
            container: container.clone(),
            items: items.to_vec(),
        }) {
            return Vec::new();
        }
        self.execute_remove_items(container, items)
    }

    pub fn remove_item_at(&mut self, container: &Tag, slot: usize) -> Option<ItemId> {
        if !self.route(container, || ContainerCommand::RemoveItemAt {
            container: container.clone(),
            slot,
        }) {
            return None;
        }
        self.execute_remove_item_at(container, slot)
    }

    /// Removes up to `count` units of `def`. Returns the units removed.
    pub fn remove_items_by_def(&mut self, container: &Tag, def: &ItemDefId, count: u32) -> u32 {
        if !self.route(container, || ContainerCommand::RemoveItemsByDef {
            container: container.clone(),
            def: def.clone(),
            count,
        }) {
            return 0;
        }
        self.execute_remove_items_by_def(container, def, count)
    }

    pub fn remove_all_items(&mut self, container: &Tag) -> Vec<ItemId> {
        if !self.route(container, || ContainerCommand::RemoveAllItems {
            container: container.clone(),
        }) {
            return Vec::new();
        }
        self.execute_remove_all_items(container)
    }

    pub fn swap_items(&mut self, container: &Tag, a: usize, b: usize) -> bool {
        if !self.route(container, || ContainerCommand::SwapItems {
            container: container.clone(),
            a,
            b,
        }) {
            return false;
        }
        self.execute_swap_items(container, a, b)
    }

    pub fn stack_items(
        &mut self,
        container: &Tag,
        from: ItemId,
        to: ItemId,
        allow_partial: bool,
    ) -> bool {
        if !self.route(container, || ContainerCommand::StackItems {
            container: container.clone(),
            from,
            to,
            allow_partial,
        }) {
            return false;
        }
        self.execute_stack_items(container, from, to, allow_partial)
    }

    pub fn set_item_at(&mut self, container: &Tag, item: ItemId, slot: usize) -> Vec<ItemId> {
        if !self.route(container, || ContainerCommand::SetItemAt {
            container: container.clone(),
            item,
            slot,
        }) {
            return Vec::new();
        }
        self.execute_set_item_at(container, item, slot)
    }

    // ------------------------------------------------------------------
    // Item edits
    // ------------------------------------------------------------------

    pub fn set_item_count(&mut self, item: ItemId, count: u32) {
        if self.route_item(|| ContainerCommand::SetItemCount { item, count }) {
            self.execute_set_item_count(item, count);
        }
    }

    pub fn add_tag_stat(&mut self, item: ItemId, tag: &Tag, delta: i32) {
        if self.route_item(|| ContainerCommand::AddTagStat {
            item,
            tag: tag.clone(),
            delta,
        }) {
            self.execute_add_tag_stat(item, tag, delta);
        }
    }

    pub fn remove_tag_stat(&mut self, item: ItemId, tag: &Tag, delta: i32) {
        if self.route_item(|| ContainerCommand::RemoveTagStat {
            item,
            tag: tag.clone(),
            delta,
        }) {
            self.execute_remove_tag_stat(item, tag, delta);
        }
    }

    // ------------------------------------------------------------------
    // Default items and rules
    // ------------------------------------------------------------------

    /// Creates the definition's default items and item sets once per
    /// container lifetime, or again when `force` is set.
    pub fn create_default_items(&mut self, container: &Tag, force: bool) -> Vec<ItemId> {
        let Some(target) = self.container(container) else {
            warn!(owner = %self.owner(), container = %container, "unknown container");
            return Vec::new();
        };
        if target.has_default_items() && !force {
            return Vec::new();
        }
        if !self.role().has_authority() {
            self.authority_violation("create_default_items");
            return Vec::new();
        }

        let def = Arc::clone(target.def());
        let stacks = def
            .default_items
            .iter()
            .chain(def.default_item_sets.iter().flat_map(|set| set.items.iter()));

        let mut created = Vec::new();
        for stack in stacks {
            trace!(container = %container, def = %stack.def, count = stack.count, "creating default item");
            for item in self.create_item_in_container(container, &stack.def, stack.count) {
                if !created.contains(&item) {
                    created.push(item);
                }
            }
        }
        if let Some(target) = self.container_mut(container) {
            target.has_default_items = true;
        }
        created
    }

    /// Appends a rule to a container's rule list.
    pub fn add_rule(&mut self, container: &Tag, rule: impl Into<ContainerRule>) -> bool {
        let rule = rule.into();
        let kind = rule.kind();
        let Some(target) = self.container_mut(container) else {
            warn!(container = %container, "unknown container");
            return false;
        };
        target.rules.push(rule);
        self.refresh_children();
        self.emit(ContainerEvent::RuleAdded {
            container: container.clone(),
            rule: kind,
        });
        if kind == RuleKind::SelectionLink {
            self.update_all_selections(container);
        }
        true
    }

    /// Removes every rule of `kind`. Returns how many were removed.
    pub fn remove_rule(&mut self, container: &Tag, kind: RuleKind) -> usize {
        let Some(target) = self.container_mut(container) else {
            return 0;
        };
        let before = target.rules.len();
        target.rules.retain(|rule| rule.kind() != kind);
        let removed = before - target.rules.len();
        if removed > 0 {
            self.refresh_children();
            for _ in 0..removed {
                self.emit(ContainerEvent::RuleRemoved {
                    container: container.clone(),
                    rule: kind,
                });
            }
        }
        removed
    }

    // ------------------------------------------------------------------
    // Local execution
    // ------------------------------------------------------------------

    pub(crate) fn execute_add_item(
        &mut self,
        container: &Tag,
        item: ItemId,
        slot: Option<usize>,
    ) -> Vec<ItemId> {
        let Some(view) = self.view(container) else {
            warn!(owner = %self.owner(), container = %container, "unknown container");
            return Vec::new();
        };
        let Some(instance) = self.item(item) else {
            warn!(owner = %self.owner(), item = %item, "unknown item");
            return Vec::new();
        };

        let is_child = view.is_child();
        if !is_child {
            let listed_elsewhere = instance.containers().iter().find(|other| {
                *other != container && self.container(other).is_some_and(|c| !c.is_child())
            });
            if let Some(other) = listed_elsewhere {
                warn!(
                    container = %container,
                    item = %instance,
                    listed_in = %other,
                    "item is already listed in another container"
                );
                return Vec::new();
            }
        }

        let plan = view.add_item_plan(instance, slot, false, true);
        if plan.is_empty() {
            debug!(container = %container, item = %instance, "add rejected");
            return Vec::new();
        }
        self.scoped(container, |items| items.execute_add_plan(container, item, &plan, is_child))
    }

    fn execute_add_plan(
        &mut self,
        container: &Tag,
        item: ItemId,
        plan: &AddPlan,
        is_child: bool,
    ) -> Vec<ItemId> {
        let mut result = Vec::new();
        let mut original_placed = false;

        for (slot, delta) in plan.slots() {
            let occupant = self.container(container).and_then(|c| c.item_at(slot));
            if let Some(existing) = occupant {
                if is_child {
                    continue;
                }
                let event = self.items.get_mut(existing).and_then(|instance| {
                    let count = instance.count().saturating_add(delta);
                    instance.set_count(count)
                });
                self.emit_item(event);
                self.mark_slot(container, slot);
                if !result.contains(&existing) {
                    result.push(existing);
                }
                continue;
            }

            let placed = if is_child || !original_placed {
                item
            } else {
                match self.items.duplicate(item, delta) {
                    Some(copy) => copy,
                    None => continue,
                }
            };
            if !is_child {
                let event = self
                    .items
                    .get_mut(placed)
                    .and_then(|instance| instance.set_count(delta));
                self.emit_item(event);
            }

            let added = self
                .container_mut(container)
                .map(|c| c.list.add_entry_at(placed, Some(slot)));
            match added {
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    warn!(container = %container, %err, "could not place item");
                    if placed != item {
                        self.items.remove(placed);
                    }
                    continue;
                }
                None => continue,
            }
            self.mark_slot(container, slot);
            self.on_item_added(container, placed, slot);
            if placed == item {
                original_placed = true;
            }
            result.push(placed);
        }

        if !original_placed && !is_child {
            // Fully merged into existing stacks.
            self.items.mark_detached(item);
        }
        result
    }

    pub(crate) fn execute_add_items(&mut self, container: &Tag, items: &[ItemId]) -> Vec<ItemId> {
        self.scoped(container, |collection| {
            let mut result = Vec::new();
            for &item in items {
                for added in collection.execute_add_item(container, item, None) {
                    if !result.contains(&added) {
                        result.push(added);
                    }
                }
            }
            result
        })
    }

    pub(crate) fn execute_remove_item(&mut self, container: &Tag, item: ItemId) -> bool {
        let Some(slot) = self.container(container).and_then(|c| c.item_slot(item)) else {
            return false;
        };
        self.execute_remove_item_at(container, slot).is_some()
    }

    pub(crate) fn execute_remove_items(&mut self, container: &Tag, items: &[ItemId]) -> Vec<ItemId> {
        self.scoped(container, |collection| {
            items
                .iter()
                .copied()
                .filter(|&item| collection.execute_remove_item(container, item))
                .collect()
        })
    }

    /// Removes the entry at `slot`. Unlimited containers collapse the slots
    /// above it; limited containers leave a hole.
    pub(crate) fn execute_remove_item_at(&mut self, container: &Tag, slot: usize) -> Option<ItemId> {
        let target = self.container(container)?;
        target.item_at(slot)?;
        let collapse = !target.is_slot_count_limited();
        let old_num_slots = target.num_slots();

        self.scoped(container, |collection| {
            let removed = collection
                .container_mut(container)?
                .list
                .remove_entry_at(slot, collapse)?;
            if collapse {
                let last = old_num_slots.saturating_sub(1).max(slot);
                collection.mark_slot_range(container, slot, last);
            } else {
                collection.mark_slot(container, slot);
            }
            collection.on_item_removed(container, removed, slot);
            Some(removed)
        })
    }

    /// Removes up to `count` units of `def`, taking each stack's own count
    /// into account. Emptied stacks are removed, the last one is reduced.
    pub(crate) fn execute_remove_items_by_def(
        &mut self,
        container: &Tag,
        def: &ItemDefId,
        count: u32,
    ) -> u32 {
        let Some(view) = self.view(container) else {
            return 0;
        };
        let stacks: Vec<(ItemId, u32)> = view
            .items()
            .filter(|item| item.def_id() == def)
            .map(|item| (item.id(), item.count()))
            .collect();

        self.scoped(container, |collection| {
            let mut remaining = count;
            for (item, stack_count) in stacks {
                if remaining == 0 {
                    break;
                }
                if stack_count <= remaining {
                    if collection.execute_remove_item(container, item) {
                        remaining -= stack_count;
                    }
                } else {
                    let event = collection
                        .items
                        .get_mut(item)
                        .and_then(|instance| instance.set_count(stack_count - remaining));
                    collection.emit_item(event);
                    if let Some(slot) = collection.container(container).and_then(|c| c.item_slot(item)) {
                        collection.mark_slot(container, slot);
                    }
                    remaining = 0;
                }
            }
            count - remaining
        })
    }

    pub(crate) fn execute_remove_all_items(&mut self, container: &Tag) -> Vec<ItemId> {
        let Some(target) = self.container(container) else {
            return Vec::new();
        };
        let old_num_slots = target.num_slots();

        self.scoped(container, |collection| {
            let removed = collection
                .container_mut(container)
                .map(|c| c.list.reset())
                .unwrap_or_default();
            for &(slot, item) in &removed {
                collection.on_item_removed(container, item, slot);
            }
            if old_num_slots > 0 {
                collection.mark_slot_range(container, 0, old_num_slots - 1);
            }
            removed.into_iter().map(|(_, item)| item).collect()
        })
    }

    pub(crate) fn execute_swap_items(&mut self, container: &Tag, a: usize, b: usize) -> bool {
        let Some(target) = self.container(container) else {
            return false;
        };
        if a == b || !target.is_valid_slot(a) || !target.is_valid_slot(b) {
            return false;
        }
        let item_a = target.item_at(a);
        let item_b = target.item_at(b);

        self.scoped(container, |collection| {
            let swapped = collection
                .container_mut(container)
                .is_some_and(|c| c.list.swap_entries(a, b));
            if !swapped {
                return false;
            }
            collection.mark_slot(container, a);
            collection.mark_slot(container, b);
            for (item, old_slot, new_slot) in [(item_a, a, b), (item_b, b, a)] {
                if let Some(item) = item {
                    collection.emit_item(Some(ItemEvent::Slotted {
                        item,
                        container: container.clone(),
                        new_slot,
                        old_slot: Some(old_slot),
                    }));
                }
            }
            true
        })
    }

    /// Moves units from `from` onto the matching stack `to`.
    ///
    /// Without `allow_partial` nothing moves unless all of `from` fits.
    pub(crate) fn execute_stack_items(
        &mut self,
        container: &Tag,
        from: ItemId,
        to: ItemId,
        allow_partial: bool,
    ) -> bool {
        let Some(view) = self.view(container) else {
            return false;
        };
        if from == to || !view.contains(from) || !view.contains(to) {
            return false;
        }
        let (Some(source), Some(target)) = (self.item(from), self.item(to)) else {
            return false;
        };
        if !source.is_matching(target) {
            return false;
        }

        let stack_max = view.item_stack_max_count(target).value().unwrap_or(u32::MAX);
        let from_count = source.count();
        let to_count = target.count();
        let delta = from_count.min(stack_max.saturating_sub(to_count));
        if delta == 0 || (delta < from_count && !allow_partial) {
            return false;
        }

        self.scoped(container, |collection| {
            if delta == from_count {
                collection.execute_remove_item(container, from);
            } else {
                let event = collection
                    .items
                    .get_mut(from)
                    .and_then(|instance| instance.set_count(from_count - delta));
                collection.emit_item(event);
                if let Some(slot) = collection.container(container).and_then(|c| c.item_slot(from)) {
                    collection.mark_slot(container, slot);
                }
            }
            let event = collection
                .items
                .get_mut(to)
                .and_then(|instance| instance.set_count(to_count + delta));
            collection.emit_item(event);
            if let Some(slot) = collection.container(container).and_then(|c| c.item_slot(to)) {
                collection.mark_slot(container, slot);
            }
            true
        })
    }

    /// Replaces whatever occupies `slot` with `item`.
    pub(crate) fn execute_set_item_at(&mut self, container: &Tag, item: ItemId, slot: usize) -> Vec<ItemId> {
        let Some(target) = self.container(container) else {
            return Vec::new();
        };
        if target.item_at(slot) == Some(item) {
            return vec![item];
        }
        if !target.is_valid_slot(slot) {
            return Vec::new();
        }

        self.scoped(container, |collection| {
            if collection
                .container(container)
                .is_some_and(|c| c.item_at(slot).is_some())
            {
                collection.execute_remove_item_at(container, slot);
            }
            collection.execute_add_item(container, item, Some(slot))
        })
    }

    /// Sets an item's count and applies the zero-count policy.
    pub(crate) fn execute_set_item_count(&mut self, item: ItemId, count: u32) {
        let Some(instance) = self.items.get_mut(item) else {
            return;
        };
        let event = instance.set_count(count);
        if event.is_none() {
            return;
        }
        let containers = instance.containers().to_vec();
        self.emit_item(event);

        for container in &containers {
            self.scoped(container, |collection| {
                if let Some(slot) = collection.container(container).and_then(|c| c.item_slot(item)) {
                    collection.mark_slot(container, slot);
                }
            });
        }

        if count == 0 && self.settings().zero_count_policy == ZeroCountPolicy::Remove {
            let (parents, children): (Vec<Tag>, Vec<Tag>) = containers
                .into_iter()
                .partition(|id| self.container(id).is_some_and(|c| !c.is_child()));
            for container in parents.iter().chain(children.iter()) {
                self.execute_remove_item(container, item);
            }
        }
    }

    pub(crate) fn execute_add_tag_stat(&mut self, item: ItemId, tag: &Tag, delta: i32) {
        let event = self
            .items
            .get_mut(item)
            .and_then(|instance| instance.add_tag_stat(tag, delta));
        self.emit_item(event);
    }

    pub(crate) fn execute_remove_tag_stat(&mut self, item: ItemId, tag: &Tag, delta: i32) {
        let event = self
            .items
            .get_mut(item)
            .and_then(|instance| instance.remove_tag_stat(tag, delta));
        self.emit_item(event);
    }

    // ------------------------------------------------------------------
    // Notifications
    // ------------------------------------------------------------------

    pub(crate) fn on_item_added(&mut self, container: &Tag, item: ItemId, slot: usize) {
        self.items.attach(item, container);
        self.emit_item(Some(ItemEvent::Slotted {
            item,
            container: container.clone(),
            new_slot: slot,
            old_slot: None,
        }));
        self.emit(ContainerEvent::ItemAdded {
            container: container.clone(),
            item,
            slot,
        });
    }

    pub(crate) fn on_item_removed(&mut self, container: &Tag, item: ItemId, slot: usize) {
        self.emit(ContainerEvent::ItemRemoved {
            container: container.clone(),
            item,
            slot,
        });
        self.emit_item(Some(ItemEvent::Unslotted {
            item,
            container: container.clone(),
            old_slot: slot,
        }));
        self.items.detach(item, container);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::ItemSettings;
    use crate::container::ContainerDefinition;
    use crate::events::ItemsEvent;
    use crate::item::{ItemCatalog, ItemDefinition, ItemStockRule, StockLimit};

    fn catalog() -> ItemCatalog {
        [
            ItemDefinition::new("arrow", "Arrow").with_stock(ItemStockRule {
                stack_max_count: StockLimit::Limited(3),
                ..ItemStockRule::default()
            }),
            ItemDefinition::new("bomb", "Bomb").with_stock(ItemStockRule {
                max_count: StockLimit::Limited(4),
                ..ItemStockRule::default()
            }),
            ItemDefinition::new("coin", "Coin").with_stock(ItemStockRule {
                collection_max_count: StockLimit::Limited(10),
                ..ItemStockRule::default()
            }),
        ]
        .into_iter()
        .collect()
    }

    fn collection(settings: ItemSettings) -> ContainerCollection {
        ContainerCollection::new("player", settings, Arc::new(catalog()))
    }

    fn bag() -> Tag {
        Tag::from("Container.Bag")
    }

    fn with_bag(def: ContainerDefinition) -> ContainerCollection {
        let mut items = collection(ItemSettings::new());
        items.add_container(bag(), Arc::new(def)).unwrap();
        items
    }

    fn counts(items: &ContainerCollection, container: &Tag) -> Vec<(usize, u32)> {
        items
            .container(container)
            .unwrap()
            .list()
            .slot_items()
            .into_iter()
            .map(|(slot, id)| (slot, items.item(id).unwrap().count()))
            .collect()
    }

    #[test]
    fn add_splits_across_empty_slots() {
        let mut items = with_bag(ContainerDefinition::new("bag").with_slot_limit(2));
        let arrow = items.create_item(&"arrow".into(), 5).unwrap();

        let added = items.add_item(&bag(), arrow, None);

        assert_eq!(added.len(), 2);
        assert_eq!(added[0], arrow);
        assert_eq!(counts(&items, &bag()), vec![(0, 3), (1, 2)]);
    }

    #[test]
    fn clamped_add_keeps_max_count() {
        let mut items = with_bag(ContainerDefinition::new("bag"));
        let bombs = items.create_item(&"bomb".into(), 6).unwrap();

        let added = items.add_item(&bag(), bombs, None);

        assert_eq!(added, vec![bombs]);
        assert_eq!(items.item(bombs).unwrap().count(), 4);

        let more = items.create_item(&"bomb".into(), 1).unwrap();
        assert!(items.add_item(&bag(), more, None).is_empty());
    }

    #[test]
    fn collection_limit_spans_containers() {
        let mut items = with_bag(ContainerDefinition::new("bag"));
        items
            .add_container("Container.Chest", Arc::new(ContainerDefinition::new("chest")))
            .unwrap();
        items.create_item_in_container(&bag(), &"coin".into(), 8);

        let added = items.create_item_in_container(&Tag::from("Container.Chest"), &"coin".into(), 5);

        assert_eq!(added.len(), 1);
        assert_eq!(items.item(added[0]).unwrap().count(), 2);
        assert_eq!(items.total_matching_item_count_by_def(&"coin".into()), 10);
    }

    #[test]
    fn merged_item_is_destroyed() {
        let mut items = with_bag(ContainerDefinition::new("bag").with_auto_stack(true));
        let first = items.create_item_in_container(&bag(), &"arrow".into(), 1)[0];
        let second = items.create_item(&"arrow".into(), 2).unwrap();

        let added = items.add_item(&bag(), second, None);

        assert_eq!(added, vec![first]);
        assert!(items.item(second).is_none());
        assert_eq!(items.item(first).unwrap().count(), 3);
    }

    #[test]
    fn unlimited_removal_collapses_slots() {
        let mut items = with_bag(ContainerDefinition::new("bag"));
        for _ in 0..3 {
            items.create_item_in_container(&bag(), &"bomb".into(), 1);
        }
        let all = items.container(&bag()).unwrap().all_items();
        items.take_events();

        assert_eq!(items.remove_item_at(&bag(), 0), Some(all[0]));

        let slots = items.container(&bag()).unwrap().list().slot_items();
        assert_eq!(slots, vec![(0, all[1]), (1, all[2])]);
        assert!(items.item(all[0]).is_none());

        let events = items.take_events();
        assert!(events.contains(&ItemsEvent::Container(ContainerEvent::SlotsChanged {
            container: bag(),
            start: 0,
            end: 2
        })));
        assert!(events.contains(&ItemsEvent::Container(ContainerEvent::NumSlotsChanged {
            container: bag(),
            new: 2,
            old: 3
        })));
    }

    #[test]
    fn limited_removal_leaves_hole() {
        let mut items = with_bag(ContainerDefinition::new("bag").with_slot_limit(3));
        let arrows = items.create_item(&"arrow".into(), 9).unwrap();
        items.add_item(&bag(), arrows, None);
        items.take_events();

        items.remove_item_at(&bag(), 1);

        assert_eq!(counts(&items, &bag()), vec![(0, 3), (2, 3)]);
        assert_eq!(
            items.take_events().last(),
            Some(&ItemsEvent::Container(ContainerEvent::SlotChanged {
                container: bag(),
                slot: 1
            }))
        );
    }

    #[test]
    fn remove_items_by_def_uses_each_stack_count() {
        let mut items = with_bag(ContainerDefinition::new("bag").with_slot_limit(3));
        let arrows = items.create_item(&"arrow".into(), 8).unwrap();
        items.add_item(&bag(), arrows, None);
        assert_eq!(counts(&items, &bag()), vec![(0, 3), (1, 3), (2, 2)]);

        let removed = items.remove_items_by_def(&bag(), &"arrow".into(), 4);

        assert_eq!(removed, 4);
        assert_eq!(counts(&items, &bag()), vec![(1, 2), (2, 2)]);
    }

    #[test]
    fn stack_items_respects_partial_flag() {
        let mut items = with_bag(ContainerDefinition::new("bag").with_slot_limit(2));
        let a = items.create_item_in_container(&bag(), &"arrow".into(), 2)[0];
        let b = items.create_item(&"arrow".into(), 2).unwrap();
        items.add_item(&bag(), b, Some(1));

        assert!(!items.stack_items(&bag(), b, a, false));
        assert!(items.stack_items(&bag(), b, a, true));
        assert_eq!(counts(&items, &bag()), vec![(0, 3), (1, 1)]);

        assert!(!items.stack_items(&bag(), a, b, false));
        items.set_item_count(a, 2);
        assert!(items.stack_items(&bag(), b, a, false));
        assert_eq!(counts(&items, &bag()), vec![(0, 3)]);
        assert!(items.item(b).is_none());
    }

    #[test]
    fn swap_emits_slotted_events() {
        let mut items = with_bag(ContainerDefinition::new("bag").with_slot_limit(3));
        let bomb = items.create_item_in_container(&bag(), &"bomb".into(), 1)[0];
        items.take_events();

        assert!(items.swap_items(&bag(), 0, 2));
        assert!(!items.swap_items(&bag(), 1, 1));
        assert!(!items.swap_items(&bag(), 0, 3));

        assert_eq!(items.container(&bag()).unwrap().item_slot(bomb), Some(2));
        assert!(items.take_events().contains(&ItemsEvent::Item(ItemEvent::Slotted {
            item: bomb,
            container: bag(),
            new_slot: 2,
            old_slot: Some(0),
        })));
    }

    #[test]
    fn zero_count_removes_by_default() {
        let mut items = with_bag(ContainerDefinition::new("bag"));
        let bomb = items.create_item_in_container(&bag(), &"bomb".into(), 2)[0];

        items.set_item_count(bomb, 0);

        assert!(items.container(&bag()).unwrap().is_empty());
        assert!(items.item(bomb).is_none());
    }

    #[test]
    fn zero_count_can_stay_listed() {
        let mut items = collection(ItemSettings::new().with_zero_count_policy(ZeroCountPolicy::KeepZero));
        items.add_container(bag(), Arc::new(ContainerDefinition::new("bag"))).unwrap();
        let bomb = items.create_item_in_container(&bag(), &"bomb".into(), 2)[0];

        items.set_item_count(bomb, 0);

        let view = items.view(&bag()).unwrap();
        assert!(view.contains(bomb));
        assert_eq!(view.total_item_count(), 0);
        assert_eq!(view.total_item_count_by_def(&"bomb".into()), 0);
    }

    #[test]
    fn default_items_are_created_once() {
        let def = ContainerDefinition::new("bag")
            .with_default_item(crate::item::ItemDefStack::new("bomb", 2))
            .with_default_item(crate::item::ItemDefStack::new("missing", 1));
        let mut items = with_bag(def);

        assert_eq!(items.create_default_items(&bag(), false).len(), 1);
        assert!(items.create_default_items(&bag(), false).is_empty());
        assert_eq!(items.view(&bag()).unwrap().total_item_count(), 2);

        items.create_default_items(&bag(), true);
        assert_eq!(items.view(&bag()).unwrap().total_item_count(), 4);
    }

    #[test]
    fn split_moves_units_to_new_item() {
        let mut items = with_bag(ContainerDefinition::new("bag"));
        let bomb = items.create_item_in_container(&bag(), &"bomb".into(), 3)[0];

        assert_eq!(items.split_item(bomb, 3), None);
        let split = items.split_item(bomb, 1).unwrap();

        assert_eq!(items.item(bomb).unwrap().count(), 2);
        assert_eq!(items.item(split).unwrap().count(), 1);
        assert!(items.item(split).unwrap().containers().is_empty());
    }
}

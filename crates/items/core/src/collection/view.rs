//! Read-only container queries.
//!
//! [`ContainerView`] pairs a container with its collection so that queries can
//! read item counts and consult rules that look at sibling containers.

use std::ops::Deref;

use tracing::{debug, warn};

use crate::container::{AddPlan, ItemContainer, SlotLimit};
use crate::item::{ItemDefId, ItemId, ItemInstance, StockLimit};
use crate::rules::{ContainerRulePolicy, RuleContext};
use crate::tag::{Tag, TagSet};

use super::ContainerCollection;

#[derive(Clone, Copy)]
pub struct ContainerView<'a> {
    collection: &'a ContainerCollection,
    container: &'a ItemContainer,
}

impl<'a> Deref for ContainerView<'a> {
    type Target = ItemContainer;

    fn deref(&self) -> &Self::Target {
        self.container
    }
}

impl<'a> ContainerView<'a> {
    pub(crate) fn new(collection: &'a ContainerCollection, container: &'a ItemContainer) -> Self {
        Self {
            collection,
            container,
        }
    }

    pub fn container(&self) -> &'a ItemContainer {
        self.container
    }

    pub fn collection(&self) -> &'a ContainerCollection {
        self.collection
    }

    fn rule_context(&self) -> RuleContext<'a> {
        RuleContext {
            collection: self.collection,
            container: self.container.id(),
        }
    }

    /// Listed items in slot order.
    pub fn items(&self) -> impl Iterator<Item = &'a ItemInstance> + 'a {
        let collection = self.collection;
        self.container
            .all_items()
            .into_iter()
            .filter_map(move |id| collection.item(id))
    }

    pub fn item_instance_at(&self, slot: usize) -> Option<&'a ItemInstance> {
        self.container
            .item_at(slot)
            .and_then(|id| self.collection.item(id))
    }

    // ------------------------------------------------------------------
    // Finding items
    // ------------------------------------------------------------------

    pub fn find_first_item_by_def(&self, def: &ItemDefId) -> Option<ItemId> {
        self.items().find(|item| item.def_id() == def).map(ItemInstance::id)
    }

    pub fn find_items_by_def(&self, def: &ItemDefId) -> Vec<ItemId> {
        self.items()
            .filter(|item| item.def_id() == def)
            .map(ItemInstance::id)
            .collect()
    }

    /// Items owning every `require` tag and none of the `ignore` tags.
    /// Both sets empty finds nothing.
    pub fn find_items_by_tag(&self, require: &TagSet, ignore: &TagSet) -> Vec<ItemId> {
        if require.is_empty() && ignore.is_empty() {
            return Vec::new();
        }
        self.items()
            .filter(|item| item.owned_tags().has_all(require) && !item.owned_tags().has_any(ignore))
            .map(ItemInstance::id)
            .collect()
    }

    pub fn find_first_item_by_tag(&self, require: &TagSet, ignore: &TagSet) -> Option<ItemId> {
        self.find_items_by_tag(require, ignore).into_iter().next()
    }

    /// Listed items that could stack with `item`, excluding `item` itself.
    pub fn all_matching_items(&self, item: &ItemInstance) -> Vec<ItemId> {
        self.items()
            .filter(|other| other.id() != item.id() && other.is_matching(item))
            .map(ItemInstance::id)
            .collect()
    }

    pub fn find_first_matching_item(&self, item: &ItemInstance) -> Option<ItemId> {
        self.all_matching_items(item).into_iter().next()
    }

    // ------------------------------------------------------------------
    // Counts
    // ------------------------------------------------------------------

    /// Sum of counts of every listed item matching `item`, including `item`
    /// itself when listed.
    pub fn total_matching_item_count(&self, item: &ItemInstance) -> u32 {
        self.items()
            .filter(|other| other.id() == item.id() || other.is_matching(item))
            .map(ItemInstance::count)
            .sum()
    }

    pub fn total_item_count_by_def(&self, def: &ItemDefId) -> u32 {
        self.items()
            .filter(|item| item.def_id() == def)
            .map(ItemInstance::count)
            .sum()
    }

    /// Sum of all listed counts.
    pub fn total_item_count(&self) -> u32 {
        self.items().map(ItemInstance::count).sum()
    }

    pub fn is_stack_full(&self, item: ItemId) -> bool {
        self.collection.item(item).is_some_and(|instance| {
            self.item_stack_max_count(instance)
                .value()
                .is_some_and(|max| instance.count() >= max)
        })
    }

    // ------------------------------------------------------------------
    // Rules and stock
    // ------------------------------------------------------------------

    /// Every rule must accept the item.
    pub fn can_contain_item(&self, item: &ItemInstance) -> bool {
        let ctx = self.rule_context();
        self.container
            .rules()
            .iter()
            .all(|rule| rule.can_contain_item(&ctx, item))
    }

    /// Asks the rules about a fresh unit of `def`.
    pub fn can_contain_item_by_def(&self, def: &ItemDefId) -> bool {
        let Some(definition) = self.collection.definitions().definition(def) else {
            debug!(def = %def, "unknown item definition");
            return false;
        };
        self.can_contain_item(&ItemInstance::new(ItemId::default(), definition, 1))
    }

    /// Strictest of the item definition, the container definition's stock
    /// rule and every container rule.
    pub fn item_max_count(&self, item: &ItemInstance) -> StockLimit {
        std::iter::once(item.def().stock.max_count)
            .chain(std::iter::once(self.container.def().stock_rule.item_max_count(item)))
            .chain(self.container.rules().iter().map(|rule| rule.item_max_count(item)))
            .collect()
    }

    pub fn item_stack_max_count(&self, item: &ItemInstance) -> StockLimit {
        std::iter::once(item.def().stock.stack_max_count)
            .chain(std::iter::once(
                self.container.def().stock_rule.item_stack_max_count(item),
            ))
            .chain(
                self.container
                    .rules()
                    .iter()
                    .map(|rule| rule.item_stack_max_count(item)),
            )
            .collect()
    }

    pub fn item_collection_max_count(&self, item: &ItemInstance) -> StockLimit {
        item.def().stock.collection_max_count
    }

    /// Units of `item` that still fit in this container.
    pub fn remaining_space_for_item(&self, item: &ItemInstance) -> StockLimit {
        self.item_max_count(item)
            .remaining(self.total_matching_item_count(item))
    }

    /// Units of `item` that still fit in the whole collection.
    pub fn remaining_collection_space_for_item(&self, item: &ItemInstance) -> StockLimit {
        self.item_collection_max_count(item)
            .remaining(self.collection.total_matching_item_count(item))
    }

    // ------------------------------------------------------------------
    // Auto-slot
    // ------------------------------------------------------------------

    pub fn can_auto_slot(&self, item: &ItemInstance, _context_tags: &TagSet) -> bool {
        self.container
            .rules()
            .iter()
            .filter_map(|rule| rule.as_auto_slot())
            .any(|rule| rule.accepts(item))
            && self.can_contain_item(item)
    }

    /// Highest priority among auto-slot rules that accept `item`, 0 if none.
    pub fn auto_slot_priority_for_item(&self, item: &ItemInstance, _context_tags: &TagSet) -> i32 {
        if !self.can_contain_item(item) {
            return 0;
        }
        self.container
            .rules()
            .iter()
            .filter_map(|rule| rule.as_auto_slot())
            .filter(|rule| rule.accepts(item))
            .map(|rule| rule.priority)
            .max()
            .unwrap_or(0)
    }

    // ------------------------------------------------------------------
    // Add plans
    // ------------------------------------------------------------------

    /// Plans adding `item` without mutating anything.
    ///
    /// The collection limit is ignored when the item comes from a container
    /// of this collection, since moving it does not change the total.
    pub fn check_add_item(&self, item: ItemId, slot: Option<usize>, from: Option<&Tag>) -> AddPlan {
        let Some(instance) = self.collection.item(item) else {
            return AddPlan::default();
        };
        let ignore_collection_limit = from.is_some_and(|id| self.collection.container(id).is_some());
        self.add_item_plan(instance, slot, ignore_collection_limit, false)
    }

    pub(crate) fn add_item_plan(
        &self,
        item: &ItemInstance,
        target_slot: Option<usize>,
        ignore_collection_limit: bool,
        warn_on_loss: bool,
    ) -> AddPlan {
        let count = item.count();
        if self.container.contains(item.id()) || !self.can_contain_item(item) {
            return AddPlan::rejected(count);
        }
        if self.container.is_child() {
            return self.child_add_plan(item, target_slot);
        }

        let mut max_delta = self.remaining_space_for_item(item);
        if !ignore_collection_limit {
            max_delta = max_delta.min(self.remaining_collection_space_for_item(item));
        }
        let delta_count = max_delta.clamp(count);
        if delta_count == 0 {
            if warn_on_loss {
                warn!(container = %self.container.id(), item = %item, "no space for item");
            }
            return AddPlan::rejected(count);
        }
        if delta_count < count && warn_on_loss {
            warn!(
                container = %self.container.id(),
                item = %item,
                lost = count - delta_count,
                "item count clamped by stock limits"
            );
        }

        let def = self.container.def();
        let stack_max = self.item_stack_max_count(item).value().unwrap_or(u32::MAX);
        if stack_max == 0 {
            if warn_on_loss {
                warn!(container = %self.container.id(), item = %item, "stack limit is zero");
            }
            return AddPlan::rejected(count);
        }
        let slot_limit = match def.slot_limit {
            SlotLimit::Limited(slots) => Some(slots),
            SlotLimit::Unlimited => None,
        };

        let mut spare: Vec<ItemId> = if def.auto_stack || slot_limit.is_some() {
            self.all_matching_items(item)
                .into_iter()
                .filter(|id| {
                    self.collection
                        .item(*id)
                        .is_some_and(|other| other.count() < stack_max)
                })
                .collect()
        } else {
            Vec::new()
        };
        let mut num_empty = self.container.num_empty_slots();
        let mut remaining = delta_count;
        let mut next_slot = target_slot;
        let mut plan = AddPlan::default();
        let mut idle_steps = 0usize;

        while remaining > 0 {
            if num_empty == Some(0) && spare.is_empty() {
                if warn_on_loss {
                    warn!(
                        container = %self.container.id(),
                        item = %item,
                        lost = remaining,
                        "container is full"
                    );
                }
                break;
            }

            let mut slot = next_slot.unwrap_or_else(|| match spare.first() {
                Some(first) if def.auto_stack => self.container.item_slot(*first).unwrap_or(0),
                _ => 0,
            });
            if slot_limit.is_some_and(|limit| slot >= limit) {
                slot = 0;
            }

            let can_stack = def.auto_stack || num_empty == Some(0);
            let planned = plan
                .slots()
                .find(|(s, _)| *s == slot)
                .map_or(0, |(_, delta)| delta);
            let mut progressed = false;

            match self.item_instance_at(slot) {
                Some(occupant) => {
                    let current = occupant.count().saturating_add(planned);
                    if can_stack && occupant.is_matching(item) && current < stack_max {
                        let delta = remaining.min(stack_max - current);
                        debug!(container = %self.container.id(), slot, delta, "stacking into slot");
                        plan.add_count_to_slot(slot, delta);
                        remaining -= delta;
                        spare.retain(|id| *id != occupant.id());
                        progressed = true;
                    }
                }
                None if planned == 0 => {
                    let delta = remaining.min(stack_max);
                    debug!(container = %self.container.id(), slot, delta, "placing in empty slot");
                    plan.add_count_to_slot(slot, delta);
                    remaining -= delta;
                    num_empty = num_empty.map(|n| n.saturating_sub(1));
                    progressed = true;
                }
                None => {}
            }

            next_slot = Some(slot + 1);
            if let Some(limit) = slot_limit {
                idle_steps = if progressed { 0 } else { idle_steps + 1 };
                if idle_steps > limit {
                    if warn_on_loss {
                        warn!(
                            container = %self.container.id(),
                            item = %item,
                            lost = remaining,
                            "no slot accepts the remaining count"
                        );
                    }
                    break;
                }
            }
        }

        plan.update_derived_values(count);
        plan
    }

    /// Child containers mirror the parent's instance in a single slot.
    fn child_add_plan(&self, item: &ItemInstance, target_slot: Option<usize>) -> AddPlan {
        let mut plan = AddPlan::default();
        let slot = target_slot.or_else(|| self.container.next_empty_slot());
        match slot {
            Some(slot) if self.container.is_valid_slot(slot) && self.container.is_slot_empty(slot) => {
                plan.add_count_to_slot(slot, item.count());
            }
            _ => debug!(container = %self.container.id(), item = %item, "no free slot in child"),
        }
        plan.update_derived_values(item.count());
        plan
    }
}

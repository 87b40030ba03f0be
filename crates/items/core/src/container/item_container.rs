use std::sync::Arc;

use super::definition::{ContainerDefinition, SlotLimit};
use super::list::ItemList;
use super::slots::SlotChangeTracker;
use crate::item::ItemId;
use crate::replication::NetExecutionPolicy;
use crate::rules::{ContainerRule, ContainerRulePolicy, RuleKind};
use crate::tag::{Tag, TagSet};

/// One container: an item list plus the rules that govern it.
///
/// Queries that only need slot bookkeeping live here. Queries that read item
/// counts or consult rules go through [`crate::collection::ContainerView`],
/// and mutations go through [`crate::collection::ContainerCollection`].
#[derive(Clone, Debug)]
pub struct ItemContainer {
    id: Tag,
    def: Arc<ContainerDefinition>,
    pub(crate) list: ItemList,
    pub(crate) rules: Vec<ContainerRule>,
    pub(crate) children: Vec<Tag>,
    pub(crate) has_default_items: bool,
    pub(crate) slot_changes: SlotChangeTracker,
}

impl ItemContainer {
    pub(crate) fn new(id: Tag, def: Arc<ContainerDefinition>) -> Self {
        let rules = def.rules.clone();
        Self {
            id,
            def,
            list: ItemList::new(),
            rules,
            children: Vec::new(),
            has_default_items: false,
            slot_changes: SlotChangeTracker::default(),
        }
    }

    pub fn id(&self) -> &Tag {
        &self.id
    }

    pub fn def(&self) -> &Arc<ContainerDefinition> {
        &self.def
    }

    pub fn list(&self) -> &ItemList {
        &self.list
    }

    pub fn net_policy(&self) -> NetExecutionPolicy {
        self.def.net_policy
    }

    /// Container id followed by the definition's tags.
    pub fn owned_tags(&self) -> TagSet {
        let mut tags = TagSet::new();
        tags.insert(self.id.clone());
        tags.extend_from(&self.def.owned_tags);
        tags
    }

    pub fn contains(&self, item: ItemId) -> bool {
        self.list.contains(item)
    }

    pub fn item_at(&self, slot: usize) -> Option<ItemId> {
        self.list.item_at(slot)
    }

    pub fn item_slot(&self, item: ItemId) -> Option<usize> {
        self.list.slot_of(item)
    }

    /// Items in slot order.
    pub fn all_items(&self) -> Vec<ItemId> {
        self.list.all_items()
    }

    /// Items indexed by slot, `None` for empty slots.
    pub fn all_items_as_slot_array(&self) -> Vec<Option<ItemId>> {
        let mut slots = vec![None; self.num_slots().max(self.list.slots().last().map_or(0, |s| s + 1))];
        for (slot, item) in self.list.slot_items() {
            slots[slot] = Some(item);
        }
        slots
    }

    pub fn first_item(&self) -> Option<ItemId> {
        self.list.all_items().into_iter().next()
    }

    pub fn num_items(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn is_slot_count_limited(&self) -> bool {
        self.def.slot_limit.is_limited()
    }

    /// Slot limit, or the item count when unlimited.
    pub fn num_slots(&self) -> usize {
        match self.def.slot_limit {
            SlotLimit::Limited(slots) => slots,
            SlotLimit::Unlimited => self.list.len(),
        }
    }

    /// Free slots, `None` when unlimited.
    pub fn num_empty_slots(&self) -> Option<usize> {
        match self.def.slot_limit {
            SlotLimit::Limited(slots) => Some(slots.saturating_sub(self.list.len())),
            SlotLimit::Unlimited => None,
        }
    }

    /// First empty slot.
    ///
    /// Unlimited containers return the first gap, or `len()` when the list is
    /// dense, matching where an append would land. Limited containers return
    /// `None` when full.
    pub fn next_empty_slot(&self) -> Option<usize> {
        match self.def.slot_limit {
            SlotLimit::Limited(slots) => (0..slots).find(|&slot| !self.list.has_item_in_slot(slot)),
            SlotLimit::Unlimited => {
                let len = self.list.len();
                Some(
                    (0..len)
                        .find(|&slot| !self.list.has_item_in_slot(slot))
                        .unwrap_or(len),
                )
            }
        }
    }

    pub fn is_valid_slot(&self, slot: usize) -> bool {
        match self.def.slot_limit {
            SlotLimit::Limited(slots) => slot < slots,
            SlotLimit::Unlimited => true,
        }
    }

    pub fn is_slot_empty(&self, slot: usize) -> bool {
        !self.list.has_item_in_slot(slot)
    }

    pub fn rules(&self) -> &[ContainerRule] {
        &self.rules
    }

    /// First rule of the given kind.
    pub fn rule(&self, kind: RuleKind) -> Option<&ContainerRule> {
        self.rules.iter().find(|rule| rule.kind() == kind)
    }

    /// True when any rule makes this container a view over another.
    pub fn is_child(&self) -> bool {
        self.rules.iter().any(ContainerRulePolicy::is_child)
    }

    /// True when a child link of this container points at `parent`.
    pub fn has_parent(&self, parent: &Tag) -> bool {
        self.rules
            .iter()
            .any(|rule| rule.is_child() && rule.linked_container() == Some(parent))
    }

    /// Containers registered as children of this one.
    pub fn children(&self) -> &[Tag] {
        &self.children
    }

    pub fn has_default_items(&self) -> bool {
        self.has_default_items
    }

    pub(crate) fn register_child(&mut self, child: &Tag) {
        if !self.children.contains(child) {
            self.children.push(child.clone());
        }
    }

    pub(crate) fn unregister_child(&mut self, child: &Tag) {
        self.children.retain(|c| c != child);
    }
}

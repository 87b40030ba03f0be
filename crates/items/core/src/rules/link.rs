//! Link rules: live relationships to a sibling container.
//!
//! Links hold the linked container's id, never a reference. The owning
//! collection resolves the id and routes the linked container's events to the
//! link (see `collection::links`).

use super::{ContainerRulePolicy, RuleContext};
use crate::config::ItemsConfig;
use crate::item::ItemInstance;
use crate::tag::{Tag, TagQuery, TagSet};

/// Only a sibling's items may be listed; removing an item from the parent
/// removes it here too. The container becomes a child view.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ParentLink {
    pub linked_container: Option<Tag>,
}

impl ContainerRulePolicy for ParentLink {
    fn can_contain_item(&self, ctx: &RuleContext<'_>, item: &ItemInstance) -> bool {
        ctx.linked_contains(self.linked_container.as_ref(), item)
    }

    fn is_child(&self) -> bool {
        true
    }
}

/// Auto-slots items added to the linked container into this one.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AutoSlotLink {
    pub linked_container: Option<Tag>,
    /// Only items whose tags pass this query are slotted. Empty passes all.
    pub query: TagQuery,
    /// Context tags handed to the auto-slot rules.
    pub context_tags: TagSet,
}

impl Default for AutoSlotLink {
    fn default() -> Self {
        Self {
            linked_container: None,
            query: TagQuery::default(),
            context_tags: [ItemsConfig::TAG_AUTO_SLOT_NO_REPLACE].into_iter().collect(),
        }
    }
}

impl ContainerRulePolicy for AutoSlotLink {}

/// Mirrors the item at `selected_slot` of the linked container into
/// `target_slot` of this container.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SelectionLink {
    pub linked_container: Option<Tag>,
    pub target_slot: usize,
    pub allow_selecting_empty_slots: bool,
    pub selected_slot: usize,
}

impl Default for SelectionLink {
    fn default() -> Self {
        Self {
            linked_container: None,
            target_slot: 0,
            allow_selecting_empty_slots: false,
            selected_slot: 0,
        }
    }
}

impl SelectionLink {
    /// Wraps (`looped`) or clamps `slot` into `[0, num_slots - 1]`.
    pub fn clamp_slot(slot: i64, looped: bool, num_slots: usize) -> usize {
        if num_slots == 0 {
            return 0;
        }
        let num_slots = num_slots as i64;
        let slot = if looped {
            slot.rem_euclid(num_slots)
        } else {
            slot.clamp(0, num_slots - 1)
        };
        slot as usize
    }

    /// Next non-empty slot from the current selection in `direction`.
    ///
    /// Looping visits every other slot once, wrapping around. Without looping
    /// the search stops at either end.
    pub fn find_valid_item_slot(
        &self,
        direction: i64,
        looped: bool,
        num_slots: usize,
        is_slot_empty: impl Fn(usize) -> bool,
    ) -> Option<usize> {
        let selected = self.selected_slot as i64;
        let count = num_slots as i64;
        if looped {
            if count == 0 {
                return None;
            }
            (1..count)
                .map(|step| (selected + step * direction).rem_euclid(count) as usize)
                .find(|&slot| !is_slot_empty(slot))
        } else if direction > 0 {
            (self.selected_slot + 1..num_slots).find(|&slot| !is_slot_empty(slot))
        } else {
            (0..self.selected_slot).rev().find(|&slot| !is_slot_empty(slot))
        }
    }
}

impl ContainerRulePolicy for SelectionLink {
    fn can_contain_item(&self, ctx: &RuleContext<'_>, item: &ItemInstance) -> bool {
        ctx.linked_contains(self.linked_container.as_ref(), item)
    }

    fn is_child(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_wraps_or_clamps_within_range() {
        assert_eq!(SelectionLink::clamp_slot(4, true, 4), 0);
        assert_eq!(SelectionLink::clamp_slot(-1, true, 4), 3);
        assert_eq!(SelectionLink::clamp_slot(4, false, 4), 3);
        assert_eq!(SelectionLink::clamp_slot(-1, false, 4), 0);
        assert_eq!(SelectionLink::clamp_slot(2, false, 0), 0);
    }

    #[test]
    fn next_item_skips_empty_slots() {
        let occupied = [0usize, 2];
        let link = SelectionLink::default();
        let empty = |slot: usize| !occupied.contains(&slot);
        assert_eq!(link.find_valid_item_slot(1, false, 4, empty), Some(2));
    }

    #[test]
    fn prev_item_loops_around() {
        let occupied = [1usize, 3];
        let link = SelectionLink {
            selected_slot: 1,
            ..SelectionLink::default()
        };
        let empty = |slot: usize| !occupied.contains(&slot);
        assert_eq!(link.find_valid_item_slot(-1, true, 4, empty), Some(3));
        assert_eq!(link.find_valid_item_slot(-1, false, 4, empty), None);
    }

    #[test]
    fn auto_slot_link_defaults_to_no_replace() {
        let link = AutoSlotLink::default();
        assert!(link.context_tags.has_tag(&Tag::from("Item.AutoSlot.NoReplace")));
    }
}

use super::ContainerRulePolicy;
use crate::config::ItemsConfig;
use crate::item::ItemInstance;
use crate::tag::{Tag, TagFilter, TagSet};

/// Basic auto-slot rule: fill the next empty slot, otherwise replace slot 0.
///
/// Context tags adjust a single invocation:
/// `Item.AutoSlot.Replace` forces replacement, `Item.AutoSlot.NoReplace`
/// forbids it and `Item.AutoSlot.Toggle` removes an already slotted item.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AutoSlotRule {
    pub priority: i32,
    pub filter: TagFilter,
    pub replace_by_default: bool,
}

impl Default for AutoSlotRule {
    fn default() -> Self {
        Self {
            priority: ItemsConfig::DEFAULT_AUTO_SLOT_PRIORITY,
            filter: TagFilter::default(),
            replace_by_default: true,
        }
    }
}

impl AutoSlotRule {
    /// Tag gate; the container's own `can_contain_item` is checked by the caller.
    pub fn accepts(&self, item: &ItemInstance) -> bool {
        self.filter.passes(item.owned_tags())
    }

    /// Next empty slot, or slot 0 as the replacement candidate.
    pub fn best_slot(&self, next_empty_slot: Option<usize>) -> usize {
        next_empty_slot.unwrap_or(0)
    }

    pub fn should_replace(&self, context_tags: &TagSet) -> bool {
        let replace = Tag::from(ItemsConfig::TAG_AUTO_SLOT_REPLACE);
        let no_replace = Tag::from(ItemsConfig::TAG_AUTO_SLOT_NO_REPLACE);
        (self.replace_by_default || context_tags.has_tag(&replace))
            && !context_tags.has_tag(&no_replace)
    }

    pub fn is_toggle(context_tags: &TagSet) -> bool {
        context_tags.has_tag(&Tag::from(ItemsConfig::TAG_AUTO_SLOT_TOGGLE))
    }
}

impl ContainerRulePolicy for AutoSlotRule {}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(tags: &[&str]) -> TagSet {
        tags.iter().copied().collect()
    }

    #[test]
    fn replace_policy() {
        let rule = AutoSlotRule::default();
        assert!(rule.should_replace(&context(&[])));
        assert!(!rule.should_replace(&context(&["Item.AutoSlot.NoReplace"])));

        let cautious = AutoSlotRule {
            replace_by_default: false,
            ..AutoSlotRule::default()
        };
        assert!(!cautious.should_replace(&context(&[])));
        assert!(cautious.should_replace(&context(&["Item.AutoSlot.Replace"])));
        assert!(!cautious.should_replace(&context(&[
            "Item.AutoSlot.Replace",
            "Item.AutoSlot.NoReplace"
        ])));
    }

    #[test]
    fn best_slot_falls_back_to_zero() {
        let rule = AutoSlotRule::default();
        assert_eq!(rule.best_slot(Some(3)), 3);
        assert_eq!(rule.best_slot(None), 0);
    }

    #[test]
    fn default_priority_is_one() {
        assert_eq!(AutoSlotRule::default().priority, 1);
    }
}

//! Stock rules: per-container count and stack limits.

use super::ContainerRulePolicy;
use crate::config::ItemsConfig;
use crate::item::{ItemInstance, StockLimit};
use crate::tag::Tag;

/// Fixed limits applied to every item.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct StockRuleSimple {
    pub limit_max_count: bool,
    pub max_count: u32,
    pub limit_stack_max_count: bool,
    pub stack_max_count: u32,
}

impl Default for StockRuleSimple {
    fn default() -> Self {
        Self {
            limit_max_count: false,
            max_count: ItemsConfig::DEFAULT_SIMPLE_MAX_COUNT,
            limit_stack_max_count: false,
            stack_max_count: ItemsConfig::DEFAULT_SIMPLE_STACK_MAX_COUNT,
        }
    }
}

impl StockRuleSimple {
    pub fn max_count(max_count: u32) -> Self {
        Self {
            limit_max_count: true,
            max_count,
            ..Self::default()
        }
    }

    pub fn stack_max_count(stack_max_count: u32) -> Self {
        Self {
            limit_stack_max_count: true,
            stack_max_count,
            ..Self::default()
        }
    }
}

impl ContainerRulePolicy for StockRuleSimple {
    fn item_max_count(&self, _item: &ItemInstance) -> StockLimit {
        if self.limit_max_count {
            StockLimit::Limited(self.max_count)
        } else {
            StockLimit::Unlimited
        }
    }

    fn item_stack_max_count(&self, _item: &ItemInstance) -> StockLimit {
        if self.limit_stack_max_count {
            StockLimit::Limited(self.stack_max_count)
        } else {
            StockLimit::Unlimited
        }
    }
}

/// Limits for items carrying one tag.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TagStockLimits {
    pub max_count: StockLimit,
    pub stack_max_count: StockLimit,
}

/// Tag-keyed limits.
///
/// The first tag of the item's definition (in its declared order) that has an
/// entry decides the limits. Later matching tags are ignored.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StockRuleTags {
    pub limits: Vec<(Tag, TagStockLimits)>,
}

impl StockRuleTags {
    #[must_use]
    pub fn with_limit(mut self, tag: impl Into<Tag>, limits: TagStockLimits) -> Self {
        self.limits.push((tag.into(), limits));
        self
    }

    pub fn limits_for_item(&self, item: &ItemInstance) -> TagStockLimits {
        item.owned_tags()
            .iter()
            .find_map(|tag| {
                self.limits
                    .iter()
                    .find(|(key, _)| key == tag)
                    .map(|(_, limits)| *limits)
            })
            .unwrap_or_default()
    }
}

impl ContainerRulePolicy for StockRuleTags {
    fn item_max_count(&self, item: &ItemInstance) -> StockLimit {
        self.limits_for_item(item).max_count
    }

    fn item_stack_max_count(&self, item: &ItemInstance) -> StockLimit {
        self.limits_for_item(item).stack_max_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{ItemDefinition, ItemId};
    use crate::tag::TagSet;
    use std::sync::Arc;

    fn item(tags: &[&str]) -> ItemInstance {
        let def = ItemDefinition::new("thing", "Thing").with_tags(tags.iter().copied().collect::<TagSet>());
        ItemInstance::new(ItemId(1), Arc::new(def), 1)
    }

    #[test]
    fn simple_rule_only_limits_when_flagged() {
        let rule = StockRuleSimple::default();
        assert_eq!(rule.item_max_count(&item(&[])), StockLimit::Unlimited);
        let rule = StockRuleSimple::stack_max_count(5);
        assert_eq!(rule.item_stack_max_count(&item(&[])), StockLimit::Limited(5));
        assert_eq!(rule.item_max_count(&item(&[])), StockLimit::Unlimited);
    }

    #[test]
    fn first_matching_item_tag_wins() {
        let rule = StockRuleTags::default()
            .with_limit(
                "Item.Ammo",
                TagStockLimits {
                    max_count: StockLimit::Limited(50),
                    stack_max_count: StockLimit::Limited(10),
                },
            )
            .with_limit(
                "Item.Heavy",
                TagStockLimits {
                    max_count: StockLimit::Limited(2),
                    stack_max_count: StockLimit::Limited(1),
                },
            );

        // Item tag order decides, not rule order.
        let heavy_ammo = item(&["Item.Heavy", "Item.Ammo"]);
        assert_eq!(rule.item_max_count(&heavy_ammo), StockLimit::Limited(2));

        let ammo_heavy = item(&["Item.Ammo", "Item.Heavy"]);
        assert_eq!(rule.item_max_count(&ammo_heavy), StockLimit::Limited(50));
        assert_eq!(rule.item_stack_max_count(&ammo_heavy), StockLimit::Limited(10));

        assert_eq!(rule.item_max_count(&item(&["Item.Food"])), StockLimit::Unlimited);
    }
}

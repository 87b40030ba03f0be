use crate::item::{ItemDefStack, ItemSet};
use crate::replication::NetExecutionPolicy;
use crate::rules::{ContainerRule, StockRuleSimple};
use crate::tag::TagSet;

/// Slot capacity of a container.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SlotLimit {
    /// Slots grow with the item count; removals collapse the list.
    #[default]
    Unlimited,
    /// Fixed number of slots; removals leave holes.
    Limited(usize),
}

impl SlotLimit {
    pub const fn is_limited(self) -> bool {
        matches!(self, SlotLimit::Limited(_))
    }
}

/// Shared, immutable description of a container.
///
/// Rules listed here are cloned into every container created from the
/// definition so each container owns its rule state.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ContainerDefinition {
    pub name: String,
    pub owned_tags: TagSet,
    pub slot_limit: SlotLimit,
    /// Merge added items into existing stacks before using empty slots.
    pub auto_stack: bool,
    /// Fixed stock limits applied on top of the item definition's own.
    pub stock_rule: StockRuleSimple,
    pub default_items: Vec<ItemDefStack>,
    pub default_item_sets: Vec<ItemSet>,
    pub rules: Vec<ContainerRule>,
    pub net_policy: NetExecutionPolicy,
}

impl ContainerDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_slot_limit(mut self, slots: usize) -> Self {
        self.slot_limit = SlotLimit::Limited(slots);
        self
    }

    #[must_use]
    pub fn with_auto_stack(mut self, auto_stack: bool) -> Self {
        self.auto_stack = auto_stack;
        self
    }

    #[must_use]
    pub fn with_rule(mut self, rule: impl Into<ContainerRule>) -> Self {
        self.rules.push(rule.into());
        self
    }

    #[must_use]
    pub fn with_default_item(mut self, stack: ItemDefStack) -> Self {
        self.default_items.push(stack);
        self
    }

    #[must_use]
    pub fn with_net_policy(mut self, policy: NetExecutionPolicy) -> Self {
        self.net_policy = policy;
        self
    }
}

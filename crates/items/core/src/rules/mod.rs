//! Container rules: stock limits, tag requirements, auto-slotting and links.
//!
//! Every rule kind implements [`ContainerRulePolicy`]. A container asks all of
//! its rules and composes the answers: an item is accepted only if every rule
//! accepts it, and count limits take the strictest non-unlimited answer.
pub mod auto_slot;
pub mod link;
pub mod requirement;
pub mod stock;

pub use auto_slot::AutoSlotRule;
pub use link::{AutoSlotLink, ParentLink, SelectionLink};
pub use requirement::TagRequirementRule;
pub use stock::{StockRuleSimple, StockRuleTags, TagStockLimits};

use crate::collection::ContainerCollection;
use crate::item::{ItemInstance, StockLimit};
use crate::tag::Tag;

/// Read access handed to rules while they are consulted.
pub struct RuleContext<'a> {
    pub collection: &'a ContainerCollection,
    pub container: &'a Tag,
}

impl RuleContext<'_> {
    /// True when the linked container exists and lists `item`.
    pub fn linked_contains(&self, linked: Option<&Tag>, item: &ItemInstance) -> bool {
        linked
            .and_then(|id| self.collection.container(id))
            .is_some_and(|container| container.contains(item.id()))
    }
}

/// Capability shared by every rule kind. Defaults answer "no opinion".
pub trait ContainerRulePolicy {
    fn can_contain_item(&self, _ctx: &RuleContext<'_>, _item: &ItemInstance) -> bool {
        true
    }

    fn item_max_count(&self, _item: &ItemInstance) -> StockLimit {
        StockLimit::Unlimited
    }

    fn item_stack_max_count(&self, _item: &ItemInstance) -> StockLimit {
        StockLimit::Unlimited
    }

    /// A child container is a view over another container's items.
    fn is_child(&self) -> bool {
        false
    }
}

#[derive(Clone, Debug, PartialEq, Eq, strum::EnumDiscriminants)]
#[strum_discriminants(name(RuleKind))]
#[strum_discriminants(derive(Hash, strum::Display))]
#[cfg_attr(
    feature = "serde",
    strum_discriminants(derive(serde::Serialize, serde::Deserialize))
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ContainerRule {
    StockSimple(StockRuleSimple),
    StockTags(StockRuleTags),
    TagRequirements(TagRequirementRule),
    AutoSlot(AutoSlotRule),
    ParentLink(ParentLink),
    AutoSlotLink(AutoSlotLink),
    SelectionLink(SelectionLink),
}

impl ContainerRule {
    pub fn kind(&self) -> RuleKind {
        RuleKind::from(self)
    }

    pub fn is_link(&self) -> bool {
        matches!(
            self,
            ContainerRule::ParentLink(_)
                | ContainerRule::AutoSlotLink(_)
                | ContainerRule::SelectionLink(_)
        )
    }

    /// Linked container id for link rules.
    pub fn linked_container(&self) -> Option<&Tag> {
        match self {
            ContainerRule::ParentLink(link) => link.linked_container.as_ref(),
            ContainerRule::AutoSlotLink(link) => link.linked_container.as_ref(),
            ContainerRule::SelectionLink(link) => link.linked_container.as_ref(),
            _ => None,
        }
    }

    pub(crate) fn set_linked_container(&mut self, id: Option<Tag>) {
        match self {
            ContainerRule::ParentLink(link) => link.linked_container = id,
            ContainerRule::AutoSlotLink(link) => link.linked_container = id,
            ContainerRule::SelectionLink(link) => link.linked_container = id,
            _ => {}
        }
    }

    pub fn as_auto_slot(&self) -> Option<&AutoSlotRule> {
        match self {
            ContainerRule::AutoSlot(rule) => Some(rule),
            _ => None,
        }
    }

    pub fn as_selection(&self) -> Option<&SelectionLink> {
        match self {
            ContainerRule::SelectionLink(link) => Some(link),
            _ => None,
        }
    }

    pub(crate) fn as_selection_mut(&mut self) -> Option<&mut SelectionLink> {
        match self {
            ContainerRule::SelectionLink(link) => Some(link),
            _ => None,
        }
    }

    fn policy(&self) -> &dyn ContainerRulePolicy {
        match self {
            ContainerRule::StockSimple(rule) => rule,
            ContainerRule::StockTags(rule) => rule,
            ContainerRule::TagRequirements(rule) => rule,
            ContainerRule::AutoSlot(rule) => rule,
            ContainerRule::ParentLink(rule) => rule,
            ContainerRule::AutoSlotLink(rule) => rule,
            ContainerRule::SelectionLink(rule) => rule,
        }
    }
}

impl ContainerRulePolicy for ContainerRule {
    fn can_contain_item(&self, ctx: &RuleContext<'_>, item: &ItemInstance) -> bool {
        self.policy().can_contain_item(ctx, item)
    }

    fn item_max_count(&self, item: &ItemInstance) -> StockLimit {
        self.policy().item_max_count(item)
    }

    fn item_stack_max_count(&self, item: &ItemInstance) -> StockLimit {
        self.policy().item_stack_max_count(item)
    }

    fn is_child(&self) -> bool {
        self.policy().is_child()
    }
}

impl From<StockRuleSimple> for ContainerRule {
    fn from(rule: StockRuleSimple) -> Self {
        ContainerRule::StockSimple(rule)
    }
}

impl From<StockRuleTags> for ContainerRule {
    fn from(rule: StockRuleTags) -> Self {
        ContainerRule::StockTags(rule)
    }
}

impl From<TagRequirementRule> for ContainerRule {
    fn from(rule: TagRequirementRule) -> Self {
        ContainerRule::TagRequirements(rule)
    }
}

impl From<AutoSlotRule> for ContainerRule {
    fn from(rule: AutoSlotRule) -> Self {
        ContainerRule::AutoSlot(rule)
    }
}

impl From<ParentLink> for ContainerRule {
    fn from(rule: ParentLink) -> Self {
        ContainerRule::ParentLink(rule)
    }
}

impl From<AutoSlotLink> for ContainerRule {
    fn from(rule: AutoSlotLink) -> Self {
        ContainerRule::AutoSlotLink(rule)
    }
}

impl From<SelectionLink> for ContainerRule {
    fn from(rule: SelectionLink) -> Self {
        ContainerRule::SelectionLink(rule)
    }
}

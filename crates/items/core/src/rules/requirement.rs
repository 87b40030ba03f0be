use super::{ContainerRulePolicy, RuleContext};
use crate::item::ItemInstance;
use crate::tag::TagFilter;

/// Accepts only items whose definition tags pass the filter.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct TagRequirementRule {
    pub filter: TagFilter,
}

impl ContainerRulePolicy for TagRequirementRule {
    fn can_contain_item(&self, _ctx: &RuleContext<'_>, item: &ItemInstance) -> bool {
        self.filter.passes(item.owned_tags())
    }
}

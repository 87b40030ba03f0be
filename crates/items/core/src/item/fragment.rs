//! Pluggable behaviour attached to item definitions.

use super::instance::ItemInstance;
use crate::equipment::{ConditionId, EquipmentDefId};
use crate::tag::Tag;

/// Hooks every fragment kind can implement.
pub trait ItemFragment {
    /// Called once per fragment for every newly created item, in definition order.
    fn on_item_created(&self, _item: &mut ItemInstance) {}

    /// Returns true to prevent two items of the same definition from stacking.
    fn vetoes_match(&self, _item: &ItemInstance, _other: &ItemInstance) -> bool {
        false
    }
}

/// Tag stats every new item starts with.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TagStatsFragment {
    #[cfg_attr(feature = "serde", serde(default))]
    pub default_stats: Vec<(Tag, i32)>,
    /// Only stack with items whose stats are identical.
    #[cfg_attr(feature = "serde", serde(default))]
    pub stack_only_with_equal_stats: bool,
}

impl ItemFragment for TagStatsFragment {
    fn on_item_created(&self, item: &mut ItemInstance) {
        for (tag, value) in &self.default_stats {
            item.add_tag_stat(tag, *value);
        }
    }

    fn vetoes_match(&self, item: &ItemInstance, other: &ItemInstance) -> bool {
        self.stack_only_with_equal_stats && item.tag_stats() != other.tag_stats()
    }
}

/// Grants equipment while the item sits in a container, optionally gated by a
/// condition.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EquipmentFragment {
    pub equipment: EquipmentDefId,
    #[cfg_attr(feature = "serde", serde(default))]
    pub condition: Option<ConditionId>,
}

impl ItemFragment for EquipmentFragment {}

/// Economic value of one unit.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EconValueFragment {
    pub value: f32,
}

impl EconValueFragment {
    /// Number of units worth `target_value`, rounded half away from zero and
    /// never below `min_count`.
    pub fn count_for_value(&self, target_value: f32, min_count: u32) -> u32 {
        if self.value <= 0.0 {
            return min_count;
        }
        let count = (target_value / self.value).round();
        if count <= 0.0 {
            min_count
        } else {
            (count as u32).max(min_count)
        }
    }
}

impl ItemFragment for EconValueFragment {}

#[derive(Clone, Debug, PartialEq, strum::EnumDiscriminants)]
#[strum_discriminants(name(FragmentKind))]
#[strum_discriminants(derive(Hash, strum::Display))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Fragment {
    TagStats(TagStatsFragment),
    Equipment(EquipmentFragment),
    EconValue(EconValueFragment),
}

impl Fragment {
    pub fn kind(&self) -> FragmentKind {
        FragmentKind::from(self)
    }

    pub fn as_equipment(&self) -> Option<&EquipmentFragment> {
        match self {
            Fragment::Equipment(fragment) => Some(fragment),
            _ => None,
        }
    }

    pub fn as_econ_value(&self) -> Option<&EconValueFragment> {
        match self {
            Fragment::EconValue(fragment) => Some(fragment),
            _ => None,
        }
    }

    fn inner(&self) -> &dyn ItemFragment {
        match self {
            Fragment::TagStats(fragment) => fragment,
            Fragment::Equipment(fragment) => fragment,
            Fragment::EconValue(fragment) => fragment,
        }
    }
}

impl ItemFragment for Fragment {
    fn on_item_created(&self, item: &mut ItemInstance) {
        self.inner().on_item_created(item);
    }

    fn vetoes_match(&self, item: &ItemInstance, other: &ItemInstance) -> bool {
        self.inner().vetoes_match(item, other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn econ_value_rounds_from_zero_with_minimum() {
        let gold = EconValueFragment { value: 2.0 };
        assert_eq!(gold.count_for_value(5.0, 1), 3);
        assert_eq!(gold.count_for_value(3.0, 1), 2);
        assert_eq!(gold.count_for_value(0.5, 1), 1);
        assert_eq!(gold.count_for_value(100.0, 60), 60);
    }

    #[test]
    fn kind_discriminant() {
        let fragment = Fragment::EconValue(EconValueFragment { value: 1.0 });
        assert_eq!(fragment.kind(), FragmentKind::EconValue);
        assert!(fragment.as_equipment().is_none());
    }
}

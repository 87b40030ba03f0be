//! Equipment granted by items.
//!
//! - [`list`]: equipment instances and their replicated list
//! - [`component`]: the per-owner equipment component with authority gating
//! - [`bridge`]: applies equipment for items whose definition carries an
//!   equipment fragment
pub mod bridge;
pub mod component;
pub mod list;

pub use bridge::{AlwaysTrue, ConditionEvaluator, ItemEquipmentBridge};
pub use component::{
    EquipmentCommand, EquipmentComponent, EquipmentDelta, EquipmentError, EquipmentEvent,
};
pub use list::{Equipment, EquipmentId, EquipmentList, EquipmentSpec};

use std::fmt;

/// Identifier of an equipment definition.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct EquipmentDefId(pub String);

impl EquipmentDefId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EquipmentDefId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EquipmentDefId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Opaque handle to a condition evaluated by a [`ConditionEvaluator`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct ConditionId(pub String);

impl fmt::Display for ConditionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConditionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

//! Immutable item definitions and the catalog that serves them.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::fragment::{Fragment, FragmentKind};
use crate::tag::TagSet;

/// Stable identifier of an item definition.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct ItemDefId(pub String);

impl ItemDefId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemDefId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemDefId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// A count limit. Composition always takes the strictest limit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StockLimit {
    #[default]
    Unlimited,
    Limited(u32),
}

impl StockLimit {
    pub const fn is_unlimited(self) -> bool {
        matches!(self, StockLimit::Unlimited)
    }

    pub const fn value(self) -> Option<u32> {
        match self {
            StockLimit::Unlimited => None,
            StockLimit::Limited(n) => Some(n),
        }
    }

    /// Minimum of two limits; unlimited only when both are.
    #[must_use]
    pub fn min(self, other: StockLimit) -> StockLimit {
        match (self, other) {
            (StockLimit::Unlimited, other) => other,
            (this, StockLimit::Unlimited) => this,
            (StockLimit::Limited(a), StockLimit::Limited(b)) => StockLimit::Limited(a.min(b)),
        }
    }

    /// Space left once `used` units are present.
    pub fn remaining(self, used: u32) -> StockLimit {
        match self {
            StockLimit::Unlimited => StockLimit::Unlimited,
            StockLimit::Limited(n) => StockLimit::Limited(n.saturating_sub(used)),
        }
    }

    /// Clamps `count` to this limit.
    pub fn clamp(self, count: u32) -> u32 {
        match self {
            StockLimit::Unlimited => count,
            StockLimit::Limited(n) => count.min(n),
        }
    }
}

impl FromIterator<StockLimit> for StockLimit {
    fn from_iter<I: IntoIterator<Item = StockLimit>>(iter: I) -> Self {
        iter.into_iter().fold(StockLimit::Unlimited, StockLimit::min)
    }
}

/// The definition's own stock rule.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ItemStockRule {
    /// Max total count in one container.
    pub max_count: StockLimit,
    /// Max count of one stack.
    pub stack_max_count: StockLimit,
    /// Max total count across a collection, child containers excluded.
    pub collection_max_count: StockLimit,
}

impl ItemStockRule {
    /// Each instance holds exactly one unit.
    pub fn non_stackable() -> Self {
        Self {
            stack_max_count: StockLimit::Limited(1),
            ..Self::default()
        }
    }

    pub fn can_stack(&self) -> bool {
        self.stack_max_count != StockLimit::Limited(1)
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ItemDefinition {
    pub id: ItemDefId,
    pub name: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub owned_tags: TagSet,
    #[cfg_attr(feature = "serde", serde(default))]
    pub stock: ItemStockRule,
    /// Consulted in order on item creation.
    #[cfg_attr(feature = "serde", serde(default))]
    pub fragments: Vec<Fragment>,
}

impl ItemDefinition {
    pub fn new(id: impl Into<ItemDefId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            owned_tags: TagSet::new(),
            stock: ItemStockRule::default(),
            fragments: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_tags(mut self, tags: TagSet) -> Self {
        self.owned_tags = tags;
        self
    }

    #[must_use]
    pub fn with_stock(mut self, stock: ItemStockRule) -> Self {
        self.stock = stock;
        self
    }

    #[must_use]
    pub fn with_fragment(mut self, fragment: Fragment) -> Self {
        self.fragments.push(fragment);
        self
    }

    /// First fragment of the given kind.
    pub fn find_fragment(&self, kind: FragmentKind) -> Option<&Fragment> {
        self.fragments.iter().find(|f| FragmentKind::from(*f) == kind)
    }
}

impl From<String> for ItemDefId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A definition paired with a count, used for default items.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ItemDefStack {
    pub def: ItemDefId,
    pub count: u32,
}

impl ItemDefStack {
    pub fn new(def: impl Into<ItemDefId>, count: u32) -> Self {
        Self {
            def: def.into(),
            count,
        }
    }
}

/// Named group of default stacks.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ItemSet {
    pub name: String,
    pub items: Vec<ItemDefStack>,
}

/// Read access to item definitions.
pub trait ItemDefinitions: Send + Sync {
    fn definition(&self, id: &ItemDefId) -> Option<Arc<ItemDefinition>>;

    fn all_definitions(&self) -> Vec<Arc<ItemDefinition>>;
}

/// In-memory definition catalog.
#[derive(Clone, Debug, Default)]
pub struct ItemCatalog {
    definitions: BTreeMap<ItemDefId, Arc<ItemDefinition>>,
}

impl ItemCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a definition, replacing any previous one with the same id.
    pub fn insert(&mut self, definition: ItemDefinition) -> Arc<ItemDefinition> {
        let definition = Arc::new(definition);
        self.definitions
            .insert(definition.id.clone(), Arc::clone(&definition));
        definition
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

impl FromIterator<ItemDefinition> for ItemCatalog {
    fn from_iter<I: IntoIterator<Item = ItemDefinition>>(iter: I) -> Self {
        let mut catalog = ItemCatalog::new();
        for definition in iter {
            catalog.insert(definition);
        }
        catalog
    }
}

impl ItemDefinitions for ItemCatalog {
    fn definition(&self, id: &ItemDefId) -> Option<Arc<ItemDefinition>> {
        self.definitions.get(id).cloned()
    }

    fn all_definitions(&self) -> Vec<Arc<ItemDefinition>> {
        self.definitions.values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limits_compose_to_the_strictest() {
        let limits = [
            StockLimit::Unlimited,
            StockLimit::Limited(10),
            StockLimit::Limited(4),
            StockLimit::Unlimited,
        ];
        assert_eq!(limits.into_iter().collect::<StockLimit>(), StockLimit::Limited(4));
        assert_eq!(
            [StockLimit::Unlimited, StockLimit::Unlimited]
                .into_iter()
                .collect::<StockLimit>(),
            StockLimit::Unlimited
        );
    }

    #[test]
    fn remaining_saturates() {
        assert_eq!(StockLimit::Limited(3).remaining(5), StockLimit::Limited(0));
        assert_eq!(StockLimit::Unlimited.remaining(5), StockLimit::Unlimited);
    }

    #[test]
    fn catalog_lookup() {
        let catalog: ItemCatalog = [ItemDefinition::new("potion", "Potion")]
            .into_iter()
            .collect();
        assert!(catalog.definition(&"potion".into()).is_some());
        assert!(catalog.definition(&"sword".into()).is_none());
        assert_eq!(catalog.all_definitions().len(), 1);
    }
}

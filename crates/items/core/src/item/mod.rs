//! Item definitions, instances and the arena that owns them.
pub mod definition;
pub mod fragment;
pub mod instance;
pub mod store;
pub mod tag_stack;

pub use definition::{
    ItemCatalog, ItemDefId, ItemDefStack, ItemDefinition, ItemDefinitions, ItemSet,
    ItemStockRule, StockLimit,
};
pub use fragment::{
    EconValueFragment, EquipmentFragment, Fragment, FragmentKind, ItemFragment, TagStatsFragment,
};
pub use instance::{ItemId, ItemInstance};
pub use store::ItemStore;
pub use tag_stack::{TagStack, TagStackContainer};

//! Deterministic container/item engine shared by servers, replicas and tools.
//!
//! `items-core` defines stackable item instances, the containers that list
//! them, the rules that bound what a container accepts and the links that
//! relate containers to each other. All mutation flows through
//! [`collection::ContainerCollection`], which owns the items of one owner,
//! routes every call through the client/server execution plan and produces
//! the events and replication deltas the runtime ships around.
pub mod collection;
pub mod command;
pub mod config;
pub mod container;
pub mod equipment;
pub mod error;
pub mod events;
pub mod item;
pub mod replication;
#[cfg(feature = "serde")]
pub mod root;
pub mod rules;
pub mod subsystem;
pub mod tag;

pub use collection::{
    CollectionDelta, CollectionSaveData, CollectionSnapshot, ContainerCollection, ContainerError,
    ContainerGraph, ContainerSaveData, ContainerSpec, ContainerView, GraphError, ItemDelta,
    ItemFields, ItemSaveData, ItemSnapshot, LinkSpec, ReplicationError, SaveError,
};
pub use command::{ContainerCommand, ContainerCommandKind};
pub use config::{ItemSettings, ItemsConfig, ZeroCountPolicy};
pub use container::{
    AddPlan, ContainerDefinition, ItemContainer, ItemList, ItemListEntry, ItemListError,
    SlotLimit,
};
pub use equipment::{
    AlwaysTrue, ConditionEvaluator, ConditionId, Equipment, EquipmentCommand, EquipmentComponent,
    EquipmentDefId, EquipmentDelta, EquipmentError, EquipmentEvent, EquipmentId, EquipmentList,
    EquipmentSpec, ItemEquipmentBridge,
};
pub use error::{ErrorSeverity, ItemsError};
pub use events::{ContainerEvent, ItemEvent, ItemsEvent};
pub use item::{
    EconValueFragment, EquipmentFragment, Fragment, FragmentKind, ItemCatalog, ItemDefId,
    ItemDefStack, ItemDefinition, ItemDefinitions, ItemId, ItemInstance, ItemSet, ItemStockRule,
    ItemStore, StockLimit, TagStack, TagStackContainer, TagStatsFragment,
};
pub use replication::{
    FastArrayDelta, FastArrayItem, FastArrayObserver, NetExecutionPlan, NetExecutionPolicy,
    NetRole, ReplicationId,
};
#[cfg(feature = "serde")]
pub use root::{compute_commands_root, compute_state_root};
pub use rules::{
    AutoSlotLink, AutoSlotRule, ContainerRule, ContainerRulePolicy, ParentLink, RuleContext,
    RuleKind, SelectionLink, StockRuleSimple, StockRuleTags, TagRequirementRule, TagStockLimits,
};
pub use subsystem::ItemSubsystem;
pub use tag::{Tag, TagFilter, TagQuery, TagSet};

//! Container collection: the owner of a set of named containers and every
//! item they list.
//!
//! # Module Organization
//!
//! - [`view`]: read-only container queries that need item data or rules
//! - [`mutation`]: add/remove/stack/swap and item edits, gated by the net plan
//! - [`links`]: link reactions, auto-slotting and selection
//! - [`graph`]: container graph specs and their application
//! - [`save`]: commit/load of persistent save data
//! - [`replication`]: authority snapshots and replica deltas
//!
//! # Ownership
//!
//! Items live in the collection's [`ItemStore`]; containers list item ids.
//! Links name their linked container by id and the collection routes events
//! between siblings, so no container ever holds a reference to another.
//!
//! Every mutation runs inside a scope. Slot changes are batched per container
//! and flushed when the container's outermost scope closes; items that left
//! their last container are destroyed when the collection's outermost scope
//! closes.
pub mod graph;
pub mod links;
pub mod mutation;
pub mod replication;
pub mod save;
pub mod view;

pub use graph::{ContainerGraph, ContainerSpec, GraphError, LinkSpec};
pub use replication::{
    CollectionDelta, CollectionSnapshot, ItemDelta, ItemFields, ItemSnapshot, ReplicationError,
};
pub use save::{CollectionSaveData, ContainerSaveData, ItemSaveData, SaveError};
pub use view::ContainerView;

use std::sync::Arc;

use tracing::{error, trace, warn};

use crate::command::ContainerCommand;
use crate::config::ItemSettings;
use crate::container::{ContainerDefinition, ItemContainer};
use crate::error::{ErrorSeverity, ItemsError};
use crate::events::{ContainerEvent, ItemEvent, ItemsEvent};
use crate::item::{ItemDefId, ItemDefinitions, ItemId, ItemInstance, ItemStore};
use crate::replication::{NetExecutionPlan, NetRole};
use crate::rules::ContainerRulePolicy;
use crate::tag::Tag;

/// Errors raised while managing the containers of a collection.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ContainerError {
    /// No container with this id exists.
    #[error("unknown container {0}")]
    UnknownContainer(Tag),

    /// A container with this id already exists.
    #[error("container {0} already exists")]
    DuplicateContainer(Tag),

    /// Container ids must be valid tags.
    #[error("invalid container id {0:?}")]
    InvalidContainerId(Tag),

    /// No item with this id exists.
    #[error("unknown item {0}")]
    UnknownItem(ItemId),

    /// A command reached a collection without authority.
    #[error("collection of {owner} is not authoritative (role: {role})")]
    NotAuthority {
        /// Owner of the collection.
        owner: String,
        /// Current role.
        role: NetRole,
    },
}

impl ItemsError for ContainerError {
    fn severity(&self) -> ErrorSeverity {
        use ContainerError::*;
        match self {
            UnknownContainer(_) | InvalidContainerId(_) | UnknownItem(_) => {
                ErrorSeverity::Validation
            }
            DuplicateContainer(_) => ErrorSeverity::Recoverable,
            NotAuthority { .. } => ErrorSeverity::Internal,
        }
    }

    fn error_code(&self) -> &'static str {
        use ContainerError::*;
        match self {
            UnknownContainer(_) => "CONTAINER_UNKNOWN",
            DuplicateContainer(_) => "CONTAINER_DUPLICATE",
            InvalidContainerId(_) => "CONTAINER_INVALID_ID",
            UnknownItem(_) => "CONTAINER_UNKNOWN_ITEM",
            NotAuthority { .. } => "CONTAINER_NOT_AUTHORITY",
        }
    }
}

/// Named containers plus the items they hold.
#[derive(Clone)]
pub struct ContainerCollection {
    owner: String,
    settings: ItemSettings,
    definitions: Arc<dyn ItemDefinitions>,
    role: NetRole,
    pub(crate) containers: Vec<ItemContainer>,
    pub(crate) items: ItemStore,
    events: Vec<ItemsEvent>,
    outbox: Vec<ContainerCommand>,
    depth: u32,
    /// Set while a replica applies authority state; link reactions are
    /// skipped because their effects arrive through replication.
    pub(crate) replicating: bool,
}

impl std::fmt::Debug for ContainerCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContainerCollection")
            .field("owner", &self.owner)
            .field("role", &self.role)
            .field("containers", &self.container_ids())
            .field("items", &self.items.len())
            .finish()
    }
}

impl ContainerCollection {
    pub fn new(
        owner: impl Into<String>,
        settings: ItemSettings,
        definitions: Arc<dyn ItemDefinitions>,
    ) -> Self {
        Self {
            owner: owner.into(),
            settings,
            definitions,
            role: NetRole::Authority,
            containers: Vec::new(),
            items: ItemStore::new(),
            events: Vec::new(),
            outbox: Vec::new(),
            depth: 0,
            replicating: false,
        }
    }

    #[must_use]
    pub fn with_role(mut self, role: NetRole) -> Self {
        self.role = role;
        self
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn settings(&self) -> &ItemSettings {
        &self.settings
    }

    pub fn definitions(&self) -> &Arc<dyn ItemDefinitions> {
        &self.definitions
    }

    pub fn role(&self) -> NetRole {
        self.role
    }

    /// Roles may change at any time; execution plans are computed per call.
    pub fn set_role(&mut self, role: NetRole) {
        self.role = role;
    }

    // ------------------------------------------------------------------
    // Containers
    // ------------------------------------------------------------------

    /// Creates a container from `def`. Link rules carried by the definition
    /// are resolved against the containers already present.
    pub fn add_container(
        &mut self,
        id: impl Into<Tag>,
        def: Arc<ContainerDefinition>,
    ) -> Result<&ItemContainer, ContainerError> {
        let id = id.into();
        if !id.is_valid() {
            return Err(ContainerError::InvalidContainerId(id));
        }
        if self.container(&id).is_some() {
            return Err(ContainerError::DuplicateContainer(id));
        }
        trace!(owner = %self.owner, container = %id, "adding container");
        self.containers.push(ItemContainer::new(id.clone(), def));
        self.refresh_children();
        self.update_all_selections(&id);
        self.container(&id)
            .ok_or(ContainerError::UnknownContainer(id))
    }

    /// Removes a container. Its items are removed first so that links react.
    pub fn remove_container(&mut self, id: &Tag) -> Result<ItemContainer, ContainerError> {
        if self.container(id).is_none() {
            return Err(ContainerError::UnknownContainer(id.clone()));
        }
        self.execute_remove_all_items(id);
        let index = self
            .containers
            .iter()
            .position(|c| c.id() == id)
            .ok_or_else(|| ContainerError::UnknownContainer(id.clone()))?;
        let container = self.containers.remove(index);
        self.refresh_children();
        Ok(container)
    }

    pub fn container(&self, id: &Tag) -> Option<&ItemContainer> {
        self.containers.iter().find(|c| c.id() == id)
    }

    pub(crate) fn container_mut(&mut self, id: &Tag) -> Option<&mut ItemContainer> {
        self.containers.iter_mut().find(|c| c.id() == id)
    }

    /// Container plus the collection context needed for item and rule queries.
    pub fn view(&self, id: &Tag) -> Option<ContainerView<'_>> {
        self.container(id)
            .map(|container| ContainerView::new(self, container))
    }

    pub fn containers(&self) -> impl Iterator<Item = &ItemContainer> {
        self.containers.iter()
    }

    pub fn container_ids(&self) -> Vec<Tag> {
        self.containers.iter().map(|c| c.id().clone()).collect()
    }

    /// Container named by [`ItemSettings::default_container_id`].
    pub fn default_container(&self) -> Option<&ItemContainer> {
        let id = self.settings.default_container_id()?;
        let container = self.container(id);
        if container.is_none() {
            warn!(owner = %self.owner, container = %id, "default container not found");
        }
        container
    }

    /// Containers whose child links point at `parent`.
    pub fn children_of(&self, parent: &Tag) -> Vec<Tag> {
        self.container(parent)
            .map(|c| c.children().to_vec())
            .unwrap_or_default()
    }

    /// Rebuilds every container's child registry from the current links.
    pub(crate) fn refresh_children(&mut self) {
        let links: Vec<(Tag, Tag)> = self
            .containers
            .iter()
            .flat_map(|child| {
                child
                    .rules()
                    .iter()
                    .filter(|rule| rule.is_link())
                    .filter(|rule| rule.is_child())
                    .filter_map(|rule| rule.linked_container().cloned())
                    .map(|parent| (parent, child.id().clone()))
                    .collect::<Vec<_>>()
            })
            .collect();

        for container in &mut self.containers {
            let stale: Vec<Tag> = container
                .children()
                .iter()
                .filter(|child| !links.iter().any(|(p, c)| p == container.id() && c == *child))
                .cloned()
                .collect();
            for child in stale {
                container.unregister_child(&child);
            }
        }
        for (parent, child) in links {
            match self.container_mut(&parent) {
                Some(container) => container.register_child(&child),
                None => trace!(container = %child, parent = %parent, "parent not present yet"),
            }
        }
    }

    // ------------------------------------------------------------------
    // Items
    // ------------------------------------------------------------------

    pub fn item(&self, id: ItemId) -> Option<&ItemInstance> {
        self.items.get(id)
    }

    pub fn items(&self) -> &ItemStore {
        &self.items
    }

    /// Sum of matching counts across all non-child containers.
    pub fn total_matching_item_count(&self, item: &ItemInstance) -> u32 {
        self.containers
            .iter()
            .filter(|c| !c.is_child())
            .filter_map(|c| self.view(c.id()))
            .map(|view| view.total_matching_item_count(item))
            .sum()
    }

    /// Sum of counts of `def` across all non-child containers.
    pub fn total_matching_item_count_by_def(&self, def: &ItemDefId) -> u32 {
        self.containers
            .iter()
            .filter(|c| !c.is_child())
            .filter_map(|c| self.view(c.id()))
            .map(|view| view.total_item_count_by_def(def))
            .sum()
    }

    // ------------------------------------------------------------------
    // Events and outbox
    // ------------------------------------------------------------------

    /// Drains queued events in firing order.
    pub fn take_events(&mut self) -> Vec<ItemsEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn pending_events(&self) -> &[ItemsEvent] {
        &self.events
    }

    /// Drains commands that must run on the authority.
    pub fn take_outbox(&mut self) -> Vec<ContainerCommand> {
        std::mem::take(&mut self.outbox)
    }

    pub(crate) fn emit(&mut self, event: ContainerEvent) {
        self.events.push(event.clone().into());
        if !self.replicating {
            self.dispatch_links(&event);
        }
    }

    pub(crate) fn emit_item(&mut self, event: Option<ItemEvent>) {
        if let Some(event) = event {
            self.events.push(event.into());
        }
    }

    /// Decides where a container mutation runs and queues the server request.
    ///
    /// Returns whether the caller should execute the mutation locally.
    pub(crate) fn route(
        &mut self,
        container: &Tag,
        command: impl FnOnce() -> ContainerCommand,
    ) -> bool {
        let Some(policy) = self.container(container).map(ItemContainer::net_policy) else {
            warn!(owner = %self.owner, container = %container, "unknown container");
            return false;
        };
        let plan = NetExecutionPlan::for_container(self.role, policy);
        if plan.execute_on_server {
            let command = command();
            trace!(owner = %self.owner, ?command, "forwarding to server");
            self.outbox.push(command);
        }
        plan.execute_locally
    }

    /// Like [`Self::route`] for edits of an item rather than a container.
    pub(crate) fn route_item(&mut self, command: impl FnOnce() -> ContainerCommand) -> bool {
        let plan = NetExecutionPlan::for_role(self.role);
        if plan.execute_on_server {
            self.outbox.push(command());
        }
        plan.execute_locally
    }

    // ------------------------------------------------------------------
    // Scopes
    // ------------------------------------------------------------------

    pub(crate) fn begin_scope(&mut self, container: &Tag) {
        self.depth += 1;
        if let Some(c) = self.container_mut(container) {
            let num_slots = c.num_slots();
            c.slot_changes.begin(num_slots);
        }
    }

    pub(crate) fn end_scope(&mut self, container: &Tag) {
        let events = match self.container_mut(container) {
            Some(c) if c.slot_changes.is_active() => {
                let num_slots = c.num_slots();
                let id = c.id().clone();
                c.slot_changes.end(&id, num_slots)
            }
            _ => Vec::new(),
        };
        for event in events {
            self.emit(event);
        }
        self.release_depth();
    }

    fn release_depth(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        if self.depth == 0 {
            for id in self.items.prune_detached() {
                trace!(owner = %self.owner, item = %id, "destroyed detached item");
            }
        }
    }

    /// Runs `f` with detached items kept alive until it returns, so an item
    /// can leave one container and enter another across several operations.
    pub(crate) fn batch<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.depth += 1;
        let result = f(self);
        self.release_depth();
        result
    }

    /// Runs `f` inside a mutation scope of `container`.
    pub(crate) fn scoped<R>(&mut self, container: &Tag, f: impl FnOnce(&mut Self) -> R) -> R {
        self.begin_scope(container);
        let result = f(self);
        self.end_scope(container);
        result
    }

    pub(crate) fn mark_slot(&mut self, container: &Tag, slot: usize) {
        if let Some(c) = self.container_mut(container) {
            c.slot_changes.mark(slot);
        }
    }

    pub(crate) fn mark_slot_range(&mut self, container: &Tag, start: usize, end: usize) {
        if let Some(c) = self.container_mut(container) {
            c.slot_changes.mark_range(start, end);
        }
    }

    /// Reports a mutation attempted where the role guarantees authority.
    pub(crate) fn authority_violation(&self, operation: &str) {
        error!(owner = %self.owner, role = %self.role, operation, "mutation requires authority");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::ContainerDefinition;
    use crate::item::{ItemCatalog, ItemDefinition};
    use crate::rules::ParentLink;

    fn collection() -> ContainerCollection {
        let catalog: ItemCatalog = [ItemDefinition::new("apple", "Apple")].into_iter().collect();
        ContainerCollection::new("player", ItemSettings::new(), Arc::new(catalog))
    }

    #[test]
    fn duplicate_and_invalid_ids_are_rejected() {
        let mut items = collection();
        let def = Arc::new(ContainerDefinition::new("bag"));
        items.add_container("Container.Bag", Arc::clone(&def)).unwrap();

        assert_eq!(
            items.add_container("Container.Bag", Arc::clone(&def)).unwrap_err(),
            ContainerError::DuplicateContainer(Tag::from("Container.Bag"))
        );
        assert!(matches!(
            items.add_container("", def),
            Err(ContainerError::InvalidContainerId(_))
        ));
    }

    #[test]
    fn children_register_regardless_of_creation_order() {
        let mut items = collection();
        let quickbar = ContainerDefinition::new("quickbar").with_rule(ParentLink {
            linked_container: Some(Tag::from("Container.Inventory")),
        });
        items.add_container("Container.Quickbar", Arc::new(quickbar)).unwrap();
        items
            .add_container("Container.Inventory", Arc::new(ContainerDefinition::new("inv")))
            .unwrap();

        assert_eq!(
            items.children_of(&Tag::from("Container.Inventory")),
            vec![Tag::from("Container.Quickbar")]
        );

        items.remove_container(&Tag::from("Container.Quickbar")).unwrap();
        assert!(items.children_of(&Tag::from("Container.Inventory")).is_empty());
    }
}

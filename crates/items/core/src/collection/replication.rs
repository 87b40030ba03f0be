//! Authority snapshots and replica deltas.
//!
//! The authority keeps one [`CollectionSnapshot`] per replica as the baseline
//! it last sent. [`ContainerCollection::delta_since`] diffs the live state
//! against that baseline; the replica applies the result with
//! [`ContainerCollection::apply_delta`].
//!
//! A delta is applied in a fixed order: item state first (so every listed id
//! resolves), then container lists, then selections, then destroyed items.

use std::collections::BTreeMap;

use bitflags::bitflags;
use tracing::{debug, trace, warn};

use crate::container::ItemListEntry;
use crate::error::{ErrorSeverity, ItemsError};
use crate::events::ItemEvent;
use crate::item::{ItemDefId, ItemId, ItemInstance, TagStack};
use crate::replication::{FastArrayDelta, FastArrayObserver, diff_fast_array};
use crate::rules::ContainerRule;
use crate::tag::Tag;

use super::ContainerCollection;

bitflags! {
    /// Which fields of an item an [`ItemDelta`] carries.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct ItemFields: u8 {
        /// Set only for items the replica has not seen yet.
        const DEF       = 1 << 0;
        const COUNT     = 1 << 1;
        const TAG_STATS = 1 << 2;
    }
}

#[derive(Clone, Debug, thiserror::Error)]
pub enum ReplicationError {
    /// Deltas flow from the authority, never into it.
    #[error("collection of {owner} is authoritative and cannot apply deltas")]
    AuthorityTarget { owner: String },
}

impl ItemsError for ReplicationError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Internal
    }

    fn error_code(&self) -> &'static str {
        match self {
            ReplicationError::AuthorityTarget { .. } => "REPLICATION_AUTHORITY_TARGET",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ItemSnapshot {
    pub id: ItemId,
    pub def: ItemDefId,
    pub count: u32,
    pub tag_stats: Vec<TagStack>,
}

impl ItemSnapshot {
    fn capture(item: &ItemInstance) -> Self {
        Self {
            id: item.id(),
            def: item.def_id().clone(),
            count: item.count(),
            tag_stats: item.tag_stats().stacks().to_vec(),
        }
    }
}

/// Replicated state of a collection at one point in time.
///
/// List entries are captured without their replica-side `last_known_slot`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CollectionSnapshot {
    pub lists: BTreeMap<Tag, Vec<ItemListEntry>>,
    pub items: BTreeMap<ItemId, ItemSnapshot>,
    pub selections: BTreeMap<Tag, usize>,
}

impl CollectionSnapshot {
    /// Changes that turn `baseline` into `self`.
    pub fn diff(&self, baseline: &CollectionSnapshot) -> CollectionDelta {
        let mut delta = CollectionDelta::default();

        for (id, item) in &self.items {
            match baseline.items.get(id) {
                None => delta.items.push(ItemDelta {
                    id: *id,
                    fields: ItemFields::all(),
                    def: Some(item.def.clone()),
                    count: item.count,
                    tag_stats: diff_fast_array(&[], &item.tag_stats),
                }),
                Some(before) => {
                    let mut fields = ItemFields::empty();
                    if before.count != item.count {
                        fields |= ItemFields::COUNT;
                    }
                    let tag_stats =
                        diff_fast_array(&before.tag_stats, &item.tag_stats);
                    if !tag_stats.is_empty() {
                        fields |= ItemFields::TAG_STATS;
                    }
                    if !fields.is_empty() {
                        delta.items.push(ItemDelta {
                            id: *id,
                            fields,
                            def: None,
                            count: item.count,
                            tag_stats,
                        });
                    }
                }
            }
        }
        delta.destroyed = baseline
            .items
            .keys()
            .filter(|id| !self.items.contains_key(id))
            .copied()
            .collect();

        for (container, entries) in &self.lists {
            let before = baseline.lists.get(container).map(Vec::as_slice).unwrap_or(&[]);
            let list = diff_fast_array(before, entries);
            if !list.is_empty() {
                delta.lists.push((container.clone(), list));
            }
        }

        delta.selections = self
            .selections
            .iter()
            .filter(|(container, slot)| baseline.selections.get(*container) != Some(*slot))
            .map(|(container, slot)| (container.clone(), *slot))
            .collect();
        delta
    }
}

/// Changes to one item.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ItemDelta {
    pub id: ItemId,
    pub fields: ItemFields,
    /// Present when `fields` contains [`ItemFields::DEF`].
    pub def: Option<ItemDefId>,
    pub count: u32,
    pub tag_stats: FastArrayDelta<TagStack>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CollectionDelta {
    pub items: Vec<ItemDelta>,
    pub lists: Vec<(Tag, FastArrayDelta<ItemListEntry>)>,
    pub selections: Vec<(Tag, usize)>,
    /// Items the authority destroyed.
    pub destroyed: Vec<ItemId>,
}

impl CollectionDelta {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
            && self.lists.is_empty()
            && self.selections.is_empty()
            && self.destroyed.is_empty()
    }
}

/// Records list changes while a replica list applies a delta.
#[derive(Default)]
struct ListChanges {
    removed: Vec<(ItemId, usize)>,
    added: Vec<(ItemId, usize)>,
    moved: Vec<(ItemId, Option<usize>, usize)>,
}

impl FastArrayObserver<ItemListEntry> for ListChanges {
    fn pre_replicated_remove(&mut self, indices: &[usize], items: &[ItemListEntry]) {
        self.removed
            .extend(indices.iter().map(|&i| (items[i].item, items[i].slot)));
    }

    fn post_replicated_add(&mut self, indices: &[usize], items: &[ItemListEntry]) {
        self.added
            .extend(indices.iter().map(|&i| (items[i].item, items[i].slot)));
    }

    fn post_replicated_change(&mut self, indices: &[usize], items: &[ItemListEntry]) {
        self.moved.extend(
            indices
                .iter()
                .map(|&i| (items[i].item, items[i].last_known_slot, items[i].slot)),
        );
    }
}

impl ContainerCollection {
    pub fn snapshot(&self) -> CollectionSnapshot {
        let lists = self
            .containers()
            .map(|c| {
                let entries = c
                    .list()
                    .entries()
                    .iter()
                    .map(|entry| ItemListEntry {
                        last_known_slot: None,
                        ..entry.clone()
                    })
                    .collect();
                (c.id().clone(), entries)
            })
            .collect();
        let items = self
            .items()
            .iter()
            .map(|item| (item.id(), ItemSnapshot::capture(item)))
            .collect();
        let selections = self
            .containers()
            .filter_map(|c| {
                c.rules()
                    .iter()
                    .find_map(ContainerRule::as_selection)
                    .map(|link| (c.id().clone(), link.selected_slot))
            })
            .collect();
        CollectionSnapshot {
            lists,
            items,
            selections,
        }
    }

    /// Changes since `baseline`, as last acknowledged by a replica.
    pub fn delta_since(&self, baseline: &CollectionSnapshot) -> CollectionDelta {
        self.snapshot().diff(baseline)
    }

    /// Applies authority state to this replica.
    ///
    /// Link reactions are suppressed while the delta applies; everything the
    /// authority's links did arrives in the same delta.
    pub fn apply_delta(&mut self, delta: CollectionDelta) -> Result<(), ReplicationError> {
        if self.role().has_authority() {
            return Err(ReplicationError::AuthorityTarget {
                owner: self.owner().to_string(),
            });
        }
        if delta.is_empty() {
            return Ok(());
        }

        self.replicating = true;
        self.batch(|collection| {
            for item in delta.items {
                collection.apply_item_delta(item);
            }
            for (container, list) in delta.lists {
                collection.apply_list_delta(&container, list);
            }
            for (container, slot) in delta.selections {
                if let Some(link) = collection
                    .container_mut(&container)
                    .and_then(|c| c.rules.iter_mut().find_map(ContainerRule::as_selection_mut))
                {
                    link.selected_slot = slot;
                }
            }
            for id in delta.destroyed {
                collection.items.mark_detached(id);
            }
        });
        self.replicating = false;
        Ok(())
    }

    fn apply_item_delta(&mut self, delta: ItemDelta) {
        if delta.fields.contains(ItemFields::DEF) && !self.items.contains(delta.id) {
            let Some(def) = delta
                .def
                .as_ref()
                .and_then(|def| self.definitions().definition(def))
            else {
                warn!(owner = %self.owner(), item = %delta.id, def = ?delta.def, "replicated item has unknown definition");
                return;
            };
            debug!(owner = %self.owner(), item = %delta.id, "replicated new item");
            self.items.insert(ItemInstance::new(delta.id, def, delta.count));
        }

        let Some(item) = self.items.get_mut(delta.id) else {
            warn!(owner = %self.owner(), item = %delta.id, "delta for unknown item");
            return;
        };
        let mut events = Vec::new();
        if delta.fields.contains(ItemFields::COUNT) {
            events.extend(item.set_count(delta.count));
        }
        if delta.fields.contains(ItemFields::TAG_STATS) {
            for (tag, new, old) in item.tag_stats_mut().apply_delta(delta.tag_stats) {
                events.push(ItemEvent::TagStatChanged {
                    item: delta.id,
                    tag,
                    new,
                    old,
                });
            }
        }
        for event in events {
            self.emit_item(Some(event));
        }
    }

    fn apply_list_delta(&mut self, container: &Tag, delta: FastArrayDelta<ItemListEntry>) {
        let mut changes = ListChanges::default();
        match self.container_mut(container) {
            Some(c) => c.list.apply_delta(delta, &mut changes),
            None => {
                warn!(owner = %self.owner(), container = %container, "delta for unknown container");
                return;
            }
        }

        self.scoped(container, |collection| {
            for (item, slot) in changes.removed {
                collection.mark_slot(container, slot);
                collection.on_item_removed(container, item, slot);
            }
            for (item, slot) in changes.added {
                collection.mark_slot(container, slot);
                collection.on_item_added(container, item, slot);
            }
            for (item, old_slot, new_slot) in changes.moved {
                if old_slot == Some(new_slot) {
                    continue;
                }
                if let Some(old) = old_slot {
                    collection.mark_slot(container, old);
                }
                collection.mark_slot(container, new_slot);
                collection.emit_item(Some(ItemEvent::Slotted {
                    item,
                    container: container.clone(),
                    new_slot,
                    old_slot,
                }));
            }
        });
        trace!(owner = %self.owner(), container = %container, "applied list delta");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::ItemSettings;
    use crate::container::ContainerDefinition;
    use crate::events::{ContainerEvent, ItemsEvent};
    use crate::item::{ItemCatalog, ItemDefinition};
    use crate::replication::NetRole;

    fn collection(role: NetRole) -> ContainerCollection {
        let catalog: ItemCatalog = [
            ItemDefinition::new("potion", "Potion"),
            ItemDefinition::new("sword", "Sword"),
        ]
        .into_iter()
        .collect();
        let mut items = ContainerCollection::new("player", ItemSettings::new(), Arc::new(catalog))
            .with_role(role);
        items
            .add_container(
                "Container.Inventory",
                Arc::new(ContainerDefinition::new("inventory").with_slot_limit(6)),
            )
            .unwrap();
        items
    }

    fn inventory() -> Tag {
        Tag::from("Container.Inventory")
    }

    #[test]
    fn replica_converges_on_authority_state() {
        let mut server = collection(NetRole::Authority);
        let mut client = collection(NetRole::AutonomousProxy);

        let potion = server.create_item(&"potion".into(), 3).unwrap();
        server.add_item(&inventory(), potion, Some(2));
        server.add_tag_stat(potion, &Tag::from("Stat.Potency"), 4);

        let baseline = CollectionSnapshot::default();
        client.apply_delta(server.delta_since(&baseline)).unwrap();

        let replicated = client.item(potion).unwrap();
        assert_eq!(replicated.count(), 3);
        assert_eq!(replicated.tag_stat(&Tag::from("Stat.Potency")), 4);
        assert_eq!(client.container(&inventory()).unwrap().item_at(2), Some(potion));
        assert_eq!(client.snapshot(), server.snapshot());
    }

    #[test]
    fn only_changed_fields_are_sent() {
        let mut server = collection(NetRole::Authority);
        let potion = server.create_item(&"potion".into(), 3).unwrap();
        server.add_item(&inventory(), potion, None);
        let baseline = server.snapshot();

        server.set_item_count(potion, 5);
        let delta = server.delta_since(&baseline);

        assert!(delta.lists.is_empty());
        assert_eq!(delta.items.len(), 1);
        assert_eq!(delta.items[0].fields, ItemFields::COUNT);
        assert!(server.delta_since(&server.snapshot()).is_empty());
    }

    #[test]
    fn replica_fires_add_remove_and_slot_events() {
        let mut server = collection(NetRole::Authority);
        let mut client = collection(NetRole::SimulatedProxy);
        let sword = server.create_item(&"sword".into(), 1).unwrap();
        server.add_item(&inventory(), sword, Some(0));
        client.apply_delta(server.delta_since(&CollectionSnapshot::default())).unwrap();
        let baseline = server.snapshot();

        let added = client.take_events();
        assert!(added.contains(&ItemsEvent::Container(ContainerEvent::ItemAdded {
            container: inventory(),
            item: sword,
            slot: 0,
        })));

        server.swap_items(&inventory(), 0, 4);
        client.apply_delta(server.delta_since(&baseline)).unwrap();
        assert!(client.take_events().contains(&ItemsEvent::Item(ItemEvent::Slotted {
            item: sword,
            container: inventory(),
            new_slot: 4,
            old_slot: Some(0),
        })));
        let baseline = server.snapshot();

        server.remove_item(&inventory(), sword);
        client.apply_delta(server.delta_since(&baseline)).unwrap();
        let events = client.take_events();
        assert!(events.contains(&ItemsEvent::Container(ContainerEvent::ItemRemoved {
            container: inventory(),
            item: sword,
            slot: 4,
        })));
        assert!(client.item(sword).is_none());
        assert!(client.container(&inventory()).unwrap().is_empty());
    }

    #[test]
    fn authority_rejects_deltas() {
        let mut server = collection(NetRole::Authority);
        assert!(matches!(
            server.apply_delta(CollectionDelta::default()),
            Err(ReplicationError::AuthorityTarget { .. })
        ));
    }
}

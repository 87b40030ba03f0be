//! Persistent save data.
//!
//! Containers are committed parents first so that loading a child can resolve
//! the items its parent already restored. Items are keyed by a guid that is
//! stable within one save; a child only re-lists items whose guid its parent
//! loaded.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, warn};

use crate::container::ItemContainer;
use crate::error::{ErrorSeverity, ItemsError};
use crate::item::{ItemDefId, ItemId};
use crate::replication::NetRole;
use crate::rules::ContainerRulePolicy;
use crate::tag::Tag;

use super::ContainerCollection;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SaveError {
    /// Only the authority restores saved state.
    #[error("cannot load save data as {role}")]
    NotAuthority { role: NetRole },

    /// Two items in the save share a guid.
    #[error("duplicate item guid {guid} in container {container}")]
    DuplicateGuid { guid: u64, container: Tag },
}

impl ItemsError for SaveError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            SaveError::NotAuthority { .. } => ErrorSeverity::Internal,
            SaveError::DuplicateGuid { .. } => ErrorSeverity::Validation,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            SaveError::NotAuthority { .. } => "SAVE_NOT_AUTHORITY",
            SaveError::DuplicateGuid { .. } => "SAVE_DUPLICATE_GUID",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ItemSaveData {
    pub guid: u64,
    /// `None` when the definition could not be resolved at commit time.
    pub def: Option<ItemDefId>,
    pub count: u32,
    pub tag_stats: Vec<(Tag, i32)>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ContainerSaveData {
    /// Slot to item.
    pub items: BTreeMap<usize, ItemSaveData>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CollectionSaveData {
    /// Parents precede their children.
    pub containers: Vec<(Tag, ContainerSaveData)>,
}

impl CollectionSaveData {
    pub fn container(&self, id: &Tag) -> Option<&ContainerSaveData> {
        self.containers
            .iter()
            .find(|(container, _)| container == id)
            .map(|(_, data)| data)
    }

    pub fn item_count(&self) -> usize {
        self.containers.iter().map(|(_, data)| data.items.len()).sum()
    }
}

impl ContainerCollection {
    /// Container ids ordered so that every parent precedes its children.
    pub fn containers_in_save_order(&self) -> Vec<Tag> {
        let mut ordered: Vec<Tag> = Vec::new();
        let mut pending: Vec<&ItemContainer> = self.containers().collect();
        while !pending.is_empty() {
            let (ready, waiting): (Vec<_>, Vec<_>) = pending.into_iter().partition(|c| {
                c.rules()
                    .iter()
                    .filter(|rule| rule.is_child())
                    .filter_map(|rule| rule.linked_container())
                    .all(|parent| ordered.contains(parent) || self.container(parent).is_none())
            });
            if ready.is_empty() {
                // Cyclic links; keep declaration order for the rest.
                ordered.extend(waiting.iter().map(|c| c.id().clone()));
                break;
            }
            ordered.extend(ready.iter().map(|c| c.id().clone()));
            pending = waiting;
        }
        ordered
    }

    pub fn commit_save_data(&self) -> CollectionSaveData {
        let containers = self
            .containers_in_save_order()
            .into_iter()
            .filter_map(|id| {
                let container = self.container(&id)?;
                let items = container
                    .list()
                    .slot_items()
                    .into_iter()
                    .filter_map(|(slot, item)| {
                        let instance = self.item(item)?;
                        Some((
                            slot,
                            ItemSaveData {
                                guid: item.0,
                                def: Some(instance.def_id().clone()),
                                count: instance.count(),
                                tag_stats: instance
                                    .tag_stats()
                                    .iter()
                                    .map(|(tag, count)| (tag.clone(), count))
                                    .collect(),
                            },
                        ))
                    })
                    .collect();
                Some((id, ContainerSaveData { items }))
            })
            .collect();
        CollectionSaveData { containers }
    }

    /// Replaces the contents of every saved container with the saved items.
    ///
    /// Returns the number of items restored. Unknown containers and
    /// definitions are skipped with a warning.
    pub fn load_save_data(&mut self, data: &CollectionSaveData) -> Result<usize, SaveError> {
        if !self.role().has_authority() {
            return Err(SaveError::NotAuthority { role: self.role() });
        }

        let mut guid_map: HashMap<u64, ItemId> = HashMap::new();
        let mut restored = 0;

        for (id, saved) in &data.containers {
            let Some(container) = self.container(id) else {
                warn!(container = %id, "saved container does not exist");
                continue;
            };
            let is_child = container.is_child();
            self.execute_remove_all_items(id);
            if let Some(container) = self.container_mut(id) {
                container.has_default_items = true;
            }

            for (&slot, item) in &saved.items {
                if is_child {
                    match guid_map.get(&item.guid) {
                        Some(&existing) => {
                            self.execute_add_item(id, existing, Some(slot));
                        }
                        None => debug!(container = %id, guid = item.guid, "parent did not load item"),
                    }
                    continue;
                }

                if guid_map.contains_key(&item.guid) {
                    return Err(SaveError::DuplicateGuid {
                        guid: item.guid,
                        container: id.clone(),
                    });
                }
                let Some(def) = item.def.as_ref().and_then(|def| self.definitions().definition(def)) else {
                    warn!(container = %id, guid = item.guid, def = ?item.def, "skipping item with unknown definition");
                    continue;
                };

                let new_id = self.items.restore(def, item.count);
                if let Some(instance) = self.items.get_mut(new_id) {
                    for (tag, count) in &item.tag_stats {
                        instance.tag_stats_mut().add_stack(tag, *count);
                    }
                }
                if self.execute_add_item(id, new_id, Some(slot)).contains(&new_id) {
                    guid_map.insert(item.guid, new_id);
                    restored += 1;
                } else {
                    warn!(container = %id, guid = item.guid, slot, "saved item no longer fits");
                    self.discard_item(new_id);
                }
            }
        }
        Ok(restored)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::ItemSettings;
    use crate::container::ContainerDefinition;
    use crate::item::{ItemCatalog, ItemDefinition};
    use crate::rules::ParentLink;

    fn collection() -> ContainerCollection {
        let catalog: ItemCatalog = [
            ItemDefinition::new("potion", "Potion"),
            ItemDefinition::new("sword", "Sword"),
        ]
        .into_iter()
        .collect();
        let mut items = ContainerCollection::new("player", ItemSettings::new(), Arc::new(catalog));
        // Child first to exercise save ordering.
        items
            .add_container(
                "Container.Quickbar",
                Arc::new(
                    ContainerDefinition::new("quickbar")
                        .with_slot_limit(4)
                        .with_rule(ParentLink {
                            linked_container: Some(Tag::from("Container.Inventory")),
                        }),
                ),
            )
            .unwrap();
        items
            .add_container(
                "Container.Inventory",
                Arc::new(ContainerDefinition::new("inventory").with_slot_limit(8)),
            )
            .unwrap();
        items
    }

    #[test]
    fn parents_are_saved_before_children() {
        let items = collection();
        assert_eq!(
            items.containers_in_save_order(),
            vec![Tag::from("Container.Inventory"), Tag::from("Container.Quickbar")]
        );
    }

    #[test]
    fn save_load_restores_slots_and_child_views() {
        let inventory = Tag::from("Container.Inventory");
        let quickbar = Tag::from("Container.Quickbar");
        let mut items = collection();
        let potion = items.create_item(&"potion".into(), 5).unwrap();
        items.add_item(&inventory, potion, Some(3));
        items.add_tag_stat(potion, &Tag::from("Stat.Potency"), 2);
        items.add_item(&quickbar, potion, Some(1));
        let save = items.commit_save_data();

        let mut loaded = collection();
        assert_eq!(loaded.load_save_data(&save), Ok(1));

        let restored = loaded.container(&inventory).unwrap().item_at(3).unwrap();
        let instance = loaded.item(restored).unwrap();
        assert_eq!(instance.count(), 5);
        assert_eq!(instance.tag_stat(&Tag::from("Stat.Potency")), 2);
        assert_eq!(loaded.container(&quickbar).unwrap().item_at(1), Some(restored));
        assert_eq!(loaded.commit_save_data().item_count(), save.item_count());
    }

    #[test]
    fn unknown_definitions_are_skipped() {
        let inventory = Tag::from("Container.Inventory");
        let mut save = CollectionSaveData::default();
        let mut data = ContainerSaveData::default();
        data.items.insert(
            0,
            ItemSaveData {
                guid: 7,
                def: Some("relic".into()),
                count: 1,
                tag_stats: Vec::new(),
            },
        );
        data.items.insert(
            1,
            ItemSaveData {
                guid: 8,
                def: None,
                count: 1,
                tag_stats: Vec::new(),
            },
        );
        save.containers.push((inventory.clone(), data));

        let mut items = collection();
        assert_eq!(items.load_save_data(&save), Ok(0));
        assert!(items.container(&inventory).unwrap().is_empty());
    }

    #[test]
    fn replicas_cannot_load() {
        let mut items = collection().with_role(NetRole::SimulatedProxy);
        assert_eq!(
            items.load_save_data(&CollectionSaveData::default()),
            Err(SaveError::NotAuthority {
                role: NetRole::SimulatedProxy
            })
        );
    }
}

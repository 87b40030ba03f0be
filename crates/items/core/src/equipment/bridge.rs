//! Applies equipment for items that carry an equipment fragment.
//!
//! The bridge consumes the events a [`ContainerCollection`] queued and keeps
//! the owner's [`EquipmentComponent`] in step: an item entering the collection
//! grants its equipment (once its condition holds), a conditional item is
//! re-checked whenever it is slotted or unslotted, and an item leaving the
//! collection removes its equipment by definition.
//!
//! Items must map to distinct equipment definitions; nothing else links a
//! piece of equipment back to its item.

use std::collections::HashMap;

use tracing::{debug, trace};

use crate::collection::ContainerCollection;
use crate::events::{ContainerEvent, ItemEvent, ItemsEvent};
use crate::item::{EquipmentFragment, FragmentKind, ItemId, ItemInstance};

use super::component::EquipmentComponent;
use super::list::EquipmentSpec;
use super::{ConditionId, EquipmentDefId};

/// Boolean oracle for equipment conditions.
pub trait ConditionEvaluator: Send + Sync {
    fn evaluate(
        &self,
        condition: &ConditionId,
        item: &ItemInstance,
        collection: &ContainerCollection,
    ) -> bool;
}

/// Evaluator that accepts every condition.
#[derive(Clone, Copy, Debug, Default)]
pub struct AlwaysTrue;

impl ConditionEvaluator for AlwaysTrue {
    fn evaluate(&self, _: &ConditionId, _: &ItemInstance, _: &ContainerCollection) -> bool {
        true
    }
}

#[derive(Clone, Debug)]
struct TrackedItem {
    fragment: EquipmentFragment,
    applied: Option<EquipmentDefId>,
}

#[derive(Clone, Debug, Default)]
pub struct ItemEquipmentBridge {
    tracked: HashMap<ItemId, TrackedItem>,
}

impl ItemEquipmentBridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_tracking(&self, item: ItemId) -> bool {
        self.tracked.contains_key(&item)
    }

    /// Equipment definition currently applied for `item`.
    pub fn applied_equipment(&self, item: ItemId) -> Option<&EquipmentDefId> {
        self.tracked.get(&item)?.applied.as_ref()
    }

    /// Starts tracking every item already listed in `collection`.
    pub fn register(
        &mut self,
        collection: &ContainerCollection,
        equipment: &mut EquipmentComponent,
        conditions: &dyn ConditionEvaluator,
    ) {
        let listed: Vec<ItemId> = collection
            .containers()
            .flat_map(|c| c.all_items())
            .collect();
        for item in listed {
            self.on_item_added(collection, item, equipment, conditions);
        }
    }

    /// Removes the equipment of every tracked item and stops tracking.
    pub fn unregister(&mut self, equipment: &mut EquipmentComponent) {
        let tracked: Vec<ItemId> = self.tracked.keys().copied().collect();
        for item in tracked {
            self.on_item_removed(item, equipment);
        }
    }

    /// Reacts to events drained from `collection` after an operation.
    pub fn handle_events(
        &mut self,
        collection: &ContainerCollection,
        events: &[ItemsEvent],
        equipment: &mut EquipmentComponent,
        conditions: &dyn ConditionEvaluator,
    ) {
        for event in events {
            match event {
                ItemsEvent::Container(ContainerEvent::ItemAdded { item, .. }) => {
                    self.on_item_added(collection, *item, equipment, conditions);
                }
                ItemsEvent::Container(ContainerEvent::ItemRemoved { item, .. }) => {
                    let still_listed = collection
                        .item(*item)
                        .is_some_and(|instance| !instance.containers().is_empty());
                    if !still_listed {
                        self.on_item_removed(*item, equipment);
                    }
                }
                ItemsEvent::Item(ItemEvent::Slotted { item, .. } | ItemEvent::Unslotted { item, .. }) => {
                    self.check_condition(collection, *item, equipment, conditions);
                }
                _ => {}
            }
        }
    }

    fn on_item_added(
        &mut self,
        collection: &ContainerCollection,
        item: ItemId,
        equipment: &mut EquipmentComponent,
        conditions: &dyn ConditionEvaluator,
    ) {
        if self.tracked.contains_key(&item) {
            return;
        }
        let Some(fragment) = collection
            .item(item)
            .and_then(|instance| instance.def().find_fragment(FragmentKind::Equipment))
            .and_then(|fragment| fragment.as_equipment())
            .cloned()
        else {
            return;
        };

        trace!(item = %item, equipment = %fragment.equipment, "tracking item equipment");
        self.tracked.insert(
            item,
            TrackedItem {
                fragment,
                applied: None,
            },
        );
        self.check_condition(collection, item, equipment, conditions);
    }

    fn on_item_removed(&mut self, item: ItemId, equipment: &mut EquipmentComponent) {
        if let Some(tracked) = self.tracked.remove(&item) {
            if let Some(def) = tracked.applied {
                debug!(item = %item, equipment = %def, "removing item equipment");
                equipment.remove_equipment_by_def(&def);
            }
        }
    }

    fn check_condition(
        &mut self,
        collection: &ContainerCollection,
        item: ItemId,
        equipment: &mut EquipmentComponent,
        conditions: &dyn ConditionEvaluator,
    ) {
        let (Some(tracked), Some(instance)) = (self.tracked.get_mut(&item), collection.item(item))
        else {
            return;
        };
        let holds = tracked
            .fragment
            .condition
            .as_ref()
            .is_none_or(|condition| conditions.evaluate(condition, instance, collection));

        match (tracked.applied.clone(), holds) {
            (None, true) => {
                let def = tracked.fragment.equipment.clone();
                debug!(item = %item, equipment = %def, "applying item equipment");
                equipment.apply_equipment_spec(
                    EquipmentSpec::from_tag_stats(def.clone(), instance.tag_stats()),
                    Some(item),
                );
                tracked.applied = Some(def);
            }
            (Some(def), false) => {
                debug!(item = %item, equipment = %def, "item equipment condition failed");
                equipment.remove_equipment_by_def(&def);
                tracked.applied = None;
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::ItemSettings;
    use crate::container::ContainerDefinition;
    use crate::item::{Fragment, ItemCatalog, ItemDefinition};
    use crate::rules::ParentLink;
    use crate::tag::Tag;

    struct InHand;

    impl ConditionEvaluator for InHand {
        fn evaluate(&self, _: &ConditionId, item: &ItemInstance, _: &ContainerCollection) -> bool {
            item.containers().contains(&Tag::from("Container.Hand"))
        }
    }

    fn collection() -> ContainerCollection {
        let catalog: ItemCatalog = [
            ItemDefinition::new("helm", "Helm").with_fragment(Fragment::Equipment(
                EquipmentFragment {
                    equipment: "helm_gear".into(),
                    condition: None,
                },
            )),
            ItemDefinition::new("torch", "Torch").with_fragment(Fragment::Equipment(
                EquipmentFragment {
                    equipment: "torch_light".into(),
                    condition: Some("in_hand".into()),
                },
            )),
            ItemDefinition::new("apple", "Apple"),
        ]
        .into_iter()
        .collect();
        let mut items = ContainerCollection::new("player", ItemSettings::new(), Arc::new(catalog));
        items
            .add_container(
                "Container.Inventory",
                Arc::new(ContainerDefinition::new("inventory")),
            )
            .unwrap();
        items
            .add_container(
                "Container.Hand",
                Arc::new(
                    ContainerDefinition::new("hand")
                        .with_slot_limit(1)
                        .with_rule(ParentLink {
                            linked_container: Some(Tag::from("Container.Inventory")),
                        }),
                ),
            )
            .unwrap();
        items
    }

    fn pump(
        bridge: &mut ItemEquipmentBridge,
        items: &mut ContainerCollection,
        equipment: &mut EquipmentComponent,
    ) {
        let events = items.take_events();
        bridge.handle_events(items, &events, equipment, &InHand);
    }

    #[test]
    fn unconditional_equipment_follows_the_item() {
        let mut items = collection();
        let mut equipment = EquipmentComponent::new("player");
        let mut bridge = ItemEquipmentBridge::new();
        let inventory = Tag::from("Container.Inventory");

        let helm = items.create_item(&"helm".into(), 1).unwrap();
        items.add_tag_stat(helm, &Tag::from("Stat.Armor"), 5);
        items.add_item(&inventory, helm, None);
        let apple = items.create_item(&"apple".into(), 1).unwrap();
        items.add_item(&inventory, apple, None);
        pump(&mut bridge, &mut items, &mut equipment);

        let granted = equipment.find_equipment_by_def(&"helm_gear".into()).unwrap();
        assert_eq!(granted.instigator, Some(helm));
        assert_eq!(granted.tag_stat(&Tag::from("Stat.Armor")), 5);
        assert_eq!(equipment.all_equipment().len(), 1);

        items.remove_item(&inventory, helm);
        pump(&mut bridge, &mut items, &mut equipment);
        assert!(equipment.all_equipment().is_empty());
        assert!(!bridge.is_tracking(helm));
    }

    #[test]
    fn conditional_equipment_rechecks_on_slot_changes() {
        let mut items = collection();
        let mut equipment = EquipmentComponent::new("player");
        let mut bridge = ItemEquipmentBridge::new();
        let inventory = Tag::from("Container.Inventory");
        let hand = Tag::from("Container.Hand");

        let torch = items.create_item(&"torch".into(), 1).unwrap();
        items.add_item(&inventory, torch, None);
        pump(&mut bridge, &mut items, &mut equipment);
        assert!(equipment.all_equipment().is_empty());

        items.add_item(&hand, torch, None);
        pump(&mut bridge, &mut items, &mut equipment);
        assert_eq!(bridge.applied_equipment(torch), Some(&"torch_light".into()));

        items.remove_item(&hand, torch);
        pump(&mut bridge, &mut items, &mut equipment);
        assert!(equipment.all_equipment().is_empty());
        assert!(bridge.is_tracking(torch));
    }

    #[test]
    fn register_picks_up_existing_items() {
        let mut items = collection();
        let helm = items.create_item(&"helm".into(), 1).unwrap();
        items.add_item(&Tag::from("Container.Inventory"), helm, None);
        items.take_events();

        let mut equipment = EquipmentComponent::new("player");
        let mut bridge = ItemEquipmentBridge::new();
        bridge.register(&items, &mut equipment, &AlwaysTrue);
        assert_eq!(equipment.all_equipment().len(), 1);

        bridge.unregister(&mut equipment);
        assert!(equipment.all_equipment().is_empty());
    }
}

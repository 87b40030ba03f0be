//! Link reactions, auto-slotting and selection.
//!
//! A link rule lives on the container that reacts; its `linked_container`
//! names the container whose events it follows. [`ContainerCollection::emit`]
//! calls [`ContainerCollection::dispatch_links`] synchronously for every
//! container event, so a reaction completes before the triggering operation
//! returns.

use tracing::{debug, trace, warn};

use crate::command::ContainerCommand;
use crate::events::ContainerEvent;
use crate::item::ItemId;
use crate::rules::{AutoSlotLink, AutoSlotRule, ContainerRule, SelectionLink};
use crate::tag::{Tag, TagSet};

use super::ContainerCollection;

impl ContainerCollection {
    /// Routes `event` to every link rule following its container.
    pub(crate) fn dispatch_links(&mut self, event: &ContainerEvent) {
        let source = event.container();
        let listeners: Vec<(Tag, usize)> = self
            .containers
            .iter()
            .flat_map(|container| {
                container
                    .rules()
                    .iter()
                    .enumerate()
                    .filter(|(_, rule)| rule.linked_container() == Some(source))
                    .map(|(index, _)| (container.id().clone(), index))
                    .collect::<Vec<_>>()
            })
            .collect();

        for (container, index) in listeners {
            let Some(rule) = self
                .container(&container)
                .and_then(|c| c.rules().get(index))
                .cloned()
            else {
                continue;
            };
            match (&rule, event) {
                (
                    ContainerRule::ParentLink(_) | ContainerRule::SelectionLink(_),
                    ContainerEvent::ItemRemoved { item, .. },
                ) => {
                    if self.container(&container).is_some_and(|c| c.contains(*item)) {
                        trace!(child = %container, item = %item, "removing item removed from parent");
                        self.execute_remove_item(&container, *item);
                    }
                }
                (ContainerRule::AutoSlotLink(link), ContainerEvent::ItemAdded { item, .. }) => {
                    self.on_auto_slot_link_item_added(&container, link, *item);
                }
                (ContainerRule::SelectionLink(link), ContainerEvent::ItemAdded { .. }) => {
                    let target_empty = self
                        .container(&container)
                        .is_some_and(|c| c.is_slot_empty(link.target_slot));
                    if !link.allow_selecting_empty_slots && target_empty {
                        self.execute_select_item(&container, 1, true);
                    }
                }
                (ContainerRule::SelectionLink(link), event) if event.covers_slot(link.selected_slot) => {
                    self.on_selected_slot_changed(&container, link);
                }
                _ => {}
            }
        }
    }

    fn on_auto_slot_link_item_added(&mut self, container: &Tag, link: &AutoSlotLink, item: ItemId) {
        let Some(instance) = self.item(item) else {
            return;
        };
        if !link.query.passes(instance.owned_tags()) {
            return;
        }
        let Some(view) = self.view(container) else {
            return;
        };

        if view.can_auto_slot(instance, &link.context_tags) {
            self.execute_try_auto_slot(container, item, &link.context_tags);
        } else if !view.container().rules().iter().any(|r| r.as_auto_slot().is_some())
            && view.can_contain_item(instance)
        {
            if let Some(slot) = view.next_empty_slot() {
                self.execute_add_item(container, item, Some(slot));
            }
        }
    }

    fn on_selected_slot_changed(&mut self, container: &Tag, link: &SelectionLink) {
        let Some(linked) = link.linked_container.as_ref().and_then(|id| self.container(id)) else {
            return;
        };
        if linked.is_slot_empty(link.selected_slot) && !link.allow_selecting_empty_slots {
            let target = link.target_slot;
            self.scoped(container, |collection| {
                collection.execute_remove_item_at(container, target);
                collection.execute_select_item(container, 1, true);
            });
        } else {
            self.update_selection(container);
        }
    }

    // ------------------------------------------------------------------
    // Auto-slot
    // ------------------------------------------------------------------

    /// Places `item` using the container's auto-slot rules.
    pub fn try_auto_slot(&mut self, container: &Tag, item: ItemId, context_tags: &TagSet) -> Vec<ItemId> {
        if !self.route(container, || ContainerCommand::TryAutoSlot {
            container: container.clone(),
            item,
            context_tags: context_tags.clone(),
        }) {
            return Vec::new();
        }
        self.execute_try_auto_slot(container, item, context_tags)
    }

    /// The first auto-slot rule that accepts the item decides. With the toggle
    /// context tag an already listed item is removed instead.
    pub(crate) fn execute_try_auto_slot(
        &mut self,
        container: &Tag,
        item: ItemId,
        context_tags: &TagSet,
    ) -> Vec<ItemId> {
        let Some(view) = self.view(container) else {
            return Vec::new();
        };
        let Some(instance) = self.item(item) else {
            return Vec::new();
        };

        if view.contains(item) {
            if AutoSlotRule::is_toggle(context_tags) {
                debug!(container = %container, item = %item, "toggling item off");
                self.execute_remove_item(container, item);
            }
            return Vec::new();
        }

        let can_contain = view.can_contain_item(instance);
        let Some(rule) = view
            .container()
            .rules()
            .iter()
            .filter_map(ContainerRule::as_auto_slot)
            .find(|rule| can_contain && rule.accepts(instance))
            .cloned()
        else {
            return Vec::new();
        };

        let slot = rule.best_slot(view.next_empty_slot());
        let occupied = !view.is_slot_empty(slot);
        if occupied && !rule.should_replace(context_tags) {
            debug!(container = %container, slot, "auto-slot target occupied, not replacing");
            return Vec::new();
        }

        self.scoped(container, |collection| {
            if occupied {
                collection.execute_remove_item_at(container, slot);
            }
            collection.execute_add_item(container, item, Some(slot))
        })
    }

    /// Child of `parent` with the highest auto-slot priority for `item`.
    pub fn find_auto_slot_child_container_for_item(
        &self,
        parent: &Tag,
        item: ItemId,
        context_tags: &TagSet,
    ) -> Option<Tag> {
        let instance = self.item(item)?;
        let mut best: Option<(i32, Tag)> = None;
        for child in self.children_of(parent) {
            let Some(view) = self.view(&child) else {
                continue;
            };
            let priority = view.auto_slot_priority_for_item(instance, context_tags);
            if priority > 0 && best.as_ref().is_none_or(|(p, _)| priority > *p) {
                best = Some((priority, child));
            }
        }
        best.map(|(_, id)| id)
    }

    // ------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------

    fn selection(&self, container: &Tag) -> Option<&SelectionLink> {
        self.container(container)?
            .rules()
            .iter()
            .find_map(ContainerRule::as_selection)
    }

    pub fn selected_slot(&self, container: &Tag) -> Option<usize> {
        self.selection(container).map(|link| link.selected_slot)
    }

    /// Item mirrored from the linked container's selected slot.
    pub fn selected_item(&self, container: &Tag) -> Option<ItemId> {
        let link = self.selection(container)?;
        self.container(link.linked_container.as_ref()?)?
            .item_at(link.selected_slot)
    }

    fn linked_num_slots(&self, link: &SelectionLink) -> usize {
        link.linked_container
            .as_ref()
            .and_then(|id| self.container(id))
            .map_or(0, |c| c.num_slots())
    }

    pub fn set_selected_slot(&mut self, container: &Tag, slot: usize) {
        if self.route(container, || ContainerCommand::SelectSlot {
            container: container.clone(),
            slot,
        }) {
            self.execute_set_selected_slot(container, slot);
        }
    }

    pub fn select_next_slot(&mut self, container: &Tag, looped: bool) {
        self.select_slot_offset(container, 1, looped);
    }

    pub fn select_prev_slot(&mut self, container: &Tag, looped: bool) {
        self.select_slot_offset(container, -1, looped);
    }

    fn select_slot_offset(&mut self, container: &Tag, offset: i64, looped: bool) {
        let Some(link) = self.selection(container) else {
            return;
        };
        let slot = SelectionLink::clamp_slot(
            link.selected_slot as i64 + offset,
            looped,
            self.linked_num_slots(link),
        );
        self.set_selected_slot(container, slot);
    }

    /// Moves the selection to the next slot holding an item. With empty slots
    /// allowed this is the same as [`Self::select_next_slot`].
    pub fn select_next_item(&mut self, container: &Tag, looped: bool) {
        self.select_item_offset(container, 1, looped);
    }

    pub fn select_prev_item(&mut self, container: &Tag, looped: bool) {
        self.select_item_offset(container, -1, looped);
    }

    fn select_item_offset(&mut self, container: &Tag, direction: i64, looped: bool) {
        match self.find_selectable_slot(container, direction, looped) {
            Some(slot) => self.set_selected_slot(container, slot),
            None => trace!(container = %container, "no item to select"),
        }
    }

    fn find_selectable_slot(&self, container: &Tag, direction: i64, looped: bool) -> Option<usize> {
        let link = self.selection(container)?;
        let num_slots = self.linked_num_slots(link);
        if link.allow_selecting_empty_slots {
            return Some(SelectionLink::clamp_slot(
                link.selected_slot as i64 + direction,
                looped,
                num_slots,
            ));
        }
        let linked = self.container(link.linked_container.as_ref()?)?;
        link.find_valid_item_slot(direction, looped, num_slots, |slot| linked.is_slot_empty(slot))
    }

    pub(crate) fn execute_select_item(&mut self, container: &Tag, direction: i64, looped: bool) {
        if let Some(slot) = self.find_selectable_slot(container, direction, looped) {
            self.execute_set_selected_slot(container, slot);
        }
    }

    pub(crate) fn execute_set_selected_slot(&mut self, container: &Tag, slot: usize) {
        let Some(link) = self
            .container_mut(container)
            .and_then(|c| c.rules.iter_mut().find_map(ContainerRule::as_selection_mut))
        else {
            warn!(container = %container, "container has no selection link");
            return;
        };
        if link.selected_slot == slot {
            return;
        }
        trace!(container = %container, old = link.selected_slot, new = slot, "selected slot");
        link.selected_slot = slot;
        self.update_selection(container);
    }

    /// Mirrors the linked container's selected item into the target slot.
    pub(crate) fn update_selection(&mut self, container: &Tag) {
        let Some(link) = self.selection(container).cloned() else {
            return;
        };
        let selected = self.selected_item(container);
        let current = self.container(container).and_then(|c| c.item_at(link.target_slot));
        if current == selected {
            return;
        }
        self.scoped(container, |collection| {
            if current.is_some() {
                collection.execute_remove_item_at(container, link.target_slot);
            }
            if let Some(item) = selected {
                collection.execute_add_item(container, item, Some(link.target_slot));
            }
        });
    }

    /// Brings every selection of `container` in line with its linked container.
    pub(crate) fn update_all_selections(&mut self, container: &Tag) {
        let Some(link) = self.selection(container).cloned() else {
            return;
        };
        let linked_empty = link
            .linked_container
            .as_ref()
            .and_then(|id| self.container(id))
            .is_none_or(|c| c.is_slot_empty(link.selected_slot));
        if linked_empty && !link.allow_selecting_empty_slots {
            self.execute_select_item(container, 1, true);
        } else {
            self.update_selection(container);
        }
    }
}

//! Mutation requests forwarded from a client to the authority.
//!
//! A non-authoritative collection queues one [`ContainerCommand`] per public
//! mutation it cannot (or may not only) execute itself. The transport delivers
//! the queue to the server, which replays each command with
//! [`ContainerCollection::apply_command`].

use tracing::debug;

use crate::collection::{ContainerCollection, ContainerError};
use crate::item::{ItemDefId, ItemId};
use crate::tag::{Tag, TagSet};

#[derive(Clone, Debug, PartialEq, Eq, strum::EnumDiscriminants)]
#[strum_discriminants(name(ContainerCommandKind))]
#[strum_discriminants(derive(Hash, strum::Display))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ContainerCommand {
    AddItem {
        container: Tag,
        item: ItemId,
        slot: Option<usize>,
    },
    AddItems {
        container: Tag,
        items: Vec<ItemId>,
    },
    RemoveItem {
        container: Tag,
        item: ItemId,
    },
    RemoveItems {
        container: Tag,
        items: Vec<ItemId>,
    },
    RemoveItemAt {
        container: Tag,
        slot: usize,
    },
    RemoveItemsByDef {
        container: Tag,
        def: ItemDefId,
        count: u32,
    },
    RemoveAllItems {
        container: Tag,
    },
    SwapItems {
        container: Tag,
        a: usize,
        b: usize,
    },
    StackItems {
        container: Tag,
        from: ItemId,
        to: ItemId,
        allow_partial: bool,
    },
    SetItemAt {
        container: Tag,
        item: ItemId,
        slot: usize,
    },
    SetItemCount {
        item: ItemId,
        count: u32,
    },
    AddTagStat {
        item: ItemId,
        tag: Tag,
        delta: i32,
    },
    RemoveTagStat {
        item: ItemId,
        tag: Tag,
        delta: i32,
    },
    SelectSlot {
        container: Tag,
        slot: usize,
    },
    TryAutoSlot {
        container: Tag,
        item: ItemId,
        context_tags: TagSet,
    },
}

impl ContainerCommand {
    pub fn kind(&self) -> ContainerCommandKind {
        ContainerCommandKind::from(self)
    }

    /// Container the command targets, if any.
    pub fn container(&self) -> Option<&Tag> {
        use ContainerCommand::*;
        match self {
            AddItem { container, .. }
            | AddItems { container, .. }
            | RemoveItem { container, .. }
            | RemoveItems { container, .. }
            | RemoveItemAt { container, .. }
            | RemoveItemsByDef { container, .. }
            | RemoveAllItems { container }
            | SwapItems { container, .. }
            | StackItems { container, .. }
            | SetItemAt { container, .. }
            | SelectSlot { container, .. }
            | TryAutoSlot { container, .. } => Some(container),
            SetItemCount { .. } | AddTagStat { .. } | RemoveTagStat { .. } => None,
        }
    }

    /// Items the command refers to.
    pub fn items(&self) -> Vec<ItemId> {
        use ContainerCommand::*;
        match self {
            AddItem { item, .. }
            | RemoveItem { item, .. }
            | SetItemAt { item, .. }
            | SetItemCount { item, .. }
            | AddTagStat { item, .. }
            | RemoveTagStat { item, .. }
            | TryAutoSlot { item, .. } => vec![*item],
            AddItems { items, .. } | RemoveItems { items, .. } => items.clone(),
            StackItems { from, to, .. } => vec![*from, *to],
            RemoveItemAt { .. }
            | RemoveItemsByDef { .. }
            | RemoveAllItems { .. }
            | SwapItems { .. }
            | SelectSlot { .. } => Vec::new(),
        }
    }
}

impl ContainerCollection {
    /// Executes commands forwarded together, in order.
    ///
    /// Items removed by one command survive until the whole batch ran, so a
    /// remove followed by an add moves the item instead of destroying it.
    pub fn apply_commands(
        &mut self,
        commands: Vec<ContainerCommand>,
    ) -> Vec<Result<(), ContainerError>> {
        self.batch(|collection| {
            commands
                .into_iter()
                .map(|command| collection.apply_command(command))
                .collect()
        })
    }

    /// Executes a forwarded command on the authority.
    ///
    /// Unknown containers and items are rejected before anything runs; the
    /// command's own outcome (a rejected add, an empty slot) is not an error.
    pub fn apply_command(&mut self, command: ContainerCommand) -> Result<(), ContainerError> {
        use ContainerCommand::*;

        if !self.role().has_authority() {
            return Err(ContainerError::NotAuthority {
                owner: self.owner().to_string(),
                role: self.role(),
            });
        }
        if let Some(container) = command.container() {
            if self.container(container).is_none() {
                return Err(ContainerError::UnknownContainer(container.clone()));
            }
        }
        if let Some(missing) = command.items().into_iter().find(|id| self.item(*id).is_none()) {
            return Err(ContainerError::UnknownItem(missing));
        }

        debug!(owner = %self.owner(), kind = %command.kind(), "applying command");
        match command {
            AddItem {
                container,
                item,
                slot,
            } => {
                self.execute_add_item(&container, item, slot);
            }
            AddItems { container, items } => {
                self.execute_add_items(&container, &items);
            }
            RemoveItem { container, item } => {
                self.execute_remove_item(&container, item);
            }
            RemoveItems { container, items } => {
                self.execute_remove_items(&container, &items);
            }
            RemoveItemAt { container, slot } => {
                self.execute_remove_item_at(&container, slot);
            }
            RemoveItemsByDef {
                container,
                def,
                count,
            } => {
                self.execute_remove_items_by_def(&container, &def, count);
            }
            RemoveAllItems { container } => {
                self.execute_remove_all_items(&container);
            }
            SwapItems { container, a, b } => {
                self.execute_swap_items(&container, a, b);
            }
            StackItems {
                container,
                from,
                to,
                allow_partial,
            } => {
                self.execute_stack_items(&container, from, to, allow_partial);
            }
            SetItemAt {
                container,
                item,
                slot,
            } => {
                self.execute_set_item_at(&container, item, slot);
            }
            SetItemCount { item, count } => self.execute_set_item_count(item, count),
            AddTagStat { item, tag, delta } => self.execute_add_tag_stat(item, &tag, delta),
            RemoveTagStat { item, tag, delta } => self.execute_remove_tag_stat(item, &tag, delta),
            SelectSlot { container, slot } => self.execute_set_selected_slot(&container, slot),
            TryAutoSlot {
                container,
                item,
                context_tags,
            } => {
                self.execute_try_auto_slot(&container, item, &context_tags);
            }
        }
        Ok(())
    }
}

//! Messages exchanged between the server session, its handle and replicas.
use std::fmt;

use serde::{Deserialize, Serialize};

use items_core::{
    CollectionDelta, ContainerCommand, EquipmentCommand, EquipmentDelta, ItemDefId, ItemId,
    NetRole, Tag,
};

/// Identifies one connected replica of a collection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReplicaId(pub u32);

impl fmt::Display for ReplicaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "replica#{}", self.0)
    }
}

/// Authoritative operations issued by server-side game code.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionCommand {
    /// Any container or item mutation.
    Container(ContainerCommand),
    CreateItem {
        container: Tag,
        def: ItemDefId,
        count: u32,
    },
    CreateDefaultItems {
        container: Tag,
        force: bool,
    },
    MoveItem {
        from: Tag,
        to: Tag,
        item: ItemId,
        slot: Option<usize>,
        allow_partial: bool,
    },
    Equipment(EquipmentCommand),
    SetEquipmentActive(bool),
}

/// Commands a replica queued locally, forwarded in one batch.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwardedCommands {
    pub containers: Vec<ContainerCommand>,
    pub equipment: Vec<EquipmentCommand>,
}

impl ForwardedCommands {
    pub fn is_empty(&self) -> bool {
        self.containers.is_empty() && self.equipment.is_empty()
    }

    pub fn len(&self) -> usize {
        self.containers.len() + self.equipment.len()
    }
}

/// Per-command results of a forwarded batch.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ForwardOutcome {
    pub applied: usize,
    /// Batch index (container commands first, then equipment) and error text.
    pub rejected: Vec<(usize, String)>,
}

/// Role a replica connects with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplicaRole {
    /// Owning client; may forward commands.
    Owner,
    /// Observer; only receives updates.
    Observer,
}

impl ReplicaRole {
    pub const fn net_role(self) -> NetRole {
        match self {
            ReplicaRole::Owner => NetRole::AutonomousProxy,
            ReplicaRole::Observer => NetRole::SimulatedProxy,
        }
    }
}

/// Everything a replica needs to catch up with the authority.
///
/// Updates for one replica carry strictly increasing sequence numbers and
/// must be applied in order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicationUpdate {
    pub sequence: u64,
    pub collection: CollectionDelta,
    pub equipment: EquipmentDelta,
    /// State root of the authority after this update.
    pub state_root: [u8; 32],
}

impl ReplicationUpdate {
    pub fn state_root_hex(&self) -> String {
        hex::encode(self.state_root)
    }
}

//! Typed payloads carried on each topic.
use serde::{Deserialize, Serialize};

use items_core::{EquipmentEvent, ItemsEvent};

use crate::api::ReplicaId;

/// Container and item changes produced by one server command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemsChanged {
    pub owner: String,
    pub events: Vec<ItemsEvent>,
}

/// Equipment granted or removed by one server command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquipmentChanged {
    pub owner: String,
    pub events: Vec<EquipmentEvent>,
}

/// Replication activity observed by the server session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplicationEvent {
    Connected {
        replica: ReplicaId,
    },
    Disconnected {
        replica: ReplicaId,
    },
    /// An update left the server.
    UpdateSent {
        replica: ReplicaId,
        sequence: u64,
        state_root: [u8; 32],
    },
    /// A forwarded batch was replayed on the authority.
    CommandsApplied {
        replica: ReplicaId,
        applied: usize,
        rejected: usize,
    },
}

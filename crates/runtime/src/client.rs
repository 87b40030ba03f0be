//! Replica side of a session.
//!
//! A [`ClientSession`] holds a non-authoritative copy of the collection and
//! its equipment. Game code mutates the copy as usual; locally predicted
//! calls apply at once and every forwarded call lands in an outbox that
//! [`ClientSession::flush`] ships to the server. Authority state comes back
//! as [`ReplicationUpdate`]s, applied strictly in sequence order.

use tokio::sync::mpsc;
use tracing::{debug, trace};

use items_core::{
    ContainerCollection, EquipmentComponent, EquipmentEvent, ItemsEvent, compute_state_root,
};

use crate::api::{
    ForwardOutcome, ForwardedCommands, ReplicaId, ReplicaRole, ReplicationUpdate, Result,
    RuntimeError, SessionHandle,
};

pub struct ClientSession {
    replica: ReplicaId,
    role: ReplicaRole,
    collection: ContainerCollection,
    equipment: EquipmentComponent,
    updates: mpsc::Receiver<ReplicationUpdate>,
    handle: SessionHandle,
    last_sequence: u64,
    converged: bool,
}

impl ClientSession {
    pub(crate) fn new(
        replica: ReplicaId,
        role: ReplicaRole,
        collection: ContainerCollection,
        equipment: EquipmentComponent,
        updates: mpsc::Receiver<ReplicationUpdate>,
        handle: SessionHandle,
    ) -> Self {
        Self {
            replica,
            role,
            collection,
            equipment,
            updates,
            handle,
            last_sequence: 0,
            converged: false,
        }
    }

    pub fn replica(&self) -> ReplicaId {
        self.replica
    }

    pub fn role(&self) -> ReplicaRole {
        self.role
    }

    pub fn collection(&self) -> &ContainerCollection {
        &self.collection
    }

    /// Mutable access for game code. Calls are routed by the collection's
    /// role, so only predicted or forwarded work happens here.
    pub fn collection_mut(&mut self) -> &mut ContainerCollection {
        &mut self.collection
    }

    pub fn equipment(&self) -> &EquipmentComponent {
        &self.equipment
    }

    pub fn equipment_mut(&mut self) -> &mut EquipmentComponent {
        &mut self.equipment
    }

    /// Sequence of the last applied update; 0 before the first one.
    pub fn last_sequence(&self) -> u64 {
        self.last_sequence
    }

    /// Whether the state root after the last update matched the server's.
    pub fn is_converged(&self) -> bool {
        self.converged
    }

    /// Forwards queued commands to the server.
    pub async fn flush(&mut self) -> Result<ForwardOutcome> {
        let commands = ForwardedCommands {
            containers: self.collection.take_outbox(),
            equipment: self.equipment.take_outbox(),
        };
        if commands.is_empty() {
            return Ok(ForwardOutcome::default());
        }
        debug!(replica = %self.replica, count = commands.len(), "forwarding commands");
        self.handle.forward(self.replica, commands).await
    }

    /// Waits for the next update and applies it.
    pub async fn recv_update(&mut self) -> Result<()> {
        let update = self
            .updates
            .recv()
            .await
            .ok_or(RuntimeError::UpdateChannelClosed {
                replica: self.replica,
            })?;
        self.apply_update(update)
    }

    /// Applies every update already delivered, without waiting.
    pub fn apply_pending(&mut self) -> Result<usize> {
        let mut applied = 0;
        while let Ok(update) = self.updates.try_recv() {
            self.apply_update(update)?;
            applied += 1;
        }
        Ok(applied)
    }

    /// Applies one update. Updates must arrive in sequence order.
    pub fn apply_update(&mut self, update: ReplicationUpdate) -> Result<()> {
        let expected = self.last_sequence + 1;
        if update.sequence != expected {
            return Err(RuntimeError::OutOfOrderUpdate {
                expected,
                received: update.sequence,
            });
        }

        self.collection.apply_delta(update.collection)?;
        self.equipment.apply_delta(update.equipment)?;
        self.last_sequence = update.sequence;

        let local_root = compute_state_root(&self.collection.snapshot());
        self.converged = local_root == update.state_root;
        if self.converged {
            trace!(replica = %self.replica, sequence = update.sequence, "replica converged");
        } else {
            // Expected while predictions are still in flight.
            debug!(
                replica = %self.replica,
                sequence = update.sequence,
                local = %hex::encode(local_root),
                server = %hex::encode(update.state_root),
                "replica state root differs from the server"
            );
        }
        Ok(())
    }

    pub fn take_item_events(&mut self) -> Vec<ItemsEvent> {
        self.collection.take_events()
    }

    pub fn take_equipment_events(&mut self) -> Vec<EquipmentEvent> {
        self.equipment.take_events()
    }

    /// Stops updates for this replica and returns its final state.
    pub async fn disconnect(self) -> Result<(ContainerCollection, EquipmentComponent)> {
        self.handle.disconnect(self.replica).await?;
        Ok((self.collection, self.equipment))
    }
}

impl std::fmt::Debug for ClientSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSession")
            .field("replica", &self.replica)
            .field("role", &self.role)
            .field("last_sequence", &self.last_sequence)
            .field("converged", &self.converged)
            .finish()
    }
}

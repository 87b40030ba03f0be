//! Cloneable façade for issuing commands to the server session.
//!
//! [`SessionHandle`] hides channel plumbing and offers async helpers for
//! mutating the authoritative collection, connecting replicas and streaming
//! events from specific topics.
use std::collections::HashMap;

use tokio::sync::{broadcast, mpsc, oneshot};

use items_core::{
    CollectionSnapshot, ContainerCollection, Equipment, EquipmentComponent, ItemDefId, ItemId,
    Tag,
};

use super::errors::{Result, RuntimeError};
use super::sink::ReplicaSink;
use super::types::{ForwardOutcome, ForwardedCommands, ReplicaId, ReplicaRole, SessionCommand};
use crate::client::ClientSession;
use crate::events::{Event, EventBus, Topic};
use crate::workers::Command;

/// Client-facing handle to interact with the server session
#[derive(Clone)]
pub struct SessionHandle {
    command_tx: mpsc::Sender<Command>,
    event_bus: EventBus,
    update_buffer_size: usize,
    default_role: ReplicaRole,
}

impl SessionHandle {
    pub(crate) fn new(
        command_tx: mpsc::Sender<Command>,
        event_bus: EventBus,
        update_buffer_size: usize,
        default_role: ReplicaRole,
    ) -> Self {
        Self {
            command_tx,
            event_bus,
            update_buffer_size,
            default_role,
        }
    }

    async fn request<T>(&self, build: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.command_tx
            .send(build(reply_tx))
            .await
            .map_err(|_| RuntimeError::CommandChannelClosed)?;

        reply_rx.await.map_err(RuntimeError::ReplyChannelClosed)
    }

    /// Execute an authoritative command and return the items it touched.
    pub async fn execute(&self, command: SessionCommand) -> Result<Vec<ItemId>> {
        self.request(|reply| Command::Execute { command, reply })
            .await?
    }

    /// Create `count` units of `def` inside `container`.
    pub async fn create_item(
        &self,
        container: impl Into<Tag>,
        def: impl Into<ItemDefId>,
        count: u32,
    ) -> Result<Vec<ItemId>> {
        self.execute(SessionCommand::CreateItem {
            container: container.into(),
            def: def.into(),
            count,
        })
        .await
    }

    /// Replay commands a replica queued locally.
    pub async fn forward(
        &self,
        replica: ReplicaId,
        commands: ForwardedCommands,
    ) -> Result<ForwardOutcome> {
        self.request(|reply| Command::Forward {
            replica,
            commands,
            reply,
        })
        .await?
    }

    /// Register a custom transport for `replica`.
    ///
    /// The replica immediately receives a full update.
    pub async fn connect_sink(
        &self,
        replica: ReplicaId,
        role: ReplicaRole,
        sink: Box<dyn ReplicaSink>,
    ) -> Result<()> {
        self.request(|reply| Command::Connect {
            replica,
            role,
            sink,
            reply,
        })
        .await?
    }

    /// Connect an in-process replica with the configured default role.
    pub async fn connect(
        &self,
        replica: ReplicaId,
        collection: ContainerCollection,
        equipment: EquipmentComponent,
    ) -> Result<ClientSession> {
        self.connect_as(replica, self.default_role, collection, equipment)
            .await
    }

    /// Connect an in-process replica.
    ///
    /// `collection` must be a non-authoritative copy of the server's
    /// container graph; its role and the equipment role follow `role`.
    pub async fn connect_as(
        &self,
        replica: ReplicaId,
        role: ReplicaRole,
        mut collection: ContainerCollection,
        mut equipment: EquipmentComponent,
    ) -> Result<ClientSession> {
        if collection.role().has_authority() {
            return Err(RuntimeError::AuthorityReplica {
                owner: collection.owner().to_string(),
            });
        }
        collection.set_role(role.net_role());
        equipment.set_role(role.net_role());

        let (update_tx, update_rx) = mpsc::channel(self.update_buffer_size);
        self.connect_sink(replica, role, Box::new(update_tx)).await?;

        Ok(ClientSession::new(
            replica,
            role,
            collection,
            equipment,
            update_rx,
            self.clone(),
        ))
    }

    /// Stop sending updates to `replica`.
    pub async fn disconnect(&self, replica: ReplicaId) -> Result<()> {
        self.request(|reply| Command::Disconnect { replica, reply })
            .await?
    }

    /// Query the current replicated state (read-only snapshot)
    pub async fn snapshot(&self) -> Result<CollectionSnapshot> {
        self.request(|reply| Command::QuerySnapshot { reply }).await
    }

    /// Query the equipment granted on the server
    pub async fn equipment(&self) -> Result<Vec<Equipment>> {
        self.request(|reply| Command::QueryEquipment { reply }).await
    }

    /// Root over the current replicated state
    pub async fn state_root(&self) -> Result<[u8; 32]> {
        self.request(|reply| Command::QueryStateRoot { reply })
            .await
    }

    /// Commit the collection to the configured save repository.
    pub async fn save(&self) -> Result<()> {
        self.request(|reply| Command::Save { reply }).await?
    }

    /// Restore the collection from the configured save repository.
    ///
    /// Returns the number of restored items.
    pub async fn load(&self) -> Result<usize> {
        self.request(|reply| Command::Load { reply }).await?
    }

    /// Subscribe to events from a specific topic
    ///
    /// # Topics
    ///
    /// - `Topic::Items` - Container and item changes
    /// - `Topic::Equipment` - Equipment grants and removals
    /// - `Topic::Replication` - Replica connections and outgoing updates
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        self.event_bus.subscribe(topic)
    }

    /// Subscribe to multiple topics at once
    pub fn subscribe_multiple(&self, topics: &[Topic]) -> HashMap<Topic, broadcast::Receiver<Event>> {
        self.event_bus.subscribe_multiple(topics)
    }

    /// Get a reference to the event bus for advanced usage
    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }
}

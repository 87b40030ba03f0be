//! Server session worker that owns the authoritative [`ContainerCollection`].
//!
//! Receives commands from [`SessionHandle`](crate::api::SessionHandle),
//! executes them, keeps equipment in step through the
//! [`ItemEquipmentBridge`], publishes events and sends every connected
//! replica the delta since the last update it received.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use items_core::{
    CollectionSnapshot, ConditionEvaluator, ContainerCollection, ContainerError, Equipment,
    EquipmentComponent, ItemEquipmentBridge, ItemId, ItemSubsystem, Tag, compute_state_root,
};

use crate::api::{
    ForwardOutcome, ForwardedCommands, ReplicaId, ReplicaRole, ReplicaSink, ReplicationUpdate,
    Result, RuntimeError, SessionCommand,
};
use crate::events::{EquipmentChanged, Event, EventBus, ItemsChanged, ReplicationEvent};
use crate::repository::SaveRepository;

/// Commands processed by the server session.
pub enum Command {
    Execute {
        command: SessionCommand,
        reply: oneshot::Sender<Result<Vec<ItemId>>>,
    },
    /// Replay a batch a replica queued locally.
    Forward {
        replica: ReplicaId,
        commands: ForwardedCommands,
        reply: oneshot::Sender<Result<ForwardOutcome>>,
    },
    Connect {
        replica: ReplicaId,
        role: ReplicaRole,
        sink: Box<dyn ReplicaSink>,
        reply: oneshot::Sender<Result<()>>,
    },
    Disconnect {
        replica: ReplicaId,
        reply: oneshot::Sender<Result<()>>,
    },
    QuerySnapshot {
        reply: oneshot::Sender<CollectionSnapshot>,
    },
    QueryEquipment {
        reply: oneshot::Sender<Vec<Equipment>>,
    },
    QueryStateRoot {
        reply: oneshot::Sender<[u8; 32]>,
    },
    Save {
        reply: oneshot::Sender<Result<()>>,
    },
    Load {
        reply: oneshot::Sender<Result<usize>>,
    },
}

/// What one replica has acknowledged so far.
struct ReplicaState {
    role: ReplicaRole,
    sink: Box<dyn ReplicaSink>,
    sequence: u64,
    collection: CollectionSnapshot,
    equipment: Vec<Equipment>,
    equipment_active: Option<bool>,
}

/// Worker that owns the authoritative collection and its equipment.
pub struct ServerSession {
    collection: ContainerCollection,
    equipment: EquipmentComponent,
    subsystem: ItemSubsystem,
    bridge: ItemEquipmentBridge,
    conditions: Arc<dyn ConditionEvaluator>,
    repository: Option<Arc<dyn SaveRepository>>,
    replicas: BTreeMap<ReplicaId, ReplicaState>,
    command_rx: mpsc::Receiver<Command>,
    event_bus: EventBus,
}

impl ServerSession {
    pub(crate) fn new(
        collection: ContainerCollection,
        equipment: EquipmentComponent,
        conditions: Arc<dyn ConditionEvaluator>,
        repository: Option<Arc<dyn SaveRepository>>,
        command_rx: mpsc::Receiver<Command>,
        event_bus: EventBus,
    ) -> Self {
        let subsystem = ItemSubsystem::new(collection.settings().clone());
        let mut session = Self {
            collection,
            equipment,
            subsystem,
            bridge: ItemEquipmentBridge::new(),
            conditions,
            repository,
            replicas: BTreeMap::new(),
            command_rx,
            event_bus,
        };
        session.bridge.register(
            &session.collection,
            &mut session.equipment,
            session.conditions.as_ref(),
        );
        session.collection.take_events();
        session.equipment.take_events();
        session
    }

    /// Main worker loop.
    pub async fn run(mut self) {
        info!(owner = %self.collection.owner(), "server session started");
        loop {
            tokio::select! {
                Some(cmd) = self.command_rx.recv() => {
                    self.handle_command(cmd).await;
                }
                else => break,
            }
        }
        info!(owner = %self.collection.owner(), "server session stopped");
    }

    async fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Execute { command, reply } => {
                let result = self.execute(command);
                self.after_mutation().await;
                let _ = reply.send(result);
            }
            Command::Forward {
                replica,
                commands,
                reply,
            } => {
                let result = self.forward(replica, commands);
                self.after_mutation().await;
                let _ = reply.send(result);
            }
            Command::Connect {
                replica,
                role,
                sink,
                reply,
            } => {
                let result = self.connect(replica, role, sink).await;
                let _ = reply.send(result);
            }
            Command::Disconnect { replica, reply } => {
                let result = match self.replicas.remove(&replica) {
                    Some(_) => {
                        self.publish_replication(ReplicationEvent::Disconnected { replica });
                        Ok(())
                    }
                    None => Err(RuntimeError::UnknownReplica { replica }),
                };
                let _ = reply.send(result);
            }
            Command::QuerySnapshot { reply } => {
                let _ = reply.send(self.collection.snapshot());
            }
            Command::QueryEquipment { reply } => {
                let _ = reply.send(self.equipment.snapshot());
            }
            Command::QueryStateRoot { reply } => {
                let _ = reply.send(compute_state_root(&self.collection.snapshot()));
            }
            Command::Save { reply } => {
                let _ = reply.send(self.save());
            }
            Command::Load { reply } => {
                let result = self.load();
                self.after_mutation().await;
                let _ = reply.send(result);
            }
        }
    }

    fn require_container(&self, container: &Tag) -> Result<()> {
        if self.collection.container(container).is_none() {
            return Err(ContainerError::UnknownContainer(container.clone()).into());
        }
        Ok(())
    }

    fn execute(&mut self, command: SessionCommand) -> Result<Vec<ItemId>> {
        debug!(owner = %self.collection.owner(), ?command, "executing session command");
        match command {
            SessionCommand::Container(command) => {
                self.collection.apply_command(command)?;
                Ok(Vec::new())
            }
            SessionCommand::CreateItem {
                container,
                def,
                count,
            } => {
                self.require_container(&container)?;
                Ok(self
                    .collection
                    .create_item_in_container(&container, &def, count))
            }
            SessionCommand::CreateDefaultItems { container, force } => {
                self.require_container(&container)?;
                Ok(self.collection.create_default_items(&container, force))
            }
            SessionCommand::MoveItem {
                from,
                to,
                item,
                slot,
                allow_partial,
            } => {
                self.require_container(&from)?;
                self.require_container(&to)?;
                Ok(self.subsystem.move_item(
                    &mut self.collection,
                    &from,
                    &to,
                    item,
                    slot,
                    allow_partial,
                ))
            }
            SessionCommand::Equipment(command) => {
                self.equipment.apply_command(command)?;
                Ok(Vec::new())
            }
            SessionCommand::SetEquipmentActive(active) => {
                if active {
                    self.equipment.activate();
                } else {
                    self.equipment.deactivate();
                }
                Ok(Vec::new())
            }
        }
    }

    fn forward(&mut self, replica: ReplicaId, commands: ForwardedCommands) -> Result<ForwardOutcome> {
        let role = self
            .replicas
            .get(&replica)
            .map(|state| state.role)
            .ok_or(RuntimeError::UnknownReplica { replica })?;
        if role != ReplicaRole::Owner {
            return Err(RuntimeError::ReadOnlyReplica { replica });
        }

        let mut outcome = ForwardOutcome::default();
        // Equipment rejections are indexed after the container commands.
        let offset = commands.containers.len();
        let results = self.collection.apply_commands(commands.containers);
        for (index, result) in results.into_iter().enumerate() {
            match result {
                Ok(()) => outcome.applied += 1,
                Err(error) => {
                    warn!(%replica, index, %error, "forwarded container command rejected");
                    outcome.rejected.push((index, error.to_string()));
                }
            }
        }
        for (index, command) in commands.equipment.into_iter().enumerate() {
            match self.equipment.apply_command(command) {
                Ok(()) => outcome.applied += 1,
                Err(error) => {
                    warn!(%replica, index, %error, "forwarded equipment command rejected");
                    outcome.rejected.push((offset + index, error.to_string()));
                }
            }
        }

        self.publish_replication(ReplicationEvent::CommandsApplied {
            replica,
            applied: outcome.applied,
            rejected: outcome.rejected.len(),
        });
        Ok(outcome)
    }

    async fn connect(
        &mut self,
        replica: ReplicaId,
        role: ReplicaRole,
        sink: Box<dyn ReplicaSink>,
    ) -> Result<()> {
        if self.replicas.contains_key(&replica) {
            return Err(RuntimeError::ReplicaAlreadyConnected { replica });
        }
        self.replicas.insert(
            replica,
            ReplicaState {
                role,
                sink,
                sequence: 0,
                collection: CollectionSnapshot::default(),
                equipment: Vec::new(),
                equipment_active: None,
            },
        );
        info!(%replica, ?role, "replica connected");
        self.publish_replication(ReplicationEvent::Connected { replica });
        self.replicate().await;

        if self.replicas.contains_key(&replica) {
            Ok(())
        } else {
            Err(RuntimeError::UpdateChannelClosed { replica })
        }
    }

    fn save(&self) -> Result<()> {
        let repository = self.repository.as_ref().ok_or(RuntimeError::NoRepository)?;
        let data = self.collection.commit_save_data();
        repository.save(self.collection.owner(), &data)?;
        info!(owner = %self.collection.owner(), containers = data.containers.len(), "collection saved");
        Ok(())
    }

    fn load(&mut self) -> Result<usize> {
        let repository = self.repository.as_ref().ok_or(RuntimeError::NoRepository)?;
        let owner = self.collection.owner().to_string();
        let data = repository
            .load(&owner)?
            .ok_or_else(|| RuntimeError::MissingSave { owner: owner.clone() })?;
        let restored = self.collection.load_save_data(&data)?;
        info!(%owner, restored, "collection loaded");
        Ok(restored)
    }

    /// Drains events, updates equipment, publishes and replicates.
    async fn after_mutation(&mut self) {
        let events = self.collection.take_events();
        if !events.is_empty() {
            self.bridge.handle_events(
                &self.collection,
                &events,
                &mut self.equipment,
                self.conditions.as_ref(),
            );
            self.event_bus.publish(Event::Items(ItemsChanged {
                owner: self.collection.owner().to_string(),
                events,
            }));
        }

        let equipment_events = self.equipment.take_events();
        if !equipment_events.is_empty() {
            self.event_bus.publish(Event::Equipment(EquipmentChanged {
                owner: self.collection.owner().to_string(),
                events: equipment_events,
            }));
        }

        self.replicate().await;
    }

    /// Sends each replica whatever changed since its last update.
    async fn replicate(&mut self) {
        if self.replicas.is_empty() {
            return;
        }
        let snapshot = self.collection.snapshot();
        let equipment = self.equipment.snapshot();
        let active = self.equipment.is_active();
        let state_root = compute_state_root(&snapshot);

        let mut closed = Vec::new();
        for (&replica, state) in self.replicas.iter_mut() {
            let collection_delta = snapshot.diff(&state.collection);
            let equipment_delta = self.equipment.delta_since(&state.equipment);
            if collection_delta.is_empty()
                && equipment_delta.list.is_empty()
                && state.equipment_active == Some(active)
            {
                continue;
            }

            let sequence = state.sequence + 1;
            let update = ReplicationUpdate {
                sequence,
                collection: collection_delta,
                equipment: equipment_delta,
                state_root,
            };
            if state.sink.deliver(update).await {
                state.sequence = sequence;
                state.collection = snapshot.clone();
                state.equipment = equipment.clone();
                state.equipment_active = Some(active);
                self.event_bus
                    .publish(Event::Replication(ReplicationEvent::UpdateSent {
                        replica,
                        sequence,
                        state_root,
                    }));
            } else {
                closed.push(replica);
            }
        }

        for replica in closed {
            warn!(%replica, "replica channel closed; dropping replica");
            self.replicas.remove(&replica);
            self.publish_replication(ReplicationEvent::Disconnected { replica });
        }
    }

    fn publish_replication(&self, event: ReplicationEvent) {
        self.event_bus.publish(Event::Replication(event));
    }
}

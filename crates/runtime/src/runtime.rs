//! High-level runtime orchestrator.
//!
//! The runtime owns the server session worker, wires up command and event
//! channels, and exposes a builder-based API for hosting an authoritative
//! collection and connecting replicas to it.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use items_core::{AlwaysTrue, ConditionEvaluator, ContainerCollection, EquipmentComponent};

use crate::api::{ReplicaRole, Result, RuntimeError, SessionHandle};
use crate::events::EventBus;
use crate::repository::{FileSaveRepository, SaveFormat, SaveRepository};
use crate::workers::{Command, ServerSession};

/// Runtime configuration shared across the orchestrator and workers.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub event_buffer_size: usize,
    pub command_buffer_size: usize,
    /// Capacity of each in-process replica's update channel.
    pub update_buffer_size: usize,
    /// Role used by [`SessionHandle::connect`].
    pub replica_role: ReplicaRole,
    /// Directory for a file save repository (default: none)
    pub save_dir: Option<PathBuf>,
    pub save_format: SaveFormat,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            event_buffer_size: 100,
            command_buffer_size: 32,
            update_buffer_size: 64,
            replica_role: ReplicaRole::Owner,
            save_dir: None,
            save_format: SaveFormat::Bincode,
        }
    }
}

/// Main runtime that hosts one authoritative collection
///
/// Runtime owns the worker; [`SessionHandle`] provides a cloneable façade
/// for game code and replicas.
pub struct Runtime {
    handle: SessionHandle,
    server_handle: JoinHandle<()>,
}

impl Runtime {
    /// Create a new runtime builder
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Get a cloneable handle to this runtime
    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    /// Shutdown the runtime gracefully
    ///
    /// The worker stops once every handle, including those held by client
    /// sessions, has been dropped.
    pub async fn shutdown(self) -> Result<()> {
        drop(self.handle);
        self.server_handle.await.map_err(RuntimeError::WorkerJoin)
    }
}

/// Builder for [`Runtime`] with flexible configuration.
pub struct RuntimeBuilder {
    config: RuntimeConfig,
    collection: Option<ContainerCollection>,
    equipment: Option<EquipmentComponent>,
    conditions: Arc<dyn ConditionEvaluator>,
    repository: Option<Arc<dyn SaveRepository>>,
}

impl RuntimeBuilder {
    fn new() -> Self {
        Self {
            config: RuntimeConfig::default(),
            collection: None,
            equipment: None,
            conditions: Arc::new(AlwaysTrue),
            repository: None,
        }
    }

    /// Override runtime configuration
    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Provide the authoritative collection (required)
    pub fn collection(mut self, collection: ContainerCollection) -> Self {
        self.collection = Some(collection);
        self
    }

    /// Provide the owner's equipment. Defaults to an empty, active component.
    pub fn equipment(mut self, equipment: EquipmentComponent) -> Self {
        self.equipment = Some(equipment);
        self
    }

    /// Set the evaluator for equipment conditions. Defaults to [`AlwaysTrue`].
    pub fn conditions(mut self, conditions: impl ConditionEvaluator + 'static) -> Self {
        self.conditions = Arc::new(conditions);
        self
    }

    /// Set a save repository. Takes precedence over `RuntimeConfig::save_dir`.
    pub fn repository(mut self, repository: Arc<dyn SaveRepository>) -> Self {
        self.repository = Some(repository);
        self
    }

    /// Load settings, items, containers and the named graph from a content
    /// directory and use the resulting collection.
    #[cfg(feature = "content")]
    pub fn content(
        self,
        factory: &items_content::ContentFactory,
        owner: &str,
        graph: &str,
    ) -> Result<Self> {
        let collection = factory
            .build_collection(owner, graph)
            .map_err(|e| RuntimeError::Content(format!("{:#}", e)))?;
        Ok(self.collection(collection))
    }

    /// Build the runtime and spawn the server session.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn build(self) -> Result<Runtime> {
        let mut collection = self.collection.ok_or(RuntimeError::MissingCollection)?;
        if !collection.role().has_authority() {
            tracing::warn!(
                owner = %collection.owner(),
                role = %collection.role(),
                "server collection promoted to authority"
            );
            collection.set_role(items_core::NetRole::Authority);
        }
        let equipment = self
            .equipment
            .unwrap_or_else(|| EquipmentComponent::new(collection.owner()));

        let repository = match (self.repository, &self.config.save_dir) {
            (Some(repository), _) => Some(repository),
            (None, Some(dir)) => Some(Arc::new(FileSaveRepository::with_format(
                dir,
                self.config.save_format,
            )?) as Arc<dyn SaveRepository>),
            (None, None) => None,
        };

        let (command_tx, command_rx) = mpsc::channel::<Command>(self.config.command_buffer_size);
        let event_bus = EventBus::with_capacity(self.config.event_buffer_size);

        let handle = SessionHandle::new(
            command_tx,
            event_bus.clone(),
            self.config.update_buffer_size,
            self.config.replica_role,
        );

        let server = ServerSession::new(
            collection,
            equipment,
            self.conditions,
            repository,
            command_rx,
            event_bus,
        );
        let server_handle = tokio::spawn(async move {
            server.run().await;
        });

        Ok(Runtime {
            handle,
            server_handle,
        })
    }
}

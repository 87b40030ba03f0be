//! Authority/replica runtime for item containers.
//!
//! This crate hosts an authoritative [`items_core::ContainerCollection`] in a
//! tokio worker and keeps replicas in step with it. Consumers embed
//! [`Runtime`] to run the server session, drive it through
//! [`SessionHandle`], and connect [`ClientSession`]s that predict, forward
//! and apply replication updates.
//!
//! Modules are organized by responsibility:
//! - [`runtime`] hosts the orchestrator and builder
//! - [`api`] exposes the types downstream clients interact with
//! - [`client`] holds the replica side of a session
//! - [`events`] provides topic-based event bus for flexible event routing
//! - [`repository`] persists collection save data
//! - [`logging`] installs tracing subscribers
pub mod api;
pub mod client;
pub mod events;
pub mod logging;
pub mod repository;
pub mod runtime;

mod workers;

pub use api::{
    ForwardOutcome, ForwardedCommands, ReplicaId, ReplicaRole, ReplicaSink, ReplicationUpdate,
    Result, RuntimeError, SessionCommand, SessionHandle,
};
pub use client::ClientSession;
pub use events::{
    EquipmentChanged, Event, EventBus, ItemsChanged, ReplicationEvent, Topic,
};
pub use logging::{init_tracing, init_tracing_with_file};
pub use repository::{
    FileSaveRepository, InMemorySaveRepository, RepositoryError, SaveFormat, SaveRepository,
};
pub use runtime::{Runtime, RuntimeBuilder, RuntimeConfig};

//! Unified error types surfaced by the runtime API.
//!
//! Wraps failures from worker coordination, repositories and the item engine
//! so clients can bubble them up with consistent context.
use thiserror::Error;
use tokio::sync::oneshot;

use items_core::{ContainerError, EquipmentError, GraphError, ReplicationError, SaveError};

pub use crate::repository::RepositoryError;

use super::types::ReplicaId;

pub type Result<T> = std::result::Result<T, RuntimeError>;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("server session command channel closed")]
    CommandChannelClosed,

    #[error("server session reply channel closed")]
    ReplyChannelClosed(#[source] oneshot::error::RecvError),

    #[error("server session join failed")]
    WorkerJoin(#[source] tokio::task::JoinError),

    #[error("replication update channel of {replica} closed")]
    UpdateChannelClosed { replica: ReplicaId },

    #[error("{replica} is not connected")]
    UnknownReplica { replica: ReplicaId },

    #[error("{replica} is already connected")]
    ReplicaAlreadyConnected { replica: ReplicaId },

    #[error("replica of {owner} must not hold authority")]
    AuthorityReplica { owner: String },

    #[error("{replica} is an observer and cannot forward commands")]
    ReadOnlyReplica { replica: ReplicaId },

    #[error("out-of-order replication update: expected sequence {expected}, received {received}")]
    OutOfOrderUpdate { expected: u64, received: u64 },

    #[error("no save repository configured")]
    NoRepository,

    #[error("no save data for {owner}")]
    MissingSave { owner: String },

    #[error("runtime requires a collection before building")]
    MissingCollection,

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Container(#[from] ContainerError),

    #[error(transparent)]
    Equipment(#[from] EquipmentError),

    #[error(transparent)]
    Replication(#[from] ReplicationError),

    #[error(transparent)]
    Save(#[from] SaveError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[cfg(feature = "content")]
    #[error("failed to load content: {0}")]
    Content(String),
}

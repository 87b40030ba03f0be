//! Public API surface for runtime consumers.
//!
//! Re-exports the types clients need to drive a server session, connect
//! replicas and handle errors.
pub mod errors;
pub mod handle;
pub mod sink;
pub mod types;

pub use errors::{Result, RuntimeError};
pub use handle::SessionHandle;
pub use sink::ReplicaSink;
pub use types::{
    ForwardOutcome, ForwardedCommands, ReplicaId, ReplicaRole, ReplicationUpdate, SessionCommand,
};

//! Delivery seam between the server session and its replicas.
use async_trait::async_trait;
use tokio::sync::mpsc;

use super::types::ReplicationUpdate;

/// Destination for the updates of one replica.
///
/// The in-process transport is an [`mpsc::Sender`]; a network transport
/// implements this trait around its own connection.
#[async_trait]
pub trait ReplicaSink: Send + Sync {
    /// Delivers one update. `false` means the replica is gone and the server
    /// drops it.
    async fn deliver(&self, update: ReplicationUpdate) -> bool;
}

#[async_trait]
impl ReplicaSink for mpsc::Sender<ReplicationUpdate> {
    async fn deliver(&self, update: ReplicationUpdate) -> bool {
        self.send(update).await.is_ok()
    }
}

#[async_trait]
impl ReplicaSink for mpsc::UnboundedSender<ReplicationUpdate> {
    async fn deliver(&self, update: ReplicationUpdate) -> bool {
        self.send(update).is_ok()
    }
}

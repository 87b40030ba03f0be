//! Replication primitives and the client/server execution plan.
//!
//! - [`delta`] implements fast-array diffing and replica application
//! - [`net`] decides, per call, whether a mutation runs locally, is forwarded
//!   to the server, or both
pub mod delta;
pub mod net;

pub use delta::{
    FastArrayDelta, FastArrayItem, FastArrayObserver, NoopObserver, apply_fast_array,
    diff_fast_array,
};
pub use net::{NetExecutionPlan, NetExecutionPolicy, NetRole};

/// Stable identifier of an element inside one replicated array.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReplicationId(pub u32);

/// Allocates replication ids for one array.
#[derive(Clone, Debug, Default)]
pub(crate) struct ReplicationIdAllocator {
    next: u32,
}

impl ReplicationIdAllocator {
    pub(crate) fn allocate(&mut self) -> ReplicationId {
        self.next = self.next.wrapping_add(1);
        ReplicationId(self.next)
    }

    /// Keeps future ids above everything seen from the authority.
    pub(crate) fn observe(&mut self, id: ReplicationId) {
        self.next = self.next.max(id.0);
    }
}

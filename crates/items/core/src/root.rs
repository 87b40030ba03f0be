//! Commitments over replicated state and forwarded commands.
//!
//! Two collections whose snapshots hash to the same root hold the same
//! replicated state. The runtime compares roots to check that a replica has
//! converged on the authority.
//!
//! Both functions serialize with bincode, which is deterministic for the
//! ordered maps a [`CollectionSnapshot`] uses, and hash with SHA-256.

use crate::collection::CollectionSnapshot;
use crate::command::ContainerCommand;

/// SHA-256 over the bincode encoding of `snapshot`.
pub fn compute_state_root(snapshot: &CollectionSnapshot) -> [u8; 32] {
    use sha2::{Digest, Sha256};

    let mut hasher = Sha256::new();
    if let Ok(bytes) = bincode::serialize(snapshot) {
        hasher.update(&bytes);
    }
    hasher.finalize().into()
}

/// SHA-256 over a command sequence. Order matters.
pub fn compute_commands_root(commands: &[ContainerCommand]) -> [u8; 32] {
    use sha2::{Digest, Sha256};

    let mut hasher = Sha256::new();
    for command in commands {
        if let Ok(bytes) = bincode::serialize(command) {
            hasher.update(&bytes);
        }
    }
    hasher.finalize().into()
}

//! Repository contract for persisting collection save data.

use items_core::CollectionSaveData;

use super::error::Result;

/// Repository for collection save data, keyed by owner.
///
/// Only authoritative collections are saved; replicas rebuild their state
/// from replication.
pub trait SaveRepository: Send + Sync {
    /// Store the save data of `owner`, replacing any previous save.
    fn save(&self, owner: &str, data: &CollectionSaveData) -> Result<()>;

    /// Load the save data of `owner`.
    fn load(&self, owner: &str) -> Result<Option<CollectionSaveData>>;

    /// Check if a save exists
    fn exists(&self, owner: &str) -> bool;

    /// Delete a save. Missing saves are not an error.
    fn delete(&self, owner: &str) -> Result<()>;

    /// List all owners with a save, sorted.
    fn list_keys(&self) -> Result<Vec<String>> {
        Ok(vec![])
    }
}

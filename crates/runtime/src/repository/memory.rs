use std::collections::BTreeMap;
use std::sync::RwLock;

use items_core::CollectionSaveData;

use super::error::{RepositoryError, Result};
use super::traits::SaveRepository;

/// In-memory implementation of [`SaveRepository`]
#[derive(Debug, Default)]
pub struct InMemorySaveRepository {
    saves: RwLock<BTreeMap<String, CollectionSaveData>>,
}

impl InMemorySaveRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SaveRepository for InMemorySaveRepository {
    fn save(&self, owner: &str, data: &CollectionSaveData) -> Result<()> {
        let mut saves = self.saves.write().map_err(|_| RepositoryError::LockPoisoned)?;
        saves.insert(owner.to_string(), data.clone());
        Ok(())
    }

    fn load(&self, owner: &str) -> Result<Option<CollectionSaveData>> {
        let saves = self.saves.read().map_err(|_| RepositoryError::LockPoisoned)?;
        Ok(saves.get(owner).cloned())
    }

    fn exists(&self, owner: &str) -> bool {
        self.saves
            .read()
            .map(|saves| saves.contains_key(owner))
            .unwrap_or(false)
    }

    fn delete(&self, owner: &str) -> Result<()> {
        let mut saves = self.saves.write().map_err(|_| RepositoryError::LockPoisoned)?;
        saves.remove(owner);
        Ok(())
    }

    fn list_keys(&self) -> Result<Vec<String>> {
        let saves = self.saves.read().map_err(|_| RepositoryError::LockPoisoned)?;
        Ok(saves.keys().cloned().collect())
    }
}

//! File-based [`SaveRepository`] implementation.

use std::fs;
use std::path::{Path, PathBuf};

use items_core::CollectionSaveData;

use super::error::{RepositoryError, Result};
use super::traits::SaveRepository;

/// On-disk encoding of save files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SaveFormat {
    /// Compact binary saves (`save_{owner}.bin`).
    #[default]
    Bincode,
    /// Pretty JSON for inspection (`save_{owner}.json`).
    Json,
}

impl SaveFormat {
    fn extension(self) -> &'static str {
        match self {
            SaveFormat::Bincode => "bin",
            SaveFormat::Json => "json",
        }
    }

    fn encode(self, data: &CollectionSaveData) -> Result<Vec<u8>> {
        match self {
            SaveFormat::Bincode => {
                bincode::serialize(data).map_err(|e| RepositoryError::Serialization(e.to_string()))
            }
            SaveFormat::Json => {
                serde_json::to_vec_pretty(data).map_err(|e| RepositoryError::Json(e.to_string()))
            }
        }
    }

    fn decode(self, bytes: &[u8]) -> Result<CollectionSaveData> {
        match self {
            SaveFormat::Bincode => {
                bincode::deserialize(bytes).map_err(|e| RepositoryError::CorruptedData(e.to_string()))
            }
            SaveFormat::Json => {
                serde_json::from_slice(bytes).map_err(|e| RepositoryError::CorruptedData(e.to_string()))
            }
        }
    }
}

/// File-based implementation of [`SaveRepository`].
///
/// Each owner is stored as one file in `base_dir`. Writes go to a temporary
/// file first and are renamed into place.
pub struct FileSaveRepository {
    base_dir: PathBuf,
    format: SaveFormat,
}

impl FileSaveRepository {
    /// Create a bincode repository, creating `base_dir` if needed.
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self> {
        Self::with_format(base_dir, SaveFormat::Bincode)
    }

    pub fn with_format(base_dir: impl AsRef<Path>, format: SaveFormat) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir, format })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn format(&self) -> SaveFormat {
        self.format
    }

    fn save_path(&self, owner: &str) -> Result<PathBuf> {
        let valid = !owner.is_empty()
            && owner
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            && !owner.starts_with('.');
        if !valid {
            return Err(RepositoryError::InvalidKey(owner.to_string()));
        }
        Ok(self
            .base_dir
            .join(format!("save_{}.{}", owner, self.format.extension())))
    }
}

impl SaveRepository for FileSaveRepository {
    fn save(&self, owner: &str, data: &CollectionSaveData) -> Result<()> {
        let path = self.save_path(owner)?;
        let temp_path = path.with_extension(format!("{}.tmp", self.format.extension()));

        let bytes = self.format.encode(data)?;
        fs::write(&temp_path, bytes)?;
        fs::rename(&temp_path, &path)?;

        tracing::debug!("Saved {} to {}", owner, path.display());
        Ok(())
    }

    fn load(&self, owner: &str) -> Result<Option<CollectionSaveData>> {
        let path = self.save_path(owner)?;
        if !path.exists() {
            return Ok(None);
        }

        let bytes = fs::read(&path)?;
        let data = self.format.decode(&bytes)?;

        tracing::debug!("Loaded {} from {}", owner, path.display());
        Ok(Some(data))
    }

    fn exists(&self, owner: &str) -> bool {
        self.save_path(owner).is_ok_and(|path| path.exists())
    }

    fn delete(&self, owner: &str) -> Result<()> {
        let path = self.save_path(owner)?;
        if path.exists() {
            fs::remove_file(&path)?;
            tracing::debug!("Deleted save of {}", owner);
        }
        Ok(())
    }

    fn list_keys(&self) -> Result<Vec<String>> {
        let suffix = format!(".{}", self.format.extension());
        let mut keys = Vec::new();

        for entry in fs::read_dir(&self.base_dir)? {
            let path = entry?.path();
            if let Some(filename) = path.file_name().and_then(|s| s.to_str())
                && let Some(owner) = filename
                    .strip_prefix("save_")
                    .and_then(|s| s.strip_suffix(suffix.as_str()))
            {
                keys.push(owner.to_string());
            }
        }

        keys.sort_unstable();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_keys_cannot_escape_the_directory() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FileSaveRepository::new(dir.path()).unwrap();

        assert!(matches!(
            repo.save("../hero", &CollectionSaveData::default()),
            Err(RepositoryError::InvalidKey(_))
        ));
        assert!(!repo.exists(""));
    }

    #[test]
    fn formats_do_not_see_each_other() {
        let dir = tempfile::tempdir().unwrap();
        let binary = FileSaveRepository::new(dir.path()).unwrap();
        let json = FileSaveRepository::with_format(dir.path(), SaveFormat::Json).unwrap();

        binary.save("hero", &CollectionSaveData::default()).unwrap();

        assert_eq!(binary.list_keys().unwrap(), vec!["hero".to_string()]);
        assert!(json.list_keys().unwrap().is_empty());
        assert_eq!(json.load("hero").unwrap(), None);
    }

    #[test]
    fn corrupted_files_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FileSaveRepository::new(dir.path()).unwrap();
        fs::write(dir.path().join("save_hero.bin"), b"\xff\xff").unwrap();

        assert!(matches!(repo.load("hero"), Err(RepositoryError::CorruptedData(_))));
    }
}

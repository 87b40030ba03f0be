//! Item settings loader.

use std::path::Path;

use items_core::ItemSettings;

use crate::loaders::{LoadResult, read_file};

/// Loader for item settings from TOML files.
pub struct SettingsLoader;

impl SettingsLoader {
    /// Load settings from a TOML file. Missing keys keep their defaults.
    pub fn load(path: &Path) -> LoadResult<ItemSettings> {
        let content = read_file(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> LoadResult<ItemSettings> {
        toml::from_str(content).map_err(|e| anyhow::anyhow!("Failed to parse item settings TOML: {}", e))
    }
}

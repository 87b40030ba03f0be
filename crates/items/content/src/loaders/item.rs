//! Item catalog loader.

use std::path::Path;

use items_core::{ItemCatalog, ItemDefinition, ItemDefinitions};
use serde::{Deserialize, Serialize};

use crate::loaders::{LoadResult, read_file};

/// Item catalog structure for RON files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemCatalogFile {
    pub items: Vec<ItemDefinition>,
}

/// Loader for item catalogs from RON files.
pub struct ItemLoader;

impl ItemLoader {
    /// Load item definitions from a RON file.
    pub fn load(path: &Path) -> LoadResult<Vec<ItemDefinition>> {
        let content = read_file(path)?;
        Self::parse(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse item catalog {}: {}", path.display(), e))
    }

    /// Load a RON file straight into an [`ItemCatalog`].
    ///
    /// Duplicate ids are rejected instead of silently replacing each other.
    pub fn load_catalog(path: &Path) -> LoadResult<ItemCatalog> {
        let definitions = Self::load(path)?;
        let mut catalog = ItemCatalog::new();
        for definition in definitions {
            let id = definition.id.clone();
            if catalog.definition(&id).is_some() {
                anyhow::bail!("Duplicate item definition {} in {}", id, path.display());
            }
            catalog.insert(definition);
        }
        tracing::debug!(path = %path.display(), items = catalog.len(), "loaded item catalog");
        Ok(catalog)
    }

    pub fn parse(content: &str) -> LoadResult<Vec<ItemDefinition>> {
        let catalog: ItemCatalogFile = ron::from_str(content)?;
        Ok(catalog.items)
    }
}

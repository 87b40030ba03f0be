//! Content factory for building item content from data files.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use items_core::{
    ContainerCollection, ContainerGraph, ItemCatalog, ItemSettings, ItemSubsystem, NetRole,
};

use crate::loaders::{ContainerLoader, GraphLoader, ItemLoader, LoadResult, SettingsLoader};
use crate::registry::ContainerRegistry;

/// Content factory that loads all item content from a data directory.
///
/// # Directory Structure
///
/// ```text
/// data_dir/
/// ├── settings.toml
/// ├── items.ron
/// ├── containers.ron
/// └── graphs/
///     └── player.ron
/// ```
pub struct ContentFactory {
    data_dir: PathBuf,
}

impl ContentFactory {
    /// Creates a new content factory pointing to a data directory.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Load item settings from `settings.toml`.
    pub fn load_settings(&self) -> LoadResult<ItemSettings> {
        SettingsLoader::load(&self.data_dir.join("settings.toml"))
    }

    /// Load the item catalog from `items.ron`.
    pub fn load_items(&self) -> LoadResult<ItemCatalog> {
        ItemLoader::load_catalog(&self.data_dir.join("items.ron"))
    }

    /// Load container definitions from `containers.ron`.
    pub fn load_containers(&self) -> LoadResult<ContainerRegistry> {
        ContainerLoader::load(&self.data_dir.join("containers.ron"))
    }

    /// Load `graphs/{graph_name}.ron` resolved against `registry`.
    pub fn load_graph(
        &self,
        graph_name: &str,
        registry: &ContainerRegistry,
    ) -> LoadResult<ContainerGraph> {
        let path = self.data_dir.join("graphs").join(format!("{}.ron", graph_name));
        GraphLoader::load(&path, registry)
    }

    /// Builds an authoritative collection for `owner` from a named graph,
    /// with default items created in every container.
    pub fn build_collection(&self, owner: &str, graph_name: &str) -> LoadResult<ContainerCollection> {
        let mut collection = self.build_containers(owner, graph_name)?;
        for container in collection.container_ids() {
            collection.create_default_items(&container, false);
        }
        collection.take_events();
        Ok(collection)
    }

    /// Builds an empty replica of the same graph. Its items arrive through
    /// replication.
    pub fn build_replica(
        &self,
        owner: &str,
        graph_name: &str,
        role: NetRole,
    ) -> LoadResult<ContainerCollection> {
        if role.has_authority() {
            anyhow::bail!("Replica of {} cannot be built as {}", owner, role);
        }
        let mut collection = self.build_containers(owner, graph_name)?;
        collection.take_events();
        collection.set_role(role);
        Ok(collection)
    }

    fn build_containers(&self, owner: &str, graph_name: &str) -> LoadResult<ContainerCollection> {
        let subsystem = ItemSubsystem::new(self.load_settings()?);
        let catalog = Arc::new(self.load_items()?);
        let registry = self.load_containers()?;
        let graph = self.load_graph(graph_name, &registry)?;

        let mut collection = subsystem.create_collection(owner, catalog);
        collection
            .apply_graph(&graph)
            .map_err(|e| anyhow::anyhow!("Failed to apply graph {}: {}", graph_name, e))?;
        Ok(collection)
    }

    /// Returns the data directory path.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

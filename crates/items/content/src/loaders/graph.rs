//! Container graph template loader.

use std::path::Path;

use items_core::ContainerGraph;

use crate::loaders::{LoadResult, read_file};
use crate::registry::{ContainerRegistry, GraphTemplate};

/// Loader for container graph templates from RON files.
pub struct GraphLoader;

impl GraphLoader {
    /// Load a template without resolving definition names.
    pub fn load_template(path: &Path) -> LoadResult<GraphTemplate> {
        let content = read_file(path)?;
        ron::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse container graph {}: {}", path.display(), e))
    }

    /// Load a template and resolve it against `registry`.
    pub fn load(path: &Path, registry: &ContainerRegistry) -> LoadResult<ContainerGraph> {
        let template = Self::load_template(path)?;
        let graph = template.resolve(registry)?;
        for spec in &graph.links {
            if !spec.link.is_link() {
                anyhow::bail!(
                    "Graph {} links {} with a non-link rule ({})",
                    path.display(),
                    spec.linked_container_id,
                    spec.link.kind()
                );
            }
        }
        Ok(graph)
    }
}

//! Content loaders for reading item data from files.
//!
//! RON is used for catalogs, container definitions and graph templates; TOML
//! for settings. Every loader returns `items-core` types directly.

pub mod container;
pub mod factory;
pub mod graph;
pub mod item;
pub mod settings;

pub use container::ContainerLoader;
pub use factory::ContentFactory;
pub use graph::GraphLoader;
pub use item::ItemLoader;
pub use settings::SettingsLoader;

use std::path::Path;

/// Common result type for loaders.
pub type LoadResult<T> = anyhow::Result<T>;

/// Helper function to read file contents.
pub(crate) fn read_file(path: &Path) -> LoadResult<String> {
    std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read file {}: {}", path.display(), e))
}

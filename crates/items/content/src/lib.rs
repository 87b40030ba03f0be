//! Data-driven item content and its loaders.
//!
//! This crate turns content files into the definition types of `items-core`:
//! - Item catalogs (RON)
//! - Named container definitions (RON)
//! - Container graph templates that reference definitions by name (RON)
//! - Item settings (TOML)
//!
//! Content is read once at startup and shared through `Arc`; nothing here is
//! ever mutated by a collection.

pub mod registry;

#[cfg(feature = "loaders")]
pub mod loaders;

pub use registry::{ContainerEntry, ContainerRegistry, GraphTemplate, UnknownContainerDefinition};

#[cfg(feature = "loaders")]
pub use loaders::{
    ContainerLoader, ContentFactory, GraphLoader, ItemLoader, LoadResult, SettingsLoader,
};

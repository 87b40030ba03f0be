//! Repository layer for collection save data.
//!
//! Repositories persist what an authoritative collection commits with
//! `commit_save_data`. Static content (item catalogs, container definitions)
//! is loaded by `items-content`, not stored here.

mod error;
mod file;
mod memory;
mod traits;

pub use error::RepositoryError;
pub use file::{FileSaveRepository, SaveFormat};
pub use memory::InMemorySaveRepository;
pub use traits::SaveRepository;

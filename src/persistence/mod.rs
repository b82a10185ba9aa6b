//! Durable storage for the saved states catalog.

pub mod json_file;
pub mod writer;

use async_trait::async_trait;

use crate::error::PersistenceError;
use crate::room::SavedStates;

pub use json_file::JsonFileStore;
pub use writer::{CatalogWriter, WriteFailure, WriterOptions};

/// Reads and writes the whole catalog as a single blob.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Load the catalog. A store that has never been written yields an
    /// empty catalog.
    async fn load(&self) -> Result<SavedStates, PersistenceError>;

    /// Replace the stored catalog with `catalog`.
    async fn save(&self, catalog: &SavedStates) -> Result<(), PersistenceError>;
}

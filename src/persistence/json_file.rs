use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info};

use super::CatalogStore;
use crate::error::PersistenceError;
use crate::room::SavedStates;

/// Catalog stored as one flat JSON object (`name -> state`) on disk.
///
/// Writes go to a sibling `.tmp` file first and are renamed into place, so a
/// crash mid-write leaves the previous catalog intact.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn write_error(&self, source: std::io::Error) -> PersistenceError {
        PersistenceError::Write {
            path: self.path.clone(),
            source,
        }
    }
}

#[async_trait]
impl CatalogStore for JsonFileStore {
    async fn load(&self) -> Result<SavedStates, PersistenceError> {
        let data = match tokio::fs::read(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("No saved states at {}, starting with an empty catalog", self.path.display());
                return Ok(SavedStates::new());
            }
            Err(source) => {
                return Err(PersistenceError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let catalog: SavedStates =
            serde_json::from_slice(&data).map_err(|source| PersistenceError::Corrupt {
                path: self.path.clone(),
                source,
            })?;
        info!("Loaded {} saved states from {}", catalog.len(), self.path.display());
        Ok(catalog)
    }

    async fn save(&self, catalog: &SavedStates) -> Result<(), PersistenceError> {
        let data = serde_json::to_vec(catalog)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.write_error(e))?;
        }

        let temp = self.temp_path();
        tokio::fs::write(&temp, &data)
            .await
            .map_err(|e| self.write_error(e))?;
        tokio::fs::rename(&temp, &self.path)
            .await
            .map_err(|e| self.write_error(e))?;

        debug!("Wrote {} saved states ({} bytes) to {}", catalog.len(), data.len(), self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_catalog() -> SavedStates {
        let mut catalog = SavedStates::new();
        catalog.insert(
            "board".into(),
            json!({
                "pieces": [1, 2.5, "three", null, true],
                "meta": { "owner": "Quiet Otter", "nested": { "deep": [] } }
            })
            .as_object()
            .cloned()
            .unwrap(),
        );
        catalog.insert("empty".into(), Default::default());
        catalog
    }

    #[tokio::test]
    async fn test_missing_file_is_empty_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("absent.states.json"));
        let catalog = store.load().await.unwrap();
        assert!(catalog.is_empty());
    }

    #[tokio::test]
    async fn test_save_then_load_is_lossless() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("app.xml.states.json"));
        let catalog = sample_catalog();

        store.save(&catalog).await.unwrap();
        let reloaded = JsonFileStore::new(store.path()).load().await.unwrap();
        assert_eq!(reloaded, catalog);
        assert!(!store.temp_path().exists());
    }

    #[tokio::test]
    async fn test_file_is_flat_json_object() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("states.json"));
        store.save(&sample_catalog()).await.unwrap();

        let raw: serde_json::Value =
            serde_json::from_slice(&std::fs::read(store.path()).unwrap()).unwrap();
        assert_eq!(raw["empty"], json!({}));
        assert_eq!(raw["board"]["meta"]["owner"], json!("Quiet Otter"));
    }

    #[tokio::test]
    async fn test_save_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("nested/dir/states.json"));
        store.save(&sample_catalog()).await.unwrap();
        assert!(store.path().exists());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("states.json");
        std::fs::write(&path, b"{ not json").unwrap();

        let err = JsonFileStore::new(&path).load().await.unwrap_err();
        assert!(matches!(err, PersistenceError::Corrupt { .. }));
    }

    #[tokio::test]
    async fn test_non_object_entries_are_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("states.json");
        std::fs::write(&path, br#"{ "a": 5 }"#).unwrap();

        let err = JsonFileStore::new(&path).load().await.unwrap_err();
        assert!(matches!(err, PersistenceError::Corrupt { .. }));
    }

    #[tokio::test]
    async fn test_unreadable_path_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be read as a file.
        let err = JsonFileStore::new(dir.path()).load().await.unwrap_err();
        assert!(matches!(err, PersistenceError::Read { .. }));
    }
}

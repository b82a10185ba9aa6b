use std::collections::BTreeMap;

use super::document::Document;

/// Saved states keyed by name.
pub type SavedStates = BTreeMap<String, Document>;

/// In-memory mirror of the persisted saved states.
#[derive(Debug, Default)]
pub struct SavedStateCatalog {
    entries: SavedStates,
}

impl SavedStateCatalog {
    pub fn new(entries: SavedStates) -> Self {
        Self { entries }
    }

    /// Store `document` under `name`, replacing any earlier entry.
    pub fn add(&mut self, name: String, document: Document) -> &SavedStates {
        self.entries.insert(name, document);
        &self.entries
    }

    pub fn entries(&self) -> &SavedStates {
        &self.entries
    }
}

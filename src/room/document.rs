use serde_json::{Map, Value};

/// The shared key-value document.
pub type Document = Map<String, Value>;

/// Owner of the room's single shared document.
///
/// Writes are unconditional overwrites; whoever reaches the store last wins.
#[derive(Debug, Default)]
pub struct StateStore {
    document: Document,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> &Document {
        &self.document
    }

    /// Merge `delta` into the document, then drop `delete_keys`.
    ///
    /// Deletions run after every upsert, so a key named in both is gone
    /// afterwards.
    pub fn apply_delta(&mut self, delta: Document, delete_keys: &[String]) -> &Document {
        for (key, value) in delta {
            self.document.insert(key, value);
        }
        for key in delete_keys {
            self.document.remove(key);
        }
        &self.document
    }

    /// Replace the whole document, or clear it when `document` is `None`.
    pub fn reset(&mut self, document: Option<Document>) -> &Document {
        self.document = document.unwrap_or_default();
        &self.document
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    #[test]
    fn test_disjoint_deltas_union() {
        let mut store = StateStore::new();
        store.apply_delta(doc(json!({ "a": 1, "b": [1, 2] })), &[]);
        store.apply_delta(doc(json!({ "c": { "nested": true } })), &[]);
        assert_eq!(
            Value::Object(store.current().clone()),
            json!({ "a": 1, "b": [1, 2], "c": { "nested": true } })
        );

        let mut reversed = StateStore::new();
        reversed.apply_delta(doc(json!({ "c": { "nested": true } })), &[]);
        reversed.apply_delta(doc(json!({ "a": 1, "b": [1, 2] })), &[]);
        assert_eq!(store.current(), reversed.current());
    }

    #[test]
    fn test_later_write_wins() {
        let mut store = StateStore::new();
        store.apply_delta(doc(json!({ "x": 1 })), &[]);
        store.apply_delta(doc(json!({ "x": "two" })), &[]);
        assert_eq!(store.current()["x"], json!("two"));
    }

    #[test]
    fn test_delete_wins_over_upsert_in_same_call() {
        let mut store = StateStore::new();
        store.apply_delta(doc(json!({ "k": 1, "keep": 2 })), &["k".to_string()]);
        assert!(!store.current().contains_key("k"));
        assert_eq!(store.current()["keep"], json!(2));
    }

    #[test]
    fn test_delete_missing_key_is_noop() {
        let mut store = StateStore::new();
        store.apply_delta(doc(json!({ "a": 1 })), &["nope".to_string()]);
        assert_eq!(Value::Object(store.current().clone()), json!({ "a": 1 }));
    }

    #[test]
    fn test_apply_delta_is_idempotent() {
        let delta = doc(json!({ "a": 1, "b": null }));
        let deletes = vec!["c".to_string()];

        let mut once = StateStore::new();
        once.apply_delta(doc(json!({ "c": 3 })), &[]);
        once.apply_delta(delta.clone(), &deletes);

        let mut twice = StateStore::new();
        twice.apply_delta(doc(json!({ "c": 3 })), &[]);
        twice.apply_delta(delta.clone(), &deletes);
        twice.apply_delta(delta, &deletes);

        assert_eq!(once.current(), twice.current());
    }

    #[test]
    fn test_reset_replaces_or_clears() {
        let mut store = StateStore::new();
        store.apply_delta(doc(json!({ "old": 1 })), &[]);
        store.reset(Some(doc(json!({ "new": 2 }))));
        assert_eq!(Value::Object(store.current().clone()), json!({ "new": 2 }));
        store.reset(None);
        assert!(store.current().is_empty());
    }
}

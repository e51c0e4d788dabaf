//! Host-managed settings storage.
//!
//! The host owns persistence; the connector only reads and (for form
//! round-trips) writes JSON values under a fixed key. [`MemorySettings`]
//! backs tests and embedded hosts without a persistence layer.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde_json::Value;

/// Settings storage supplied by the host.
pub trait SettingsStore: Send + Sync {
    /// Raw JSON value stored under `key`, if any.
    fn get(&self, key: &str) -> Option<Value>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: Value);
}

/// In-memory [`SettingsStore`].
#[derive(Debug, Default)]
pub struct MemorySettings {
    values: RwLock<HashMap<String, Value>>,
}

impl SettingsStore for MemorySettings {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: Value) {
        self.values.write().insert(key.to_string(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn set_then_get_round_trips() {
        let store = MemorySettings::default();
        assert!(store.get("picbed.gitcode").is_none());
        store.set("picbed.gitcode", json!({"owner": "acme"}));
        assert_eq!(
            store.get("picbed.gitcode").unwrap()["owner"],
            json!("acme")
        );
    }

    #[test]
    fn set_replaces_previous_value() {
        let store = MemorySettings::default();
        store.set("k", json!(1));
        store.set("k", json!(2));
        assert_eq!(store.get("k"), Some(json!(2)));
    }
}

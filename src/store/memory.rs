//! In-memory store for tests and ephemeral sessions.

use crate::store::{KeyValueStore, StoreError};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// A store that keeps values in memory.
///
/// Clones share the same map, so a test can keep a handle and inspect what
/// the step counter persisted.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: Arc<Mutex<HashMap<String, f32>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds `key = value`.
    pub fn with_value(key: &str, value: f32) -> Self {
        let store = Self::new();
        if let Ok(mut values) = store.values.lock() {
            values.insert(key.to_string(), value);
        }
        store
    }
}

impl KeyValueStore for MemoryStore {
    fn get_f32(&self, key: &str, default: f32) -> Result<f32, StoreError> {
        let values = self
            .values
            .lock()
            .map_err(|e| StoreError::IoError(e.to_string()))?;
        Ok(values.get(key).copied().unwrap_or(default))
    }

    fn put_f32(&mut self, key: &str, value: f32) -> Result<(), StoreError> {
        let mut values = self
            .values
            .lock()
            .map_err(|e| StoreError::IoError(e.to_string()))?;
        values.insert(key.to_string(), value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_values() {
        let store = MemoryStore::new();
        let mut writer = store.clone();

        writer.put_f32("k", 3.0).unwrap();
        assert_eq!(store.get_f32("k", 0.0).unwrap(), 3.0);
        assert_eq!(store.get_f32("missing", 8.0).unwrap(), 8.0);
    }
}

//! JSON-file backed preferences.
//!
//! Each preference file is a flat JSON object of key to number, kept under
//! `<data_path>/shared_prefs/<name>.json`. Every read goes to disk so a value
//! written by another process (e.g. `stepper reset`) is picked up on the next
//! start.

use crate::store::{KeyValueStore, StoreError};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// A named preference file.
#[derive(Debug, Clone)]
pub struct PreferenceStore {
    path: PathBuf,
}

impl PreferenceStore {
    /// Open the preference file `name` under `data_path`.
    ///
    /// The file is not created until the first write.
    pub fn open(data_path: &Path, name: &str) -> Self {
        Self {
            path: data_path.join("shared_prefs").join(format!("{name}.json")),
        }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<Map<String, Value>, StoreError> {
        if !self.path.exists() {
            return Ok(Map::new());
        }

        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| StoreError::IoError(e.to_string()))?;
        if content.trim().is_empty() {
            return Ok(Map::new());
        }

        serde_json::from_str(&content).map_err(|e| StoreError::ParseError(e.to_string()))
    }
}

impl KeyValueStore for PreferenceStore {
    fn get_f32(&self, key: &str, default: f32) -> Result<f32, StoreError> {
        match self.read_all()?.get(key) {
            None => Ok(default),
            Some(value) => value
                .as_f64()
                .map(|v| v as f32)
                .ok_or_else(|| StoreError::ParseError(format!("`{key}` is not a number"))),
        }
    }

    fn put_f32(&mut self, key: &str, value: f32) -> Result<(), StoreError> {
        let mut values = match self.read_all() {
            Ok(values) => values,
            Err(StoreError::ParseError(e)) => {
                tracing::warn!(path = ?self.path, "Replacing unreadable preference file: {e}");
                Map::new()
            }
            Err(e) => return Err(e),
        };
        let number = serde_json::Number::from_f64(f64::from(value))
            .ok_or_else(|| StoreError::SerializeError(format!("`{value}` is not finite")))?;
        values.insert(key.to_string(), Value::Number(number));

        // Ensure parent directory exists
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(&values)
            .map_err(|e| StoreError::SerializeError(e.to_string()))?;

        // Write then rename so an interrupted write never leaves a torn file
        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, content).map_err(|e| StoreError::IoError(e.to_string()))?;
        std::fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::IoError(e.to_string()))?;

        tracing::debug!(key, value, path = ?self.path, "preference written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{BASELINE_KEY, PREFS_NAME};

    #[test]
    fn test_missing_file_returns_default() {
        let dir = tempfile::tempdir().unwrap();
        let store = PreferenceStore::open(dir.path(), PREFS_NAME);

        assert_eq!(store.get_f32(BASELINE_KEY, 0.0).unwrap(), 0.0);
        assert!(!store.path().exists());
    }

    #[test]
    fn test_value_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();

        let mut store = PreferenceStore::open(dir.path(), PREFS_NAME);
        store.put_f32(BASELINE_KEY, 1234.0).unwrap();
        drop(store);

        let reopened = PreferenceStore::open(dir.path(), PREFS_NAME);
        assert_eq!(reopened.get_f32(BASELINE_KEY, 0.0).unwrap(), 1234.0);
    }

    #[test]
    fn test_other_keys_preserved() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = PreferenceStore::open(dir.path(), PREFS_NAME);

        store.put_f32("other", 1.5).unwrap();
        store.put_f32(BASELINE_KEY, 9.0).unwrap();

        assert_eq!(store.get_f32("other", 0.0).unwrap(), 1.5);
        assert_eq!(store.get_f32(BASELINE_KEY, 0.0).unwrap(), 9.0);
    }

    #[test]
    fn test_corrupt_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = PreferenceStore::open(dir.path(), PREFS_NAME);
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(store.path(), "{not json").unwrap();

        assert!(matches!(
            store.get_f32(BASELINE_KEY, 0.0),
            Err(StoreError::ParseError(_))
        ));
    }

    #[test]
    fn test_write_replaces_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = PreferenceStore::open(dir.path(), PREFS_NAME);
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(store.path(), "garbage").unwrap();

        store.put_f32(BASELINE_KEY, 500.0).unwrap();
        assert_eq!(store.get_f32(BASELINE_KEY, 0.0).unwrap(), 500.0);
        assert!(!store.path().with_extension("json.tmp").exists());
    }

    #[test]
    fn test_non_finite_value_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = PreferenceStore::open(dir.path(), PREFS_NAME);

        assert!(matches!(
            store.put_f32(BASELINE_KEY, f32::NAN),
            Err(StoreError::SerializeError(_))
        ));
    }
}

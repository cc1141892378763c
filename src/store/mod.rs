//! Persistent key-value storage.
//!
//! The step counter persists exactly one value, the baseline, under
//! [`BASELINE_KEY`]. Stores are synchronous and private to the application.

pub mod memory;
pub mod prefs;

pub use memory::MemoryStore;
pub use prefs::PreferenceStore;

/// Preference file the baseline lives in.
pub const PREFS_NAME: &str = "savedPref";

/// Key the baseline is stored under.
pub const BASELINE_KEY: &str = "prevSteps";

/// Synchronous key-value store for scalar values.
pub trait KeyValueStore: Send {
    /// Read a value, returning `default` when the key is absent.
    fn get_f32(&self, key: &str, default: f32) -> Result<f32, StoreError>;

    /// Write a value.
    fn put_f32(&mut self, key: &str, value: f32) -> Result<(), StoreError>;
}

/// Storage errors.
#[derive(Debug)]
pub enum StoreError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::IoError(e) => write!(f, "IO error: {e}"),
            StoreError::ParseError(e) => write!(f, "Parse error: {e}"),
            StoreError::SerializeError(e) => write!(f, "Serialize error: {e}"),
        }
    }
}

impl std::error::Error for StoreError {}

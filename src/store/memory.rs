//! In-memory store backend.

use dashmap::DashMap;

use crate::error::ConfigError;
use crate::store::{SerializedStore, UNSET_STAMP};

/// Ephemeral [`SerializedStore`] backed by concurrent maps. Used in tests
/// and for configs that do not need to survive a restart.
#[derive(Default)]
pub struct MemoryStore {
    values: DashMap<String, String>,
    stamps: DashMap<String, i64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SerializedStore for MemoryStore {
    fn get_value(&self, key: &str) -> Result<Option<String>, ConfigError> {
        Ok(self.values.get(key).map(|v| v.clone()))
    }

    fn set_value(&self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.values.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove_value(&self, key: &str) -> Result<(), ConfigError> {
        self.values.remove(key);
        Ok(())
    }

    fn stamp(&self, key: &str) -> Result<i64, ConfigError> {
        Ok(self.stamps.get(key).map(|s| *s).unwrap_or(UNSET_STAMP))
    }

    fn set_stamp(&self, key: &str, stamp: i64) -> Result<(), ConfigError> {
        self.stamps.insert(key.to_owned(), stamp);
        Ok(())
    }

    fn remove_stamp(&self, key: &str) -> Result<(), ConfigError> {
        self.stamps.remove(key);
        Ok(())
    }
}

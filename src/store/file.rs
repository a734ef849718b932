//! File-backed store backend.
//!
//! One file per record under a root directory, mirroring the original
//! storage layout of one blob per slot. Record keys are mapped to file
//! names by replacing `:` with `_`; timestamps live in a `.timestamp`
//! sidecar holding a decimal i64.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::store::{SerializedStore, UNSET_STAMP};

/// Durable [`SerializedStore`] writing each record to its own file.
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Open (creating if needed) a store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn value_path(&self, key: &str) -> PathBuf {
        self.root.join(key.replace(':', "_"))
    }

    fn stamp_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.timestamp", key.replace(':', "_")))
    }

    fn read_optional(path: &Path) -> Result<Option<String>, ConfigError> {
        match fs::read_to_string(path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn remove_if_exists(path: &Path) -> Result<(), ConfigError> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

impl SerializedStore for FileStore {
    fn get_value(&self, key: &str) -> Result<Option<String>, ConfigError> {
        Self::read_optional(&self.value_path(key))
    }

    fn set_value(&self, key: &str, value: &str) -> Result<(), ConfigError> {
        fs::write(self.value_path(key), value)?;
        Ok(())
    }

    fn remove_value(&self, key: &str) -> Result<(), ConfigError> {
        Self::remove_if_exists(&self.value_path(key))
    }

    fn stamp(&self, key: &str) -> Result<i64, ConfigError> {
        match Self::read_optional(&self.stamp_path(key))? {
            Some(text) => text
                .trim()
                .parse()
                .map_err(|_| ConfigError::Codec(format!("corrupt timestamp for `{key}`"))),
            None => Ok(UNSET_STAMP),
        }
    }

    fn set_stamp(&self, key: &str, stamp: i64) -> Result<(), ConfigError> {
        fs::write(self.stamp_path(key), stamp.to_string())?;
        Ok(())
    }

    fn remove_stamp(&self, key: &str) -> Result<(), ConfigError> {
        Self::remove_if_exists(&self.stamp_path(key))
    }
}

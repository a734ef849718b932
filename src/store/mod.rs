//! Local persistence of configuration slots.
//!
//! Each configuration kind owns three slots — Default, Fetched, Activated —
//! persisted as text blobs with paired timestamps in a [`SerializedStore`].
//! [`ConfigStore`] layers the slot state machine on top; [`MemoryStore`]
//! and [`FileStore`] are the built-in backends.

pub mod config_store;
pub mod file;
pub mod memory;

pub use config_store::ConfigStore;
pub use file::FileStore;
pub use memory::MemoryStore;

use std::fmt;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::ConfigError;

/// Sentinel timestamp meaning "slot never written" (or written without a
/// timestamp, as defaults are).
pub const UNSET_STAMP: i64 = -1;

/// Wall-clock milliseconds since the Unix epoch.
pub(crate) fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

/// Identifier of one configuration type; partition key into the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConfigKind(String);

impl ConfigKind {
    /// Build a kind from a non-blank name.
    pub fn new(name: impl Into<String>) -> Result<Self, ConfigError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ConfigError::InvalidResourceName);
        }
        Ok(Self(name))
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConfigKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One of the three versions a configuration value can live in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Default,
    Fetched,
    Activated,
}

impl Slot {
    pub fn as_str(&self) -> &'static str {
        match self {
            Slot::Default => "default",
            Slot::Fetched => "fetched",
            Slot::Activated => "activated",
        }
    }
}

/// Record key for a slot's value: `{kind}:{slot}`. The paired timestamp
/// lives under `{kind}:{slot}:timestamp`.
pub(crate) fn slot_key(kind: &ConfigKind, slot: Slot) -> String {
    format!("{}:{}", kind.name(), slot.as_str())
}

/// Durable key -> text mapping with paired numeric timestamps.
///
/// Implementations must keep each (value, timestamp) pair update atomic
/// enough that a torn value/timestamp combination is never observable;
/// callers serialize whole-slot updates above this trait.
pub trait SerializedStore: Send + Sync {
    fn get_value(&self, key: &str) -> Result<Option<String>, ConfigError>;
    fn set_value(&self, key: &str, value: &str) -> Result<(), ConfigError>;
    fn remove_value(&self, key: &str) -> Result<(), ConfigError>;

    /// Timestamp paired with `key`, or [`UNSET_STAMP`] when absent.
    fn stamp(&self, key: &str) -> Result<i64, ConfigError>;
    fn set_stamp(&self, key: &str, stamp: i64) -> Result<(), ConfigError>;
    fn remove_stamp(&self, key: &str) -> Result<(), ConfigError>;
}

/// Slot-level contract the rest of the crate consumes.
///
/// [`ConfigStore`] is the built-in implementation; alternatives must honor
/// the same slot semantics (default bootstrap, monotonic activation,
/// -1 sentinel for "never fetched").
pub trait LocalRepository<T>: Send + Sync {
    /// Store a default config. Seeds the Activated slot on first run,
    /// otherwise runs migration conflict handling.
    fn store_default(&self, value: &T) -> Result<(), ConfigError>;

    /// Store a freshly fetched config with its completion timestamp.
    fn store_fetched(&self, value: &T, timestamp: i64) -> Result<(), ConfigError>;

    /// Completion timestamp of the last fetch, or [`UNSET_STAMP`].
    fn fetched_timestamp(&self) -> Result<i64, ConfigError>;

    /// The last fetched config, if any.
    fn last_fetched(&self) -> Result<Option<Arc<T>>, ConfigError>;

    /// Promote Fetched into Activated when strictly newer; no-op otherwise.
    fn activate(&self) -> Result<(), ConfigError>;

    /// Activated config if set, else the default, else `None`.
    fn config(&self) -> Result<Option<Arc<T>>, ConfigError>;

    /// Erase all three slots and their timestamps.
    fn clear(&self) -> Result<(), ConfigError>;
}

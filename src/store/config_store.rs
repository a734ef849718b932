//! Three-slot state machine for one configuration kind.
//!
//! # Responsibilities
//! - Persist Default / Fetched / Activated slots and their timestamps
//! - Seed Activated from the first default (bootstrap)
//! - Promote Fetched into Activated only when strictly newer
//! - Run migration conflict handling when a new default collides with
//!   activated data
//!
//! # Design Decisions
//! - One mutex per kind: every slot update (value + timestamp) happens
//!   under it, so readers see pre- or post-write state, never a torn mix
//! - The deserialized activated value is memoized in an `ArcSwapOption`
//!   and invalidated whenever the Activated slot changes
//! - An Activated slot whose timestamp is the sentinel originated from a
//!   default, so a newer default may overwrite it without conflict

use std::sync::{Arc, Mutex};

use arc_swap::ArcSwapOption;
use serde_json::Value;

use crate::error::ConfigError;
use crate::mapper::Mapper;
use crate::merge::{merge, MigrationStrategy};
use crate::store::{slot_key, ConfigKind, LocalRepository, SerializedStore, Slot, UNSET_STAMP};

/// The built-in [`LocalRepository`] over a [`SerializedStore`] backend.
pub struct ConfigStore<T> {
    kind: ConfigKind,
    backend: Arc<dyn SerializedStore>,
    mapper: Arc<dyn Mapper<T>>,
    migration: MigrationStrategy,
    lock: Mutex<()>,
    active: ArcSwapOption<T>,
}

impl<T> ConfigStore<T> {
    pub fn new(
        kind: ConfigKind,
        backend: Arc<dyn SerializedStore>,
        mapper: Arc<dyn Mapper<T>>,
        migration: MigrationStrategy,
    ) -> Self {
        Self {
            kind,
            backend,
            mapper,
            migration,
            lock: Mutex::new(()),
            active: ArcSwapOption::empty(),
        }
    }

    pub fn kind(&self) -> &ConfigKind {
        &self.kind
    }

    fn key(&self, slot: Slot) -> String {
        slot_key(&self.kind, slot)
    }

    /// Merge the superseded default underneath the activated document.
    /// Non-JSON payloads cannot be merged structurally; the activated
    /// value is kept untouched in that case.
    fn resolve_conflict(&self, default_text: &str) -> Result<(), ConfigError> {
        match self.migration {
            MigrationStrategy::ActivatedOnly => Ok(()),
            MigrationStrategy::Merge => {
                let activated_key = self.key(Slot::Activated);
                let Some(activated_text) = self.backend.get_value(&activated_key)? else {
                    return Ok(());
                };

                let low: Result<Value, _> = serde_json::from_str(default_text);
                let high: Result<Value, _> = serde_json::from_str(&activated_text);
                let (Ok(low), Ok(high)) = (low, high) else {
                    tracing::debug!(kind = %self.kind, "non-json payload, skipping merge");
                    return Ok(());
                };

                let merged = merge(&low, &high);
                self.backend
                    .set_value(&activated_key, &merged.to_string())?;
                // Timestamp untouched: a merge is not a re-fetch.
                self.active.store(None);
                tracing::info!(kind = %self.kind, "merged new default into activated config");
                Ok(())
            }
        }
    }
}

impl<T> LocalRepository<T> for ConfigStore<T>
where
    T: Send + Sync,
{
    fn store_default(&self, value: &T) -> Result<(), ConfigError> {
        let text = self.mapper.to_text(value)?;
        let _guard = self.lock.lock().expect("config store mutex poisoned");

        let default_key = self.key(Slot::Default);
        self.backend.set_value(&default_key, &text)?;
        self.backend.remove_stamp(&default_key)?;

        let activated_key = self.key(Slot::Activated);
        if self.backend.stamp(&activated_key)? == UNSET_STAMP {
            // First run, or the previous activated value came from an older
            // default: bootstrap Activated from the new default.
            self.backend.set_value(&activated_key, &text)?;
            self.active.store(None);
            tracing::debug!(kind = %self.kind, "seeded activated slot from default");
            Ok(())
        } else {
            self.resolve_conflict(&text)
        }
    }

    fn store_fetched(&self, value: &T, timestamp: i64) -> Result<(), ConfigError> {
        let text = self.mapper.to_text(value)?;
        let _guard = self.lock.lock().expect("config store mutex poisoned");

        let fetched_key = self.key(Slot::Fetched);
        self.backend.set_value(&fetched_key, &text)?;
        self.backend.set_stamp(&fetched_key, timestamp)?;
        Ok(())
    }

    fn fetched_timestamp(&self) -> Result<i64, ConfigError> {
        let _guard = self.lock.lock().expect("config store mutex poisoned");
        self.backend.stamp(&self.key(Slot::Fetched))
    }

    fn last_fetched(&self) -> Result<Option<Arc<T>>, ConfigError> {
        let _guard = self.lock.lock().expect("config store mutex poisoned");
        match self.backend.get_value(&self.key(Slot::Fetched))? {
            None => Ok(None),
            Some(text) => Ok(Some(Arc::new(self.mapper.from_text(&text)?))),
        }
    }

    fn activate(&self) -> Result<(), ConfigError> {
        let _guard = self.lock.lock().expect("config store mutex poisoned");

        let fetched_key = self.key(Slot::Fetched);
        let activated_key = self.key(Slot::Activated);
        let fetched_ts = self.backend.stamp(&fetched_key)?;
        let activated_ts = self.backend.stamp(&activated_key)?;

        if fetched_ts <= activated_ts {
            tracing::debug!(kind = %self.kind, "no newer fetched config to activate");
            return Ok(());
        }
        let Some(text) = self.backend.get_value(&fetched_key)? else {
            tracing::debug!(kind = %self.kind, "no fetched config to activate");
            return Ok(());
        };

        self.backend.set_value(&activated_key, &text)?;
        self.backend.set_stamp(&activated_key, fetched_ts)?;
        self.active.store(None);
        tracing::info!(kind = %self.kind, timestamp = fetched_ts, "activated fetched config");
        Ok(())
    }

    fn config(&self) -> Result<Option<Arc<T>>, ConfigError> {
        if let Some(cached) = self.active.load_full() {
            return Ok(Some(cached));
        }

        let _guard = self.lock.lock().expect("config store mutex poisoned");
        let text = match self.backend.get_value(&self.key(Slot::Activated))? {
            Some(text) => Some(text),
            None => self.backend.get_value(&self.key(Slot::Default))?,
        };
        match text {
            None => Ok(None),
            Some(text) => {
                let value = Arc::new(self.mapper.from_text(&text)?);
                self.active.store(Some(value.clone()));
                Ok(Some(value))
            }
        }
    }

    fn clear(&self) -> Result<(), ConfigError> {
        let _guard = self.lock.lock().expect("config store mutex poisoned");

        for slot in [Slot::Default, Slot::Fetched, Slot::Activated] {
            let key = self.key(slot);
            self.backend.remove_value(&key)?;
            self.backend.remove_stamp(&key)?;
        }
        self.active.store(None);
        tracing::info!(kind = %self.kind, "cleared all config slots");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::JsonMapper;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn store(migration: MigrationStrategy) -> ConfigStore<Value> {
        ConfigStore::new(
            ConfigKind::new("app").unwrap(),
            Arc::new(MemoryStore::new()),
            Arc::new(JsonMapper::new()),
            migration,
        )
    }

    #[test]
    fn test_default_bootstraps_activated() {
        let store = store(MigrationStrategy::ActivatedOnly);
        store.store_default(&json!({"level": "info"})).unwrap();

        let config = store.config().unwrap().unwrap();
        assert_eq!(*config, json!({"level": "info"}));
    }

    #[test]
    fn test_empty_store_yields_none() {
        let store = store(MigrationStrategy::ActivatedOnly);
        assert!(store.config().unwrap().is_none());
        assert_eq!(store.fetched_timestamp().unwrap(), UNSET_STAMP);
    }

    #[test]
    fn test_fetched_does_not_touch_activated() {
        let store = store(MigrationStrategy::ActivatedOnly);
        store.store_default(&json!({"v": 1})).unwrap();
        store.store_fetched(&json!({"v": 2}), 100).unwrap();

        assert_eq!(*store.config().unwrap().unwrap(), json!({"v": 1}));
        assert_eq!(store.fetched_timestamp().unwrap(), 100);
        assert_eq!(*store.last_fetched().unwrap().unwrap(), json!({"v": 2}));
    }

    #[test]
    fn test_activate_promotes_newer_fetch() {
        let store = store(MigrationStrategy::ActivatedOnly);
        store.store_default(&json!({"v": 1})).unwrap();
        store.store_fetched(&json!({"v": 2}), 100).unwrap();
        store.activate().unwrap();

        assert_eq!(*store.config().unwrap().unwrap(), json!({"v": 2}));
    }

    #[test]
    fn test_activate_never_regresses() {
        let store = store(MigrationStrategy::ActivatedOnly);
        store.store_fetched(&json!({"v": "new"}), 200).unwrap();
        store.activate().unwrap();

        // An older fetch must not replace the newer activated value.
        store.store_fetched(&json!({"v": "old"}), 150).unwrap();
        store.activate().unwrap();
        assert_eq!(*store.config().unwrap().unwrap(), json!({"v": "new"}));
    }

    #[test]
    fn test_double_activate_is_noop() {
        let store = store(MigrationStrategy::ActivatedOnly);
        store.store_fetched(&json!({"v": 1}), 100).unwrap();
        store.activate().unwrap();
        let first = store.config().unwrap().unwrap();

        store.activate().unwrap();
        let second = store.config().unwrap().unwrap();
        assert_eq!(first, second);
        // Memo survives the no-op: no write happened.
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_activate_without_fetch_keeps_default() {
        let store = store(MigrationStrategy::ActivatedOnly);
        store.store_default(&json!({"v": "default"})).unwrap();
        store.activate().unwrap();
        assert_eq!(*store.config().unwrap().unwrap(), json!({"v": "default"}));
    }

    #[test]
    fn test_newer_default_reseeds_default_derived_activated() {
        let store = store(MigrationStrategy::ActivatedOnly);
        store.store_default(&json!({"v": 1})).unwrap();
        // Activated still carries the sentinel timestamp, so it is
        // default-derived and the new default simply replaces it.
        store.store_default(&json!({"v": 2})).unwrap();
        assert_eq!(*store.config().unwrap().unwrap(), json!({"v": 2}));
    }

    #[test]
    fn test_activated_only_ignores_conflicts() {
        let store = store(MigrationStrategy::ActivatedOnly);
        store.store_fetched(&json!({"k1": "remote"}), 100).unwrap();
        store.activate().unwrap();

        store
            .store_default(&json!({"k1": "default", "k2": "default"}))
            .unwrap();
        assert_eq!(*store.config().unwrap().unwrap(), json!({"k1": "remote"}));
    }

    #[test]
    fn test_merge_strategy_fills_gaps_from_default() {
        let store = store(MigrationStrategy::Merge);
        store.store_fetched(&json!({"k1": "remote"}), 100).unwrap();
        store.activate().unwrap();

        store
            .store_default(&json!({"k1": "default", "k2": "default"}))
            .unwrap();
        assert_eq!(
            *store.config().unwrap().unwrap(),
            json!({"k1": "remote", "k2": "default"})
        );
    }

    #[test]
    fn test_merge_skips_non_json_payloads() {
        let store = ConfigStore::new(
            ConfigKind::new("motd").unwrap(),
            Arc::new(MemoryStore::new()),
            Arc::new(crate::mapper::TextMapper),
            MigrationStrategy::Merge,
        );
        store.store_fetched(&"remote text".to_string(), 100).unwrap();
        store.activate().unwrap();

        // Plain-text payloads cannot be merged structurally; the
        // activated value stays untouched.
        store.store_default(&"default text".to_string()).unwrap();
        assert_eq!(*store.config().unwrap().unwrap(), "remote text");
    }

    #[test]
    fn test_merge_keeps_activated_timestamp() {
        let store = store(MigrationStrategy::Merge);
        store.store_fetched(&json!({"k1": "remote"}), 100).unwrap();
        store.activate().unwrap();
        store.store_default(&json!({"k2": "default"})).unwrap();

        // A later fetch with a newer timestamp must still win activation.
        store.store_fetched(&json!({"k1": "fresh"}), 200).unwrap();
        store.activate().unwrap();
        assert_eq!(*store.config().unwrap().unwrap(), json!({"k1": "fresh"}));
    }

    #[test]
    fn test_clear_erases_everything() {
        let store = store(MigrationStrategy::ActivatedOnly);
        store.store_default(&json!({"v": 1})).unwrap();
        store.store_fetched(&json!({"v": 2}), 100).unwrap();
        store.activate().unwrap();

        store.clear().unwrap();
        assert!(store.config().unwrap().is_none());
        assert_eq!(store.fetched_timestamp().unwrap(), UNSET_STAMP);
        assert!(store.last_fetched().unwrap().is_none());
    }
}

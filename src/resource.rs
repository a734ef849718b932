//! Per-kind configuration resource façade.
//!
//! # Responsibilities
//! - Compose the local repository, remote repository, cache strategy and
//!   fetch coordinator for one configuration kind
//! - Gate fetches on staleness before touching the coordinator
//!
//! # Design Decisions
//! - Construction goes through a builder whose `build()` is the only way
//!   to obtain a usable resource: missing collaborators fail there, so a
//!   built resource is always ready
//! - `fetch` returns a handle synchronously and never blocks the caller;
//!   everything else is synchronous store work

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::cache::CacheStrategy;
use crate::error::ConfigError;
use crate::fetch::coordinator::{FetchCoordinator, FetchHandle, FetchOutcome};
use crate::fetch::remote::RemoteRepository;
use crate::mapper::{JsonMapper, Mapper};
use crate::merge::MigrationStrategy;
use crate::store::{now_millis, ConfigKind, ConfigStore, LocalRepository, SerializedStore};

/// Façade over one configuration kind: defaults, fetching, activation.
pub struct ConfigResource<T> {
    kind: ConfigKind,
    local: Arc<dyn LocalRepository<T>>,
    remote: Arc<dyn RemoteRepository<T>>,
    cache: CacheStrategy,
    coordinator: FetchCoordinator<T>,
}

impl<T> std::fmt::Debug for ConfigResource<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigResource")
            .field("kind", &self.kind)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl<T: Send + Sync + 'static> ConfigResource<T> {
    pub fn builder(name: impl Into<String>) -> ConfigResourceBuilder<T> {
        ConfigResourceBuilder::new(name)
    }

    pub fn kind(&self) -> &ConfigKind {
        &self.kind
    }

    /// Store a default config. Activated is seeded from it on first run.
    pub fn set_default(&self, value: &T) -> Result<(), ConfigError> {
        self.local.store_default(value)
    }

    /// Fetch the remote config into the Fetched slot.
    ///
    /// If the last fetch is still fresh per the cache strategy, the call
    /// succeeds immediately with the existing fetched value and the remote
    /// is not contacted. Otherwise the call joins the in-flight fetch
    /// cycle, or starts one on a background task.
    pub fn fetch(&self) -> FetchHandle<T> {
        let last_fetched = match self.local.fetched_timestamp() {
            Ok(ts) => ts,
            // A broken store is not "never fetched"; fail the cycle.
            Err(e) => return FetchHandle::settled(FetchOutcome::Error(Arc::new(e))),
        };
        if !self.cache.should_fetch(now_millis(), last_fetched) {
            if let Ok(Some(value)) = self.local.last_fetched() {
                tracing::debug!(kind = %self.kind, "fetched config still fresh, skipping remote");
                return FetchHandle::settled(FetchOutcome::Success {
                    value,
                    completed_at: last_fetched,
                });
            }
        }

        let remote = self.remote.clone();
        let local = self.local.clone();
        let kind = self.kind.clone();
        self.coordinator.fetch(move || async move {
            let value = remote.fetch().await?;
            let completed_at = now_millis();
            local.store_fetched(&value, completed_at)?;
            tracing::info!(kind = %kind, timestamp = completed_at, "stored fetched config");
            Ok((value, completed_at))
        })
    }

    /// Promote the last fetched config, if newer than the activated one.
    pub fn activate(&self) -> Result<(), ConfigError> {
        self.local.activate()
    }

    /// The activated config, falling back to the default; `None` when
    /// neither exists.
    pub fn get(&self) -> Result<Option<Arc<T>>, ConfigError> {
        self.local.config()
    }

    /// Erase default, fetched and activated configs for this kind.
    pub fn clear(&self) -> Result<(), ConfigError> {
        self.local.clear()
    }
}

/// Builder for [`ConfigResource`]. A local repository (or a store backend
/// plus mapper to build one) and a remote repository are required.
pub struct ConfigResourceBuilder<T> {
    name: String,
    local: Option<Arc<dyn LocalRepository<T>>>,
    remote: Option<Arc<dyn RemoteRepository<T>>>,
    backend: Option<Arc<dyn SerializedStore>>,
    mapper: Option<Arc<dyn Mapper<T>>>,
    migration: MigrationStrategy,
    cache: CacheStrategy,
}

impl<T: Send + Sync + 'static> ConfigResourceBuilder<T> {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            local: None,
            remote: None,
            backend: None,
            mapper: None,
            migration: MigrationStrategy::default(),
            cache: CacheStrategy::default(),
        }
    }

    /// Use an already-built local repository.
    pub fn local(mut self, local: Arc<dyn LocalRepository<T>>) -> Self {
        self.local = Some(local);
        self
    }

    /// Build the local repository from this store backend. Requires a
    /// mapper (see [`Self::mapper`] or [`Self::json`]).
    pub fn backend(mut self, backend: Arc<dyn SerializedStore>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn mapper(mut self, mapper: Arc<dyn Mapper<T>>) -> Self {
        self.mapper = Some(mapper);
        self
    }

    pub fn remote(mut self, remote: Arc<dyn RemoteRepository<T>>) -> Self {
        self.remote = Some(remote);
        self
    }

    pub fn migration(mut self, migration: MigrationStrategy) -> Self {
        self.migration = migration;
        self
    }

    pub fn cache(mut self, cache: CacheStrategy) -> Self {
        self.cache = cache;
        self
    }

    /// Validate collaborators and produce a ready resource.
    pub fn build(self) -> Result<ConfigResource<T>, ConfigError> {
        let kind = ConfigKind::new(self.name)?;
        let remote = self
            .remote
            .ok_or(ConfigError::MissingCollaborator("remote repository"))?;

        let local = match self.local {
            Some(local) => local,
            None => {
                let backend = self
                    .backend
                    .ok_or(ConfigError::MissingCollaborator("local repository"))?;
                let mapper = self.mapper.ok_or(ConfigError::MissingCollaborator("mapper"))?;
                Arc::new(ConfigStore::new(
                    kind.clone(),
                    backend,
                    mapper,
                    self.migration,
                )) as Arc<dyn LocalRepository<T>>
            }
        };

        tracing::info!(kind = %kind, "config resource ready");
        Ok(ConfigResource {
            kind,
            local,
            remote,
            cache: self.cache,
            coordinator: FetchCoordinator::new(),
        })
    }
}

impl<T> ConfigResourceBuilder<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Use the default JSON mapper for the payload type.
    pub fn json(mut self) -> Self {
        self.mapper = Some(Arc::new(JsonMapper::new()));
        self
    }
}

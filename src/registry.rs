//! Registry of configuration resources.
//!
//! # Responsibilities
//! - Own the process's configuration resources, keyed by kind name
//! - Bound memory with fixed-capacity, least-recently-used eviction
//!
//! # Design Decisions
//! - An explicit object owned by the embedding application, not a global
//! - Resources are type-erased behind `Any`; lookup restores the payload
//!   type and fails loudly on a mismatch

use std::any::Any;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use crate::error::ConfigError;
use crate::resource::ConfigResource;

struct RegistryInner {
    resources: HashMap<String, Arc<dyn Any + Send + Sync>>,
    // Front is least recently used.
    order: VecDeque<String>,
}

impl RegistryInner {
    fn touch(&mut self, name: &str) {
        if let Some(pos) = self.order.iter().position(|n| n == name) {
            self.order.remove(pos);
        }
        self.order.push_back(name.to_owned());
    }
}

/// Bounded cache of [`ConfigResource`] instances.
pub struct ConfigRegistry {
    capacity: usize,
    inner: Mutex<RegistryInner>,
}

impl ConfigRegistry {
    /// Registry holding at most `capacity` resources (minimum one).
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(RegistryInner {
                resources: HashMap::new(),
                order: VecDeque::new(),
            }),
        }
    }

    /// Insert a resource under its kind name, evicting the least recently
    /// used entry when full. Re-registering a name replaces the resource.
    pub fn register<T: Send + Sync + 'static>(
        &self,
        resource: ConfigResource<T>,
    ) -> Arc<ConfigResource<T>> {
        let name = resource.kind().name().to_owned();
        let resource = Arc::new(resource);

        let mut inner = self.inner.lock().expect("registry mutex poisoned");
        if !inner.resources.contains_key(&name) && inner.resources.len() >= self.capacity {
            if let Some(evicted) = inner.order.pop_front() {
                inner.resources.remove(&evicted);
                tracing::debug!(kind = %evicted, "evicted least recently used config resource");
            }
        }
        inner
            .resources
            .insert(name.clone(), resource.clone() as Arc<dyn Any + Send + Sync>);
        inner.touch(&name);
        resource
    }

    /// Look up a resource by kind name, promoting it to most recently
    /// used. Fails if the name is unknown or was registered with another
    /// payload type.
    pub fn of<T: Send + Sync + 'static>(
        &self,
        name: &str,
    ) -> Result<Arc<ConfigResource<T>>, ConfigError> {
        let mut inner = self.inner.lock().expect("registry mutex poisoned");
        let entry = inner
            .resources
            .get(name)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownResource(name.to_owned()))?;

        let resource = entry
            .downcast::<ConfigResource<T>>()
            .map_err(|_| ConfigError::TypeMismatch(name.to_owned()))?;
        inner.touch(name);
        Ok(resource)
    }

    /// Number of registered resources.
    pub fn len(&self) -> usize {
        self.inner.lock().expect("registry mutex poisoned").resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

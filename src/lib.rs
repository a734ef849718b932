//! Client-side staged configuration cache.
//!
//! Per configuration kind, three versions of a value are kept: a built-in
//! default, the most recently fetched remote value, and the activated
//! value the application reads. Fetches are gated on staleness and
//! coordinated so concurrent callers share a single network operation.

pub mod cache;
pub mod error;
pub mod fetch;
pub mod mapper;
pub mod merge;
pub mod registry;
pub mod resource;
pub mod store;

pub use cache::CacheStrategy;
pub use error::ConfigError;
pub use fetch::{FetchHandle, FetchOutcome, HttpRemoteRepository, RemoteRepository};
pub use mapper::{JsonMapper, Mapper, TextMapper};
pub use merge::MigrationStrategy;
pub use registry::ConfigRegistry;
pub use resource::{ConfigResource, ConfigResourceBuilder};
pub use store::{ConfigKind, ConfigStore, FileStore, LocalRepository, MemoryStore, Slot};

//! Remote fetching: the single-flight coordinator and remote repositories.

pub mod coordinator;
pub mod remote;

pub use coordinator::{FetchCoordinator, FetchHandle, FetchOutcome};
pub use remote::{HttpRemoteRepository, RemoteRepository};

//! Single-flight coordination of remote fetches.
//!
//! # Responsibilities
//! - Ensure at most one remote fetch is outstanding per resource
//! - Multiplex concurrent callers onto the in-flight cycle
//! - Replay the settled outcome to listeners that attach late
//!
//! # Design Decisions
//! - The "check-if-in-flight, else start" decision happens under one
//!   mutex, so two callers can never start two cycles
//! - A cycle resolves exactly once; any number of listeners and waiters
//!   subscribe to that single resolution
//! - Settled cycles are never reused: staleness is the cache gate's
//!   concern, not the coordinator's
//! - Listeners attached while pending fire on the task that settles the
//!   cycle; listeners attached after settlement fire inline

use std::future::Future;
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;

use crate::error::ConfigError;

/// Terminal result of one fetch cycle.
#[derive(Debug)]
pub enum FetchOutcome<T> {
    /// The remote produced a value; `completed_at` is the wall-clock
    /// millisecond timestamp of completion.
    Success { value: Arc<T>, completed_at: i64 },
    /// The remote call failed.
    Error(Arc<ConfigError>),
}

impl<T> Clone for FetchOutcome<T> {
    fn clone(&self) -> Self {
        match self {
            FetchOutcome::Success {
                value,
                completed_at,
            } => FetchOutcome::Success {
                value: value.clone(),
                completed_at: *completed_at,
            },
            FetchOutcome::Error(e) => FetchOutcome::Error(e.clone()),
        }
    }
}

impl<T> FetchOutcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, FetchOutcome::Success { .. })
    }

    pub fn value(&self) -> Option<Arc<T>> {
        match self {
            FetchOutcome::Success { value, .. } => Some(value.clone()),
            FetchOutcome::Error(_) => None,
        }
    }

    pub fn error(&self) -> Option<Arc<ConfigError>> {
        match self {
            FetchOutcome::Success { .. } => None,
            FetchOutcome::Error(e) => Some(e.clone()),
        }
    }
}

type SuccessListener<T> = Box<dyn FnOnce(Arc<T>) + Send>;
type ErrorListener = Box<dyn FnOnce(Arc<ConfigError>) + Send>;

enum CycleState<T> {
    Pending {
        on_success: Vec<SuccessListener<T>>,
        on_error: Vec<ErrorListener>,
    },
    Settled(FetchOutcome<T>),
}

struct CycleInner<T> {
    state: Mutex<CycleState<T>>,
    done: Notify,
}

/// Handle onto one fetch cycle. Clones share the cycle.
pub struct FetchHandle<T> {
    inner: Arc<CycleInner<T>>,
}

impl<T> Clone for FetchHandle<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> FetchHandle<T> {
    fn pending() -> Self {
        Self {
            inner: Arc::new(CycleInner {
                state: Mutex::new(CycleState::Pending {
                    on_success: Vec::new(),
                    on_error: Vec::new(),
                }),
                done: Notify::new(),
            }),
        }
    }

    /// Handle that is already resolved, e.g. when the cache gate skips
    /// the remote call entirely.
    pub(crate) fn settled(outcome: FetchOutcome<T>) -> Self {
        Self {
            inner: Arc::new(CycleInner {
                state: Mutex::new(CycleState::Settled(outcome)),
                done: Notify::new(),
            }),
        }
    }

    /// Attach a success listener. Fires exactly once if the cycle
    /// succeeds; fires immediately if it already has.
    pub fn on_success(&self, listener: impl FnOnce(Arc<T>) + Send + 'static) {
        let immediate = {
            let mut state = self.inner.state.lock().expect("fetch cycle mutex poisoned");
            match &mut *state {
                CycleState::Pending { on_success, .. } => {
                    on_success.push(Box::new(listener));
                    None
                }
                CycleState::Settled(outcome) => outcome.value().map(|v| (listener, v)),
            }
        };
        if let Some((listener, value)) = immediate {
            listener(value);
        }
    }

    /// Attach an error listener. Fires exactly once if the cycle fails;
    /// fires immediately if it already has.
    pub fn on_error(&self, listener: impl FnOnce(Arc<ConfigError>) + Send + 'static) {
        let immediate = {
            let mut state = self.inner.state.lock().expect("fetch cycle mutex poisoned");
            match &mut *state {
                CycleState::Pending { on_error, .. } => {
                    on_error.push(Box::new(listener));
                    None
                }
                CycleState::Settled(outcome) => outcome.error().map(|e| (listener, e)),
            }
        };
        if let Some((listener, error)) = immediate {
            listener(error);
        }
    }

    pub fn is_settled(&self) -> bool {
        matches!(
            &*self.inner.state.lock().expect("fetch cycle mutex poisoned"),
            CycleState::Settled(_)
        )
    }

    /// The cached outcome, if the cycle has settled.
    pub fn outcome(&self) -> Option<FetchOutcome<T>> {
        match &*self.inner.state.lock().expect("fetch cycle mutex poisoned") {
            CycleState::Pending { .. } => None,
            CycleState::Settled(outcome) => Some(outcome.clone()),
        }
    }

    /// Wait for the cycle to settle and return its outcome.
    pub async fn wait(&self) -> FetchOutcome<T> {
        loop {
            let notified = self.inner.done.notified();
            tokio::pin!(notified);
            // Register before checking, so a settle between the check and
            // the await cannot be missed.
            notified.as_mut().enable();
            if let Some(outcome) = self.outcome() {
                return outcome;
            }
            notified.await;
        }
    }

    /// Resolve the cycle. A cycle settles at most once; a second call is
    /// ignored.
    fn settle(&self, outcome: FetchOutcome<T>) {
        let listeners = {
            let mut state = self.inner.state.lock().expect("fetch cycle mutex poisoned");
            match std::mem::replace(&mut *state, CycleState::Settled(outcome.clone())) {
                CycleState::Pending {
                    on_success,
                    on_error,
                } => Some((on_success, on_error)),
                settled @ CycleState::Settled(_) => {
                    *state = settled;
                    None
                }
            }
        };

        if let Some((on_success, on_error)) = listeners {
            match &outcome {
                FetchOutcome::Success { value, .. } => {
                    for listener in on_success {
                        listener(value.clone());
                    }
                }
                FetchOutcome::Error(error) => {
                    for listener in on_error {
                        listener(error.clone());
                    }
                }
            }
        }
        self.inner.done.notify_waiters();
    }
}

/// Per-resource single-flight gate in front of the remote repository.
pub struct FetchCoordinator<T> {
    inflight: Mutex<Option<FetchHandle<T>>>,
}

impl<T> Default for FetchCoordinator<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FetchCoordinator<T> {
    pub fn new() -> Self {
        Self {
            inflight: Mutex::new(None),
        }
    }
}

impl<T: Send + Sync + 'static> FetchCoordinator<T> {
    /// Join the in-flight cycle if one exists, otherwise start a new one
    /// by spawning `op` onto the runtime. `op` yields the fetched value
    /// together with its completion timestamp.
    pub fn fetch<F, Fut>(&self, op: F) -> FetchHandle<T>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(T, i64), ConfigError>> + Send + 'static,
    {
        let mut inflight = self.inflight.lock().expect("coordinator mutex poisoned");

        if let Some(handle) = inflight.as_ref() {
            if !handle.is_settled() {
                tracing::debug!("joining in-flight fetch cycle");
                return handle.clone();
            }
        }

        let handle = FetchHandle::pending();
        *inflight = Some(handle.clone());

        let cycle = handle.clone();
        tokio::spawn(async move {
            let outcome = match op().await {
                Ok((value, completed_at)) => FetchOutcome::Success {
                    value: Arc::new(value),
                    completed_at,
                },
                Err(e) => {
                    tracing::warn!(error = %e, "remote fetch failed");
                    FetchOutcome::Error(Arc::new(e))
                }
            };
            cycle.settle(outcome);
        });

        handle
    }
}

//! Best-effort cancellation of the active container.
//!
//! The CLI's Ctrl+C handler calls [`CancelHandle::cancel`], which kills the
//! container currently tracked by the executor and prevents new ones from
//! starting. The invocation then unwinds normally, so scoped resources such
//! as remote checkouts are released.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use runa_common::types::ContainerName;

use crate::backend::ContainerBackend;

struct CancelState {
    backend: Arc<dyn ContainerBackend>,
    active: Mutex<Option<ContainerName>>,
    cancelled: AtomicBool,
}

/// Shared handle used to stop in-flight container execution.
#[derive(Clone)]
pub struct CancelHandle {
    state: Arc<CancelState>,
}

impl CancelHandle {
    /// Creates a handle that kills containers through `backend`.
    #[must_use]
    pub fn new(backend: Arc<dyn ContainerBackend>) -> Self {
        Self {
            state: Arc::new(CancelState {
                backend,
                active: Mutex::new(None),
                cancelled: AtomicBool::new(false),
            }),
        }
    }

    /// Marks the invocation cancelled and kills the active container, if any.
    pub fn cancel(&self) {
        let active = {
            let active = self.lock_active();
            self.state.cancelled.store(true, Ordering::SeqCst);
            active.clone()
        };
        if let Some(name) = active {
            if let Err(e) = self.state.backend.kill(&name) {
                tracing::warn!(container = %name, error = %e, "failed to kill container");
            }
        }
    }

    /// Whether [`cancel`](Self::cancel) has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.load(Ordering::SeqCst)
    }

    /// Records `name` as the active container until the guard is dropped.
    ///
    /// Returns `None` once the invocation has been cancelled. The flag is
    /// checked under the same lock [`cancel`](Self::cancel) takes, so a
    /// container is either refused here or seen by `cancel`.
    pub(crate) fn track(&self, name: &ContainerName) -> Option<ActiveContainer<'_>> {
        let mut active = self.lock_active();
        if self.is_cancelled() {
            return None;
        }
        *active = Some(name.clone());
        Some(ActiveContainer { handle: self })
    }

    fn lock_active(&self) -> MutexGuard<'_, Option<ContainerName>> {
        self.state
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Clears the active container when dropped.
pub(crate) struct ActiveContainer<'a> {
    handle: &'a CancelHandle,
}

impl Drop for ActiveContainer<'_> {
    fn drop(&mut self) {
        *self.handle.lock_active() = None;
    }
}

//! Per-project mutual exclusion.
//!
//! Lifecycle operations on one project must not interleave (a `stop` racing
//! a half-finished `start` would leave orphans). Different projects proceed
//! in parallel.

use std::collections::HashSet;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use tracing::debug;

#[derive(Debug, Default)]
struct LockState {
    held: Mutex<HashSet<String>>,
    released: Condvar,
}

/// A set of named locks shared by clones.
#[derive(Debug, Clone, Default)]
pub struct ProjectLocks {
    inner: Arc<LockState>,
}

/// Held while a project operation runs; releases the project on drop.
#[derive(Debug)]
pub struct ProjectGuard {
    state: Arc<LockState>,
    project: String,
}

impl ProjectLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn held(&self) -> MutexGuard<'_, HashSet<String>> {
        self.inner.held.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Block until `project` is free, then take it.
    pub fn acquire(&self, project: &str) -> ProjectGuard {
        let mut held = self.held();
        while held.contains(project) {
            debug!(project, "waiting for project lock");
            held = self
                .inner
                .released
                .wait(held)
                .unwrap_or_else(PoisonError::into_inner);
        }
        held.insert(project.to_string());
        self.guard(project)
    }

    /// Take `project` only if nobody holds it.
    pub fn try_acquire(&self, project: &str) -> Option<ProjectGuard> {
        let mut held = self.held();
        if held.insert(project.to_string()) {
            Some(self.guard(project))
        } else {
            None
        }
    }

    pub fn is_locked(&self, project: &str) -> bool {
        self.held().contains(project)
    }

    fn guard(&self, project: &str) -> ProjectGuard {
        ProjectGuard {
            state: Arc::clone(&self.inner),
            project: project.to_string(),
        }
    }
}

impl Drop for ProjectGuard {
    fn drop(&mut self) {
        self.state
            .held
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.project);
        self.state.released.notify_all();
    }
}

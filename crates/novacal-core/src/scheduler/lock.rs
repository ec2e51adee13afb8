//! Per-owner advisory locks.
//!
//! Both the allocator and the splitter read obstacles first and write last.
//! Holding the owner's lock across that sequence keeps two invocations for
//! the same owner from committing placements into the same free slot.
//! Across processes the repository's own transaction takes over.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock, Mutex};

static SHARED: LazyLock<Arc<OwnerLocks>> = LazyLock::new(|| Arc::new(OwnerLocks::new()));

#[derive(Debug, Default)]
pub struct OwnerLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl OwnerLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide locks, the default for schedulers and splitters.
    pub fn shared() -> Arc<Self> {
        Arc::clone(&SHARED)
    }

    fn lock_for(&self, owner_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|p| p.into_inner());
        locks
            .entry(owner_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Run `f` while holding the lock of `owner_id`.
    pub fn with_owner<T>(&self, owner_id: &str, f: impl FnOnce() -> T) -> T {
        let lock = self.lock_for(owner_id);
        // The guarded value is `()`, so a poisoned lock carries no broken state.
        let _guard = lock.lock().unwrap_or_else(|p| p.into_inner());
        f()
    }
}

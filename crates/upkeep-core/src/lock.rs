//! Per-module mutual exclusion.
//!
//! Two concurrent upgrade requests for the same module would share one
//! workspace and one deploy path, so they must run one after the other.
//! Different modules never contend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Lazily created lock per module name.
#[derive(Debug, Default)]
pub struct ModuleLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ModuleLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// The lock of `module`, created on first use.
    pub fn handle(&self, module: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks
            .entry(module.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Run `f` while holding the lock of `module`.
    ///
    /// A lock poisoned by a panicking holder is taken over; the guarded
    /// state is `()`, so there is nothing to repair.
    pub fn with_lock<T>(&self, module: &str, f: impl FnOnce() -> T) -> T {
        let handle = self.handle(module);
        let _guard = handle.lock().unwrap_or_else(PoisonError::into_inner);
        f()
    }

    /// Whether some caller currently holds the lock of `module`.
    pub fn is_locked(&self, module: &str) -> bool {
        let locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        match locks.get(module) {
            Some(handle) => handle.try_lock().is_err(),
            None => false,
        }
    }
}

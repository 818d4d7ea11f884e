//! Single-entry guard for state-changing operations.

use std::sync::atomic::{AtomicBool, Ordering};

use ebb_core::error::StateError;

#[derive(Debug, Default)]
pub struct ReentrancyLock {
    entered: AtomicBool,
}

/// Releases the lock on drop, including on early return.
#[must_use]
pub struct EntryGuard<'a> {
    lock: &'a ReentrancyLock,
}

impl ReentrancyLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enter(&self) -> Result<EntryGuard<'_>, StateError> {
        self.entered
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| StateError::Reentrant)?;
        Ok(EntryGuard { lock: self })
    }

    pub fn is_entered(&self) -> bool {
        self.entered.load(Ordering::Acquire)
    }
}

impl Drop for EntryGuard<'_> {
    fn drop(&mut self) {
        self.lock.entered.store(false, Ordering::Release);
    }
}

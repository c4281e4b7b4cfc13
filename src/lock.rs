use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Guard that suspends input handling while a long-running backend
/// interaction (bulk copy, jump to path) is outstanding.
///
/// At most one [`OperationGuard`] exists at a time. Dropping it releases the
/// lock, so every exit path of the holder gives it back.
#[derive(Debug, Clone, Default)]
pub struct OperationLock {
    held: Arc<AtomicUsize>,
}

#[derive(Debug)]
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct OperationGuard {
    held: Arc<AtomicUsize>,
}

impl OperationLock {
    pub fn try_acquire(&self) -> Option<OperationGuard> {
        self.held
            .compare_exchange(0, 1, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        Some(OperationGuard {
            held: Arc::clone(&self.held),
        })
    }

    pub fn is_held(&self) -> bool {
        self.held_count() > 0
    }

    pub fn held_count(&self) -> usize {
        self.held.load(Ordering::Acquire)
    }
}

impl Drop for OperationGuard {
    fn drop(&mut self) {
        self.held.fetch_sub(1, Ordering::AcqRel);
    }
}

use std::sync::{Condvar, Mutex, PoisonError};

use crate::errors::GateError;

/// Binary semaphore shared by the writers and the reader cohort.
///
/// A `MutexGuard` cannot be used here: the cohort's hold is taken by the first
/// reader to arrive and given back by the last one to leave, which is usually
/// another thread.
#[derive(Default, Debug)]
pub struct WriteExclusionLock {
    held: Mutex<bool>,
    released: Condvar,
}

impl WriteExclusionLock {
    pub fn new() -> WriteExclusionLock {
        Default::default()
    }

    /// Blocks until the lock is free, then takes it.
    pub fn acquire(&self) -> Result<(), GateError> {
        let mut held = self.held.lock()?;
        while *held {
            held = self.released.wait(held)?;
        }
        *held = true;
        Ok(())
    }

    /// Gives the lock back and wakes one waiter.
    ///
    /// Never fails. The inner mutex only guards a flag, so a poisoned mutex is
    /// recovered rather than leaving every other task blocked forever.
    pub fn release(&self) {
        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        debug_assert!(*held, "released a write-exclusion lock that was not held");
        *held = false;
        drop(held);
        self.released.notify_one();
    }

    pub fn is_held(&self) -> bool {
        *self.held.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

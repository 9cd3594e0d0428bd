//! Reader-preference readers-writers gate.
//!
//! Readers join a cohort under the bookkeeping lock. The first one in takes the
//! write-exclusion lock on behalf of the whole cohort and the last one out gives
//! it back. Writers take the write-exclusion lock directly. A steady stream of
//! readers can therefore keep a writer waiting indefinitely.

use std::cell::UnsafeCell;
use std::sync::{Mutex, PoisonError};

use tracing::trace;

use crate::errors::GateError;

mod exclusion;
mod stats;

pub use exclusion::WriteExclusionLock;
pub use stats::{AccessStats, StatsSnapshot};

pub type SharedCounter = ReaderWriterGate<u64>;

pub struct ReaderWriterGate<T> {
    value: UnsafeCell<T>,
    // ActiveReaderCount. Only ever read or written with this lock held.
    bookkeeping: Mutex<usize>,
    write_exclusion: WriteExclusionLock,
    stats: AccessStats,
}

// `value` is only handed out as `&T` while the reader cohort holds the
// write-exclusion lock, and as `&mut T` while a single writer holds it.
unsafe impl<T: Send + Sync> Sync for ReaderWriterGate<T> {}

/// Membership in the reader cohort. Dropping it performs the departure half of
/// the reader protocol, so the cohort's hold is given back on every exit path.
struct CohortGuard<'a, T> {
    gate: &'a ReaderWriterGate<T>,
}

impl<'a, T> Drop for CohortGuard<'a, T> {
    fn drop(&mut self) {
        let mut active = self
            .gate
            .bookkeeping
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *active -= 1;
        if *active == 0 {
            trace!("last reader out, releasing write exclusion");
            self.gate.write_exclusion.release();
        }
    }
}

struct ReadSection<'a> {
    stats: &'a AccessStats,
}

impl<'a> Drop for ReadSection<'a> {
    fn drop(&mut self) {
        self.stats.leave_read();
    }
}

struct ExclusiveGuard<'a> {
    lock: &'a WriteExclusionLock,
}

impl<'a> Drop for ExclusiveGuard<'a> {
    fn drop(&mut self) {
        self.lock.release();
    }
}

impl<T> ReaderWriterGate<T> {
    pub fn new(value: T) -> ReaderWriterGate<T> {
        ReaderWriterGate {
            value: UnsafeCell::new(value),
            bookkeeping: Mutex::new(0),
            write_exclusion: WriteExclusionLock::new(),
            stats: AccessStats::new(),
        }
    }

    fn join_cohort(&self) -> Result<CohortGuard<'_, T>, GateError> {
        let mut active = self.bookkeeping.lock()?;
        *active += 1;
        if *active == 1 {
            trace!("first reader in, locking out writers");
            if let Err(e) = self.write_exclusion.acquire() {
                *active -= 1;
                return Err(e);
            }
        }
        Ok(CohortGuard { gate: self })
    }

    /// Runs `f` with shared access to the value.
    ///
    /// Any number of readers may be inside `f` at the same time. The
    /// bookkeeping lock is not held while `f` runs.
    pub fn read<R, F>(&self, f: F) -> Result<R, GateError>
        where F: FnOnce(&T) -> R,
    {
        let _cohort = self.join_cohort()?;
        let inside = self.stats.enter_read();
        let _section = ReadSection { stats: &self.stats };
        trace!(inside, "reading");
        let result = f(unsafe { &*self.value.get() });
        self.stats.record_read();
        Ok(result)
    }

    /// Runs `f` with exclusive access to the value.
    pub fn write<R, F>(&self, f: F) -> Result<R, GateError>
        where F: FnOnce(&mut T) -> R,
    {
        self.write_exclusion.acquire()?;
        let _exclusive = ExclusiveGuard { lock: &self.write_exclusion };
        self.stats.enter_write();
        let result = f(unsafe { &mut *self.value.get() });
        self.stats.record_write();
        Ok(result)
    }

    /// Samples ActiveReaderCount.
    ///
    /// Blocks while a first reader is waiting on the write-exclusion lock, since
    /// that reader holds the bookkeeping lock.
    pub fn active_readers(&self) -> Result<usize, GateError> {
        Ok(*self.bookkeeping.lock()?)
    }

    pub fn is_write_locked(&self) -> bool {
        self.write_exclusion.is_held()
    }

    pub fn stats(&self) -> &AccessStats {
        &self.stats
    }

    pub fn into_inner(self) -> T {
        self.value.into_inner()
    }
}

impl<T: Default> Default for ReaderWriterGate<T> {
    fn default() -> Self {
        ReaderWriterGate::new(T::default())
    }
}

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Counters the gate bumps on every access.
///
/// `readers_inside` counts readers that are currently executing their read
/// closure. It is tracked separately from the active reader count so that the
/// writer side can check it without touching the bookkeeping lock.
#[derive(Default, Debug)]
pub struct AccessStats {
    reads: AtomicU64,
    writes: AtomicU64,
    readers_inside: AtomicUsize,
    peak_readers_inside: AtomicUsize,
    exclusion_violations: AtomicU64,
}

#[derive(Default, Copy, Clone, Debug, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub reads: u64,
    pub writes: u64,
    pub readers_inside: usize,
    pub peak_readers_inside: usize,
    pub exclusion_violations: u64,
}

impl AccessStats {
    pub fn new() -> AccessStats {
        Default::default()
    }

    #[inline]
    pub(crate) fn enter_read(&self) -> usize {
        let inside = self.readers_inside.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_readers_inside.fetch_max(inside, Ordering::SeqCst);
        inside
    }

    #[inline]
    pub(crate) fn leave_read(&self) {
        self.readers_inside.fetch_sub(1, Ordering::SeqCst);
    }

    #[inline]
    pub(crate) fn record_read(&self) {
        self.reads.fetch_add(1, Ordering::Relaxed);
    }

    /// Called by a writer while it holds the write-exclusion lock.
    #[inline]
    pub(crate) fn enter_write(&self) {
        if self.readers_inside.load(Ordering::SeqCst) != 0 {
            self.exclusion_violations.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[inline]
    pub(crate) fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn readers_inside(&self) -> usize {
        self.readers_inside.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            reads: self.reads.load(Ordering::SeqCst),
            writes: self.writes.load(Ordering::SeqCst),
            readers_inside: self.readers_inside.load(Ordering::SeqCst),
            peak_readers_inside: self.peak_readers_inside.load(Ordering::SeqCst),
            exclusion_violations: self.exclusion_violations.load(Ordering::SeqCst),
        }
    }
}

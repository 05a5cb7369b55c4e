use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Instant;

/// Station statistics for monitoring and tests
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StationStats {
    /// Cars handed to `admit`
    pub admitted: u64,
    /// Cars that made it into the waiting area
    pub enqueued: u64,
    /// Cars that finished service
    pub serviced: u64,
    /// Cars stopped by shutdown before entering the waiting area
    pub cancelled: u64,
    /// Cars that entered the waiting area but were never serviced
    pub abandoned: u64,
    /// Current waiting-area length
    pub queue_len: usize,
    /// Bays currently servicing a car
    pub active_bays: usize,
    /// Free permits on the bay semaphore
    pub free_bays: usize,
    /// Consistency violations reported so far
    pub violations: usize,
}

impl StationStats {
    /// Cars admitted but not yet accounted for as serviced, cancelled or abandoned
    pub fn in_flight(&self) -> u64 {
        self.admitted
            .saturating_sub(self.serviced + self.cancelled + self.abandoned)
    }

    pub fn is_settled(&self) -> bool {
        self.in_flight() == 0
    }
}

/// Live counters behind [`StationStats`]
#[derive(Debug, Default)]
pub(crate) struct StationCounters {
    admitted: AtomicU64,
    enqueued: AtomicU64,
    serviced: AtomicU64,
    cancelled: AtomicU64,
    abandoned: AtomicU64,
    active_bays: AtomicUsize,
    pending_arrivals: AtomicUsize,
    scheduled: AtomicUsize,
    settle_lock: Mutex<()>,
    settled: Condvar,
}

impl StationCounters {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Count an admission and return its 1-based sequence number
    pub(crate) fn record_admission(&self) -> u64 {
        self.pending_arrivals.fetch_add(1, Ordering::SeqCst);
        self.admitted.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Cars promised by a feeder but not admitted yet
    pub(crate) fn schedule(&self, count: usize) {
        self.scheduled.fetch_add(count, Ordering::SeqCst);
    }

    pub(crate) fn unschedule(&self, count: usize) {
        self.scheduled.fetch_sub(count, Ordering::SeqCst);
        self.notify_settled();
    }

    pub(crate) fn record_enqueue(&self) {
        self.enqueued.fetch_add(1, Ordering::SeqCst);
    }

    /// The arrival context finished, whatever its outcome
    pub(crate) fn record_arrival_exit(&self) {
        self.pending_arrivals.fetch_sub(1, Ordering::SeqCst);
        self.notify_settled();
    }

    pub(crate) fn record_cancelled(&self) {
        self.cancelled.fetch_add(1, Ordering::SeqCst);
        self.notify_settled();
    }

    pub(crate) fn record_abandoned(&self, count: u64) {
        self.abandoned.fetch_add(count, Ordering::SeqCst);
        self.notify_settled();
    }

    pub(crate) fn record_serviced(&self) {
        self.serviced.fetch_add(1, Ordering::SeqCst);
        self.notify_settled();
    }

    /// Returns the new active-bay count
    pub(crate) fn bay_started(&self) -> usize {
        self.active_bays.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Returns the new active-bay count
    pub(crate) fn bay_finished(&self) -> usize {
        self.active_bays.fetch_sub(1, Ordering::SeqCst) - 1
    }

    pub(crate) fn active_bays(&self) -> usize {
        self.active_bays.load(Ordering::SeqCst)
    }

    pub(crate) fn pending_arrivals(&self) -> usize {
        self.pending_arrivals.load(Ordering::SeqCst)
    }

    /// Every admitted or scheduled car has reached a final outcome
    pub(crate) fn is_settled(&self) -> bool {
        self.scheduled.load(Ordering::SeqCst) == 0 && self.snapshot().is_settled()
    }

    /// Fill in the counter fields of a stats snapshot
    pub(crate) fn snapshot(&self) -> StationStats {
        StationStats {
            admitted: self.admitted.load(Ordering::SeqCst),
            enqueued: self.enqueued.load(Ordering::SeqCst),
            serviced: self.serviced.load(Ordering::SeqCst),
            cancelled: self.cancelled.load(Ordering::SeqCst),
            abandoned: self.abandoned.load(Ordering::SeqCst),
            active_bays: self.active_bays(),
            ..StationStats::default()
        }
    }

    /// Block until `done` holds or `deadline` passes. Returns the final value of `done`.
    pub(crate) fn wait_until<F>(&self, deadline: Instant, done: F) -> bool
    where
        F: Fn(&Self) -> bool,
    {
        let mut guard = self.settle_lock.lock();
        while !done(self) {
            if self.settled.wait_until(&mut guard, deadline).timed_out() {
                return done(self);
            }
        }
        true
    }

    /// Block until `done` holds
    pub(crate) fn wait<F>(&self, done: F)
    where
        F: Fn(&Self) -> bool,
    {
        let mut guard = self.settle_lock.lock();
        while !done(self) {
            self.settled.wait(&mut guard);
        }
    }

    fn notify_settled(&self) {
        let _guard = self.settle_lock.lock();
        self.settled.notify_all();
    }
}

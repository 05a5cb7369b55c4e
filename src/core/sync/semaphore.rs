use super::shutdown::ShutdownSignal;
use crate::core::errors::Cancelled;
use parking_lot::{Condvar, Mutex};

/// Counting semaphore built from a mutex and a condition variable.
///
/// The counter is only decremented under the same lock that confirmed it was
/// positive. `release` wakes every blocked acquirer and each one re-checks the
/// counter, so no waiter depends on being the sole recipient of a signal.
#[derive(Debug)]
pub struct Semaphore {
    value: Mutex<usize>,
    condvar: Condvar,
}

impl Semaphore {
    /// Create a semaphore holding `initial` permits
    pub fn new(initial: usize) -> Self {
        Self {
            value: Mutex::new(initial),
            condvar: Condvar::new(),
        }
    }

    /// Block until a permit is available, then take it
    pub fn acquire(&self) {
        let mut value = self.value.lock();
        while *value == 0 {
            self.condvar.wait(&mut value);
        }
        *value -= 1;
    }

    /// Like [`acquire`](Self::acquire), but gives up once `shutdown` is triggered.
    ///
    /// A cancelled call never touches the counter.
    pub fn acquire_or_cancel(&self, shutdown: &ShutdownSignal) -> Result<(), Cancelled> {
        let mut value = self.value.lock();
        loop {
            if shutdown.is_triggered() {
                return Err(Cancelled);
            }
            if *value > 0 {
                *value -= 1;
                return Ok(());
            }
            self.condvar.wait(&mut value);
        }
    }

    /// Take a permit only if one is available right now
    pub fn try_acquire(&self) -> bool {
        let mut value = self.value.lock();
        if *value == 0 {
            return false;
        }
        *value -= 1;
        true
    }

    /// Acquire a permit that is returned when the guard drops
    pub fn acquire_guard(&self) -> SemaphoreGuard<'_> {
        self.acquire();
        SemaphoreGuard { semaphore: self }
    }

    /// Return a permit and wake all waiters
    pub fn release(&self) {
        let mut value = self.value.lock();
        *value += 1;
        self.condvar.notify_all();
    }

    /// Wake all waiters without adding a permit, so cancellable waiters
    /// re-check their shutdown signal.
    pub fn interrupt(&self) {
        let _value = self.value.lock();
        self.condvar.notify_all();
    }

    /// Current counter value. Informational only: it may be stale by the
    /// time the caller looks at it.
    pub fn peek(&self) -> usize {
        *self.value.lock()
    }
}

/// Permit held for the lifetime of the guard
#[must_use = "the permit is released as soon as the guard is dropped"]
pub struct SemaphoreGuard<'a> {
    semaphore: &'a Semaphore,
}

impl Drop for SemaphoreGuard<'_> {
    fn drop(&mut self) {
        self.semaphore.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{catch_unwind, AssertUnwindSafe};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_acquire_and_release_counts() {
        let sem = Semaphore::new(2);
        sem.acquire();
        sem.acquire();
        assert_eq!(sem.peek(), 0);
        assert!(!sem.try_acquire());
        sem.release();
        assert_eq!(sem.peek(), 1);
        assert!(sem.try_acquire());
        assert_eq!(sem.peek(), 0);
    }

    #[test]
    fn test_acquire_blocks_until_release() {
        let sem = Arc::new(Semaphore::new(0));
        let acquired = Arc::new(AtomicUsize::new(0));

        let handle = {
            let sem = sem.clone();
            let acquired = acquired.clone();
            thread::spawn(move || {
                sem.acquire();
                acquired.fetch_add(1, Ordering::SeqCst);
            })
        };

        thread::sleep(Duration::from_millis(30));
        assert_eq!(acquired.load(Ordering::SeqCst), 0);

        sem.release();
        handle.join().unwrap();
        assert_eq!(acquired.load(Ordering::SeqCst), 1);
        assert_eq!(sem.peek(), 0);
    }

    #[test]
    fn test_broadcast_wake_admits_exactly_released_permits() {
        let sem = Arc::new(Semaphore::new(0));
        let shutdown = ShutdownSignal::new();
        let acquired = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..3)
            .map(|_| {
                let sem = sem.clone();
                let shutdown = shutdown.clone();
                let acquired = acquired.clone();
                thread::spawn(move || {
                    if sem.acquire_or_cancel(&shutdown).is_ok() {
                        acquired.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();

        thread::sleep(Duration::from_millis(30));
        sem.release();
        sem.release();
        thread::sleep(Duration::from_millis(50));
        assert_eq!(acquired.load(Ordering::SeqCst), 2);
        assert_eq!(sem.peek(), 0);

        shutdown.trigger();
        sem.interrupt();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(acquired.load(Ordering::SeqCst), 2);
        assert_eq!(sem.peek(), 0);
    }

    #[test]
    fn test_cancelled_acquire_leaves_value_unchanged() {
        let sem = Arc::new(Semaphore::new(0));
        let shutdown = ShutdownSignal::new();

        let handle = {
            let sem = sem.clone();
            let shutdown = shutdown.clone();
            thread::spawn(move || sem.acquire_or_cancel(&shutdown))
        };

        thread::sleep(Duration::from_millis(30));
        shutdown.trigger();
        sem.interrupt();

        assert_eq!(handle.join().unwrap(), Err(Cancelled));
        assert_eq!(sem.peek(), 0);
    }

    #[test]
    fn test_cancel_wins_over_available_permit() {
        let sem = Semaphore::new(1);
        let shutdown = ShutdownSignal::new();
        shutdown.trigger();
        assert_eq!(sem.acquire_or_cancel(&shutdown), Err(Cancelled));
        assert_eq!(sem.peek(), 1);
    }

    #[test]
    fn test_guard_releases_on_drop() {
        let sem = Semaphore::new(1);
        {
            let _guard = sem.acquire_guard();
            assert_eq!(sem.peek(), 0);
        }
        assert_eq!(sem.peek(), 1);
    }

    #[test]
    fn test_guard_releases_on_panic() {
        let sem = Semaphore::new(1);
        let result = catch_unwind(AssertUnwindSafe(|| {
            let _guard = sem.acquire_guard();
            panic!("critical section failed");
        }));
        assert!(result.is_err());
        assert_eq!(sem.peek(), 1);
    }

    #[test]
    fn test_mutual_exclusion_under_contention() {
        let sem = Arc::new(Semaphore::new(1));
        let inside = Arc::new(AtomicUsize::new(0));
        let max_inside = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let sem = sem.clone();
                let inside = inside.clone();
                let max_inside = max_inside.clone();
                thread::spawn(move || {
                    for _ in 0..200 {
                        let _guard = sem.acquire_guard();
                        let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                        max_inside.fetch_max(now, Ordering::SeqCst);
                        inside.fetch_sub(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(max_inside.load(Ordering::SeqCst), 1);
        assert_eq!(sem.peek(), 1);
    }
}

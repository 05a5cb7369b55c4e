use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct ShutdownState {
    triggered: AtomicBool,
    lock: Mutex<()>,
    condvar: Condvar,
}

/// One-shot stop flag shared by every execution context of a station.
///
/// Semaphore waiters check the flag under their own lock, so a trigger must be
/// followed by [`Semaphore::interrupt`](super::Semaphore::interrupt) on every
/// semaphore a context may be blocked on.
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    state: Arc<ShutdownState>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the flag and wake everything sleeping on it
    pub fn trigger(&self) {
        self.state.triggered.store(true, Ordering::SeqCst);
        let _guard = self.state.lock.lock();
        self.state.condvar.notify_all();
    }

    pub fn is_triggered(&self) -> bool {
        self.state.triggered.load(Ordering::SeqCst)
    }

    /// Sleep for `duration` unless shutdown arrives first.
    ///
    /// Returns `true` if the full duration elapsed, `false` if interrupted.
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        let mut guard = self.state.lock.lock();
        while !self.is_triggered() {
            if self.state.condvar.wait_until(&mut guard, deadline).timed_out() {
                return !self.is_triggered();
            }
        }
        false
    }
}

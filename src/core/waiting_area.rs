use crate::core::errors::Cancelled;
use crate::core::sync::{Semaphore, ShutdownSignal};
use crate::core::types::ItemId;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Bounded FIFO waiting area shared by arriving cars and pumps.
///
/// Capacity is enforced by the `empty_slots`/`filled_slots` pair and every
/// queue mutation happens while holding the `mutex` semaphore.
///
/// A capacity of zero puts the area in hand-off mode: a pump advertises one
/// slot each time it starts waiting for a car, instead of returning a slot
/// after each dequeue. Queue length is then bounded by the number of idle pumps.
#[derive(Debug)]
pub struct WaitingArea {
    // Uncontended: only touched while `mutex` is held.
    items: Mutex<VecDeque<ItemId>>,
    capacity: usize,
    mutex: Semaphore,
    empty_slots: Semaphore,
    filled_slots: Semaphore,
    // Hand-off offers a faulted take could not reclaim. Each one is still
    // outstanding, so the next take skips its own offer.
    stale_offers: AtomicUsize,
}

/// Counter snapshot of the three waiting-area semaphores
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotCounts {
    pub mutex: usize,
    pub empty: usize,
    pub filled: usize,
}

impl WaitingArea {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            mutex: Semaphore::new(1),
            empty_slots: Semaphore::new(capacity),
            filled_slots: Semaphore::new(0),
            stale_offers: AtomicUsize::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_handoff(&self) -> bool {
        self.capacity == 0
    }

    /// Producer side: wait for a slot, append `item` under the mutex, then
    /// signal that a car is available.
    ///
    /// `on_enqueued` runs inside the critical section with the new queue
    /// length. Only the slot wait can be cancelled.
    pub fn enter<F>(&self, item: ItemId, shutdown: &ShutdownSignal, on_enqueued: F) -> Result<(), Cancelled>
    where
        F: FnOnce(&ItemId, usize),
    {
        self.empty_slots.acquire_or_cancel(shutdown)?;
        {
            let _critical = self.mutex.acquire_guard();
            let mut items = self.items.lock();
            on_enqueued(&item, items.len() + 1);
            items.push_back(item);
        }
        self.filled_slots.release();
        Ok(())
    }

    /// Consumer side: wait for a car, pop the head under the mutex, then free
    /// a waiting-area slot.
    ///
    /// Returns `Ok(None)` when the queue was empty despite a filled permit;
    /// no slot is released in that case, and in hand-off mode the slot this
    /// call offered is withdrawn again. `on_dequeued` runs inside the
    /// critical section with the remaining queue length.
    pub fn take<F>(&self, shutdown: &ShutdownSignal, on_dequeued: F) -> Result<Option<ItemId>, Cancelled>
    where
        F: FnOnce(&ItemId, usize),
    {
        if self.is_handoff() {
            self.offer_slot();
        }
        self.filled_slots.acquire_or_cancel(shutdown)?;
        let taken = {
            let _critical = self.mutex.acquire_guard();
            let mut items = self.items.lock();
            let head = items.pop_front();
            if let Some(item) = &head {
                on_dequeued(item, items.len());
            }
            head
        };
        match (&taken, self.is_handoff()) {
            (Some(_), false) => self.empty_slots.release(),
            (None, true) => self.withdraw_offer(),
            _ => {}
        }
        Ok(taken)
    }

    fn offer_slot(&self) {
        let stale = self
            .stale_offers
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if stale.is_err() {
            self.empty_slots.release();
        }
    }

    /// A producer may already hold the offered slot, in which case its car
    /// is on the way and the offer stays outstanding for the next take.
    fn withdraw_offer(&self) {
        if !self.empty_slots.try_acquire() {
            self.stale_offers.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Wake every context blocked on one of the area's semaphores
    pub fn interrupt(&self) {
        self.empty_slots.interrupt();
        self.filled_slots.interrupt();
        self.mutex.interrupt();
    }

    /// Remove and return everything still queued, in queue order
    pub fn drain(&self) -> Vec<ItemId> {
        let _critical = self.mutex.acquire_guard();
        let mut items = self.items.lock();
        items.drain(..).collect()
    }

    /// Queue length, read under the mutex
    pub fn len(&self) -> usize {
        let _critical = self.mutex.acquire_guard();
        let len = self.items.lock().len();
        len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn slot_counts(&self) -> SlotCounts {
        SlotCounts {
            mutex: self.mutex.peek(),
            empty: self.empty_slots.peek(),
            filled: self.filled_slots.peek(),
        }
    }

    #[cfg(test)]
    pub(crate) fn filled_slots(&self) -> &Semaphore {
        &self.filled_slots
    }
}

use crate::core::observer::{StationEvent, StationObserver};
use crate::core::types::{BayId, ItemId};
use log::warn;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;

/// Invariant breach detected by the [`ConsistencyValidator`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("queue exceeded capacity ({size}/{limit})")]
    QueueOverCapacity { size: usize, limit: usize },
    #[error("active bays exceed total limit ({active}/{limit})")]
    TooManyActiveBays { active: usize, limit: usize },
    #[error("{0} started service twice")]
    DuplicateService(ItemId),
    #[error("{0} already busy but assigned again")]
    BayAlreadyBusy(BayId),
    #[error("{0} was already free")]
    BayAlreadyFree(BayId),
}

#[derive(Debug, Default)]
struct ValidatorState {
    started: HashSet<ItemId>,
    busy_bays: HashSet<BayId>,
    violations: Vec<Violation>,
}

/// Side-channel auditor of the station invariants.
///
/// Keeps its own bookkeeping, independent of the semaphores, and reports
/// every breach to the observer. Nothing here feeds back into control flow.
pub struct ConsistencyValidator {
    queue_limit: usize,
    pool_size: usize,
    state: Mutex<ValidatorState>,
    observer: Arc<dyn StationObserver>,
}

impl ConsistencyValidator {
    pub fn new(queue_limit: usize, pool_size: usize, observer: Arc<dyn StationObserver>) -> Self {
        Self {
            queue_limit,
            pool_size,
            state: Mutex::new(ValidatorState::default()),
            observer,
        }
    }

    pub fn observe_enqueue(&self, size: usize) {
        if size > self.queue_limit {
            self.report(Violation::QueueOverCapacity {
                size,
                limit: self.queue_limit,
            });
        }
    }

    pub fn observe_active_bays(&self, active: usize) {
        if active > self.pool_size {
            self.report(Violation::TooManyActiveBays {
                active,
                limit: self.pool_size,
            });
        }
    }

    /// Items are tracked for the lifetime of the run, so a repeated id counts
    /// as a second service.
    pub fn observe_service_start(&self, item: &ItemId) {
        let fresh = self.state.lock().started.insert(item.clone());
        if !fresh {
            self.report(Violation::DuplicateService(item.clone()));
        }
    }

    pub fn observe_bay_acquire(&self, bay: BayId) {
        let (fresh, active) = {
            let mut state = self.state.lock();
            let fresh = state.busy_bays.insert(bay);
            (fresh, state.busy_bays.len())
        };
        if fresh {
            self.observe_active_bays(active);
        } else {
            self.report(Violation::BayAlreadyBusy(bay));
        }
    }

    pub fn observe_bay_release(&self, bay: BayId) {
        let was_busy = self.state.lock().busy_bays.remove(&bay);
        if !was_busy {
            self.report(Violation::BayAlreadyFree(bay));
        }
    }

    pub fn violations(&self) -> Vec<Violation> {
        self.state.lock().violations.clone()
    }

    pub fn violation_count(&self) -> usize {
        self.state.lock().violations.len()
    }

    pub fn busy_bays(&self) -> usize {
        self.state.lock().busy_bays.len()
    }

    fn report(&self, violation: Violation) {
        warn!("[Validator] {}", violation);
        self.state.lock().violations.push(violation.clone());
        self.observer.notify(StationEvent::Violation(violation));
    }
}

impl std::fmt::Debug for ConsistencyValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsistencyValidator")
            .field("queue_limit", &self.queue_limit)
            .field("pool_size", &self.pool_size)
            .field("violations", &self.violation_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::observer::RecordingObserver;

    fn validator(queue_limit: usize, pool_size: usize) -> (ConsistencyValidator, Arc<RecordingObserver>) {
        let observer = Arc::new(RecordingObserver::new());
        (
            ConsistencyValidator::new(queue_limit, pool_size, observer.clone()),
            observer,
        )
    }

    #[test]
    fn test_queue_limit() {
        let (validator, observer) = validator(2, 1);
        validator.observe_enqueue(1);
        validator.observe_enqueue(2);
        assert_eq!(validator.violation_count(), 0);

        validator.observe_enqueue(3);
        assert_eq!(
            validator.violations(),
            vec![Violation::QueueOverCapacity { size: 3, limit: 2 }]
        );
        assert_eq!(
            observer.events(),
            vec![StationEvent::Violation(Violation::QueueOverCapacity { size: 3, limit: 2 })]
        );
    }

    #[test]
    fn test_duplicate_service() {
        let (validator, _) = validator(2, 1);
        validator.observe_service_start(&ItemId::from("A"));
        validator.observe_service_start(&ItemId::from("B"));
        assert_eq!(validator.violation_count(), 0);

        validator.observe_service_start(&ItemId::from("A"));
        assert_eq!(
            validator.violations(),
            vec![Violation::DuplicateService(ItemId::from("A"))]
        );
    }

    #[test]
    fn test_balanced_bay_bookkeeping() {
        let (validator, _) = validator(2, 2);
        validator.observe_bay_acquire(BayId::new(1));
        validator.observe_bay_acquire(BayId::new(2));
        assert_eq!(validator.busy_bays(), 2);
        validator.observe_bay_release(BayId::new(1));
        validator.observe_bay_release(BayId::new(2));
        assert_eq!(validator.busy_bays(), 0);
        assert_eq!(validator.violation_count(), 0);
    }

    #[test]
    fn test_double_acquire_and_double_free() {
        let (validator, _) = validator(2, 2);
        validator.observe_bay_acquire(BayId::new(1));
        validator.observe_bay_acquire(BayId::new(1));
        validator.observe_bay_release(BayId::new(1));
        validator.observe_bay_release(BayId::new(1));
        assert_eq!(
            validator.violations(),
            vec![
                Violation::BayAlreadyBusy(BayId::new(1)),
                Violation::BayAlreadyFree(BayId::new(1)),
            ]
        );
    }

    #[test]
    fn test_too_many_active_bays() {
        let (validator, _) = validator(2, 1);
        validator.observe_bay_acquire(BayId::new(1));
        validator.observe_bay_acquire(BayId::new(2));
        assert_eq!(
            validator.violations(),
            vec![Violation::TooManyActiveBays { active: 2, limit: 1 }]
        );
        validator.observe_active_bays(5);
        assert_eq!(validator.violation_count(), 2);
    }

    #[test]
    fn test_violation_messages() {
        assert_eq!(
            Violation::QueueOverCapacity { size: 4, limit: 3 }.to_string(),
            "queue exceeded capacity (4/3)"
        );
        assert_eq!(
            Violation::BayAlreadyFree(BayId::new(2)).to_string(),
            "Bay 2 was already free"
        );
        assert_eq!(
            Violation::DuplicateService(ItemId::from("A")).to_string(),
            "A started service twice"
        );
    }
}

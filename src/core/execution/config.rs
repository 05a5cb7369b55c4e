//! Configuration for a service station run
//!
//! This module provides the station sizing, service timing and the way
//! arriving cars are dispatched onto execution contexts.

use crate::core::errors::StationError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How the producer protocol of each admitted car is executed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArrivalDispatch {
    /// Every car gets its own OS thread
    ThreadPerArrival,
    /// Cars run on a dedicated Rayon pool with the given number of threads
    Pool(usize),
}

impl Default for ArrivalDispatch {
    fn default() -> Self {
        ArrivalDispatch::ThreadPerArrival
    }
}

/// Configuration for a station
///
/// Treated as immutable once the station is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StationConfig {
    /// Number of cars the waiting area can hold. Zero means hand-off mode.
    pub waiting_capacity: usize,
    /// Number of pumps, and of service bays
    pub pump_count: usize,
    /// Time a car occupies a bay
    pub service_time: Duration,
    /// Random delay window applied before a car tries to enter the waiting area
    pub arrival_jitter: Option<(Duration, Duration)>,
    /// Seed for the arrival jitter. Entropy is used when unset.
    pub seed: Option<u64>,
    /// Execution strategy for arriving cars
    pub dispatch: ArrivalDispatch,
}

impl StationConfig {
    /// Create a new configuration with default values
    ///
    /// Defaults: 3 waiting slots, 2 pumps, 1 second service, no jitter
    pub fn new() -> Self {
        Self {
            waiting_capacity: 3,
            pump_count: 2,
            service_time: Duration::from_secs(1),
            arrival_jitter: None,
            seed: None,
            dispatch: ArrivalDispatch::default(),
        }
    }

    /// Set the number of cars the waiting area can hold
    ///
    /// # Arguments
    /// * `capacity` - Waiting slots; zero selects hand-off mode
    ///
    /// # Returns
    /// A new configuration with the specified capacity
    pub fn with_waiting_capacity(mut self, capacity: usize) -> Self {
        self.waiting_capacity = capacity;
        self
    }

    /// Set the number of pumps, which is also the number of service bays
    ///
    /// # Arguments
    /// * `pumps` - Number of pumps, at least 1 for a valid configuration
    ///
    /// # Returns
    /// A new configuration with the specified pump count
    pub fn with_pump_count(mut self, pumps: usize) -> Self {
        self.pump_count = pumps;
        self
    }

    /// Set how long a car occupies its bay
    ///
    /// # Arguments
    /// * `service_time` - Time spent servicing each car
    ///
    /// # Returns
    /// A new configuration with the specified service time
    pub fn with_service_time(mut self, service_time: Duration) -> Self {
        self.service_time = service_time;
        self
    }

    /// Delay each car by a uniformly random duration in `[min, max]`
    ///
    /// # Arguments
    /// * `min` - Shortest delay before a car tries to enter the waiting area
    /// * `max` - Longest delay, not smaller than `min`
    ///
    /// # Returns
    /// A new configuration with the specified jitter window
    pub fn with_arrival_jitter(mut self, min: Duration, max: Duration) -> Self {
        self.arrival_jitter = Some((min, max));
        self
    }

    /// Seed the arrival jitter for reproducible runs
    ///
    /// # Arguments
    /// * `seed` - Base seed; each car derives its own generator from it
    ///
    /// # Returns
    /// A new configuration with the specified seed
    ///
    /// # Note
    /// This setting only matters when an arrival jitter is configured
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set how arriving cars are mapped onto execution contexts
    ///
    /// # Arguments
    /// * `dispatch` - Thread per arrival, or a bounded Rayon pool
    ///
    /// # Returns
    /// A new configuration with the specified dispatch strategy
    pub fn with_dispatch(mut self, dispatch: ArrivalDispatch) -> Self {
        self.dispatch = dispatch;
        self
    }

    /// Reject configurations no station can be built from
    pub fn validate(&self) -> Result<(), StationError> {
        if self.pump_count == 0 {
            return Err(StationError::InvalidConfiguration(
                "pump count must be at least 1".to_string(),
            ));
        }
        if let ArrivalDispatch::Pool(0) = self.dispatch {
            return Err(StationError::InvalidConfiguration(
                "arrival pool needs at least one thread".to_string(),
            ));
        }
        if let Some((min, max)) = self.arrival_jitter {
            if min > max {
                return Err(StationError::InvalidConfiguration(format!(
                    "arrival jitter window is inverted ({:?} > {:?})",
                    min, max
                )));
            }
        }
        Ok(())
    }

    /// Queue length the validator accepts: the capacity, or the pump count in
    /// hand-off mode where every idle pump advertises one slot
    pub fn queue_limit(&self) -> usize {
        if self.waiting_capacity == 0 {
            self.pump_count
        } else {
            self.waiting_capacity
        }
    }
}

impl Default for StationConfig {
    fn default() -> Self {
        Self::new()
    }
}

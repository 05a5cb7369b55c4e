use crate::core::errors::StationError;
use crate::core::execution::arrival::{arrival_delay, ArrivalUnit};
use crate::core::execution::config::{ArrivalDispatch, StationConfig};
use crate::core::execution::pump::Pump;
use crate::core::execution::schedule::ArrivalSchedule;
use crate::core::observer::{LogObserver, StationEvent, StationObserver};
use crate::core::stats::{StationCounters, StationStats};
use crate::core::sync::{Semaphore, ShutdownSignal};
use crate::core::types::{BayId, ItemId, WorkerState, WorkerStateCell};
use crate::core::validator::{ConsistencyValidator, Violation};
use crate::core::waiting_area::{SlotCounts, WaitingArea};
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Receipt for an admitted car
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admission {
    /// 1-based admission number, unique per station
    pub sequence: u64,
    pub item: ItemId,
}

/// State shared by the controller, the pumps and the arrival contexts
pub(crate) struct StationInner {
    pub(crate) config: StationConfig,
    pub(crate) area: WaitingArea,
    pub(crate) free_bays: Semaphore,
    pub(crate) shutdown: ShutdownSignal,
    pub(crate) validator: ConsistencyValidator,
    pub(crate) observer: Arc<dyn StationObserver>,
    pub(crate) counters: StationCounters,
    pub(crate) worker_states: Vec<WorkerStateCell>,
    arrival_pool: Option<rayon::ThreadPool>,
}

impl StationInner {
    fn admit(self: &Arc<Self>, item: ItemId) -> Result<Admission, StationError> {
        if self.shutdown.is_triggered() {
            return Err(StationError::Stopped);
        }

        let sequence = self.counters.record_admission();
        let delay = arrival_delay(&self.config, sequence);
        let unit = ArrivalUnit::new(item.clone(), delay, Arc::clone(self));
        debug!("Admitting {} as #{}", item, sequence);

        match &self.arrival_pool {
            Some(pool) => pool.spawn(move || unit.run()),
            None => {
                let spawned = thread::Builder::new()
                    .name(format!("arrival-{}", sequence))
                    .spawn(move || unit.run());
                if let Err(err) = spawned {
                    self.counters.record_cancelled();
                    self.counters.record_arrival_exit();
                    return Err(StationError::WorkerSpawn(format!(
                        "arrival context for {}: {}",
                        item, err
                    )));
                }
            }
        }

        Ok(Admission { sequence, item })
    }

    /// Admit every scheduled car, pausing between admissions, until the
    /// schedule is exhausted or the station shuts down
    fn run_feed(self: &Arc<Self>, schedule: ArrivalSchedule) {
        let total = schedule.items.len();
        let mut fed = 0;
        for item in schedule.items {
            if fed > 0 && !self.shutdown.sleep(schedule.inter_arrival) {
                break;
            }
            let admitted = self.admit(item);
            self.counters.unschedule(1);
            fed += 1;
            if let Err(err) = admitted {
                warn!("Arrival feed stopped: {}", err);
                break;
            }
        }
        if fed < total {
            self.counters.unschedule(total - fed);
        }
    }
}

/// Service station controller.
///
/// Owns the waiting area, the bay semaphore and the pump workers. Cars are
/// admitted fire-and-forget; each one runs its producer protocol on its own
/// execution context.
pub struct Station {
    inner: Arc<StationInner>,
    workers: Vec<JoinHandle<()>>,
    feeders: Mutex<Vec<JoinHandle<()>>>,
    stopped: bool,
}

impl Station {
    /// Build a station that reports to the `log` facade
    pub fn new(config: StationConfig) -> Result<Self, StationError> {
        Self::with_observer(config, Arc::new(LogObserver))
    }

    /// Build a station with `waiting_capacity` slots and `pump_count` pumps,
    /// other settings at their defaults
    ///
    /// # Arguments
    /// * `waiting_capacity` - Waiting-area slots; zero selects hand-off mode
    /// * `pump_count` - Number of pumps and bays
    ///
    /// # Returns
    /// The configured station, or `InvalidConfiguration` when no station can
    /// be built. Nothing is spawned until [`Station::start`].
    pub fn configure(waiting_capacity: usize, pump_count: usize) -> Result<Self, StationError> {
        Self::new(
            StationConfig::new()
                .with_waiting_capacity(waiting_capacity)
                .with_pump_count(pump_count),
        )
    }

    /// Build a station that reports to `observer`
    ///
    /// # Arguments
    /// * `config` - Station configuration, validated before anything is built
    /// * `observer` - Receiver of every station event
    ///
    /// # Returns
    /// The station, `InvalidConfiguration` for a rejected config, or
    /// `WorkerSpawn` when the arrival pool cannot be created
    pub fn with_observer(
        config: StationConfig,
        observer: Arc<dyn StationObserver>,
    ) -> Result<Self, StationError> {
        config.validate()?;

        let arrival_pool = match config.dispatch {
            ArrivalDispatch::ThreadPerArrival => None,
            ArrivalDispatch::Pool(threads) => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .thread_name(|index| format!("arrival-pool-{}", index))
                    .build()
                    .map_err(|err| StationError::WorkerSpawn(format!("arrival pool: {}", err)))?,
            ),
        };

        let validator =
            ConsistencyValidator::new(config.queue_limit(), config.pump_count, observer.clone());
        let inner = StationInner {
            area: WaitingArea::new(config.waiting_capacity),
            free_bays: Semaphore::new(config.pump_count),
            shutdown: ShutdownSignal::new(),
            validator,
            observer,
            counters: StationCounters::new(),
            worker_states: (0..config.pump_count).map(|_| WorkerStateCell::new()).collect(),
            arrival_pool,
            config,
        };

        Ok(Self {
            inner: Arc::new(inner),
            workers: Vec::new(),
            feeders: Mutex::new(Vec::new()),
            stopped: false,
        })
    }

    /// Spawn one worker per pump
    ///
    /// # Returns
    /// `AlreadyStarted` on a second call and `Stopped` after [`Station::stop`]
    pub fn start(&mut self) -> Result<(), StationError> {
        if self.stopped {
            return Err(StationError::Stopped);
        }
        if !self.workers.is_empty() {
            return Err(StationError::AlreadyStarted);
        }

        let config = &self.inner.config;
        info!(
            "Station starting: {} pumps, waiting capacity {}",
            config.pump_count, config.waiting_capacity
        );
        for number in 1..=config.pump_count {
            let pump = Pump::new(BayId::new(number), Arc::clone(&self.inner));
            let handle = thread::Builder::new()
                .name(format!("pump-{}", number))
                .spawn(move || pump.run())
                .map_err(|err| StationError::WorkerSpawn(format!("pump {}: {}", number, err)))?;
            self.workers.push(handle);
        }
        Ok(())
    }

    /// Hand a car to the station. Returns as soon as its arrival context is
    /// spawned, before the car has entered the waiting area.
    ///
    /// # Arguments
    /// * `item` - Car identifier
    ///
    /// # Returns
    /// The admission receipt with its sequence number, or `Stopped` once the
    /// station has shut down
    pub fn admit(&self, item: impl Into<ItemId>) -> Result<Admission, StationError> {
        self.inner.admit(item.into())
    }

    /// Admit the scheduled cars from a background feeder
    ///
    /// # Arguments
    /// * `schedule` - Cars in admission order and the pause between them
    ///
    /// # Note
    /// Returns immediately. [`Station::stop`] interrupts a feed in progress.
    pub fn feed(&self, schedule: ArrivalSchedule) -> Result<(), StationError> {
        if self.inner.shutdown.is_triggered() {
            return Err(StationError::Stopped);
        }

        let total = schedule.items.len();
        self.inner.counters.schedule(total);
        let inner = Arc::clone(&self.inner);
        let spawned = thread::Builder::new()
            .name("arrival-feed".to_string())
            .spawn(move || inner.run_feed(schedule));
        match spawned {
            Ok(handle) => {
                self.feeders.lock().push(handle);
                Ok(())
            }
            Err(err) => {
                self.inner.counters.unschedule(total);
                Err(StationError::WorkerSpawn(format!("arrival feed: {}", err)))
            }
        }
    }

    /// Block until every admitted or scheduled car is serviced, cancelled or
    /// abandoned. Returns `false` on timeout.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        self.inner
            .counters
            .wait_until(Instant::now() + timeout, |counters| counters.is_settled())
    }

    /// Stop the station and return the cars still queued, which are never
    /// serviced.
    ///
    /// Workers finish any service in progress; contexts blocked on a
    /// semaphore are cancelled. Calling `stop` again returns nothing.
    pub fn stop(&mut self) -> Vec<ItemId> {
        if self.stopped {
            return Vec::new();
        }
        self.stopped = true;

        let inner = &self.inner;
        info!("Station stopping");
        inner.shutdown.trigger();
        inner.area.interrupt();
        inner.free_bays.interrupt();

        for feeder in self.feeders.lock().drain(..) {
            if feeder.join().is_err() {
                warn!("Arrival feed panicked");
            }
        }
        inner.counters.wait(|counters| counters.pending_arrivals() == 0);
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                warn!("A pump worker panicked");
            }
        }

        let abandoned = inner.area.drain();
        if !abandoned.is_empty() {
            info!("{} cars left in the waiting area", abandoned.len());
            inner.counters.record_abandoned(abandoned.len() as u64);
            for item in &abandoned {
                inner
                    .observer
                    .notify(StationEvent::Abandoned { item: item.clone() });
            }
            inner.observer.notify(StationEvent::QueueSizeChanged(0));
        }
        abandoned
    }

    pub fn is_running(&self) -> bool {
        !self.stopped && !self.workers.is_empty()
    }

    pub fn config(&self) -> &StationConfig {
        &self.inner.config
    }

    pub fn stats(&self) -> StationStats {
        StationStats {
            queue_len: self.inner.area.len(),
            free_bays: self.inner.free_bays.peek(),
            violations: self.inner.validator.violation_count(),
            ..self.inner.counters.snapshot()
        }
    }

    /// Current state of every pump, ordered by bay number
    pub fn worker_states(&self) -> Vec<WorkerState> {
        self.inner.worker_states.iter().map(WorkerStateCell::get).collect()
    }

    pub fn queue_len(&self) -> usize {
        self.inner.area.len()
    }

    /// Free permits on the bay semaphore
    pub fn free_bays(&self) -> usize {
        self.inner.free_bays.peek()
    }

    pub fn slot_counts(&self) -> SlotCounts {
        self.inner.area.slot_counts()
    }

    pub fn violations(&self) -> Vec<Violation> {
        self.inner.validator.violations()
    }
}

impl Drop for Station {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for Station {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Station")
            .field("config", &self.inner.config)
            .field("workers", &self.workers.len())
            .field("stopped", &self.stopped)
            .finish()
    }
}

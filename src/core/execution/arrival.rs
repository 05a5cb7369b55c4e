use crate::core::errors::Cancelled;
use crate::core::execution::config::StationConfig;
use crate::core::execution::station::StationInner;
use crate::core::observer::StationEvent;
use crate::core::types::ItemId;
use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::time::Duration;

/// Pre-arrival delay for the car with the given admission sequence number.
///
/// Seeded configurations derive one generator per car so the delay does not
/// depend on the order in which arrival contexts get scheduled.
pub(crate) fn arrival_delay(config: &StationConfig, sequence: u64) -> Option<Duration> {
    let (min, max) = config.arrival_jitter?;
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(sequence)),
        None => StdRng::from_entropy(),
    };
    Some(rng.gen_range(min..=max))
}

/// Producer side of the station: one per admitted car
pub(crate) struct ArrivalUnit {
    item: ItemId,
    delay: Option<Duration>,
    station: Arc<StationInner>,
}

impl ArrivalUnit {
    pub(crate) fn new(item: ItemId, delay: Option<Duration>, station: Arc<StationInner>) -> Self {
        Self {
            item,
            delay,
            station,
        }
    }

    pub(crate) fn run(self) {
        let station = &self.station;
        station.observer.notify(StationEvent::Arrived {
            item: self.item.clone(),
        });

        if let Err(Cancelled) = self.enter_waiting_area() {
            debug!("{} cancelled before entering the queue", self.item);
            station.counters.record_cancelled();
            station.observer.notify(StationEvent::ArrivalCancelled {
                item: self.item.clone(),
            });
        }
        station.counters.record_arrival_exit();
    }

    fn enter_waiting_area(&self) -> Result<(), Cancelled> {
        let station = &self.station;
        if let Some(delay) = self.delay {
            if !station.shutdown.sleep(delay) {
                return Err(Cancelled);
            }
        }

        debug!("{} is checking for queue space", self.item);
        let mut entered_len = 0;
        station
            .area
            .enter(self.item.clone(), &station.shutdown, |_, queue_len| {
                station.counters.record_enqueue();
                entered_len = queue_len;
            })?;
        station.validator.observe_enqueue(entered_len);
        station.observer.notify(StationEvent::Enqueued {
            item: self.item.clone(),
            queue_len: entered_len,
        });
        station.observer.notify(StationEvent::QueueSizeChanged(entered_len));
        Ok(())
    }
}

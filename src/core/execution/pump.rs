use crate::core::errors::Cancelled;
use crate::core::execution::station::StationInner;
use crate::core::observer::StationEvent;
use crate::core::types::{BayId, ItemId, WorkerState, WorkerStateCell};
use log::{debug, info, warn};
use std::sync::Arc;
use std::thread;

/// Consumer side of the station: one long-lived worker per bay
pub(crate) struct Pump {
    bay: BayId,
    station: Arc<StationInner>,
}

impl Pump {
    pub(crate) fn new(bay: BayId, station: Arc<StationInner>) -> Self {
        Self { bay, station }
    }

    pub(crate) fn run(self) {
        info!("[Pump {}] on duty", self.bay.number());
        let station = &self.station;

        while !station.shutdown.is_triggered() {
            self.state().set(WorkerState::WaitingForItem);
            let item = match self.next_car() {
                Ok(Some(item)) => item,
                Ok(None) => {
                    warn!("[Pump {}] queue empty despite a filled slot", self.bay.number());
                    station.observer.notify(StationEvent::QueueFault { pump: self.bay });
                    continue;
                }
                Err(Cancelled) => break,
            };

            self.state().set(WorkerState::WaitingForBay);
            if station.free_bays.acquire_or_cancel(&station.shutdown).is_err() {
                info!(
                    "[Pump {}] {} abandoned while waiting for a bay",
                    self.bay.number(),
                    item
                );
                station.counters.record_abandoned(1);
                station.observer.notify(StationEvent::Abandoned { item });
                break;
            }

            self.serve(item);
            self.state().set(WorkerState::Idle);
        }

        self.state().set(WorkerState::Stopped);
        station.observer.notify(StationEvent::WorkerStopped { pump: self.bay });
        debug!("[Pump {}] left its loop", self.bay.number());
    }

    fn next_car(&self) -> Result<Option<ItemId>, Cancelled> {
        let station = &self.station;
        let mut remaining = 0;
        let taken = station
            .area
            .take(&station.shutdown, |_, queue_len| remaining = queue_len)?;
        if let Some(item) = &taken {
            station.observer.notify(StationEvent::Dequeued {
                item: item.clone(),
                pump: self.bay,
                queue_len: remaining,
            });
            station.observer.notify(StationEvent::QueueSizeChanged(remaining));
        }
        Ok(taken)
    }

    /// Occupy the bay for the configured service time. The bay permit is
    /// already held and is returned here.
    fn serve(&self, item: ItemId) {
        let station = &self.station;
        self.state().set(WorkerState::Servicing);
        station.validator.observe_service_start(&item);
        station.validator.observe_bay_acquire(self.bay);
        let active = station.counters.bay_started();
        station.validator.observe_active_bays(active);
        station.observer.notify(StationEvent::ActiveBaysChanged(active));
        station.observer.notify(StationEvent::ServiceStarted {
            item: item.clone(),
            bay: self.bay,
        });

        thread::sleep(station.config.service_time);

        station.observer.notify(StationEvent::ServiceFinished {
            item,
            bay: self.bay,
        });
        let active = station.counters.bay_finished();
        station.observer.notify(StationEvent::ActiveBaysChanged(active));
        station.validator.observe_bay_release(self.bay);
        station.free_bays.release();
        station.counters.record_serviced();
    }

    fn state(&self) -> &WorkerStateCell {
        &self.station.worker_states[self.bay.number() - 1]
    }
}

use crate::core::types::{BayId, ItemId};
use crate::core::validator::Violation;
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::sync::mpsc::{self, Receiver, Sender};

/// Notification published by the station core
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StationEvent {
    /// A car's arrival context started running
    Arrived { item: ItemId },
    /// A car was appended to the waiting area
    Enqueued { item: ItemId, queue_len: usize },
    /// A pump took a car off the head of the waiting area
    Dequeued { item: ItemId, pump: BayId, queue_len: usize },
    ServiceStarted { item: ItemId, bay: BayId },
    ServiceFinished { item: ItemId, bay: BayId },
    QueueSizeChanged(usize),
    ActiveBaysChanged(usize),
    /// Shutdown reached a car before it entered the waiting area
    ArrivalCancelled { item: ItemId },
    /// Shutdown reached a dequeued car before it got a bay, or the car was
    /// still queued when the station stopped
    Abandoned { item: ItemId },
    /// A pump found the waiting area empty despite a filled permit
    QueueFault { pump: BayId },
    WorkerStopped { pump: BayId },
    Violation(Violation),
}

/// Display/log collaborator of the station.
///
/// Called from every execution context of the station, never while the
/// waiting-area mutex is held. Implementations should still return quickly.
pub trait StationObserver: Send + Sync {
    fn notify(&self, event: StationEvent);
}

/// Forwards every event to the `log` facade
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl StationObserver for LogObserver {
    fn notify(&self, event: StationEvent) {
        match event {
            StationEvent::Arrived { item } => info!("{} arrived", item),
            StationEvent::Enqueued { item, queue_len } => {
                info!("{} enters the queue. Queue size: {}", item, queue_len)
            }
            StationEvent::Dequeued { item, pump, .. } => {
                info!("[Pump {}] {} Occupied", pump.number(), item)
            }
            StationEvent::ServiceStarted { item, bay } => {
                info!("[Pump {}] {} begins service at {}", bay.number(), item, bay)
            }
            StationEvent::ServiceFinished { item, bay } => {
                info!("[Pump {}] {} finishes service, {} is now free", bay.number(), item, bay)
            }
            StationEvent::QueueSizeChanged(len) => debug!("Queue: {}", len),
            StationEvent::ActiveBaysChanged(active) => debug!("Active pumps: {}", active),
            StationEvent::ArrivalCancelled { item } => {
                info!("{} left before entering the queue", item)
            }
            StationEvent::Abandoned { item } => info!("{} was never serviced", item),
            StationEvent::QueueFault { pump } => {
                warn!("[Pump {}] queue empty despite a filled slot", pump.number())
            }
            StationEvent::WorkerStopped { pump } => info!("[Pump {}] shutting down", pump.number()),
            StationEvent::Violation(violation) => warn!("[Validator] {}", violation),
        }
    }
}

/// Discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl StationObserver for NullObserver {
    fn notify(&self, _event: StationEvent) {}
}

/// Keeps every event in arrival order
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<StationEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events recorded so far
    pub fn events(&self) -> Vec<StationEvent> {
        self.events.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl StationObserver for RecordingObserver {
    fn notify(&self, event: StationEvent) {
        self.events.lock().push(event);
    }
}

/// Sends every event down an unbounded channel.
///
/// Events are dropped once the receiver is gone.
#[derive(Debug)]
pub struct ChannelObserver {
    sender: Mutex<Sender<StationEvent>>,
}

impl ChannelObserver {
    pub fn new() -> (Self, Receiver<StationEvent>) {
        let (sender, receiver) = mpsc::channel();
        (
            Self {
                sender: Mutex::new(sender),
            },
            receiver,
        )
    }
}

impl StationObserver for ChannelObserver {
    fn notify(&self, event: StationEvent) {
        let _ = self.sender.lock().send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_observer_keeps_order() {
        let observer = RecordingObserver::new();
        assert!(observer.is_empty());
        observer.notify(StationEvent::QueueSizeChanged(1));
        observer.notify(StationEvent::QueueSizeChanged(0));
        assert_eq!(observer.len(), 2);
        assert_eq!(
            observer.events(),
            vec![StationEvent::QueueSizeChanged(1), StationEvent::QueueSizeChanged(0)]
        );
    }

    #[test]
    fn test_channel_observer_delivers() {
        let (observer, receiver) = ChannelObserver::new();
        observer.notify(StationEvent::Arrived { item: ItemId::from("A") });
        assert_eq!(
            receiver.recv().unwrap(),
            StationEvent::Arrived { item: ItemId::from("A") }
        );
    }

    #[test]
    fn test_channel_observer_survives_dropped_receiver() {
        let (observer, receiver) = ChannelObserver::new();
        drop(receiver);
        observer.notify(StationEvent::ActiveBaysChanged(1));
    }

    #[test]
    fn test_log_observer_handles_every_event() {
        let _ = env_logger::builder().is_test(true).try_init();
        let item = ItemId::from("A");
        let bay = BayId::new(1);
        let events = vec![
            StationEvent::Arrived { item: item.clone() },
            StationEvent::Enqueued { item: item.clone(), queue_len: 1 },
            StationEvent::Dequeued { item: item.clone(), pump: bay, queue_len: 0 },
            StationEvent::ServiceStarted { item: item.clone(), bay },
            StationEvent::ServiceFinished { item: item.clone(), bay },
            StationEvent::QueueSizeChanged(0),
            StationEvent::ActiveBaysChanged(0),
            StationEvent::ArrivalCancelled { item: item.clone() },
            StationEvent::Abandoned { item },
            StationEvent::QueueFault { pump: bay },
            StationEvent::WorkerStopped { pump: bay },
            StationEvent::Violation(Violation::BayAlreadyFree(bay)),
        ];
        for event in events {
            LogObserver.notify(event);
        }
    }
}

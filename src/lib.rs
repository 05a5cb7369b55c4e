pub mod core;

// Re-export commonly used types
pub use crate::core::errors::{Cancelled, StationError};
pub use crate::core::execution::{Admission, ArrivalDispatch, ArrivalSchedule, Station, StationConfig};
pub use crate::core::observer::{
    ChannelObserver, LogObserver, NullObserver, RecordingObserver, StationEvent, StationObserver,
};
pub use crate::core::stats::StationStats;
pub use crate::core::sync::{Semaphore, SemaphoreGuard, ShutdownSignal};
pub use crate::core::types::{BayId, ItemId, WorkerState};
pub use crate::core::validator::{ConsistencyValidator, Violation};
pub use crate::core::waiting_area::{SlotCounts, WaitingArea};

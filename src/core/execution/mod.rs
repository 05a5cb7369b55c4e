pub mod config;
pub mod schedule;
pub mod station;

mod arrival;
mod pump;

// Re-export commonly used types
pub use config::{ArrivalDispatch, StationConfig};
pub use schedule::ArrivalSchedule;
pub use station::{Admission, Station};

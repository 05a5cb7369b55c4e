use thiserror::Error;

/// Errors surfaced by station construction and lifecycle calls
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StationError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("station is already running")]
    AlreadyStarted,
    #[error("station has been stopped")]
    Stopped,
    #[error("failed to spawn {0}")]
    WorkerSpawn(String),
}

/// A blocked acquire was abandoned because the station is shutting down.
/// The semaphore counter is left untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("acquire cancelled by shutdown")]
pub struct Cancelled;

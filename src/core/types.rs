use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU8, Ordering};

/// Identifier of an arriving car
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    /// Create a new item ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the raw ID string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ItemId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ItemId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Service bay number. Bays are numbered from 1 and pump K always serves on bay K.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BayId(usize);

impl BayId {
    pub fn new(number: usize) -> Self {
        Self(number)
    }

    pub fn number(&self) -> usize {
        self.0
    }
}

impl std::fmt::Display for BayId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Bay {}", self.0)
    }
}

/// Lifecycle of a single pump worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkerState {
    /// Not yet started, or between two services
    Idle,
    /// Blocked until a car is in the waiting area
    WaitingForItem,
    /// Holding a dequeued car, blocked until a bay is free
    WaitingForBay,
    /// Occupying a bay
    Servicing,
    /// Left its loop after shutdown
    Stopped,
}

impl WorkerState {
    fn as_u8(self) -> u8 {
        match self {
            WorkerState::Idle => 0,
            WorkerState::WaitingForItem => 1,
            WorkerState::WaitingForBay => 2,
            WorkerState::Servicing => 3,
            WorkerState::Stopped => 4,
        }
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => WorkerState::WaitingForItem,
            2 => WorkerState::WaitingForBay,
            3 => WorkerState::Servicing,
            4 => WorkerState::Stopped,
            _ => WorkerState::Idle,
        }
    }
}

/// Published state of one worker. Only the owning worker writes it.
#[derive(Debug)]
pub(crate) struct WorkerStateCell(AtomicU8);

impl WorkerStateCell {
    pub(crate) fn new() -> Self {
        Self(AtomicU8::new(WorkerState::Idle.as_u8()))
    }

    pub(crate) fn set(&self, state: WorkerState) {
        self.0.store(state.as_u8(), Ordering::Release);
    }

    pub(crate) fn get(&self) -> WorkerState {
        WorkerState::from_u8(self.0.load(Ordering::Acquire))
    }
}

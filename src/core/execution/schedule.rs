use crate::core::types::ItemId;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Ordered list of cars fed into a station one after another
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ArrivalSchedule {
    pub items: Vec<ItemId>,
    /// Pause between two consecutive admissions
    pub inter_arrival: Duration,
}

impl ArrivalSchedule {
    pub fn new<I, T>(items: I, inter_arrival: Duration) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<ItemId>,
    {
        Self {
            items: items.into_iter().map(Into::into).collect(),
            inter_arrival,
        }
    }

    /// Parse a comma separated list of car names, e.g. `"C1, C2,C3"`.
    /// Names are trimmed and empty entries skipped.
    pub fn parse(list: &str, inter_arrival: Duration) -> Self {
        let items = list
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(ItemId::from)
            .collect();
        Self {
            items,
            inter_arrival,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

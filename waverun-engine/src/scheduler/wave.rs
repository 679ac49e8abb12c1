//! Waves and the ordered schedule they form.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use waverun_core::types::ItemId;

/// A set of items scheduled to run concurrently.
///
/// Every dependency of an item in wave `k` is satisfied by items in waves
/// `< k`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wave {
    /// Position in the schedule, starting at 0.
    pub index: usize,
    /// Items in selection order.
    pub items: Vec<ItemId>,
}

impl Wave {
    /// Number of items in the wave.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the wave is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether the wave contains an item.
    pub fn contains(&self, id: &str) -> bool {
        self.items.iter().any(|item| item.as_str() == id)
    }
}

/// The ordered wave sequence for a graph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schedule {
    waves: Vec<Wave>,
    wave_of: HashMap<ItemId, usize>,
}

impl Schedule {
    pub(crate) fn new(waves: Vec<Wave>) -> Self {
        let wave_of = waves
            .iter()
            .flat_map(|wave| wave.items.iter().map(move |id| (id.clone(), wave.index)))
            .collect();
        Self { waves, wave_of }
    }

    /// All waves in execution order.
    pub fn waves(&self) -> &[Wave] {
        &self.waves
    }

    /// Number of waves.
    pub fn len(&self) -> usize {
        self.waves.len()
    }

    /// Whether there are no waves.
    pub fn is_empty(&self) -> bool {
        self.waves.is_empty()
    }

    /// Wave index of an item.
    pub fn wave_of(&self, id: &str) -> Option<usize> {
        self.wave_of.get(id).copied()
    }

    /// Number of scheduled items across all waves.
    pub fn total_items(&self) -> usize {
        self.wave_of.len()
    }

    /// Iterate over waves.
    pub fn iter(&self) -> impl Iterator<Item = &Wave> {
        self.waves.iter()
    }

    /// Item ids per wave, for display and comparisons.
    pub fn as_id_lists(&self) -> Vec<Vec<&str>> {
        self.waves
            .iter()
            .map(|wave| wave.items.iter().map(ItemId::as_str).collect())
            .collect()
    }
}

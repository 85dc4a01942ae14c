//! Long-format observation table: one row per (site, method, species).

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A single long-format observation derived from the wide survey table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Observation {
    /// Site identifier.
    pub site: String,
    /// Collection method.
    pub method: String,
    /// Species identifier.
    pub species: String,
    /// Abundance count for this (site, method, species).
    pub count: u64,
    /// Mean body size joined from the trait table.
    pub size: f64,
}

/// Derived long-format table. Read-only after construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservationTable {
    observations: Vec<Observation>,
}

impl ObservationTable {
    pub fn new(observations: Vec<Observation>) -> Self {
        Self { observations }
    }

    /// All observations.
    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    /// Number of long rows.
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    /// Check if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Distinct site identifiers, sorted.
    pub fn sites(&self) -> Vec<String> {
        let set: BTreeSet<&str> = self
            .observations
            .iter()
            .map(|o| o.site.as_str())
            .collect();
        set.into_iter().map(String::from).collect()
    }

    /// Distinct collection methods, sorted.
    pub fn methods(&self) -> Vec<String> {
        let set: BTreeSet<&str> = self
            .observations
            .iter()
            .map(|o| o.method.as_str())
            .collect();
        set.into_iter().map(String::from).collect()
    }

    /// Sum of abundance counts for one (site, method) pair.
    pub fn total_for(&self, site: &str, method: &str) -> u64 {
        self.observations
            .iter()
            .filter(|o| o.site == site && o.method == method)
            .map(|o| o.count)
            .sum()
    }
}

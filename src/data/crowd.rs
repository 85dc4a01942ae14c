//! Crowd-sourced observation table (iNaturalist-style sightings).

use crate::error::{Result, SurveyError};
use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

/// One crowd-sourced sighting. Presence is implicit: one row is one
/// individual observation, there is no count field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrowdRecord {
    pub species: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Table of crowd-sourced sightings, pre-reconciled taxonomically upstream.
#[derive(Debug, Clone)]
pub struct CrowdTable {
    records: Vec<CrowdRecord>,
    n_dropped: usize,
}

impl CrowdTable {
    pub fn new(records: Vec<CrowdRecord>) -> Self {
        Self {
            records,
            n_dropped: 0,
        }
    }

    /// Load crowd observations from a TSV file.
    ///
    /// Expected columns: `species`, `latitude`, `longitude`. Rows with an
    /// empty or `NA` species identifier or unparsable coordinates are
    /// dropped silently, matching the survey loader's cleaning policy.
    pub fn from_tsv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut reader = ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .from_path(path)?;

        let headers = reader.headers()?.clone();
        let species_idx = headers
            .iter()
            .position(|h| h == "species")
            .ok_or_else(|| SurveyError::MissingColumn("species".to_string()))?;
        let lat_idx = headers
            .iter()
            .position(|h| h == "latitude")
            .ok_or_else(|| SurveyError::MissingColumn("latitude".to_string()))?;
        let lon_idx = headers
            .iter()
            .position(|h| h == "longitude")
            .ok_or_else(|| SurveyError::MissingColumn("longitude".to_string()))?;

        let mut records = Vec::new();
        let mut n_dropped = 0;

        for record in reader.records() {
            let record = record?;
            let species = record.get(species_idx).unwrap_or("").trim();
            let lat = record.get(lat_idx).unwrap_or("").trim().parse::<f64>();
            let lon = record.get(lon_idx).unwrap_or("").trim().parse::<f64>();

            match (species, lat, lon) {
                (s, Ok(latitude), Ok(longitude)) if !s.is_empty() && s != "NA" && s != "na" => {
                    records.push(CrowdRecord {
                        species: s.to_string(),
                        latitude,
                        longitude,
                    });
                }
                _ => n_dropped += 1,
            }
        }

        Ok(Self { records, n_dropped })
    }

    /// All sightings.
    pub fn records(&self) -> &[CrowdRecord] {
        &self.records
    }

    /// Number of sightings.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Rows dropped at load time.
    pub fn n_dropped(&self) -> usize {
        self.n_dropped
    }

    /// Count of distinct species across all sightings.
    pub fn unique_species(&self) -> usize {
        let set: BTreeSet<&str> = self.records.iter().map(|r| r.species.as_str()).collect();
        set.len()
    }
}

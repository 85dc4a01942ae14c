//! Species trait table: body-size estimates per species.

use crate::error::{Result, SurveyError};
use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Minimum and maximum body-size estimates for one species.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SizeRange {
    pub min: f64,
    pub max: f64,
}

impl SizeRange {
    /// Arithmetic mean of the minimum and maximum estimates.
    pub fn mean(&self) -> f64 {
        (self.min + self.max) / 2.0
    }
}

/// One trait record per species, keyed by species identifier.
#[derive(Debug, Clone)]
pub struct TraitTable {
    sizes: HashMap<String, SizeRange>,
}

impl TraitTable {
    /// Create a trait table from (species, range) pairs.
    ///
    /// Validates that size estimates are positive with min <= max and that
    /// species identifiers are unique.
    pub fn new(records: Vec<(String, SizeRange)>) -> Result<Self> {
        let mut sizes = HashMap::with_capacity(records.len());
        for (species, range) in records {
            if !(range.min > 0.0 && range.max > 0.0 && range.min <= range.max) {
                return Err(SurveyError::InvalidSizeRange {
                    species,
                    min: range.min,
                    max: range.max,
                });
            }
            if sizes.insert(species.clone(), range).is_some() {
                return Err(SurveyError::DuplicateSpecies(species));
            }
        }
        Ok(Self { sizes })
    }

    /// Load a trait table from a TSV file.
    ///
    /// Expected columns: `species`, `min_size`, `max_size`.
    pub fn from_tsv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut reader = ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .from_path(path)?;

        let headers = reader.headers()?.clone();
        let species_idx = column_index(&headers, "species")?;
        let min_idx = column_index(&headers, "min_size")?;
        let max_idx = column_index(&headers, "max_size")?;

        let mut records = Vec::new();
        for (row_idx, record) in reader.records().enumerate() {
            let record = record?;
            let species = record.get(species_idx).unwrap_or("").trim().to_string();
            if species.is_empty() {
                return Err(SurveyError::MissingData {
                    row: row_idx,
                    reason: "empty species identifier".to_string(),
                });
            }
            let min = parse_size(&record, min_idx, row_idx, "min_size")?;
            let max = parse_size(&record, max_idx, row_idx, "max_size")?;
            records.push((species, SizeRange { min, max }));
        }

        Self::new(records)
    }

    /// Size range for a species, if present.
    pub fn get(&self, species: &str) -> Option<&SizeRange> {
        self.sizes.get(species)
    }

    /// Mean body size for a species, if present.
    pub fn mean_size(&self, species: &str) -> Option<f64> {
        self.sizes.get(species).map(SizeRange::mean)
    }

    /// Number of species with trait records.
    pub fn len(&self) -> usize {
        self.sizes.len()
    }

    /// Check if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }
}

fn column_index(headers: &csv::StringRecord, name: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h == name)
        .ok_or_else(|| SurveyError::MissingColumn(name.to_string()))
}

fn parse_size(
    record: &csv::StringRecord,
    idx: usize,
    row: usize,
    column: &str,
) -> Result<f64> {
    let raw = record.get(idx).unwrap_or("").trim();
    raw.parse().map_err(|_| SurveyError::InvalidCount {
        value: raw.to_string(),
        row,
        column: column.to_string(),
    })
}

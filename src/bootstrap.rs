//! Nonparametric bootstrap resampling of group statistics.
//!
//! Estimates the sampling distribution of a group statistic (typically
//! species richness) by repeatedly drawing, with replacement, resamples the
//! same size as the source group and recomputing the statistic on each.
//!
//! # Algorithm
//!
//! 1. For each of K iterations, draw n row indices i.i.d. uniformly with
//!    replacement from the group's n rows
//! 2. Apply the statistic function to the resampled rows
//! 3. Record the scalar result; the K results form the empirical
//!    distribution
//!
//! Iterations are independent of each other and of every other group, so the
//! loop runs in parallel when configured; each iteration derives its own RNG
//! from the base seed, which keeps serial and parallel runs identical.

use crate::data::{CrowdTable, SurveyTable};
use crate::error::{Result, SurveyError};
use crate::richness::{richness, unique_species};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Configuration for bootstrap resampling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapConfig {
    /// Number of resampling iterations.
    pub iterations: usize,
    /// Random seed for reproducibility.
    pub seed: u64,
    /// Whether to run iterations in parallel.
    pub parallel: bool,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            iterations: 1000,
            seed: 42,
            parallel: true,
        }
    }
}

impl BootstrapConfig {
    /// Quick configuration for testing (fewer iterations).
    pub fn quick() -> Self {
        Self {
            iterations: 100,
            ..Default::default()
        }
    }

    /// Thorough configuration (more iterations).
    pub fn thorough() -> Self {
        Self {
            iterations: 10000,
            ..Default::default()
        }
    }
}

/// Empirical distribution of a group statistic across bootstrap resamples.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapSample {
    /// One statistic value per iteration, in iteration order.
    pub values: Vec<f64>,
    /// Size of the source group (and of every resample).
    pub n_source: usize,
    /// Seed the distribution was drawn with.
    pub seed: u64,
}

impl BootstrapSample {
    /// Number of iterations.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the sample is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Mean of the bootstrap distribution.
    pub fn mean(&self) -> f64 {
        if self.values.is_empty() {
            return f64::NAN;
        }
        self.values.iter().sum::<f64>() / self.values.len() as f64
    }

    /// Sample standard deviation of the bootstrap distribution.
    pub fn std_dev(&self) -> f64 {
        let n = self.values.len();
        if n < 2 {
            return f64::NAN;
        }
        let mean = self.mean();
        let ss: f64 = self.values.iter().map(|v| (v - mean).powi(2)).sum();
        (ss / (n - 1) as f64).sqrt()
    }

    /// Empirical quantile (nearest-rank on the sorted values), q in [0, 1].
    pub fn quantile(&self, q: f64) -> f64 {
        if self.values.is_empty() || !(0.0..=1.0).contains(&q) {
            return f64::NAN;
        }
        let mut sorted = self.values.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let rank = ((q * sorted.len() as f64).ceil() as usize).max(1) - 1;
        sorted[rank.min(sorted.len() - 1)]
    }
}

/// Simple deterministic random number generator for resampling.
struct SimpleRng {
    state: u64,
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        // xorshift64 has a fixed point at zero.
        Self {
            state: seed.max(1),
        }
    }

    fn next_u64(&mut self) -> u64 {
        // xorshift64
        self.state ^= self.state << 13;
        self.state ^= self.state >> 7;
        self.state ^= self.state << 17;
        self.state
    }

    /// Uniform index in [0, n).
    fn next_index(&mut self, n: usize) -> usize {
        (self.next_u64() as usize) % n
    }
}

/// Draw K bootstrap resamples from `rows` and apply `statistic` to each.
///
/// Every resample has exactly `rows.len()` elements, drawn independently and
/// uniformly with replacement (classical nonparametric bootstrap). The
/// returned sequence has exactly `config.iterations` entries, in iteration
/// order.
///
/// Fails with `InsufficientData` when `rows` is empty: there is nothing to
/// resample from.
pub fn bootstrap<'a, T, F>(
    rows: &[&'a T],
    statistic: F,
    config: &BootstrapConfig,
) -> Result<BootstrapSample>
where
    T: Sync + ?Sized,
    F: Fn(&[&T]) -> f64 + Sync,
{
    let n = rows.len();
    if n == 0 {
        return Err(SurveyError::InsufficientData(
            "cannot resample from an empty group".to_string(),
        ));
    }

    let one_iteration = |iter_idx: usize| -> f64 {
        let mut rng = SimpleRng::new(config.seed.wrapping_add(iter_idx as u64));
        let resample: Vec<&T> = (0..n).map(|_| rows[rng.next_index(n)]).collect();
        statistic(&resample)
    };

    let values: Vec<f64> = if config.parallel {
        (0..config.iterations)
            .into_par_iter()
            .map(one_iteration)
            .collect()
    } else {
        (0..config.iterations).map(one_iteration).collect()
    };

    Ok(BootstrapSample {
        values,
        n_source: n,
        seed: config.seed,
    })
}

/// Bootstrap the richness statistic for every collection method in the
/// survey table, in sorted method order.
///
/// Each group gets an offset seed so its draws are independent of the other
/// groups' draws while the whole run stays reproducible.
pub fn bootstrap_richness_by_method(
    table: &SurveyTable,
    config: &BootstrapConfig,
) -> Result<Vec<(String, BootstrapSample)>> {
    let n_species = table.n_species();
    table
        .methods()
        .into_iter()
        .enumerate()
        .map(|(group_idx, method)| {
            let rows = table.rows_for_method(&method);
            let group_config = BootstrapConfig {
                seed: config
                    .seed
                    .wrapping_add((group_idx as u64) << 32),
                ..config.clone()
            };
            let sample = bootstrap(
                &rows,
                |resample| richness(resample, n_species) as f64,
                &group_config,
            )?;
            Ok((method, sample))
        })
        .collect()
}

/// Bootstrap the unique-species count for crowd-sourced sightings.
pub fn bootstrap_crowd_species(
    table: &CrowdTable,
    config: &BootstrapConfig,
) -> Result<BootstrapSample> {
    let records: Vec<_> = table.records().iter().collect();
    bootstrap(
        &records,
        |resample| unique_species(resample) as f64,
        config,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{CrowdRecord, SpeciesSchema, SurveyRow};

    fn row(site: &str, method: &str, counts: Vec<u64>) -> SurveyRow {
        SurveyRow {
            site: site.to_string(),
            method: method.to_string(),
            counts,
        }
    }

    fn create_table() -> SurveyTable {
        let schema = SpeciesSchema::new(vec![
            "sp_A".to_string(),
            "sp_B".to_string(),
            "sp_C".to_string(),
        ])
        .unwrap();
        SurveyTable::new(
            schema,
            vec![
                row("meadow", "Malaise", vec![2, 1, 0]),
                row("forest", "Malaise", vec![0, 3, 0]),
                row("meadow", "Pollard Walk", vec![0, 0, 1]),
                row("forest", "Pollard Walk", vec![1, 0, 0]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_bootstrap_length_and_bounds() {
        let table = create_table();
        let rows = table.rows_for_method("Malaise");
        let config = BootstrapConfig {
            iterations: 250,
            seed: 7,
            parallel: false,
        };

        let sample = bootstrap(
            &rows,
            |r| richness(r, table.n_species()) as f64,
            &config,
        )
        .unwrap();

        assert_eq!(sample.len(), 250);
        assert_eq!(sample.n_source, 2);
        // Every draw is a valid richness value: an integer in [0, 3].
        for &v in &sample.values {
            assert!(v >= 0.0 && v <= 3.0);
            assert_eq!(v, v.trunc());
        }
    }

    #[test]
    fn test_bootstrap_empty_group() {
        let rows: Vec<&SurveyRow> = Vec::new();
        let result = bootstrap(&rows, |r| r.len() as f64, &BootstrapConfig::quick());
        assert!(matches!(result, Err(SurveyError::InsufficientData(_))));
    }

    #[test]
    fn test_bootstrap_degenerate_single_row() {
        let r = row("meadow", "Malaise", vec![1, 0, 1]);
        let rows = vec![&r];
        let config = BootstrapConfig {
            iterations: 1,
            seed: 1,
            parallel: false,
        };

        // K=1, n=1: the one resample is the one row, so the statistic is
        // exactly the single-row richness.
        let sample = bootstrap(&rows, |r| richness(r, 3) as f64, &config).unwrap();
        assert_eq!(sample.values, vec![2.0]);
    }

    #[test]
    fn test_bootstrap_reproducible() {
        let table = create_table();
        let rows = table.rows_for_method("Malaise");
        let config = BootstrapConfig {
            iterations: 100,
            seed: 12345,
            parallel: false,
        };

        let a = bootstrap(&rows, |r| richness(r, 3) as f64, &config).unwrap();
        let b = bootstrap(&rows, |r| richness(r, 3) as f64, &config).unwrap();
        assert_eq!(a.values, b.values);
    }

    #[test]
    fn test_serial_matches_parallel() {
        let table = create_table();
        let rows = table.rows_for_method("Pollard Walk");
        let serial = BootstrapConfig {
            iterations: 200,
            seed: 99,
            parallel: false,
        };
        let parallel = BootstrapConfig {
            parallel: true,
            ..serial.clone()
        };

        let a = bootstrap(&rows, |r| richness(r, 3) as f64, &serial).unwrap();
        let b = bootstrap(&rows, |r| richness(r, 3) as f64, &parallel).unwrap();
        assert_eq!(a.values, b.values);
    }

    #[test]
    fn test_bootstrap_by_method() {
        let table = create_table();
        let config = BootstrapConfig {
            iterations: 50,
            seed: 3,
            parallel: false,
        };

        let groups = bootstrap_richness_by_method(&table, &config).unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, "Malaise");
        assert_eq!(groups[1].0, "Pollard Walk");
        for (_, sample) in &groups {
            assert_eq!(sample.len(), 50);
            assert_eq!(sample.n_source, 2);
        }
        // Observed Malaise richness is 2; resamples can only see those rows,
        // so no draw exceeds it.
        assert!(groups[0].1.values.iter().all(|&v| v <= 2.0));
    }

    #[test]
    fn test_bootstrap_crowd() {
        let table = CrowdTable::new(vec![
            CrowdRecord {
                species: "sp_A".to_string(),
                latitude: 47.0,
                longitude: 8.0,
            },
            CrowdRecord {
                species: "sp_B".to_string(),
                latitude: 47.1,
                longitude: 8.1,
            },
        ]);

        let sample = bootstrap_crowd_species(&table, &BootstrapConfig::quick()).unwrap();
        assert_eq!(sample.len(), 100);
        assert!(sample.values.iter().all(|&v| v >= 1.0 && v <= 2.0));
    }

    #[test]
    fn test_sample_summaries() {
        let sample = BootstrapSample {
            values: vec![1.0, 2.0, 3.0, 4.0],
            n_source: 4,
            seed: 0,
        };
        assert_eq!(sample.mean(), 2.5);
        assert!((sample.std_dev() - 1.2909944487).abs() < 1e-9);
        assert_eq!(sample.quantile(0.5), 2.0);
        assert_eq!(sample.quantile(1.0), 4.0);
        assert_eq!(sample.quantile(0.0), 1.0);
    }
}

//! Two-sample comparison of bootstrap distributions.

use crate::bootstrap::BootstrapSample;
use crate::error::{Result, SurveyError};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};

/// Result of a Welch two-sample difference-of-means test.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WelchTest {
    /// Welch t-statistic.
    pub statistic: f64,
    /// Welch-Satterthwaite degrees of freedom.
    pub df: f64,
    /// Two-sided p-value.
    pub p_value: f64,
    /// Mean of the first sample.
    pub mean_a: f64,
    /// Mean of the second sample.
    pub mean_b: f64,
    /// Sample sizes.
    pub n_a: usize,
    pub n_b: usize,
}

/// Welch-style difference-of-means test, unequal variances assumed.
///
/// The two sequences may have different lengths. Tests H0: mean_a = mean_b
/// against a two-sided alternative using the t-distribution with
/// Welch-Satterthwaite degrees of freedom.
pub fn welch_t_test(a: &[f64], b: &[f64]) -> Result<WelchTest> {
    if a.len() < 2 || b.len() < 2 {
        return Err(SurveyError::InsufficientData(
            "Welch test requires at least 2 values per sample".to_string(),
        ));
    }

    let (mean_a, var_a) = mean_and_var(a);
    let (mean_b, var_b) = mean_and_var(b);
    let n_a = a.len() as f64;
    let n_b = b.len() as f64;

    let se_a2 = var_a / n_a;
    let se_b2 = var_b / n_b;
    let se = (se_a2 + se_b2).sqrt();

    if se == 0.0 {
        // Both samples are constant. Identical means are a degenerate but
        // well-defined no-difference result; differing means cannot be
        // tested without variance.
        if mean_a == mean_b {
            return Ok(WelchTest {
                statistic: 0.0,
                df: (n_a + n_b - 2.0),
                p_value: 1.0,
                mean_a,
                mean_b,
                n_a: a.len(),
                n_b: b.len(),
            });
        }
        return Err(SurveyError::Numerical(
            "zero variance in both samples with unequal means".to_string(),
        ));
    }

    let statistic = (mean_a - mean_b) / se;
    let df = (se_a2 + se_b2).powi(2)
        / (se_a2.powi(2) / (n_a - 1.0) + se_b2.powi(2) / (n_b - 1.0));

    let t_dist = StudentsT::new(0.0, 1.0, df)
        .map_err(|e| SurveyError::Numerical(format!("t-distribution: {}", e)))?;
    let p_value = 2.0 * (1.0 - t_dist.cdf(statistic.abs()));

    Ok(WelchTest {
        statistic,
        df,
        p_value,
        mean_a,
        mean_b,
        n_a: a.len(),
        n_b: b.len(),
    })
}

/// Compare two bootstrap distributions with the Welch test.
pub fn compare_bootstrap(a: &BootstrapSample, b: &BootstrapSample) -> Result<WelchTest> {
    welch_t_test(&a.values, &b.values)
}

fn mean_and_var(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    (mean, var)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_welch_detects_shift() {
        let a: Vec<f64> = (0..50).map(|i| 10.0 + (i % 5) as f64 * 0.1).collect();
        let b: Vec<f64> = (0..50).map(|i| 14.0 + (i % 5) as f64 * 0.1).collect();

        let test = welch_t_test(&a, &b).unwrap();
        assert!(test.statistic < 0.0);
        assert!(test.p_value < 1e-6);
        assert_relative_eq!(test.mean_a, 10.2, epsilon = 1e-9);
        assert_relative_eq!(test.mean_b, 14.2, epsilon = 1e-9);
    }

    #[test]
    fn test_welch_no_shift() {
        let a: Vec<f64> = (0..100).map(|i| 5.0 + (i % 10) as f64 * 0.5).collect();
        let b = a.clone();

        let test = welch_t_test(&a, &b).unwrap();
        assert_relative_eq!(test.statistic, 0.0, epsilon = 1e-12);
        assert_relative_eq!(test.p_value, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_welch_unequal_lengths() {
        let a: Vec<f64> = (0..30).map(|i| (i % 7) as f64).collect();
        let b: Vec<f64> = (0..80).map(|i| (i % 7) as f64 + 0.5).collect();

        let test = welch_t_test(&a, &b).unwrap();
        assert_eq!(test.n_a, 30);
        assert_eq!(test.n_b, 80);
        assert!(test.p_value > 0.0 && test.p_value <= 1.0);
    }

    #[test]
    fn test_welch_too_small() {
        let result = welch_t_test(&[1.0], &[2.0, 3.0]);
        assert!(matches!(result, Err(SurveyError::InsufficientData(_))));
    }

    #[test]
    fn test_welch_constant_equal_samples() {
        let test = welch_t_test(&[2.0, 2.0, 2.0], &[2.0, 2.0]).unwrap();
        assert_eq!(test.statistic, 0.0);
        assert_eq!(test.p_value, 1.0);
    }

    #[test]
    fn test_welch_constant_unequal_samples() {
        let result = welch_t_test(&[2.0, 2.0], &[3.0, 3.0]);
        assert!(matches!(result, Err(SurveyError::Numerical(_))));
    }

    #[test]
    fn test_compare_bootstrap_wrapper() {
        let a = BootstrapSample {
            values: (0..200).map(|i| 3.0 + (i % 4) as f64 * 0.25).collect(),
            n_source: 10,
            seed: 1,
        };
        let b = BootstrapSample {
            values: (0..200).map(|i| 3.0 + ((i + 1) % 4) as f64 * 0.25).collect(),
            n_source: 10,
            seed: 2,
        };

        let test = compare_bootstrap(&a, &b).unwrap();
        // Same underlying distribution: no systematic difference.
        assert!(test.p_value > 0.05);
    }
}

//! Fixed- and random-effects design matrices built from the long table.

use crate::data::ObservationTable;
use crate::error::{Result, SurveyError};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Which fixed-effect terms to include beyond the collection method.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Include mean body size as a continuous covariate.
    #[serde(default)]
    pub size_covariate: bool,
    /// Include the method x size interaction (requires `size_covariate`).
    #[serde(default)]
    pub interaction: bool,
}

impl ModelSpec {
    pub fn validate(&self) -> Result<()> {
        if self.interaction && !self.size_covariate {
            return Err(SurveyError::InvalidParameter(
                "interaction term requires the size covariate".to_string(),
            ));
        }
        Ok(())
    }
}

/// Fixed-effects design matrix (X): intercept, method dummies, and optional
/// size terms.
#[derive(Debug, Clone)]
pub struct DesignMatrix {
    matrix: DMatrix<f64>,
    coefficient_names: Vec<String>,
    /// Reference level for the method factor (alphabetically first).
    reference_method: String,
}

impl DesignMatrix {
    /// Build the fixed-effects design from the long observation table.
    ///
    /// Dummy coding with the alphabetically first method as the reference
    /// level; one column per non-reference method, named `method<level>`,
    /// plus `size` and `method<level>:size` columns when requested.
    pub fn from_observations(
        observations: &ObservationTable,
        spec: &ModelSpec,
    ) -> Result<Self> {
        spec.validate()?;

        if observations.is_empty() {
            return Err(SurveyError::EmptyData(
                "no observations to build a design from".to_string(),
            ));
        }

        let methods = observations.methods();
        let reference_method = methods[0].clone();
        let obs = observations.observations();
        let n = obs.len();

        let mut coefficient_names = vec!["(Intercept)".to_string()];
        let mut columns: Vec<Vec<f64>> = vec![vec![1.0; n]];

        // Method dummies, reference level skipped.
        for level in methods.iter().skip(1) {
            coefficient_names.push(format!("method{}", level));
            columns.push(
                obs.iter()
                    .map(|o| if &o.method == level { 1.0 } else { 0.0 })
                    .collect(),
            );
        }

        if spec.size_covariate {
            coefficient_names.push("size".to_string());
            columns.push(obs.iter().map(|o| o.size).collect());
        }

        if spec.interaction {
            for level in methods.iter().skip(1) {
                coefficient_names.push(format!("method{}:size", level));
                columns.push(
                    obs.iter()
                        .map(|o| if &o.method == level { o.size } else { 0.0 })
                        .collect(),
                );
            }
        }

        let n_coef = columns.len();
        let mut matrix = DMatrix::zeros(n, n_coef);
        for (col_idx, col) in columns.iter().enumerate() {
            for (row_idx, &val) in col.iter().enumerate() {
                matrix[(row_idx, col_idx)] = val;
            }
        }

        Ok(Self {
            matrix,
            coefficient_names,
            reference_method,
        })
    }

    /// The design matrix.
    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }

    /// Coefficient names, in column order.
    pub fn coefficient_names(&self) -> &[String] {
        &self.coefficient_names
    }

    /// Number of observations (rows).
    pub fn n_observations(&self) -> usize {
        self.matrix.nrows()
    }

    /// Number of coefficients (columns).
    pub fn n_coefficients(&self) -> usize {
        self.matrix.ncols()
    }

    /// Reference level of the method factor.
    pub fn reference_method(&self) -> &str {
        &self.reference_method
    }

    /// Index of a coefficient by name.
    pub fn coefficient_index(&self, name: &str) -> Option<usize> {
        self.coefficient_names.iter().position(|n| n == name)
    }
}

/// Random-intercept design matrix (Z): one indicator column per site.
#[derive(Debug, Clone)]
pub struct RandomDesignMatrix {
    matrix: DMatrix<f64>,
    /// Site index for each observation.
    pub group_indices: Vec<usize>,
    /// Unique site identifiers, in first-seen order.
    pub site_ids: Vec<String>,
    /// Number of sites.
    pub n_sites: usize,
}

impl RandomDesignMatrix {
    /// Build the site random-intercept design: Z[i, j] = 1 when observation
    /// i was made at site j.
    pub fn from_observations(observations: &ObservationTable) -> Result<Self> {
        if observations.is_empty() {
            return Err(SurveyError::EmptyData(
                "no observations to build a random design from".to_string(),
            ));
        }

        let mut site_map: HashMap<&str, usize> = HashMap::new();
        let mut site_ids: Vec<String> = Vec::new();
        let mut group_indices = Vec::with_capacity(observations.len());

        for obs in observations.observations() {
            let idx = match site_map.get(obs.site.as_str()) {
                Some(&idx) => idx,
                None => {
                    let idx = site_ids.len();
                    site_map.insert(obs.site.as_str(), idx);
                    site_ids.push(obs.site.clone());
                    idx
                }
            };
            group_indices.push(idx);
        }

        let n_sites = site_ids.len();
        let mut z = DMatrix::zeros(observations.len(), n_sites);
        for (obs_idx, &site_idx) in group_indices.iter().enumerate() {
            z[(obs_idx, site_idx)] = 1.0;
        }

        Ok(Self {
            matrix: z,
            group_indices,
            site_ids,
            n_sites,
        })
    }

    /// The Z matrix.
    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }

    /// Number of observations (rows).
    pub fn n_observations(&self) -> usize {
        self.matrix.nrows()
    }

    /// Observations per site.
    pub fn observations_per_site(&self) -> Vec<usize> {
        let mut counts = vec![0usize; self.n_sites];
        for &idx in &self.group_indices {
            counts[idx] += 1;
        }
        counts
    }
}

/// Response vector: abundance counts as f64, in observation order.
pub fn response_vector(observations: &ObservationTable) -> DVector<f64> {
    DVector::from_iterator(
        observations.len(),
        observations.observations().iter().map(|o| o.count as f64),
    )
}

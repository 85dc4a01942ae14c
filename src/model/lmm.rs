//! Linear mixed-effects model for abundance with a site random intercept.
//!
//! Fits `y = Xβ + Zu + ε` with `u ~ N(0, τ²I)` and `ε ~ N(0, σ²I)`, where X
//! carries the collection-method fixed effect (optionally with a body-size
//! covariate and interaction) and Z indicates the site of each observation.
//! Variance components are estimated by REML; fixed-effect inference uses
//! Wald t-statistics on the residual degrees of freedom.

use crate::data::ObservationTable;
use crate::error::{Result, SurveyError};
use crate::model::design::{response_vector, DesignMatrix, ModelSpec, RandomDesignMatrix};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};

/// Configuration for REML estimation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LmmConfig {
    /// Maximum REML iterations.
    pub max_iter: usize,
    /// Convergence tolerance on the log-REML criterion.
    pub tol: f64,
    /// Small ridge value for numerical stability.
    pub ridge: f64,
    /// Lower bound for variance components.
    pub var_lower_bound: f64,
}

impl Default for LmmConfig {
    fn default() -> Self {
        Self {
            max_iter: 100,
            tol: 1e-6,
            ridge: 1e-8,
            var_lower_bound: 1e-10,
        }
    }
}

/// One fitted fixed-effect term.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixedEffect {
    /// Coefficient name (e.g., "methodPollard Walk").
    pub name: String,
    /// Estimated coefficient.
    pub estimate: f64,
    /// Estimated standard error.
    pub std_error: f64,
    /// Wald t-statistic.
    pub t_statistic: f64,
    /// Two-sided p-value on the residual degrees of freedom.
    pub p_value: f64,
}

/// A converged mixed-model fit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LmmFit {
    /// Fixed-effect estimates, in design-column order.
    pub fixed_effects: Vec<FixedEffect>,
    /// Random-intercept variance (τ²).
    pub tau2: f64,
    /// Residual variance (σ²).
    pub sigma2: f64,
    /// Site random intercepts (BLUPs), one per site.
    #[serde(skip)]
    pub random_intercepts: Vec<f64>,
    /// Site identifiers matching `random_intercepts`.
    pub site_ids: Vec<String>,
    /// REML log-likelihood at convergence.
    pub log_reml: f64,
    /// Residual degrees of freedom.
    pub df_residual: f64,
    /// Iterations to convergence.
    pub iterations: usize,
    /// Intraclass correlation: τ² / (τ² + σ²).
    pub icc: f64,
    /// Number of observations.
    pub n_observations: usize,
}

impl LmmFit {
    /// Fixed effect by coefficient name.
    pub fn fixed_effect(&self, name: &str) -> Option<&FixedEffect> {
        self.fixed_effects.iter().find(|f| f.name == name)
    }
}

/// Fit the mixed model to the long observation table.
///
/// Response is the abundance count; fixed effects come from `spec`; a random
/// intercept is fitted per site. Fails with [`SurveyError::Convergence`]
/// when REML does not converge within `config.max_iter` iterations; a
/// non-convergent fit is a structural failure that must surface, so there
/// is no ordinary-least-squares fallback.
pub fn fit_lmm(
    observations: &ObservationTable,
    spec: &ModelSpec,
    config: &LmmConfig,
) -> Result<LmmFit> {
    let design = DesignMatrix::from_observations(observations, spec)?;
    let random_design = RandomDesignMatrix::from_observations(observations)?;
    let y = response_vector(observations);

    fit_lmm_with_design(&y, &design, &random_design, config)
}

/// Fit the mixed model from pre-built design matrices.
pub fn fit_lmm_with_design(
    y: &DVector<f64>,
    design: &DesignMatrix,
    random_design: &RandomDesignMatrix,
    config: &LmmConfig,
) -> Result<LmmFit> {
    let n = y.len();
    let p = design.n_coefficients();

    if design.n_observations() != n {
        return Err(SurveyError::DimensionMismatch {
            expected: n,
            actual: design.n_observations(),
        });
    }
    if random_design.n_observations() != n {
        return Err(SurveyError::DimensionMismatch {
            expected: n,
            actual: random_design.n_observations(),
        });
    }
    if n <= p {
        return Err(SurveyError::Numerical(
            "model is saturated (observations <= fixed effects)".to_string(),
        ));
    }

    let x = design.matrix();
    let z = random_design.matrix();
    let n_sites = random_design.n_sites;

    let (mut sigma2, mut tau2) = initialize_variance_components(y, x, config)?;
    let mut log_reml_prev = f64::NEG_INFINITY;
    let mut iterations = 0;

    // Precompute ZZ'
    let zzt = z * z.transpose();

    for iter in 0..config.max_iter {
        iterations = iter + 1;

        let v = build_v_matrix(n, sigma2, tau2, &zzt, config.ridge);
        let v_chol = cholesky_with_ridge(&v, n)?;

        let v_inv_x = v_chol.solve(x);
        let v_inv_y = v_chol.solve(y);

        let xtvinvx = x.transpose() * &v_inv_x;
        let xtvinvx_inv = invert_with_ridge(&xtvinvx, p, config.ridge)?;

        // GLS estimates: beta = (X'V^-1 X)^-1 X'V^-1 y
        let beta = &xtvinvx_inv * (x.transpose() * &v_inv_y);
        let residuals = y - x * &beta;

        // REML criterion (up to a constant):
        // -0.5 * (log|V| + log|X'V^-1 X| + r'V^-1 r)
        let log_det_v = 2.0 * v_chol.l().diagonal().map(|d| d.ln()).sum();
        let log_det_xtvinvx = match xtvinvx.clone().cholesky() {
            Some(c) => 2.0 * c.l().diagonal().map(|d| d.ln()).sum(),
            None => p as f64 * xtvinvx[(0, 0)].ln(),
        };
        let v_inv_r = v_chol.solve(&residuals);
        let quad_form = residuals.dot(&v_inv_r);
        let log_reml = -0.5 * (log_det_v + log_det_xtvinvx + quad_form);

        if (log_reml - log_reml_prev).abs() < config.tol {
            return Ok(finish_fit(
                &beta,
                &xtvinvx_inv,
                &v_inv_r,
                z,
                design,
                random_design,
                tau2,
                sigma2,
                log_reml,
                (n - p) as f64,
                iterations,
                n,
            ));
        }
        log_reml_prev = log_reml;

        let (new_tau2, new_sigma2) = update_variance_components(
            &residuals, &v_inv_r, z, sigma2, tau2, n_sites, p, config,
        );
        tau2 = new_tau2;
        sigma2 = new_sigma2;
    }

    Err(SurveyError::Convergence {
        iterations,
        log_reml: log_reml_prev,
    })
}

#[allow(clippy::too_many_arguments)]
fn finish_fit(
    beta: &DVector<f64>,
    xtvinvx_inv: &DMatrix<f64>,
    v_inv_r: &DVector<f64>,
    z: &DMatrix<f64>,
    design: &DesignMatrix,
    random_design: &RandomDesignMatrix,
    tau2: f64,
    sigma2: f64,
    log_reml: f64,
    df_residual: f64,
    iterations: usize,
    n_observations: usize,
) -> LmmFit {
    let fixed_effects = beta
        .iter()
        .enumerate()
        .map(|(j, &estimate)| {
            let std_error = xtvinvx_inv[(j, j)].max(0.0).sqrt();
            let t_statistic = if std_error > 0.0 {
                estimate / std_error
            } else {
                f64::NAN
            };
            let p_value = if t_statistic.is_nan() || df_residual <= 0.0 {
                f64::NAN
            } else {
                // StudentsT::new only fails for non-positive df, checked above.
                let t_dist = StudentsT::new(0.0, 1.0, df_residual).unwrap();
                2.0 * (1.0 - t_dist.cdf(t_statistic.abs()))
            };
            FixedEffect {
                name: design.coefficient_names()[j].clone(),
                estimate,
                std_error,
                t_statistic,
                p_value,
            }
        })
        .collect();

    // BLUPs: u = tau2 * Z' V^-1 (y - Xb)
    let random_intercepts: Vec<f64> = (tau2 * z.transpose() * v_inv_r).iter().copied().collect();

    LmmFit {
        fixed_effects,
        tau2,
        sigma2,
        random_intercepts,
        site_ids: random_design.site_ids.clone(),
        log_reml,
        df_residual,
        iterations,
        icc: tau2 / (tau2 + sigma2),
        n_observations,
    }
}

/// Build V = sigma2*I + tau2*ZZ'
fn build_v_matrix(
    n: usize,
    sigma2: f64,
    tau2: f64,
    zzt: &DMatrix<f64>,
    ridge: f64,
) -> DMatrix<f64> {
    let mut v = zzt * tau2;
    for i in 0..n {
        v[(i, i)] += sigma2 + ridge;
    }
    v
}

fn cholesky_with_ridge(
    v: &DMatrix<f64>,
    n: usize,
) -> Result<nalgebra::Cholesky<f64, nalgebra::Dyn>> {
    if let Some(c) = v.clone().cholesky() {
        return Ok(c);
    }
    let v_ridge = v + DMatrix::identity(n, n) * 0.01;
    v_ridge.cholesky().ok_or_else(|| {
        SurveyError::Numerical("covariance matrix is not positive definite".to_string())
    })
}

fn invert_with_ridge(m: &DMatrix<f64>, p: usize, ridge: f64) -> Result<DMatrix<f64>> {
    if let Some(inv) = m.clone().try_inverse() {
        return Ok(inv);
    }
    (m + DMatrix::identity(p, p) * ridge)
        .try_inverse()
        .ok_or_else(|| {
            SurveyError::Numerical("design cross-product is singular".to_string())
        })
}

/// Initialize variance components from OLS residuals.
fn initialize_variance_components(
    y: &DVector<f64>,
    x: &DMatrix<f64>,
    config: &LmmConfig,
) -> Result<(f64, f64)> {
    let n = y.len();
    let p = x.ncols();

    let xtx = x.transpose() * x;
    let xtx_inv = invert_with_ridge(&xtx, p, config.ridge)?;
    let beta_ols = &xtx_inv * (x.transpose() * y);
    let residuals = y - x * beta_ols;
    let rss: f64 = residuals.iter().map(|r| r * r).sum();

    let df = (n - p).max(1);
    let sigma2 = (rss / df as f64).max(config.var_lower_bound);
    let tau2 = (0.1 * sigma2).max(config.var_lower_bound);

    Ok((sigma2, tau2))
}

/// Damped moment-based update of the variance components.
#[allow(clippy::too_many_arguments)]
fn update_variance_components(
    residuals: &DVector<f64>,
    v_inv_r: &DVector<f64>,
    z: &DMatrix<f64>,
    sigma2: f64,
    tau2: f64,
    n_sites: usize,
    p: usize,
    config: &LmmConfig,
) -> (f64, f64) {
    let n = residuals.len();

    let r_vinv_r = residuals.dot(v_inv_r);
    let new_sigma2 = (r_vinv_r / (n - p) as f64).max(config.var_lower_bound);

    // Between-site variance estimated from the projected residuals.
    let ztr = z.transpose() * v_inv_r;
    let ss_between: f64 = ztr.iter().map(|v| v * v).sum();
    let new_tau2 = (ss_between / n_sites as f64).max(config.var_lower_bound);

    // Damped update to prevent oscillation.
    let alpha = 0.5;
    (
        (alpha * new_tau2 + (1.0 - alpha) * tau2).max(config.var_lower_bound),
        (alpha * new_sigma2 + (1.0 - alpha) * sigma2).max(config.var_lower_bound),
    )
}

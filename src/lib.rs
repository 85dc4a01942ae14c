//! Species richness and abundance analysis for paired field surveys.
//!
//! This library compares insect survey data collected at the same sites
//! under two field methods (Malaise traps and Pollard walks) and against
//! crowd-sourced presence observations. It computes per-group species
//! richness, bootstrapped sampling distributions of richness, mixed-effects
//! fits of abundance on collection method, and Welch two-sample comparisons
//! between bootstrap distributions.
//!
//! # Overview
//!
//! The library is organized into composable modules:
//!
//! - **data**: Core data structures (SurveyTable, TraitTable, CrowdTable)
//! - **transform**: Wide-to-long reshaping with trait joins
//! - **richness**: Presence-based richness statistics
//! - **bootstrap**: Nonparametric bootstrap resampling of group statistics
//! - **model**: Linear mixed model with a site random intercept
//! - **compare**: Welch two-sample comparison of bootstrap distributions
//! - **summary**: Observed-vs-bootstrapped richness tables for reporting
//! - **config**: Externally supplied analysis constants
//!
//! # Example
//!
//! ```no_run
//! use survey_richness::prelude::*;
//!
//! // Load and clean the paired survey data
//! let survey = SurveyTable::from_tsv("survey.tsv").unwrap();
//! let survey = survey.retain_paired_sites();
//! let traits = TraitTable::from_tsv("traits.tsv").unwrap();
//!
//! // Bootstrap richness per collection method and compare the two
//! let config = BootstrapConfig::default();
//! let groups = bootstrap_richness_by_method(&survey, &config).unwrap();
//! let test = compare_bootstrap(&groups[0].1, &groups[1].1).unwrap();
//! println!("t = {:.2}, p = {:.3}", test.statistic, test.p_value);
//!
//! // Mixed model: abundance ~ method + (1 | site)
//! let long = to_long(&survey, &traits).unwrap();
//! let fit = fit_lmm(&long, &ModelSpec::default(), &LmmConfig::default()).unwrap();
//! ```

pub mod bootstrap;
pub mod compare;
pub mod config;
pub mod data;
pub mod error;
pub mod model;
pub mod richness;
pub mod summary;
pub mod transform;

/// Convenient re-exports for common usage.
pub mod prelude {
    pub use crate::bootstrap::{
        bootstrap, bootstrap_crowd_species, bootstrap_richness_by_method, BootstrapConfig,
        BootstrapSample,
    };
    pub use crate::compare::{compare_bootstrap, welch_t_test, WelchTest};
    pub use crate::config::{AnalysisConfig, MethodLabel};
    pub use crate::data::{
        CrowdRecord, CrowdTable, Observation, ObservationTable, SizeRange, SpeciesSchema,
        SurveyRow, SurveyTable, TraitTable,
    };
    pub use crate::error::{Result, SurveyError};
    pub use crate::model::{fit_lmm, FixedEffect, LmmConfig, LmmFit, ModelSpec};
    pub use crate::richness::{observed_richness_by_method, richness, unique_species};
    pub use crate::summary::{summarize_methods, write_summary_tsv, RichnessSummary};
    pub use crate::transform::to_long;
}

//! Mixed-effects modelling of abundance on collection method.

mod design;
mod lmm;

pub use design::{response_vector, DesignMatrix, ModelSpec, RandomDesignMatrix};
pub use lmm::{fit_lmm, fit_lmm_with_design, FixedEffect, LmmConfig, LmmFit};

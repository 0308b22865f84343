//! Nonlinear least-squares minimization behind a replaceable trait.

mod bounds;
mod lm;

pub use bounds::BoundTransform;
pub use lm::{LevenbergMarquardt, LmSettings};

use crate::domain::ScfitResult;
use crate::params::ParameterSet;
use crate::residual::Objective;
use serde::Serialize;

pub trait Minimizer {
    fn method_name(&self) -> &'static str;

    /// Minimize the sum of squared residuals over the free parameters of `parameters`.
    ///
    /// Non-convergence is reported through `MinimizerReport::success`, not as an error.
    fn minimize(
        &self,
        objective: &dyn Objective,
        parameters: &ParameterSet,
    ) -> ScfitResult<MinimizerReport>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Correlation {
    pub first: String,
    pub second: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MinimizerReport {
    pub success: bool,
    pub message: String,
    /// Final values with standard errors where they could be estimated.
    pub parameters: ParameterSet,
    pub chi_square: f64,
    pub data_points: usize,
    pub variables: usize,
    pub function_evals: usize,
    pub free_names: Vec<String>,
    pub covariance: Option<Vec<Vec<f64>>>,
    pub correlations: Vec<Correlation>,
    pub residuals: Vec<f64>,
}

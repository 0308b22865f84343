use super::{BoundTransform, Correlation, Minimizer, MinimizerReport};
use crate::domain::{ScfitError, ScfitResult};
use crate::numerics::{DenseMatrix, LuError, lu_invert, lu_solve};
use crate::params::{ExpressionPlan, ParameterSet};
use crate::residual::Objective;
use serde::{Deserialize, Serialize};

const MAX_LAMBDA: f64 = 1.0e16;
const MIN_LAMBDA: f64 = 1.0e-15;
const MIN_DIAGONAL: f64 = 1.0e-30;
const DIAGONAL_FLOOR: f64 = 1.0e-12;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct LmSettings {
    /// Residual evaluation budget; 0 means `2000 * (free parameters + 1)`.
    pub max_function_evals: usize,
    pub ftol: f64,
    pub xtol: f64,
    pub gtol: f64,
    /// Relative forward-difference step for the Jacobian.
    pub step: f64,
    pub initial_lambda: f64,
    pub lambda_up: f64,
    pub lambda_down: f64,
}

impl Default for LmSettings {
    fn default() -> Self {
        Self {
            max_function_evals: 0,
            ftol: 1.5e-8,
            xtol: 1.5e-8,
            gtol: 0.0,
            step: 1.49e-8,
            initial_lambda: 1.0e-3,
            lambda_up: 10.0,
            lambda_down: 0.1,
        }
    }
}

impl LmSettings {
    pub fn function_eval_budget(&self, variables: usize) -> usize {
        if self.max_function_evals == 0 {
            2000 * (variables + 1)
        } else {
            self.max_function_evals
        }
    }

    pub fn validate(&self) -> ScfitResult<()> {
        let positive = [
            ("step", self.step),
            ("initialLambda", self.initial_lambda),
            ("lambdaDown", self.lambda_down),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ScfitError::invalid_input(
                    "INPUT.SETTINGS",
                    format!("minimizer setting '{name}' must be positive, got {value}"),
                ));
            }
        }
        if !(self.lambda_up > 1.0 && self.lambda_down < 1.0) {
            return Err(ScfitError::invalid_input(
                "INPUT.SETTINGS",
                "minimizer requires lambdaUp > 1 and lambdaDown < 1",
            ));
        }
        for (name, value) in [("ftol", self.ftol), ("xtol", self.xtol), ("gtol", self.gtol)] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ScfitError::invalid_input(
                    "INPUT.SETTINGS",
                    format!("minimizer setting '{name}' must be non-negative, got {value}"),
                ));
            }
        }
        Ok(())
    }
}

/// Damped Gauss-Newton with Marquardt diagonal scaling and bound transforms.
#[derive(Debug, Clone, Default)]
pub struct LevenbergMarquardt {
    settings: LmSettings,
}

impl LevenbergMarquardt {
    pub fn new(settings: LmSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &LmSettings {
        &self.settings
    }
}

/// Residual evaluation in internal coordinates, with an evaluation counter.
struct Problem<'a> {
    objective: &'a dyn Objective,
    parameters: &'a ParameterSet,
    plan: &'a ExpressionPlan,
    base: Vec<f64>,
    free: Vec<usize>,
    transforms: Vec<BoundTransform>,
    evaluations: usize,
}

impl Problem<'_> {
    fn external(&self, internal: &[f64]) -> Vec<f64> {
        let mut values = self.base.clone();
        for ((index, transform), value) in self.free.iter().zip(&self.transforms).zip(internal) {
            values[*index] = transform.to_external(*value);
        }
        self.plan.apply(self.parameters, &mut values);
        values
    }

    fn residuals(&mut self, internal: &[f64]) -> Vec<f64> {
        self.evaluations += 1;
        let values = self.external(internal);
        self.objective.residuals(&values)
    }

    fn jacobian(&mut self, internal: &[f64], base: &[f64], step: f64) -> DenseMatrix {
        let mut jacobian = DenseMatrix::zeros(base.len(), internal.len());
        let mut shifted = internal.to_vec();
        for col in 0..internal.len() {
            let h = step * internal[col].abs().max(1.0);
            shifted[col] = internal[col] + h;
            let perturbed = self.residuals(&shifted);
            shifted[col] = internal[col];
            for (row, (plus, zero)) in perturbed.iter().zip(base).enumerate() {
                jacobian[(row, col)] = (plus - zero) / h;
            }
        }
        jacobian
    }
}

enum Termination {
    Converged(&'static str),
    Failed(String),
}

impl Minimizer for LevenbergMarquardt {
    fn method_name(&self) -> &'static str {
        "leastsq"
    }

    fn minimize(
        &self,
        objective: &dyn Objective,
        parameters: &ParameterSet,
    ) -> ScfitResult<MinimizerReport> {
        self.settings.validate()?;
        let plan = parameters.validate()?;
        let mut base = parameters.values();
        let mut free = Vec::new();
        let mut transforms = Vec::new();
        for (index, parameter) in parameters.iter().enumerate() {
            if !parameter.is_free() {
                continue;
            }
            let clamped = parameter.clamp(parameter.value);
            if clamped != parameter.value {
                tracing::warn!(
                    parameter = %parameter.name,
                    value = parameter.value,
                    clamped,
                    "initial value outside bounds was clamped"
                );
            }
            let transform = BoundTransform::new(parameter.min, parameter.max);
            base[index] = transform.interior(clamped);
            free.push(index);
            transforms.push(transform);
        }

        let data_points = objective.residual_len();
        if free.is_empty() {
            return Err(ScfitError::invalid_input(
                "INPUT.PARAM_FREE",
                "no free parameters to optimize",
            ));
        }
        if data_points <= free.len() {
            return Err(ScfitError::invalid_input(
                "INPUT.DEGREES_OF_FREEDOM",
                format!(
                    "{} data points cannot constrain {} free parameters",
                    data_points,
                    free.len()
                ),
            ));
        }

        let mut internal: Vec<f64> = free
            .iter()
            .zip(&transforms)
            .map(|(index, transform)| transform.to_internal(base[*index]))
            .collect();

        let mut problem = Problem {
            objective,
            parameters,
            plan: &plan,
            base,
            free,
            transforms,
            evaluations: 0,
        };
        let budget = self.settings.function_eval_budget(internal.len());

        let mut residuals = problem.residuals(&internal);
        let mut chi_square = sum_of_squares(&residuals);
        let termination = if chi_square.is_finite() {
            self.iterate(&mut problem, &mut internal, &mut residuals, &mut chi_square, budget)?
        } else {
            Termination::Failed("Fit aborted: initial residuals are not finite".to_string())
        };

        let (success, message) = match termination {
            Termination::Converged(message) => (true, message.to_string()),
            Termination::Failed(message) => (false, message),
        };
        tracing::debug!(
            success,
            evaluations = problem.evaluations,
            chi_square,
            "minimization finished"
        );

        Ok(self.finish(problem, &internal, residuals, chi_square, success, message))
    }
}

impl LevenbergMarquardt {
    fn iterate(
        &self,
        problem: &mut Problem<'_>,
        internal: &mut Vec<f64>,
        residuals: &mut Vec<f64>,
        chi_square: &mut f64,
        budget: usize,
    ) -> ScfitResult<Termination> {
        let settings = &self.settings;
        let mut lambda = settings.initial_lambda;

        loop {
            if *chi_square == 0.0 {
                return Ok(Termination::Converged("Fit succeeded: residuals vanish exactly"));
            }
            if problem.evaluations >= budget {
                return Ok(exhausted(budget));
            }

            let jacobian = problem.jacobian(internal, residuals, settings.step);
            let (normal, gradient) = normal_equations(&jacobian, residuals);

            if settings.gtol > 0.0 && gradient_cosine(&normal, &gradient, *chi_square) <= settings.gtol
            {
                return Ok(Termination::Converged(
                    "Fit succeeded: gradient is orthogonal to the residuals within gtol",
                ));
            }

            // A flat column still gets a damping floor relative to the stiffest one.
            let stiffest = (0..normal.nrows())
                .map(|index| normal[(index, index)])
                .fold(0.0, f64::max);
            let floor = (stiffest * DIAGONAL_FLOOR).max(MIN_DIAGONAL);
            loop {
                let mut damped = normal.clone();
                for index in 0..damped.nrows() {
                    damped[(index, index)] += lambda * normal[(index, index)].max(floor);
                }
                let rhs: Vec<f64> = gradient.iter().map(|value| -value).collect();
                let delta = match lu_solve(&damped, &rhs) {
                    Ok(delta) => delta,
                    Err(
                        error @ (LuError::SingularMatrix { .. }
                        | LuError::IllConditionedMatrix { .. }),
                    ) => {
                        tracing::trace!(%error, lambda, "damped system rejected");
                        lambda *= settings.lambda_up;
                        if lambda > MAX_LAMBDA {
                            return Err(error.into());
                        }
                        continue;
                    }
                    Err(error) => return Err(error.into()),
                };

                let step_norm = norm(&delta);
                if step_norm <= settings.xtol * (norm(internal) + settings.xtol) {
                    return Ok(Termination::Converged(
                        "Fit succeeded: relative change between iterates is at most xtol",
                    ));
                }

                let trial: Vec<f64> = internal.iter().zip(&delta).map(|(p, d)| p + d).collect();
                let trial_residuals = problem.residuals(&trial);
                let trial_chi_square = sum_of_squares(&trial_residuals);

                if trial_chi_square.is_finite() && trial_chi_square < *chi_square {
                    let actual = (*chi_square - trial_chi_square) / *chi_square;
                    let predicted = predicted_reduction(&jacobian, residuals, &delta) / *chi_square;
                    *internal = trial;
                    *residuals = trial_residuals;
                    *chi_square = trial_chi_square;
                    lambda = (lambda * settings.lambda_down).max(MIN_LAMBDA);

                    if actual <= settings.ftol && predicted <= settings.ftol {
                        return Ok(Termination::Converged(
                            "Fit succeeded: relative reduction in chi-square is at most ftol",
                        ));
                    }
                    break;
                }

                lambda *= settings.lambda_up;
                if problem.evaluations >= budget {
                    return Ok(exhausted(budget));
                }
                if lambda > MAX_LAMBDA {
                    return Ok(Termination::Failed(
                        "Fit aborted: no further reduction in chi-square is possible".to_string(),
                    ));
                }
            }
        }
    }

    fn finish(
        &self,
        mut problem: Problem<'_>,
        internal: &[f64],
        residuals: Vec<f64>,
        chi_square: f64,
        success: bool,
        message: String,
    ) -> MinimizerReport {
        let values = problem.external(internal);
        let data_points = residuals.len();
        let variables = internal.len();
        let free_names: Vec<String> = problem
            .free
            .iter()
            .filter_map(|index| problem.parameters.iter().nth(*index))
            .map(|parameter| parameter.name.clone())
            .collect();

        let covariance = if success && chi_square.is_finite() {
            let jacobian = problem.jacobian(internal, &residuals, self.settings.step);
            external_covariance(&problem, &jacobian, internal).map(|mut covariance| {
                let reduced = chi_square / (data_points - variables) as f64;
                for row in covariance.iter_mut() {
                    for value in row.iter_mut() {
                        *value *= reduced;
                    }
                }
                covariance
            })
        } else {
            None
        };
        if success && covariance.is_none() {
            tracing::warn!("could not estimate error bars; covariance matrix is singular");
        }

        let mut fitted = problem.parameters.clone();
        let tied_errors = covariance
            .as_ref()
            .map(|covariance| propagated_errors(&problem, &values, covariance))
            .unwrap_or_default();
        for (index, parameter) in fitted.parameters_mut().iter_mut().enumerate() {
            parameter.value = values[index];
            parameter.stderr = None;
            if let (Some(covariance), Some(slot)) = (
                covariance.as_ref(),
                problem.free.iter().position(|free| *free == index),
            ) {
                let variance = covariance[slot][slot];
                parameter.stderr = (variance >= 0.0).then(|| variance.sqrt());
            } else if let Some((_, stderr)) = tied_errors.iter().find(|(at, _)| *at == index) {
                parameter.stderr = Some(*stderr);
            }
        }

        let correlations = covariance
            .as_ref()
            .map(|covariance| correlations(&free_names, covariance))
            .unwrap_or_default();

        MinimizerReport {
            success,
            message,
            parameters: fitted,
            chi_square,
            data_points,
            variables,
            function_evals: problem.evaluations,
            free_names,
            covariance,
            correlations,
            residuals,
        }
    }
}

fn exhausted(budget: usize) -> Termination {
    Termination::Failed(format!(
        "Fit aborted: number of function evaluations exceeded {budget}"
    ))
}

fn normal_equations(jacobian: &DenseMatrix, residuals: &[f64]) -> (DenseMatrix, Vec<f64>) {
    let cols = jacobian.ncols();
    let mut normal = DenseMatrix::zeros(cols, cols);
    let mut gradient = vec![0.0; cols];
    for i in 0..cols {
        for j in i..cols {
            let sum: f64 = (0..jacobian.nrows())
                .map(|row| jacobian[(row, i)] * jacobian[(row, j)])
                .sum();
            normal[(i, j)] = sum;
            normal[(j, i)] = sum;
        }
        gradient[i] = (0..jacobian.nrows())
            .map(|row| jacobian[(row, i)] * residuals[row])
            .sum();
    }
    (normal, gradient)
}

fn gradient_cosine(normal: &DenseMatrix, gradient: &[f64], chi_square: f64) -> f64 {
    let residual_norm = chi_square.sqrt();
    gradient
        .iter()
        .enumerate()
        .map(|(index, value)| {
            let column_norm = normal[(index, index)].sqrt();
            if column_norm == 0.0 {
                0.0
            } else {
                (value / (column_norm * residual_norm)).abs()
            }
        })
        .fold(0.0, f64::max)
}

/// `|r|^2 - |r + J delta|^2`, the reduction the linear model promises.
fn predicted_reduction(jacobian: &DenseMatrix, residuals: &[f64], delta: &[f64]) -> f64 {
    let linearized: f64 = residuals
        .iter()
        .enumerate()
        .map(|(row, residual)| {
            let change: f64 = delta
                .iter()
                .enumerate()
                .map(|(col, step)| jacobian[(row, col)] * step)
                .sum();
            (residual + change).powi(2)
        })
        .sum();
    sum_of_squares(residuals) - linearized
}

/// `(J_ext^T J_ext)^-1` with the internal Jacobian rescaled by the chain rule.
fn external_covariance(
    problem: &Problem<'_>,
    jacobian: &DenseMatrix,
    internal: &[f64],
) -> Option<Vec<Vec<f64>>> {
    let mut scaled = jacobian.clone();
    for (col, (transform, value)) in problem.transforms.iter().zip(internal).enumerate() {
        let derivative = transform.derivative(*value);
        if derivative.abs() < MIN_DIAGONAL {
            return None;
        }
        for row in 0..scaled.nrows() {
            scaled[(row, col)] /= derivative;
        }
    }

    let (normal, _) = normal_equations(&scaled, &vec![0.0; scaled.nrows()]);
    let inverse = lu_invert(&normal).ok()?;
    let size = inverse.nrows();
    Some(
        (0..size)
            .map(|row| (0..size).map(|col| inverse[(row, col)]).collect())
            .collect(),
    )
}

/// Standard errors of expression-bound parameters by linear propagation.
fn propagated_errors(
    problem: &Problem<'_>,
    values: &[f64],
    covariance: &[Vec<f64>],
) -> Vec<(usize, f64)> {
    let tied: Vec<usize> = problem
        .parameters
        .iter()
        .enumerate()
        .filter(|(_, parameter)| parameter.expr.is_some())
        .map(|(index, _)| index)
        .collect();

    let mut gradients = vec![vec![0.0; problem.free.len()]; tied.len()];
    for (slot, free) in problem.free.iter().enumerate() {
        let h = 1.0e-8 * values[*free].abs().max(1.0);
        let mut shifted = values.to_vec();
        shifted[*free] += h;
        problem.plan.apply(problem.parameters, &mut shifted);
        for (gradient, index) in gradients.iter_mut().zip(&tied) {
            gradient[slot] = (shifted[*index] - values[*index]) / h;
        }
    }

    tied.iter()
        .zip(gradients)
        .map(|(index, gradient)| {
            let mut variance = 0.0;
            for (i, gi) in gradient.iter().enumerate() {
                for (j, gj) in gradient.iter().enumerate() {
                    variance += gi * covariance[i][j] * gj;
                }
            }
            (*index, variance.max(0.0).sqrt())
        })
        .collect()
}

fn correlations(names: &[String], covariance: &[Vec<f64>]) -> Vec<Correlation> {
    let mut correlations = Vec::new();
    for i in 0..names.len() {
        for j in (i + 1)..names.len() {
            let scale = (covariance[i][i] * covariance[j][j]).sqrt();
            if scale > 0.0 && scale.is_finite() {
                correlations.push(Correlation {
                    first: names[i].clone(),
                    second: names[j].clone(),
                    value: covariance[i][j] / scale,
                });
            }
        }
    }
    correlations
}

fn sum_of_squares(values: &[f64]) -> f64 {
    values.iter().map(|value| value * value).sum()
}

fn norm(values: &[f64]) -> f64 {
    sum_of_squares(values).sqrt()
}

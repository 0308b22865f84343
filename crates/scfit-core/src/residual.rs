//! Weighted residuals over one or more datasets sharing a lineshape.
//!
//! Every residual is `(y - y_model) / y_error`. The minimizer squares and sums
//! them, so the objective is the inverse-variance chi-square in both single and
//! joint mode.

use crate::domain::{FitMode, ScfitError, ScfitResult};
use crate::model::LineshapeModel;
use crate::params::ParameterSet;
use crate::qdp::Dataset;

/// Something the minimizer can drive: full parameter vector in, residuals out.
pub trait Objective {
    fn residual_len(&self) -> usize;

    /// `values` is indexed like the parameter set the objective was built for.
    fn residuals(&self, values: &[f64]) -> Vec<f64>;
}

/// Evaluate the model for `dataset_index` over `x` with the parameters bound
/// to that dataset.
pub fn evaluate_dataset_model<M: LineshapeModel + ?Sized>(
    model: &M,
    parameters: &ParameterSet,
    mode: FitMode,
    dataset_index: usize,
    x: &[f64],
) -> ScfitResult<Vec<f64>> {
    let binding = bind_dataset(model, parameters, mode, dataset_index)?;
    let mut values = parameters.values();
    parameters.validate()?.apply(parameters, &mut values);
    let bound: Vec<f64> = binding.iter().map(|index| values[*index]).collect();
    Ok(model.evaluate_many(x, &bound))
}

fn bind_dataset<M: LineshapeModel + ?Sized>(
    model: &M,
    parameters: &ParameterSet,
    mode: FitMode,
    dataset_index: usize,
) -> ScfitResult<Vec<usize>> {
    if dataset_index >= mode.dataset_count() {
        return Err(ScfitError::invalid_input(
            "INPUT.DATASET_INDEX",
            format!(
                "dataset index {} is out of range for {} mode",
                dataset_index, mode
            ),
        ));
    }

    model
        .parameter_names()
        .iter()
        .map(|name| {
            let bound_name = mode.parameter_name(name, dataset_index);
            parameters.index_of(&bound_name).ok_or_else(|| {
                ScfitError::invalid_input(
                    "INPUT.PARAM_MISSING",
                    format!("parameter '{bound_name}' is not defined"),
                )
            })
        })
        .collect()
}

/// Flattened, dataset-major residual over every loaded dataset.
pub struct ResidualBuilder<'a, M: LineshapeModel + ?Sized> {
    model: &'a M,
    datasets: &'a [Dataset],
    bindings: Vec<Vec<usize>>,
    weights: Vec<Vec<f64>>,
}

impl<'a, M: LineshapeModel + ?Sized> ResidualBuilder<'a, M> {
    pub fn new(
        model: &'a M,
        datasets: &'a [Dataset],
        mode: FitMode,
        parameters: &ParameterSet,
    ) -> ScfitResult<Self> {
        if datasets.len() != mode.dataset_count() {
            return Err(ScfitError::internal(
                "INTERNAL.FIT_MODE",
                format!(
                    "{} mode cannot drive {} datasets",
                    mode,
                    datasets.len()
                ),
            ));
        }

        let mut bindings = Vec::with_capacity(datasets.len());
        let mut weights = Vec::with_capacity(datasets.len());
        for (index, dataset) in datasets.iter().enumerate() {
            bindings.push(bind_dataset(model, parameters, mode, index)?);
            weights.push(inverse_errors(dataset)?);
        }

        Ok(Self {
            model,
            datasets,
            bindings,
            weights,
        })
    }

    pub fn evaluate_dataset(&self, values: &[f64], dataset_index: usize, x: &[f64]) -> Vec<f64> {
        let bound: Vec<f64> = self.bindings[dataset_index]
            .iter()
            .map(|index| values[*index])
            .collect();
        self.model.evaluate_many(x, &bound)
    }

    pub fn joint_residual(&self, values: &[f64]) -> Vec<f64> {
        let mut residuals = Vec::with_capacity(self.residual_len());
        for (index, dataset) in self.datasets.iter().enumerate() {
            let predicted = self.evaluate_dataset(values, index, &dataset.x());
            residuals.extend(
                dataset
                    .points
                    .iter()
                    .zip(predicted)
                    .zip(&self.weights[index])
                    .map(|((point, y_hat), weight)| (point.y - y_hat) * weight),
            );
        }
        residuals
    }
}

impl<M: LineshapeModel + ?Sized> Objective for ResidualBuilder<'_, M> {
    fn residual_len(&self) -> usize {
        self.datasets.iter().map(Dataset::len).sum()
    }

    fn residuals(&self, values: &[f64]) -> Vec<f64> {
        self.joint_residual(values)
    }
}

fn inverse_errors(dataset: &Dataset) -> ScfitResult<Vec<f64>> {
    dataset
        .points
        .iter()
        .enumerate()
        .map(|(row, point)| {
            if point.y_error.is_finite() && point.y_error != 0.0 {
                Ok(1.0 / point.y_error)
            } else {
                Err(ScfitError::invalid_input(
                    "INPUT.Y_ERROR",
                    format!(
                        "row {} of '{}' has unusable y error {}",
                        row + 1,
                        dataset.source.display(),
                        point.y_error
                    ),
                ))
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{Objective, ResidualBuilder, evaluate_dataset_model};
    use crate::domain::{FitMode, ScfitErrorCategory};
    use crate::model::{LineshapeModel, ScfCurve};
    use crate::params::{ParameterEntry, build_joint, build_single};
    use crate::qdp::{Dataset, SamplePoint};
    use std::path::PathBuf;

    fn dataset(name: &str, points: &[(f64, f64, f64)]) -> Dataset {
        Dataset {
            points: points
                .iter()
                .map(|(x, y, ye)| SamplePoint::new(*x, 0.0, *y, *ye))
                .collect(),
            header: vec!["!".to_string()],
            source: PathBuf::from(name),
        }
    }

    fn entries(values: &[f64]) -> Vec<ParameterEntry> {
        values
            .iter()
            .map(|value| ParameterEntry::new(*value, true, -1e6, 1e6))
            .collect()
    }

    #[test]
    fn joint_residual_is_flat_and_dataset_major() {
        let datasets = vec![
            dataset("a.qdp", &[(1e-4, 6.0, 0.5), (1e-3, 6.1, 0.5)]),
            dataset("b.qdp", &[(1e-4, 7.0, 0.25), (1e-3, 7.1, 0.25), (1e-2, 7.2, 0.25)]),
        ];
        let mut parameters = build_joint(&["Et", "C", "epsilon"], 2, &entries(&[6.0, 0.0, 1.0, 7.0]))
            .expect("joint set should build");
        parameters
            .apply_expressions()
            .expect("ties should resolve");

        let builder = ResidualBuilder::new(&ScfCurve, &datasets, FitMode::Joint(2), &parameters)
            .expect("builder should bind");
        let residuals = builder.residuals(&parameters.values());

        assert_eq!(builder.residual_len(), 5);
        assert_eq!(residuals.len(), 5);
        // C = 0 makes the model flat at Et_n
        let expected = [0.0, 0.2, 0.0, 0.4, 0.8];
        for (actual, expected) in residuals.iter().zip(expected) {
            assert!((actual - expected).abs() < 1e-9, "{actual} vs {expected}");
        }
    }

    #[test]
    fn single_mode_binds_bare_names() {
        let datasets = vec![dataset("a.qdp", &[(0.0, 3.0, 1.0)])];
        let parameters = build_single(&["Et", "C", "epsilon"], &entries(&[4.0, 0.5, 10.0]))
            .expect("single set should build");

        let y = evaluate_dataset_model(&ScfCurve, &parameters, FitMode::Single, 0, &[0.0])
            .expect("model should evaluate");
        assert_eq!(y, vec![ScfCurve.evaluate(0.0, &[4.0, 0.5, 10.0])]);

        let builder = ResidualBuilder::new(&ScfCurve, &datasets, FitMode::Single, &parameters)
            .expect("builder should bind");
        assert_eq!(builder.residuals(&parameters.values()), vec![1.0]);
    }

    #[test]
    fn dataset_evaluation_resolves_tied_parameters() {
        let parameters = build_joint(&["Et", "C", "epsilon"], 2, &entries(&[6.6, 0.5, 100.0, 6.0]))
            .expect("joint set should build");

        let first = evaluate_dataset_model(&ScfCurve, &parameters, FitMode::Joint(2), 0, &[0.0])
            .expect("first dataset should evaluate");
        let second = evaluate_dataset_model(&ScfCurve, &parameters, FitMode::Joint(2), 1, &[0.0])
            .expect("second dataset should evaluate");

        assert!((first[0] - 3.3).abs() < 1e-12, "{first:?}");
        assert!((second[0] - 3.0).abs() < 1e-12, "{second:?}");
    }

    #[test]
    fn zero_errors_are_rejected_when_binding() {
        let datasets = vec![dataset("a.qdp", &[(0.0, 3.0, 0.0)])];
        let parameters = build_single(&["Et", "C", "epsilon"], &entries(&[4.0, 0.5, 10.0]))
            .expect("single set should build");

        let error = ResidualBuilder::new(&ScfCurve, &datasets, FitMode::Single, &parameters)
            .err()
            .expect("zero y error should fail");
        assert_eq!(error.category(), ScfitErrorCategory::InvalidInput);
    }

    #[test]
    fn out_of_range_dataset_index_is_rejected() {
        let parameters = build_single(&["Et", "C", "epsilon"], &entries(&[4.0, 0.5, 10.0]))
            .expect("single set should build");
        assert!(evaluate_dataset_model(&ScfCurve, &parameters, FitMode::Single, 1, &[0.0]).is_err());
    }
}

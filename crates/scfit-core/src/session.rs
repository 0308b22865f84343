//! Load, parameterize and fit, one typestate per step.
//!
//! `LoadedRun` -> `ParameterizedRun` -> `FitOutcome::{Converged, Failed}`.
//! The fitting step itself is not observable: `ParameterizedRun::fit`
//! consumes the run and returns the terminal state.

use crate::domain::{FitMode, FitState, ScfitResult};
use crate::minimize::Minimizer;
use crate::model::LineshapeModel;
use crate::naming;
use crate::params::{self, ParameterEntry, ParameterSet};
use crate::qdp::{self, Dataset};
use crate::residual::ResidualBuilder;
use crate::result::FitResult;
use crate::settings::GridSettings;
use std::path::{Path, PathBuf};

pub struct LoadedRun<M: LineshapeModel> {
    model: M,
    datasets: Vec<Dataset>,
    mode: FitMode,
    prefix: String,
}

impl<M: LineshapeModel> LoadedRun<M> {
    pub fn new(model: M, datasets: Vec<Dataset>) -> ScfitResult<Self> {
        let mode = FitMode::from_dataset_count(datasets.len())?;
        let sources: Vec<&Path> = datasets
            .iter()
            .map(|dataset| dataset.source.as_path())
            .collect();
        let prefix = naming::output_prefix(&sources)?;
        Ok(Self {
            model,
            datasets,
            mode,
            prefix,
        })
    }

    /// One path loads a single dataset; several paths load a joint set.
    pub fn load<P: AsRef<Path>>(model: M, paths: &[P]) -> ScfitResult<Self> {
        let datasets = match paths {
            [single] => vec![qdp::load(single.as_ref())?],
            _ => qdp::load_joint(paths)?,
        };
        let run = Self::new(model, datasets)?;
        tracing::info!(mode = %run.mode, prefix = %run.prefix, "datasets loaded");
        Ok(run)
    }

    pub fn state(&self) -> FitState {
        FitState::Loaded
    }

    pub fn mode(&self) -> FitMode {
        self.mode
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn datasets(&self) -> &[Dataset] {
        &self.datasets
    }

    /// Slot names a parameter-entry provider must fill, in entry order.
    pub fn parameter_slots(&self) -> Vec<String> {
        params::parameter_slots(self.model.parameter_names(), self.mode)
    }

    pub fn parameterize_entries(self, entries: &[ParameterEntry]) -> ScfitResult<ParameterizedRun<M>> {
        let parameters = params::build(self.model.parameter_names(), self.mode, entries)?;
        self.parameterize(parameters)
    }

    pub fn parameterize(self, mut parameters: ParameterSet) -> ScfitResult<ParameterizedRun<M>> {
        parameters.apply_expressions()?;
        ResidualBuilder::new(&self.model, &self.datasets, self.mode, &parameters)?;
        tracing::info!(
            parameters = parameters.len(),
            free = parameters.free_count(),
            "parameter set attached"
        );
        Ok(ParameterizedRun {
            model: self.model,
            datasets: self.datasets,
            mode: self.mode,
            prefix: self.prefix,
            parameters,
        })
    }
}

pub struct ParameterizedRun<M: LineshapeModel> {
    model: M,
    datasets: Vec<Dataset>,
    mode: FitMode,
    prefix: String,
    parameters: ParameterSet,
}

impl<M: LineshapeModel> ParameterizedRun<M> {
    pub fn state(&self) -> FitState {
        FitState::Parameterized
    }

    pub fn parameters(&self) -> &ParameterSet {
        &self.parameters
    }

    pub fn mode(&self) -> FitMode {
        self.mode
    }

    pub fn fit(self, minimizer: &dyn Minimizer, grid: &GridSettings) -> ScfitResult<FitOutcome> {
        let grid_x = grid.values()?;
        let (result, curves, best_fit) = {
            let builder = ResidualBuilder::new(&self.model, &self.datasets, self.mode, &self.parameters)?;
            tracing::info!(method = minimizer.method_name(), mode = %self.mode, "fitting");
            let report = minimizer.minimize(&builder, &self.parameters)?;
            let result = FitResult::from_report(self.model.name(), minimizer.method_name(), &report);
            if !result.success {
                tracing::warn!(message = %result.message, "fit did not converge");
                return Ok(FitOutcome::Failed(FailedFit {
                    prefix: self.prefix,
                    mode: self.mode,
                    result,
                }));
            }

            let values = result.parameters.values();
            let curves: Vec<ModelCurve> = (0..self.datasets.len())
                .map(|index| ModelCurve {
                    y: builder.evaluate_dataset(&values, index, &grid_x),
                    x: grid_x.clone(),
                })
                .collect();
            let best_fit: Vec<Vec<f64>> = self
                .datasets
                .iter()
                .enumerate()
                .map(|(index, dataset)| builder.evaluate_dataset(&values, index, &dataset.x()))
                .collect();
            (result, curves, best_fit)
        };

        tracing::info!(
            chi_square = result.chi_square,
            dof = result.degrees_of_freedom,
            reduced_chi_square = result.reduced_chi_square,
            "fit converged"
        );
        Ok(FitOutcome::Converged(FittedRun {
            datasets: self.datasets,
            mode: self.mode,
            prefix: self.prefix,
            result,
            curves,
            best_fit,
        }))
    }
}

/// Model evaluated on the dense grid for one dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelCurve {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FitOutcome {
    Converged(FittedRun),
    Failed(FailedFit),
}

impl FitOutcome {
    pub fn state(&self) -> FitState {
        match self {
            Self::Converged(_) => FitState::FittedOk,
            Self::Failed(_) => FitState::FittedFailed,
        }
    }

    pub fn result(&self) -> &FitResult {
        match self {
            Self::Converged(run) => &run.result,
            Self::Failed(failed) => &failed.result,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FittedRun {
    datasets: Vec<Dataset>,
    mode: FitMode,
    prefix: String,
    result: FitResult,
    curves: Vec<ModelCurve>,
    best_fit: Vec<Vec<f64>>,
}

impl FittedRun {
    pub fn result(&self) -> &FitResult {
        &self.result
    }

    pub fn datasets(&self) -> &[Dataset] {
        &self.datasets
    }

    pub fn mode(&self) -> FitMode {
        self.mode
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn curves(&self) -> &[ModelCurve] {
        &self.curves
    }

    /// Model values at the sample positions of `dataset_index`.
    pub fn best_fit(&self, dataset_index: usize) -> &[f64] {
        &self.best_fit[dataset_index]
    }

    /// Unweighted `y - y_model` at the sample positions of `dataset_index`.
    pub fn residuals(&self, dataset_index: usize) -> Vec<f64> {
        self.datasets[dataset_index]
            .points
            .iter()
            .zip(&self.best_fit[dataset_index])
            .map(|(point, model)| point.y - model)
            .collect()
    }

    pub fn sources(&self) -> Vec<PathBuf> {
        self.datasets
            .iter()
            .map(|dataset| dataset.source.clone())
            .collect()
    }
}

/// Non-converged fit: reported, never exported.
#[derive(Debug, Clone, PartialEq)]
pub struct FailedFit {
    pub prefix: String,
    pub mode: FitMode,
    pub result: FitResult,
}

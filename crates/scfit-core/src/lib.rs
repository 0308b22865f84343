//! Joint lineshape fitting for QDP energy-calibration curves.
//!
//! One or more QDP datasets are fitted with an `Et * (1 - C * exp(-epsilon * x))`
//! lineshape. In a joint fit only `Et` varies per dataset; the remaining
//! parameters are tied to the first dataset's values.

pub mod discover;
pub mod domain;
pub mod export;
pub mod gain;
pub mod minimize;
pub mod model;
pub mod naming;
pub mod numerics;
pub mod params;
pub mod qdp;
pub mod report;
pub mod residual;
pub mod result;
pub mod serialization;
pub mod session;
pub mod settings;

pub use domain::{FitMode, FitState, ScfitError, ScfitErrorCategory, ScfitResult};
pub use export::{ExportedArtifacts, export};
pub use minimize::{LevenbergMarquardt, LmSettings, Minimizer};
pub use model::{LineshapeModel, ScfCurve};
pub use params::{FitParameter, ParameterEntry, ParameterSet};
pub use qdp::Dataset;
pub use result::FitResult;
pub use session::{FailedFit, FitOutcome, FittedRun, LoadedRun, ParameterizedRun};
pub use settings::FitSettings;

pub mod errors;

pub use errors::{ScfitError, ScfitErrorCategory, ScfitResult};

use std::fmt::{Display, Formatter};

/// How the loaded datasets are fitted, resolved once from the dataset count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FitMode {
    Single,
    Joint(usize),
}

impl FitMode {
    pub fn from_dataset_count(count: usize) -> ScfitResult<Self> {
        match count {
            0 => Err(ScfitError::insufficient_input(
                "INPUT.DATASET_COUNT",
                "at least one dataset is required",
            )),
            1 => Ok(Self::Single),
            n => Ok(Self::Joint(n)),
        }
    }

    pub const fn dataset_count(self) -> usize {
        match self {
            Self::Single => 1,
            Self::Joint(n) => n,
        }
    }

    /// Name of `base` as bound to dataset `index`: bare in single mode,
    /// `<base>_<index>` in joint mode.
    pub fn parameter_name(self, base: &str, index: usize) -> String {
        match self {
            Self::Single => base.to_string(),
            Self::Joint(_) => format!("{base}_{index}"),
        }
    }
}

impl Display for FitMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Single => f.write_str("single"),
            Self::Joint(n) => write!(f, "joint({n})"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FitState {
    Loaded,
    Parameterized,
    FittedOk,
    FittedFailed,
}

impl FitState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Loaded => "LOADED",
            Self::Parameterized => "PARAMETERIZED",
            Self::FittedOk => "FITTED_OK",
            Self::FittedFailed => "FITTED_FAILED",
        }
    }
}

impl Display for FitState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

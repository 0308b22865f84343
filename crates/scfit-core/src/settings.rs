//! Optional JSON settings for the dense grid and the minimizer.

use crate::domain::{ScfitError, ScfitResult};
use crate::minimize::LmSettings;
use crate::numerics::log_space;
use crate::serialization::read_text_artifact;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_GRID_POINTS: usize = 500;
pub const DEFAULT_CORRELATION_THRESHOLD: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct GridSettings {
    pub start: f64,
    pub stop: f64,
    pub points: usize,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            start: 1.0e-5,
            stop: 1.0e-1,
            points: DEFAULT_GRID_POINTS,
        }
    }
}

impl GridSettings {
    pub fn values(&self) -> ScfitResult<Vec<f64>> {
        log_space(self.start, self.stop, self.points)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct FitSettings {
    pub grid: GridSettings,
    pub minimizer: LmSettings,
    pub report: ReportSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct ReportSettings {
    /// Correlations below this magnitude are left out of the fit report.
    pub correlation_threshold: f64,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            correlation_threshold: DEFAULT_CORRELATION_THRESHOLD,
        }
    }
}

impl FitSettings {
    pub fn load(path: &Path) -> ScfitResult<Self> {
        let content = read_text_artifact(path)?;
        let settings: Self = serde_json::from_str(&content).map_err(|source| {
            ScfitError::invalid_input(
                "INPUT.SETTINGS",
                format!("failed to parse settings '{}': {}", path.display(), source),
            )
        })?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> ScfitResult<()> {
        self.grid.values()?;
        self.minimizer.validate()?;
        let threshold = self.report.correlation_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ScfitError::invalid_input(
                "INPUT.SETTINGS",
                format!("correlation threshold must lie in [0, 1], got {threshold}"),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{DEFAULT_GRID_POINTS, FitSettings};
    use crate::domain::ScfitErrorCategory;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn defaults_describe_a_500_point_log_grid() {
        let settings = FitSettings::default();
        let grid = settings.grid.values().expect("default grid should build");

        assert_eq!(grid.len(), DEFAULT_GRID_POINTS);
        assert_eq!(grid[0], 1e-5);
        assert_eq!(grid[DEFAULT_GRID_POINTS - 1], 1e-1);
        settings.validate().expect("defaults should validate");
    }

    #[test]
    fn partial_json_overrides_only_named_fields() {
        let temp = TempDir::new().expect("tempdir should be created");
        let path = temp.path().join("settings.json");
        fs::write(
            &path,
            r#"{ "grid": { "points": 50 }, "minimizer": { "maxFunctionEvals": 300 } }"#,
        )
        .expect("settings should be written");

        let settings = FitSettings::load(&path).expect("settings should load");
        assert_eq!(settings.grid.points, 50);
        assert_eq!(settings.grid.start, 1e-5);
        assert_eq!(settings.minimizer.max_function_evals, 300);
        assert_eq!(settings.report.correlation_threshold, 0.1);
    }

    #[test]
    fn unknown_fields_and_bad_values_are_rejected() {
        let temp = TempDir::new().expect("tempdir should be created");
        let unknown = temp.path().join("unknown.json");
        fs::write(&unknown, r#"{ "gird": {} }"#).expect("write");
        let error = FitSettings::load(&unknown).expect_err("typo should fail");
        assert_eq!(error.category(), ScfitErrorCategory::InvalidInput);

        let bad_grid = temp.path().join("grid.json");
        fs::write(&bad_grid, r#"{ "grid": { "start": 1.0, "stop": 0.5 } }"#).expect("write");
        assert!(FitSettings::load(&bad_grid).is_err());
    }
}

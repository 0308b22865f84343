use crate::minimize::{Correlation, MinimizerReport};
use crate::params::ParameterSet;
use serde::Serialize;

/// Outcome of one minimization attempt; immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct FitResult {
    pub model_name: String,
    pub method: String,
    pub success: bool,
    pub message: String,
    pub parameters: ParameterSet,
    pub chi_square: f64,
    pub degrees_of_freedom: usize,
    pub reduced_chi_square: f64,
    pub data_points: usize,
    pub variables: usize,
    pub function_evals: usize,
    pub aic: f64,
    pub bic: f64,
    pub correlations: Vec<Correlation>,
}

impl FitResult {
    pub fn from_report(model_name: &str, method: &str, report: &MinimizerReport) -> Self {
        let degrees_of_freedom = report.data_points.saturating_sub(report.variables);
        let reduced_chi_square = report.chi_square / degrees_of_freedom as f64;
        let n = report.data_points as f64;
        let k = report.variables as f64;
        let neg2_log_likelihood = n * (report.chi_square.max(1.0e-250) / n).ln();

        Self {
            model_name: model_name.to_string(),
            method: method.to_string(),
            success: report.success,
            message: report.message.clone(),
            parameters: report.parameters.clone(),
            chi_square: report.chi_square,
            degrees_of_freedom,
            reduced_chi_square,
            data_points: report.data_points,
            variables: report.variables,
            function_evals: report.function_evals,
            aic: neg2_log_likelihood + 2.0 * k,
            bic: neg2_log_likelihood + n.ln() * k,
            correlations: report.correlations.clone(),
        }
    }

    /// `(value, stderr)` of a fitted parameter.
    pub fn parameter(&self, name: &str) -> Option<(f64, Option<f64>)> {
        self.parameters
            .get(name)
            .map(|parameter| (parameter.value, parameter.stderr))
    }

    pub fn summary(&self) -> FitSummary {
        FitSummary {
            model: self.model_name.clone(),
            success: self.success,
            message: self.message.clone(),
            chi_square: self.chi_square,
            degrees_of_freedom: self.degrees_of_freedom,
            reduced_chi_square: self.reduced_chi_square,
            function_evals: self.function_evals,
            parameters: self
                .parameters
                .iter()
                .map(|parameter| ParameterEstimate {
                    name: parameter.name.clone(),
                    value: parameter.value,
                    stderr: parameter.stderr,
                    initial: parameter.init_value,
                    expr: parameter.expr.clone(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FitSummary {
    pub model: String,
    pub success: bool,
    pub message: String,
    pub chi_square: f64,
    pub degrees_of_freedom: usize,
    pub reduced_chi_square: f64,
    pub function_evals: usize,
    pub parameters: Vec<ParameterEstimate>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterEstimate {
    pub name: String,
    pub value: f64,
    pub stderr: Option<f64>,
    pub initial: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expr: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::FitResult;
    use crate::minimize::MinimizerReport;
    use crate::params::{FitParameter, ParameterSet};

    fn report(chi_square: f64, data_points: usize, variables: usize) -> MinimizerReport {
        let mut parameters = ParameterSet::new();
        parameters.add(FitParameter::new("Et", 6.6)).expect("Et");
        MinimizerReport {
            success: true,
            message: "ok".to_string(),
            parameters,
            chi_square,
            data_points,
            variables,
            function_evals: 12,
            free_names: vec!["Et".to_string()],
            covariance: None,
            correlations: Vec::new(),
            residuals: vec![0.0; data_points],
        }
    }

    #[test]
    fn reduced_chi_square_divides_by_degrees_of_freedom() {
        let result = FitResult::from_report("scf_curve", "leastsq", &report(94.0, 50, 3));

        assert_eq!(result.degrees_of_freedom, 47);
        assert_eq!(result.reduced_chi_square, result.chi_square / 47.0);
        assert_eq!(result.reduced_chi_square, 2.0);
    }

    #[test]
    fn information_criteria_follow_the_gaussian_likelihood() {
        let result = FitResult::from_report("scf_curve", "leastsq", &report(50.0, 50, 3));
        assert!((result.aic - 6.0).abs() < 1e-12);
        assert!((result.bic - 50.0_f64.ln() * 3.0).abs() < 1e-12);
    }

    #[test]
    fn summary_lists_every_parameter() {
        let summary = FitResult::from_report("scf_curve", "leastsq", &report(1.0, 10, 1)).summary();
        assert_eq!(summary.parameters.len(), 1);
        assert_eq!(summary.parameters[0].name, "Et");
        assert_eq!(summary.degrees_of_freedom, 9);
    }
}

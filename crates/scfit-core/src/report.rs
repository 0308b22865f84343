//! Plain-text fit report and the `<prefix>_result.log` layout.

use crate::result::FitResult;
use std::fmt::{self, Display, Formatter};

const SEPARATOR: &str = "--------------------------------------------------------------------";
const SIGNIFICANT_DIGITS: usize = 7;

/// `%g`-style formatting with `significant` digits and trailing zeros removed.
pub fn format_general(value: f64, significant: usize) -> String {
    if value == 0.0 || !value.is_finite() {
        return value.to_string();
    }
    let significant = significant.max(1);
    let exponent = value.abs().log10().floor() as i32;
    if exponent < -4 || exponent >= significant as i32 {
        let rendered = format!("{:.*e}", significant - 1, value);
        match rendered.split_once('e') {
            Some((mantissa, power)) => format!("{}e{}", trim_fraction(mantissa), power),
            None => rendered,
        }
    } else {
        let decimals = (significant as i32 - 1 - exponent).max(0) as usize;
        trim_fraction(&format!("{value:.decimals$}")).to_string()
    }
}

fn trim_fraction(text: &str) -> &str {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.')
    } else {
        text
    }
}

fn g(value: f64) -> String {
    format_general(value, SIGNIFICANT_DIGITS)
}

/// The lmfit-style report block; `Display` renders it line by line.
pub struct FitReport<'a> {
    pub result: &'a FitResult,
    pub correlation_threshold: f64,
}

impl Display for FitReport<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let result = self.result;
        writeln!(f, "[[Model]]")?;
        writeln!(f, "    Model({})", result.model_name)?;
        writeln!(f, "[[Fit Statistics]]")?;
        writeln!(f, "    # fitting method   = {}", result.method)?;
        writeln!(f, "    # function evals   = {}", result.function_evals)?;
        writeln!(f, "    # data points      = {}", result.data_points)?;
        writeln!(f, "    # variables        = {}", result.variables)?;
        writeln!(f, "    # fit message      = {}", result.message)?;
        writeln!(f, "    chi-square         = {}", g(result.chi_square))?;
        writeln!(f, "    reduced chi-square = {}", g(result.reduced_chi_square))?;
        writeln!(f, "    Akaike info crit   = {}", g(result.aic))?;
        writeln!(f, "    Bayesian info crit = {}", g(result.bic))?;

        writeln!(f, "[[Variables]]")?;
        let width = result
            .parameters
            .iter()
            .map(|parameter| parameter.name.len())
            .max()
            .unwrap_or(0);
        for parameter in &result.parameters {
            write!(
                f,
                "    {:<width$} {}",
                format!("{}:", parameter.name),
                g(parameter.value),
                width = width + 1
            )?;
            if let Some(stderr) = parameter.stderr {
                write!(f, " +/- {}", g(stderr))?;
                if parameter.value != 0.0 {
                    write!(f, " ({:.2}%)", (stderr / parameter.value).abs() * 100.0)?;
                }
            }
            match (&parameter.expr, parameter.vary) {
                (Some(expr), _) => writeln!(f, " == '{expr}'")?,
                (None, true) => writeln!(f, " (init = {})", g(parameter.init_value))?,
                (None, false) => writeln!(f, " (fixed)")?,
            }
        }

        let mut correlations: Vec<_> = result
            .correlations
            .iter()
            .filter(|correlation| correlation.value.abs() >= self.correlation_threshold)
            .collect();
        if correlations.is_empty() {
            return Ok(());
        }
        correlations.sort_by(|lhs, rhs| rhs.value.abs().total_cmp(&lhs.value.abs()));
        writeln!(
            f,
            "[[Correlations]] (unreported correlations are < {:.3})",
            self.correlation_threshold
        )?;
        let labels: Vec<String> = correlations
            .iter()
            .map(|correlation| format!("C({}, {})", correlation.first, correlation.second))
            .collect();
        let label_width = labels.iter().map(String::len).max().unwrap_or(0);
        for (label, correlation) in labels.iter().zip(correlations) {
            writeln!(f, "    {label:<label_width$} = {:+.4}", correlation.value)?;
        }
        Ok(())
    }
}

pub fn render_fit_report(result: &FitResult, correlation_threshold: f64) -> String {
    let report = FitReport {
        result,
        correlation_threshold,
    };
    report.to_string().trim_end().to_string()
}

pub fn render_log(result: &FitResult, correlation_threshold: f64) -> String {
    let report = render_fit_report(result, correlation_threshold);
    let ratio = format!(
        " Chi-squared value / d.o.f. = {} / {}",
        result.chi_square, result.degrees_of_freedom
    );
    let reduced = format!(" Reduced Chi-squared value  = {}", result.reduced_chi_square);
    format!("{SEPARATOR}\n{report}\n{SEPARATOR}\n{ratio}\n{reduced}\n")
}

#[cfg(test)]
mod tests {
    use super::{FitReport, format_general, render_fit_report, render_log};
    use crate::minimize::Correlation;
    use crate::params::{FitParameter, ParameterSet};
    use crate::result::FitResult;

    fn result() -> FitResult {
        let mut parameters = ParameterSet::new();
        let mut level = FitParameter::new("Et_0", 6.6);
        level.stderr = Some(0.0066);
        level.init_value = 6.5;
        parameters.add(level).expect("Et_0");
        let mut tied = FitParameter::tied("C_1", "C_0");
        tied.value = 0.02;
        tied.stderr = Some(0.001);
        parameters.add(tied).expect("C_1");
        parameters
            .add(FitParameter::new("epsilon_0", 400.0).fixed())
            .expect("epsilon_0");

        FitResult {
            model_name: "scf_curve".to_string(),
            method: "leastsq".to_string(),
            success: true,
            message: "Fit succeeded: relative reduction in chi-square is at most ftol".to_string(),
            parameters,
            chi_square: 47.0,
            degrees_of_freedom: 47,
            reduced_chi_square: 1.0,
            data_points: 50,
            variables: 3,
            function_evals: 25,
            aic: 6.0,
            bic: 11.7,
            correlations: vec![
                Correlation {
                    first: "Et_0".to_string(),
                    second: "C_0".to_string(),
                    value: -0.95,
                },
                Correlation {
                    first: "Et_0".to_string(),
                    second: "Et_1".to_string(),
                    value: 0.05,
                },
            ],
        }
    }

    #[test]
    fn general_format_matches_percent_g() {
        assert_eq!(format_general(6.6, 7), "6.6");
        assert_eq!(format_general(0.000123456789, 7), "0.0001234568");
        assert_eq!(format_general(1.5e-7, 7), "1.5e-7");
        assert_eq!(format_general(12345678.0, 7), "1.234568e7");
        assert_eq!(format_general(0.0, 7), "0");
    }

    #[test]
    fn report_marks_tied_and_fixed_parameters() {
        let report = render_fit_report(&result(), 0.1);

        assert!(report.starts_with("[[Model]]\n    Model(scf_curve)"));
        assert!(report.contains("    # data points      = 50"));
        assert!(report.contains("Et_0:      6.6 +/- 0.0066 (0.10%) (init = 6.5)"), "{report}");
        assert!(report.contains("C_1:       0.02 +/- 0.001 (5.00%) == 'C_0'"), "{report}");
        assert!(report.contains("epsilon_0: 400 (fixed)"), "{report}");
    }

    #[test]
    fn displayed_report_is_the_rendered_text_plus_newline() {
        let result = result();
        let displayed = FitReport {
            result: &result,
            correlation_threshold: 0.1,
        }
        .to_string();

        assert!(displayed.ends_with("= -0.9500\n"), "{displayed}");
        assert_eq!(displayed.trim_end(), render_fit_report(&result, 0.1));
        assert_eq!(render_fit_report(&result, 1.0).lines().last(), Some("epsilon_0: 400 (fixed)"));
    }

    #[test]
    fn weak_correlations_are_left_out() {
        let report = render_fit_report(&result(), 0.1);
        assert!(report.contains("C(Et_0, C_0) = -0.9500"), "{report}");
        assert!(!report.contains("Et_1"), "{report}");
    }

    #[test]
    fn log_ends_with_chi_square_summary() {
        let log = render_log(&result(), 0.1);
        let lines: Vec<&str> = log.lines().collect();

        assert!(lines[0].starts_with("-----"));
        assert_eq!(lines[lines.len() - 2], " Chi-squared value / d.o.f. = 47 / 47");
        assert_eq!(lines[lines.len() - 1], " Reduced Chi-squared value  = 1");
    }
}

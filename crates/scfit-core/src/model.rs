//! Lineshape models evaluated against the event-density axis.

/// A parametric curve `y = f(x; p)` with a fixed, ordered parameter list.
pub trait LineshapeModel {
    fn name(&self) -> &'static str;

    fn parameter_names(&self) -> &'static [&'static str];

    /// Evaluate at `x`. `params` follows `parameter_names()` order.
    fn evaluate(&self, x: f64, params: &[f64]) -> f64;

    fn evaluate_many(&self, xs: &[f64], params: &[f64]) -> Vec<f64> {
        xs.iter().map(|&x| self.evaluate(x, params)).collect()
    }

    fn parameter_count(&self) -> usize {
        self.parameter_names().len()
    }
}

pub const SCF_PARAMETER_NAMES: [&str; 3] = ["Et", "C", "epsilon"];

/// Saturating energy curve `Et * (1 - C * exp(-epsilon * x))`.
///
/// `Et` is the asymptotic level, `C` the contrast amplitude and `epsilon` the
/// decay rate. No domain checks are made; NaN and negative inputs propagate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScfCurve;

impl ScfCurve {
    pub fn value(x: f64, level: f64, amplitude: f64, rate: f64) -> f64 {
        level * (1.0 - amplitude * (-rate * x).exp())
    }
}

impl LineshapeModel for ScfCurve {
    fn name(&self) -> &'static str {
        "scf_curve"
    }

    fn parameter_names(&self) -> &'static [&'static str] {
        &SCF_PARAMETER_NAMES
    }

    fn evaluate(&self, x: f64, params: &[f64]) -> f64 {
        Self::value(x, params[0], params[1], params[2])
    }
}

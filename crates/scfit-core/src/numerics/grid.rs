use crate::domain::{ScfitError, ScfitResult};

/// `points` values spaced evenly in log space over `[start, stop]`, both ends included.
pub fn log_space(start: f64, stop: f64, points: usize) -> ScfitResult<Vec<f64>> {
    if !(start.is_finite() && stop.is_finite() && start > 0.0 && stop > start) {
        return Err(ScfitError::invalid_input(
            "INPUT.GRID_RANGE",
            format!("invalid grid range [{start}, {stop}] (must be finite, >0 and increasing)"),
        ));
    }
    if points < 2 {
        return Err(ScfitError::invalid_input(
            "INPUT.GRID_POINTS",
            format!("grid needs at least 2 points, got {points}"),
        ));
    }

    let ln_start = start.ln();
    let step = (stop.ln() - ln_start) / (points as f64 - 1.0);
    let mut values: Vec<f64> = (0..points)
        .map(|index| (ln_start + step * index as f64).exp())
        .collect();
    values[0] = start;
    values[points - 1] = stop;
    Ok(values)
}

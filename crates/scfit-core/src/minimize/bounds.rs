//! Maps bounded parameters to an unbounded internal space (MINUIT convention).

const BOUND_MARGIN: f64 = 1.0e-6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BoundTransform {
    Unbounded,
    Lower(f64),
    Upper(f64),
    Both(f64, f64),
}

impl BoundTransform {
    pub fn new(min: f64, max: f64) -> Self {
        match (min.is_finite(), max.is_finite()) {
            (false, false) => Self::Unbounded,
            (true, false) => Self::Lower(min),
            (false, true) => Self::Upper(max),
            (true, true) => Self::Both(min, max),
        }
    }

    pub fn to_internal(self, value: f64) -> f64 {
        match self {
            Self::Unbounded => value,
            Self::Lower(min) => ((value - min + 1.0).powi(2) - 1.0).max(0.0).sqrt(),
            Self::Upper(max) => ((max - value + 1.0).powi(2) - 1.0).max(0.0).sqrt(),
            Self::Both(min, max) => {
                if max == min {
                    return 0.0;
                }
                (2.0 * (value - min) / (max - min) - 1.0).clamp(-1.0, 1.0).asin()
            }
        }
    }

    pub fn to_external(self, internal: f64) -> f64 {
        match self {
            Self::Unbounded => internal,
            Self::Lower(min) => min - 1.0 + (internal * internal + 1.0).sqrt(),
            Self::Upper(max) => max + 1.0 - (internal * internal + 1.0).sqrt(),
            Self::Both(min, max) => min + (internal.sin() + 1.0) * (max - min) / 2.0,
        }
    }

    /// Pulls a value resting on a finite bound just inside it, where the slope is non-zero.
    pub fn interior(self, value: f64) -> f64 {
        match self {
            Self::Lower(min) if value <= min => min + BOUND_MARGIN * min.abs().max(1.0),
            Self::Upper(max) if value >= max => max - BOUND_MARGIN * max.abs().max(1.0),
            Self::Both(min, max) if max > min => {
                let margin = BOUND_MARGIN * (max - min);
                value.clamp(min + margin, max - margin)
            }
            _ => value,
        }
    }

    /// d(external) / d(internal) at `internal`.
    pub fn derivative(self, internal: f64) -> f64 {
        match self {
            Self::Unbounded => 1.0,
            Self::Lower(_) => internal / (internal * internal + 1.0).sqrt(),
            Self::Upper(_) => -internal / (internal * internal + 1.0).sqrt(),
            Self::Both(min, max) => internal.cos() * (max - min) / 2.0,
        }
    }
}

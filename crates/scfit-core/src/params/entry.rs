use crate::domain::{ScfitError, ScfitResult};
use std::str::FromStr;

pub const ENTRY_FIELDS: [&str; 4] = ["value", "vary", "min", "max"];
const MAX_ENTRY_FIELDS: usize = 5;

/// One free-slot entry: `value, vary, min, max[, expr]`.
///
/// `vary` is numeric; any nonzero value enables the parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterEntry {
    pub value: f64,
    pub vary: bool,
    pub min: f64,
    pub max: f64,
    pub expr: Option<String>,
}

impl ParameterEntry {
    pub fn new(value: f64, vary: bool, min: f64, max: f64) -> Self {
        Self {
            value,
            vary,
            min,
            max,
            expr: None,
        }
    }

    pub fn with_expr(mut self, expr: impl Into<String>) -> Self {
        self.expr = Some(expr.into());
        self
    }

    pub fn parse(line: &str) -> ScfitResult<Self> {
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if fields.len() < ENTRY_FIELDS.len() || fields.iter().take(4).any(|field| field.is_empty())
        {
            return Err(ScfitError::insufficient_input(
                "INPUT.PARAM_ENTRY",
                format!(
                    "expected '{}' but got '{}'",
                    ENTRY_FIELDS.join(", "),
                    line.trim()
                ),
            ));
        }
        if fields.len() > MAX_ENTRY_FIELDS {
            return Err(ScfitError::invalid_input(
                "INPUT.PARAM_ENTRY",
                format!(
                    "expected at most {} fields but got {} in '{}'",
                    MAX_ENTRY_FIELDS,
                    fields.len(),
                    line.trim()
                ),
            ));
        }

        let mut numbers = [0.0; 4];
        for ((slot, field), label) in numbers.iter_mut().zip(&fields).zip(ENTRY_FIELDS) {
            *slot = field.parse::<f64>().map_err(|_| {
                ScfitError::invalid_input(
                    "INPUT.PARAM_ENTRY",
                    format!("{label} '{field}' is not a number"),
                )
            })?;
        }

        let expr = fields
            .get(4)
            .filter(|field| !field.is_empty())
            .map(|field| (*field).to_string());

        Ok(Self {
            value: numbers[0],
            vary: numbers[1] != 0.0,
            min: numbers[2],
            max: numbers[3],
            expr,
        })
    }
}

impl FromStr for ParameterEntry {
    type Err = ScfitError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        Self::parse(line)
    }
}

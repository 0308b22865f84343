//! Named, bounded, optionally tied fit parameters.

pub mod entry;
pub mod expr;

pub use entry::ParameterEntry;
pub use expr::Expr;

use crate::domain::{FitMode, ScfitError, ScfitResult};

pub const TIED_LOWER_BOUND: f64 = 0.0;
pub const TIED_UPPER_BOUND: f64 = 1.0e10;

#[derive(Debug, Clone, PartialEq)]
pub struct FitParameter {
    pub name: String,
    pub value: f64,
    pub min: f64,
    pub max: f64,
    pub vary: bool,
    /// Overrides `vary`: an expression-bound parameter is never optimized.
    pub expr: Option<String>,
    pub stderr: Option<f64>,
    pub init_value: f64,
}

impl FitParameter {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
            min: f64::NEG_INFINITY,
            max: f64::INFINITY,
            vary: true,
            expr: None,
            stderr: None,
            init_value: value,
        }
    }

    pub fn from_entry(name: impl Into<String>, entry: &ParameterEntry) -> Self {
        Self {
            min: entry.min,
            max: entry.max,
            vary: entry.vary,
            expr: entry.expr.clone(),
            ..Self::new(name, entry.value)
        }
    }

    /// Placeholder bound to `target` by an equality expression.
    pub fn tied(name: impl Into<String>, target: &str) -> Self {
        Self {
            min: TIED_LOWER_BOUND,
            max: TIED_UPPER_BOUND,
            vary: false,
            expr: Some(target.to_string()),
            ..Self::new(name, 0.0)
        }
    }

    pub fn with_bounds(mut self, min: f64, max: f64) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    pub fn fixed(mut self) -> Self {
        self.vary = false;
        self
    }

    pub fn is_free(&self) -> bool {
        self.vary && self.expr.is_none()
    }

    pub fn clamp(&self, value: f64) -> f64 {
        if value < self.min {
            self.min
        } else if value > self.max {
            self.max
        } else {
            value
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParameterSet {
    parameters: Vec<FitParameter>,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, parameter: FitParameter) -> ScfitResult<()> {
        if self.index_of(&parameter.name).is_some() {
            return Err(ScfitError::invalid_input(
                "INPUT.PARAM_DUPLICATE",
                format!("parameter '{}' is defined twice", parameter.name),
            ));
        }
        self.parameters.push(parameter);
        Ok(())
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.parameters
            .iter()
            .position(|parameter| parameter.name == name)
    }

    pub fn get(&self, name: &str) -> Option<&FitParameter> {
        self.parameters.iter().find(|parameter| parameter.name == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut FitParameter> {
        self.parameters
            .iter_mut()
            .find(|parameter| parameter.name == name)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FitParameter> {
        self.parameters.iter()
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.parameters
            .iter()
            .map(|parameter| parameter.name.as_str())
            .collect()
    }

    pub fn free_names(&self) -> Vec<&str> {
        self.parameters
            .iter()
            .filter(|parameter| parameter.is_free())
            .map(|parameter| parameter.name.as_str())
            .collect()
    }

    pub fn free_count(&self) -> usize {
        self.parameters
            .iter()
            .filter(|parameter| parameter.is_free())
            .count()
    }

    pub fn values(&self) -> Vec<f64> {
        self.parameters
            .iter()
            .map(|parameter| parameter.value)
            .collect()
    }

    pub fn value(&self, name: &str) -> Option<f64> {
        self.get(name).map(|parameter| parameter.value)
    }

    /// Checks bounds and resolves every tie expression into an evaluation order.
    pub fn validate(&self) -> ScfitResult<ExpressionPlan> {
        for parameter in &self.parameters {
            if parameter.min.is_nan() || parameter.max.is_nan() || parameter.min > parameter.max {
                return Err(ScfitError::invalid_input(
                    "INPUT.PARAM_BOUNDS",
                    format!(
                        "parameter '{}' has invalid bounds [{}, {}]",
                        parameter.name, parameter.min, parameter.max
                    ),
                ));
            }
            if !parameter.value.is_finite() {
                return Err(ScfitError::invalid_input(
                    "INPUT.PARAM_VALUE",
                    format!("parameter '{}' has non-finite value", parameter.name),
                ));
            }
        }
        ExpressionPlan::build(self)
    }

    /// Evaluate tie expressions in place.
    pub fn apply_expressions(&mut self) -> ScfitResult<()> {
        let plan = self.validate()?;
        let mut values = self.values();
        plan.apply(self, &mut values);
        for (parameter, value) in self.parameters.iter_mut().zip(values) {
            parameter.value = value;
        }
        Ok(())
    }

    pub(crate) fn parameters_mut(&mut self) -> &mut [FitParameter] {
        &mut self.parameters
    }
}

impl<'a> IntoIterator for &'a ParameterSet {
    type Item = &'a FitParameter;
    type IntoIter = std::slice::Iter<'a, FitParameter>;

    fn into_iter(self) -> Self::IntoIter {
        self.parameters.iter()
    }
}

/// Tie expressions in dependency order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExpressionPlan {
    steps: Vec<(usize, Expr)>,
}

impl ExpressionPlan {
    fn build(parameters: &ParameterSet) -> ScfitResult<Self> {
        let mut pending = Vec::new();
        for (index, parameter) in parameters.iter().enumerate() {
            let Some(source) = parameter.expr.as_deref() else {
                continue;
            };
            let expr = Expr::parse(source)?;
            let mut dependencies = Vec::new();
            for name in expr.names() {
                let dependency = parameters.index_of(name).ok_or_else(|| {
                    ScfitError::invalid_input(
                        "INPUT.PARAM_EXPR",
                        format!(
                            "expression '{}' of '{}' references unknown parameter '{}'",
                            source, parameter.name, name
                        ),
                    )
                })?;
                dependencies.push(dependency);
            }
            pending.push((index, expr, dependencies));
        }

        let mut resolved: Vec<bool> = parameters
            .iter()
            .map(|parameter| parameter.expr.is_none())
            .collect();
        let mut steps = Vec::with_capacity(pending.len());
        while !pending.is_empty() {
            let before = pending.len();
            let mut remaining = Vec::new();
            for (index, expr, dependencies) in pending {
                if dependencies.iter().all(|dependency| resolved[*dependency]) {
                    resolved[index] = true;
                    steps.push((index, expr));
                } else {
                    remaining.push((index, expr, dependencies));
                }
            }
            if remaining.len() == before {
                let names: Vec<&str> = remaining
                    .iter()
                    .map(|(index, _, _)| parameters.parameters[*index].name.as_str())
                    .collect();
                return Err(ScfitError::invalid_input(
                    "INPUT.PARAM_EXPR",
                    format!("circular tie expressions among {}", names.join(", ")),
                ));
            }
            pending = remaining;
        }

        Ok(Self { steps })
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// `values` is indexed like `parameters`; results are clipped to each
    /// parameter's bounds.
    pub fn apply(&self, parameters: &ParameterSet, values: &mut [f64]) {
        for (index, expr) in &self.steps {
            let value = {
                let lookup = |name: &str| parameters.index_of(name).map(|at| values[at]);
                expr.evaluate(&lookup).unwrap_or(f64::NAN)
            };
            values[*index] = parameters.parameters[*index].clamp(value);
        }
    }
}

/// Entry slots in prompt order: every model parameter of dataset 0, then the
/// first model parameter of each further dataset.
pub fn parameter_slots(names: &[&str], mode: FitMode) -> Vec<String> {
    let mut slots: Vec<String> = names
        .iter()
        .map(|name| mode.parameter_name(name, 0))
        .collect();
    if let (FitMode::Joint(count), Some(first)) = (mode, names.first()) {
        slots.extend((1..count).map(|index| mode.parameter_name(first, index)));
    }
    slots
}

pub fn build_single(names: &[&str], entries: &[ParameterEntry]) -> ScfitResult<ParameterSet> {
    check_entry_count(names.len(), entries.len())?;
    let mut parameters = ParameterSet::new();
    for (name, entry) in names.iter().zip(entries) {
        parameters.add(FitParameter::from_entry(*name, entry))?;
    }
    Ok(parameters)
}

/// Linked set for `dataset_count` datasets: the first model parameter is free
/// per dataset, the rest are entered once for dataset 0 and tied to it elsewhere.
pub fn build_joint(
    names: &[&str],
    dataset_count: usize,
    entries: &[ParameterEntry],
) -> ScfitResult<ParameterSet> {
    let mode = FitMode::Joint(dataset_count);
    let Some(first) = names.first() else {
        return Err(ScfitError::invalid_input(
            "INPUT.PARAM_MODEL",
            "model declares no parameters",
        ));
    };
    if dataset_count == 0 {
        return Err(ScfitError::insufficient_input(
            "INPUT.DATASET_COUNT",
            "at least one dataset is required",
        ));
    }
    check_entry_count(names.len() + dataset_count - 1, entries.len())?;

    let (shared, scales) = entries.split_at(names.len());
    let mut parameters = ParameterSet::new();
    for index in 0..dataset_count {
        let scale_entry = if index == 0 { &shared[0] } else { &scales[index - 1] };
        parameters.add(FitParameter::from_entry(
            mode.parameter_name(first, index),
            scale_entry,
        ))?;
        for (offset, name) in names.iter().enumerate().skip(1) {
            let suffixed = mode.parameter_name(name, index);
            let parameter = if index == 0 {
                FitParameter::from_entry(suffixed, &shared[offset])
            } else {
                FitParameter::tied(suffixed, &mode.parameter_name(name, 0))
            };
            parameters.add(parameter)?;
        }
    }
    Ok(parameters)
}

pub fn build(names: &[&str], mode: FitMode, entries: &[ParameterEntry]) -> ScfitResult<ParameterSet> {
    match mode {
        FitMode::Single => build_single(names, entries),
        FitMode::Joint(count) => build_joint(names, count, entries),
    }
}

fn check_entry_count(expected: usize, actual: usize) -> ScfitResult<()> {
    if expected != actual {
        return Err(ScfitError::insufficient_input(
            "INPUT.PARAM_COUNT",
            format!("expected {expected} parameter entries, got {actual}"),
        ));
    }
    Ok(())
}

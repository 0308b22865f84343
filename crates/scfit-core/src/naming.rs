//! File-name conventions for inputs and outputs.
//!
//! Input stems look like `x1_scf_phase_01_02_evt`: a sensor token first, and a
//! two-digit run pair (here `01_02`) identifying the phase window. Joint fits
//! collapse the run pair to [`RUN_PAIR_PLACEHOLDER`] to name their outputs.

use crate::domain::{ScfitError, ScfitResult};
use std::path::Path;

pub const RUN_PAIR_PLACEHOLDER: &str = "xx";
const PHASE_TOKEN: &str = "phase";

pub fn file_prefix(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Index of the first token of the run pair, if the prefix has one.
fn run_pair_index(tokens: &[&str]) -> Option<usize> {
    if let Some(phase) = tokens.iter().position(|token| *token == PHASE_TOKEN) {
        let first = phase + 1;
        if first + 1 < tokens.len() && is_run_token(tokens[first]) && is_run_token(tokens[first + 1])
        {
            return Some(first);
        }
    }

    tokens
        .windows(2)
        .position(|pair| is_run_token(pair[0]) && is_run_token(pair[1]))
}

fn is_run_token(token: &str) -> bool {
    token.len() == 2 && token.bytes().all(|byte| byte.is_ascii_digit())
}

pub fn normalize_prefix(prefix: &str) -> String {
    let mut tokens: Vec<&str> = prefix.split('_').collect();
    if let Some(index) = run_pair_index(&tokens) {
        tokens[index] = RUN_PAIR_PLACEHOLDER;
        tokens[index + 1] = RUN_PAIR_PLACEHOLDER;
    }
    tokens.join("_")
}

/// Shared output prefix of a joint input set.
///
/// Stems are compared token by token; they may differ only inside one adjacent
/// pair of two-digit tokens, which is collapsed to the placeholder.
pub fn unified_prefix<P: AsRef<Path>>(paths: &[P]) -> ScfitResult<String> {
    let Some(first) = paths.first() else {
        return Err(ScfitError::insufficient_input(
            "INPUT.JOINT_PREFIX",
            "no input files were given",
        ));
    };

    let stems: Vec<String> = paths.iter().map(|path| file_prefix(path.as_ref())).collect();
    let token_lists: Vec<Vec<&str>> = stems.iter().map(|stem| stem.split('_').collect()).collect();
    let reference = &token_lists[0];

    let mut differing = Vec::new();
    for (path, tokens) in paths.iter().zip(&token_lists).skip(1) {
        if tokens.len() != reference.len() {
            return Err(prefix_mismatch(first.as_ref(), path.as_ref()));
        }
        for (position, (lhs, rhs)) in reference.iter().zip(tokens).enumerate() {
            if lhs != rhs && !differing.contains(&position) {
                differing.push(position);
            }
        }
    }

    let (Some(&low), Some(&high)) = (differing.iter().min(), differing.iter().max()) else {
        return Ok(normalize_prefix(&stems[0]));
    };
    let is_pair_at = |start: usize| {
        start + 1 < reference.len()
            && token_lists
                .iter()
                .all(|tokens| is_run_token(tokens[start]) && is_run_token(tokens[start + 1]))
    };
    let pair = if high <= low + 1 && is_pair_at(low) {
        Some(low)
    } else if high == low && low > 0 && is_pair_at(low - 1) {
        Some(low - 1)
    } else {
        None
    };

    match pair {
        Some(index) => {
            let mut tokens = reference.clone();
            tokens[index] = RUN_PAIR_PLACEHOLDER;
            tokens[index + 1] = RUN_PAIR_PLACEHOLDER;
            Ok(tokens.join("_"))
        }
        None => {
            let offender = paths
                .iter()
                .zip(&token_lists)
                .find(|(_, tokens)| {
                    tokens[low] != reference[low] || tokens[high] != reference[high]
                })
                .map_or(first.as_ref(), |(path, _)| path.as_ref());
            Err(prefix_mismatch(first.as_ref(), offender))
        }
    }
}

fn prefix_mismatch(first: &Path, other: &Path) -> ScfitError {
    ScfitError::inconsistent_input_set(
        "INPUT.JOINT_PREFIX",
        format!(
            "'{}' and '{}' differ outside a single run pair",
            first.display(),
            other.display()
        ),
    )
}

/// Output prefix for a run: the file stem for one input, the unified prefix otherwise.
pub fn output_prefix<P: AsRef<Path>>(paths: &[P]) -> ScfitResult<String> {
    match paths {
        [single] => Ok(file_prefix(single.as_ref())),
        _ => unified_prefix(paths),
    }
}

/// Display labels recovered from an input prefix.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FileLabels {
    pub sensor: Option<String>,
    pub phase: Option<String>,
}

impl FileLabels {
    pub fn parse(prefix: &str) -> Self {
        let tokens: Vec<&str> = prefix.split('_').collect();
        Self {
            sensor: tokens.first().and_then(|token| sensor_label(token)),
            phase: phase_label(&tokens),
        }
    }
}

fn sensor_label(token: &str) -> Option<String> {
    let lower = token.to_ascii_lowercase();
    let unit = lower
        .strip_prefix("xis")
        .or_else(|| lower.strip_prefix('x'))?;
    (!unit.is_empty() && unit.bytes().all(|byte| byte.is_ascii_digit()))
        .then(|| format!("XIS{unit}"))
}

fn phase_label(tokens: &[&str]) -> Option<String> {
    let phase = tokens.iter().position(|token| *token == PHASE_TOKEN)?;
    let start = dotted_digits(tokens.get(phase + 1)?)?;
    let stop = dotted_digits(tokens.get(phase + 2)?)?;
    Some(format!("phase:{start}-{stop}"))
}

fn dotted_digits(token: &str) -> Option<String> {
    if token.is_empty() || !token.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    let digits: Vec<String> = token.chars().map(String::from).collect();
    Some(digits.join("."))
}

#[cfg(test)]
mod tests {
    use super::{FileLabels, file_prefix, normalize_prefix, output_prefix, unified_prefix};
    use crate::domain::ScfitErrorCategory;
    use std::path::{Path, PathBuf};

    #[test]
    fn prefix_is_the_file_stem() {
        assert_eq!(
            file_prefix(Path::new("data/x1_scf_phase_01_02.qdp")),
            "x1_scf_phase_01_02"
        );
    }

    #[test]
    fn run_pair_after_phase_token_is_collapsed() {
        assert_eq!(
            normalize_prefix("xis1_scf_phase_01_02_evt"),
            "xis1_scf_phase_xx_xx_evt"
        );
        assert_eq!(
            normalize_prefix("xis1_scf_phase_03_04_evt"),
            "xis1_scf_phase_xx_xx_evt"
        );
    }

    #[test]
    fn first_adjacent_pair_is_used_without_phase_token() {
        assert_eq!(normalize_prefix("x0_2009_01_02_sci"), "x0_2009_xx_xx_sci");
        assert_eq!(normalize_prefix("x0_plain"), "x0_plain");
    }

    #[test]
    fn unified_prefix_accepts_run_pair_differences_only() {
        let matching = [
            PathBuf::from("a/xis1_scf_phase_01_02_evt.qdp"),
            PathBuf::from("b/xis1_scf_phase_03_04_evt.qdp"),
        ];
        assert_eq!(
            unified_prefix(&matching).expect("prefixes should agree"),
            "xis1_scf_phase_xx_xx_evt"
        );

        let mismatched = [
            PathBuf::from("xis1_scf_phase_01_02_evt.qdp"),
            PathBuf::from("xis3_scf_phase_03_04_evt.qdp"),
        ];
        let error = unified_prefix(&mismatched).expect_err("sensor mismatch should fail");
        assert_eq!(error.category(), ScfitErrorCategory::InconsistentInputSet);
    }

    #[test]
    fn unified_prefix_finds_the_run_pair_after_other_two_digit_tokens() {
        let paths = [
            PathBuf::from("x1_2009_10_01_02.qdp"),
            PathBuf::from("x1_2009_10_03_04.qdp"),
        ];
        assert_eq!(
            unified_prefix(&paths).expect("only the run pair differs"),
            "x1_2009_10_xx_xx"
        );

        let one_token = [
            PathBuf::from("x1_2009_10_01_02.qdp"),
            PathBuf::from("x1_2009_10_01_05.qdp"),
        ];
        assert_eq!(
            unified_prefix(&one_token).expect("second run token differs"),
            "x1_2009_10_xx_xx"
        );

        let split = [
            PathBuf::from("x1_2009_10_01_02.qdp"),
            PathBuf::from("x1_2009_11_01_03.qdp"),
        ];
        let error = unified_prefix(&split).expect_err("two separate differences should fail");
        assert_eq!(error.category(), ScfitErrorCategory::InconsistentInputSet);

        let longer = [
            PathBuf::from("x1_2009_01_02.qdp"),
            PathBuf::from("x1_2009_01_02_evt.qdp"),
        ];
        assert!(unified_prefix(&longer).is_err());
    }

    #[test]
    fn single_input_keeps_its_own_prefix() {
        let paths = [PathBuf::from("x1_scf_phase_01_02.qdp")];
        assert_eq!(
            output_prefix(&paths).expect("single prefix"),
            "x1_scf_phase_01_02"
        );
    }

    #[test]
    fn labels_are_parsed_from_sensor_and_phase_tokens() {
        let labels = FileLabels::parse("x1_scf_phase_01_02");
        assert_eq!(labels.sensor.as_deref(), Some("XIS1"));
        assert_eq!(labels.phase.as_deref(), Some("phase:0.1-0.2"));

        let unlabeled = FileLabels::parse("calibration");
        assert_eq!(unlabeled, FileLabels::default());
    }
}

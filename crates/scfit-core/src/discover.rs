use crate::domain::{ScfitError, ScfitResult};
use globset::Glob;
use std::fs;
use std::path::{Path, PathBuf};

/// Regular files directly inside `dir` whose file names match `pattern`,
/// sorted by path.
pub fn discover_inputs(dir: &Path, pattern: &str) -> ScfitResult<Vec<PathBuf>> {
    let matcher = Glob::new(pattern)
        .map_err(|source| {
            ScfitError::invalid_input(
                "INPUT.DISCOVER_GLOB",
                format!("invalid input glob '{pattern}': {source}"),
            )
        })?
        .compile_matcher();

    let entries = fs::read_dir(dir).map_err(|source| {
        ScfitError::io_system(
            "IO.DISCOVER_DIR",
            format!("failed to list '{}': {}", dir.display(), source),
        )
    })?;

    let mut matches = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| {
            ScfitError::io_system(
                "IO.DISCOVER_DIR",
                format!("failed to list '{}': {}", dir.display(), source),
            )
        })?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if path.file_name().is_some_and(|name| matcher.is_match(name)) {
            matches.push(path);
        }
    }
    matches.sort();

    if matches.is_empty() {
        return Err(ScfitError::malformed_input(
            "INPUT.DISCOVER_EMPTY",
            format!(
                "no files in '{}' match '{}'",
                dir.display(),
                pattern
            ),
        ));
    }
    tracing::debug!(dir = %dir.display(), pattern, count = matches.len(), "discovered inputs");
    Ok(matches)
}

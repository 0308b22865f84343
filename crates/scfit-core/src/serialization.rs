use crate::domain::{ScfitError, ScfitResult};
use std::fs;
use std::io;
use std::path::Path;

pub fn normalize_text_artifact(content: &str) -> String {
    let mut normalized = content.replace("\r\n", "\n").replace('\r', "\n");
    if !normalized.is_empty() && !normalized.ends_with('\n') {
        normalized.push('\n');
    }
    normalized
}

/// Whole-file create/overwrite; a failure part way leaves whatever was written.
pub fn write_text_artifact(path: &Path, content: &str) -> ScfitResult<()> {
    fs::write(path, normalize_text_artifact(content)).map_err(|source| {
        ScfitError::io_system(
            "IO.WRITE_ARTIFACT",
            format!("failed to write '{}': {}", path.display(), source),
        )
    })
}

/// Invalid UTF-8 is `MalformedInput`; every other read failure is an IO error.
pub fn read_text_artifact(path: &Path) -> ScfitResult<String> {
    fs::read_to_string(path).map_err(|source| match source.kind() {
        io::ErrorKind::InvalidData => ScfitError::malformed_input(
            "INPUT.TEXT_ENCODING",
            format!("'{}' is not valid UTF-8 text: {}", path.display(), source),
        ),
        _ => ScfitError::io_system(
            "IO.READ_ARTIFACT",
            format!("failed to read '{}': {}", path.display(), source),
        ),
    })
}

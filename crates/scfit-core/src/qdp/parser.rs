use super::{COLUMN_COUNT, HEADER_MARKER, QdpDocument, QdpSegment};
use crate::domain::{ScfitError, ScfitResult};
use crate::serialization::read_text_artifact;
use std::path::Path;

pub fn read_document(path: &Path) -> ScfitResult<QdpDocument> {
    let content = read_text_artifact(path)?;
    parse_document(&content, path)
}

/// `source` is only used to label error messages.
pub fn parse_document(content: &str, source: &Path) -> ScfitResult<QdpDocument> {
    let lines: Vec<&str> = content.lines().collect();
    let marker = lines
        .iter()
        .position(|line| line.trim() == HEADER_MARKER)
        .ok_or_else(|| {
            ScfitError::malformed_input(
                "INPUT.QDP_MARKER",
                format!("header terminator '!' not found in '{}'", source.display()),
            )
        })?;

    let header = lines[..=marker]
        .iter()
        .map(|line| (*line).to_string())
        .collect();

    let mut segments = Vec::new();
    let mut current = QdpSegment::default();
    for (offset, line) in lines[marker + 1..].iter().enumerate() {
        let line_number = marker + offset + 2;
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.is_empty() {
            continue;
        }
        if is_terminator(&tokens) {
            current.terminated = true;
            segments.push(std::mem::take(&mut current));
            continue;
        }
        current.rows.push(parse_row(&tokens, line_number, source)?);
    }
    if !current.rows.is_empty() {
        segments.push(current);
    }

    Ok(QdpDocument { header, segments })
}

fn is_terminator(tokens: &[&str]) -> bool {
    tokens.len() == COLUMN_COUNT && tokens.iter().all(|token| token.eq_ignore_ascii_case("NO"))
}

fn parse_row(tokens: &[&str], line_number: usize, source: &Path) -> ScfitResult<[f64; COLUMN_COUNT]> {
    if tokens.len() != COLUMN_COUNT {
        return Err(ScfitError::malformed_input(
            "INPUT.QDP_ROW",
            format!(
                "line {} of '{}': expected {} columns, found {}",
                line_number,
                source.display(),
                COLUMN_COUNT,
                tokens.len()
            ),
        ));
    }

    let mut row = [0.0; COLUMN_COUNT];
    for (slot, token) in row.iter_mut().zip(tokens) {
        *slot = token.parse::<f64>().map_err(|_| {
            ScfitError::malformed_input(
                "INPUT.QDP_ROW",
                format!(
                    "line {} of '{}': '{}' is not a number",
                    line_number,
                    source.display(),
                    token
                ),
            )
        })?;
    }
    Ok(row)
}

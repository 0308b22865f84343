use super::{QdpSegment, SEGMENT_TERMINATOR};
use crate::domain::{ScfitError, ScfitResult};
use crate::serialization::write_text_artifact;
use std::path::Path;

/// Header verbatim, one space-delimited row per index across `columns`,
/// then a single segment terminator.
pub fn write(path: &Path, header: &[String], columns: &[&[f64]]) -> ScfitResult<()> {
    let rows = columns.first().map_or(0, |column| column.len());
    if let Some(column) = columns.iter().find(|column| column.len() != rows) {
        return Err(ScfitError::invalid_input(
            "INPUT.QDP_COLUMNS",
            format!(
                "cannot write '{}': column lengths differ ({} vs {})",
                path.display(),
                rows,
                column.len()
            ),
        ));
    }

    let mut content = render_header(header);
    for index in 0..rows {
        let fields: Vec<String> = columns
            .iter()
            .map(|column| column[index].to_string())
            .collect();
        content.push_str(&fields.join(" "));
        content.push('\n');
    }
    content.push_str(SEGMENT_TERMINATOR);
    content.push('\n');

    write_text_artifact(path, &content)
}

/// Shared header once, then every segment closed by its own terminator.
pub fn write_segments(path: &Path, header: &[String], segments: &[QdpSegment]) -> ScfitResult<()> {
    write_text_artifact(path, &render_segments(header, segments))
}

pub fn render_segments(header: &[String], segments: &[QdpSegment]) -> String {
    let mut content = render_header(header);
    for segment in segments {
        for row in &segment.rows {
            let fields: Vec<String> = row.iter().map(f64::to_string).collect();
            content.push_str(&fields.join(" "));
            content.push('\n');
        }
        content.push_str(SEGMENT_TERMINATOR);
        content.push('\n');
    }
    content
}

fn render_header(header: &[String]) -> String {
    let mut content = String::new();
    for line in header {
        content.push_str(line);
        content.push('\n');
    }
    content
}

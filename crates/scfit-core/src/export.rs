//! Writes the artifacts of a converged fit: `<prefix>_result.log` and
//! `<prefix>_result.qdp`.

use crate::domain::{FitMode, ScfitError, ScfitResult};
use crate::qdp::{self, QdpSegment};
use crate::report::render_log;
use crate::serialization::write_text_artifact;
use crate::session::FittedRun;
use std::fs;
use std::path::{Path, PathBuf};

pub const LOG_SUFFIX: &str = "_result.log";
pub const TABLE_SUFFIX: &str = "_result.qdp";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedArtifacts {
    pub log: PathBuf,
    pub table: PathBuf,
}

impl ExportedArtifacts {
    pub fn paths(&self) -> [&Path; 2] {
        [&self.log, &self.table]
    }
}

pub fn artifact_paths(output_dir: &Path, prefix: &str) -> ExportedArtifacts {
    ExportedArtifacts {
        log: output_dir.join(format!("{prefix}{LOG_SUFFIX}")),
        table: output_dir.join(format!("{prefix}{TABLE_SUFFIX}")),
    }
}

pub fn export(
    run: &FittedRun,
    output_dir: &Path,
    correlation_threshold: f64,
) -> ScfitResult<ExportedArtifacts> {
    fs::create_dir_all(output_dir).map_err(|source| {
        ScfitError::io_system(
            "IO.OUTPUT_DIR",
            format!(
                "failed to create output directory '{}': {}",
                output_dir.display(),
                source
            ),
        )
    })?;

    let artifacts = artifact_paths(output_dir, run.prefix());

    write_text_artifact(&artifacts.log, &render_log(run.result(), correlation_threshold))?;
    tracing::info!(path = %artifacts.log.display(), "wrote fit log");

    let header = run
        .datasets()
        .first()
        .map(|dataset| dataset.header.clone())
        .unwrap_or_default();
    match run.mode() {
        FitMode::Single => {
            let curve = run.curves().first().ok_or_else(|| {
                ScfitError::internal("INTERNAL.CURVES", "converged fit has no model curve")
            })?;
            let zeros = vec![0.0; curve.x.len()];
            qdp::write(&artifacts.table, &header, &[&curve.x, &zeros, &curve.y, &zeros])?;
        }
        FitMode::Joint(_) => {
            let segments: Vec<QdpSegment> = run
                .curves()
                .iter()
                .map(|curve| QdpSegment {
                    rows: curve
                        .x
                        .iter()
                        .zip(&curve.y)
                        .map(|(&x, &y)| [x, 0.0, y, 0.0])
                        .collect(),
                    terminated: true,
                })
                .collect();
            qdp::write_segments(&artifacts.table, &header, &segments)?;
        }
    }
    tracing::info!(path = %artifacts.table.display(), "wrote model table");

    Ok(artifacts)
}

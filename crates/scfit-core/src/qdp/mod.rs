//! QDP text tables: a free-form header closed by a `!` line, rows of
//! `x x_error y y_error`, and `NO NO NO NO` lines closing each segment.

mod parser;
mod writer;

pub use parser::{parse_document, read_document};
pub use writer::{render_segments, write, write_segments};

use crate::domain::{ScfitError, ScfitResult};
use crate::naming;
use std::path::{Path, PathBuf};

pub const HEADER_MARKER: &str = "!";
pub const SEGMENT_TERMINATOR: &str = "NO NO NO NO";
pub const COLUMN_COUNT: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplePoint {
    pub x: f64,
    pub x_error: f64,
    pub y: f64,
    pub y_error: f64,
}

impl SamplePoint {
    pub const fn new(x: f64, x_error: f64, y: f64, y_error: f64) -> Self {
        Self {
            x,
            x_error,
            y,
            y_error,
        }
    }

    pub const fn from_row(row: [f64; COLUMN_COUNT]) -> Self {
        Self::new(row[0], row[1], row[2], row[3])
    }

    pub const fn as_row(&self) -> [f64; COLUMN_COUNT] {
        [self.x, self.x_error, self.y, self.y_error]
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct QdpSegment {
    pub rows: Vec<[f64; COLUMN_COUNT]>,
    pub terminated: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct QdpDocument {
    /// Raw lines up to and including the `!` marker.
    pub header: Vec<String>,
    pub segments: Vec<QdpSegment>,
}

impl QdpDocument {
    pub fn terminator_count(&self) -> usize {
        self.segments.iter().filter(|segment| segment.terminated).count()
    }

    pub fn row_count(&self) -> usize {
        self.segments.iter().map(|segment| segment.rows.len()).sum()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub points: Vec<SamplePoint>,
    pub header: Vec<String>,
    pub source: PathBuf,
}

impl Dataset {
    /// Read one QDP file; rows of every segment are concatenated in file order.
    pub fn load(path: &Path) -> ScfitResult<Self> {
        let document = read_document(path)?;
        let points: Vec<SamplePoint> = document
            .segments
            .iter()
            .flat_map(|segment| segment.rows.iter().copied().map(SamplePoint::from_row))
            .collect();
        if points.is_empty() {
            return Err(ScfitError::malformed_input(
                "INPUT.QDP_EMPTY",
                format!("'{}' contains no data rows after '!'", path.display()),
            ));
        }

        tracing::debug!(path = %path.display(), rows = points.len(), "loaded QDP dataset");
        Ok(Self {
            points,
            header: document.header,
            source: path.to_path_buf(),
        })
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn x(&self) -> Vec<f64> {
        self.points.iter().map(|point| point.x).collect()
    }

    pub fn x_errors(&self) -> Vec<f64> {
        self.points.iter().map(|point| point.x_error).collect()
    }

    pub fn y(&self) -> Vec<f64> {
        self.points.iter().map(|point| point.y).collect()
    }

    pub fn y_errors(&self) -> Vec<f64> {
        self.points.iter().map(|point| point.y_error).collect()
    }
}

pub fn load(path: &Path) -> ScfitResult<Dataset> {
    Dataset::load(path)
}

/// Load a joint input set. The file names must agree once their run pairs
/// are normalized away; that is checked before any file is read.
pub fn load_joint<P: AsRef<Path>>(paths: &[P]) -> ScfitResult<Vec<Dataset>> {
    let prefix = naming::unified_prefix(paths)?;
    tracing::info!(prefix = %prefix, files = paths.len(), "loading joint input set");
    paths
        .iter()
        .map(|path| Dataset::load(path.as_ref()))
        .collect()
}

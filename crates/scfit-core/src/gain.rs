//! Channel-spectrum gain correction.
//!
//! A spectrum recorded with the wrong energy-per-channel is re-binned onto
//! the true channel grid. In units of the true width, source channel `k`
//! covers `[k*r, (k+1)*r)` with `r = etrue / efunc`; its counts are shared
//! between the target channels it overlaps, proportionally to the overlap.
//! Fractional totals are rounded stochastically so the expected count is
//! preserved.

use crate::domain::{ScfitError, ScfitResult};
use crate::serialization::{read_text_artifact, write_text_artifact};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::Path;

pub const DEFAULT_SEED: u64 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpectrumRow {
    pub row: i64,
    pub channel: i64,
    pub counts: u64,
}

/// Parses `row channel counts` lines; blank lines are skipped.
pub fn parse_spectrum(content: &str, source: &Path) -> ScfitResult<Vec<SpectrumRow>> {
    let mut rows = Vec::new();
    for (index, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let fields: Vec<&str> = trimmed.split_whitespace().collect();
        let parsed = match fields.as_slice() {
            [row, channel, counts] => row
                .parse::<i64>()
                .ok()
                .zip(channel.parse::<i64>().ok())
                .zip(counts.parse::<u64>().ok())
                .map(|((row, channel), counts)| SpectrumRow {
                    row,
                    channel,
                    counts,
                }),
            _ => None,
        };
        let row = parsed.ok_or_else(|| {
            ScfitError::malformed_input(
                "INPUT.SPECTRUM_ROW",
                format!(
                    "{}:{}: expected 'row channel counts', found '{}'",
                    source.display(),
                    index + 1,
                    trimmed
                ),
            )
        })?;
        rows.push(row);
    }
    Ok(rows)
}

pub fn render_spectrum(rows: &[(i64, u64)]) -> String {
    rows.iter()
        .map(|(channel, counts)| format!("{channel} {counts}\n"))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GainCorrection {
    efunc: f64,
    etrue: f64,
}

impl GainCorrection {
    pub fn new(efunc: f64, etrue: f64) -> ScfitResult<Self> {
        for (name, value) in [("efunc", efunc), ("etrue", etrue)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ScfitError::invalid_input(
                    "INPUT.GAIN_ENERGY",
                    format!("{name} must be a positive finite energy, got {value}"),
                ));
            }
        }
        Ok(Self { efunc, etrue })
    }

    /// Width of one recorded channel in units of the true channel width.
    pub fn ratio(&self) -> f64 {
        self.etrue / self.efunc
    }

    /// Overlap re-binning onto as many target channels as there are sources.
    pub fn redistribute(&self, counts: &[u64]) -> Vec<f64> {
        let ratio = self.ratio();
        let len = counts.len();
        let mut target = vec![0.0; len];

        for (k, &count) in counts.iter().enumerate() {
            if count == 0 {
                continue;
            }
            let lo = k as f64 * ratio;
            let hi = (k + 1) as f64 * ratio;
            let first = lo.floor() as usize;
            if first >= len {
                break;
            }
            let last = (hi.ceil() as usize).min(len);
            for (j, bin) in target.iter_mut().enumerate().take(last).skip(first) {
                let overlap = hi.min((j + 1) as f64) - lo.max(j as f64);
                if overlap > 0.0 {
                    *bin += count as f64 * overlap / ratio;
                }
            }
        }
        target
    }

    /// Re-bins `rows` and rounds each channel with `rng`; the output keeps
    /// the input channel labels.
    pub fn apply<R: Rng>(&self, rows: &[SpectrumRow], rng: &mut R) -> Vec<(i64, u64)> {
        let counts: Vec<u64> = rows.iter().map(|row| row.counts).collect();
        self.redistribute(&counts)
            .into_iter()
            .zip(rows)
            .map(|(value, row)| (row.channel, stochastic_round(value, rng)))
            .collect()
    }
}

fn stochastic_round<R: Rng>(value: f64, rng: &mut R) -> u64 {
    if value <= 0.0 {
        return 0;
    }
    let whole = value.floor();
    let fraction = value - whole;
    if fraction > rng.r#gen::<f64>() {
        whole as u64 + 1
    } else {
        whole as u64
    }
}

/// Reads `input`, re-bins it and writes `channel counts` lines to `output`.
/// Returns the number of rows written.
pub fn gain_correct(
    input: &Path,
    output: &Path,
    correction: GainCorrection,
    seed: u64,
) -> ScfitResult<usize> {
    let rows = parse_spectrum(&read_text_artifact(input)?, input)?;
    let mut rng = StdRng::seed_from_u64(seed);
    let corrected = correction.apply(&rows, &mut rng);
    write_text_artifact(output, &render_spectrum(&corrected))?;
    tracing::info!(
        input = %input.display(),
        output = %output.display(),
        ratio = correction.ratio(),
        rows = corrected.len(),
        "gain corrected spectrum"
    );
    Ok(corrected.len())
}

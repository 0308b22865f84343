//! Two-panel SVG: data with model curves on a log energy axis, and the
//! unweighted residuals underneath.

use anyhow::{Context, Result};
use plotters::prelude::*;
use scfit_core::FittedRun;
use scfit_core::naming::{FileLabels, file_prefix};
use std::path::Path;

const SIZE: (u32, u32) = (960, 720);
const UPPER_PANEL_HEIGHT: u32 = 500;
const PALETTE: [RGBColor; 4] = [BLUE, RED, GREEN, MAGENTA];

pub(super) fn plot_path(output_dir: &Path, prefix: &str) -> std::path::PathBuf {
    output_dir.join(format!("{prefix}.svg"))
}

pub(super) fn render_fit_plot(run: &FittedRun, path: &Path) -> Result<()> {
    draw(run, path).with_context(|| format!("failed to render plot '{}'", path.display()))
}

fn draw(run: &FittedRun, path: &Path) -> Result<()> {
    let (x_min, x_max) = x_extent(run);
    let (y_min, y_max) = padded(run.datasets().iter().flat_map(|dataset| {
        dataset
            .points
            .iter()
            .flat_map(|point| [point.y - point.y_error, point.y + point.y_error])
    }));
    let residuals: Vec<Vec<f64>> = (0..run.datasets().len())
        .map(|index| run.residuals(index))
        .collect();
    let (r_min, r_max) = padded(residuals.iter().flatten().copied().chain([0.0]));

    let root = SVGBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE)?;
    let (upper, lower) = root.split_vertically(UPPER_PANEL_HEIGHT);

    let mut chart = ChartBuilder::on(&upper)
        .caption(run.prefix(), ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(60)
        .build_cartesian_2d((x_min..x_max).log_scale(), y_min..y_max)?;
    chart.configure_mesh().y_desc("Energy (keV)").draw()?;

    for (index, (dataset, curve)) in run.datasets().iter().zip(run.curves()).enumerate() {
        let color = PALETTE[index % PALETTE.len()];
        chart.draw_series(dataset.points.iter().map(|point| {
            PathElement::new(
                vec![
                    (point.x, point.y - point.y_error),
                    (point.x, point.y + point.y_error),
                ],
                color.mix(0.5),
            )
        }))?;
        chart
            .draw_series(
                dataset
                    .points
                    .iter()
                    .map(|point| Circle::new((point.x, point.y), 2, color.filled())),
            )?
            .label(dataset_label(dataset.source.as_path()))
            .legend(move |(x, y)| Circle::new((x, y), 3, color.filled()));
        chart.draw_series(LineSeries::new(
            curve
                .x
                .iter()
                .zip(&curve.y)
                .filter(|(x, _)| (x_min..=x_max).contains(*x))
                .map(|(&x, &y)| (x, y)),
            &color,
        ))?;
    }
    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    let mut residual_chart = ChartBuilder::on(&lower)
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d((x_min..x_max).log_scale(), r_min..r_max)?;
    residual_chart
        .configure_mesh()
        .x_desc("Event density (events / frame / pixel)")
        .y_desc("Residual")
        .draw()?;
    residual_chart.draw_series(std::iter::once(PathElement::new(
        vec![(x_min, 0.0), (x_max, 0.0)],
        BLACK.mix(0.4),
    )))?;
    for (index, (dataset, residual)) in run.datasets().iter().zip(&residuals).enumerate() {
        let color = PALETTE[index % PALETTE.len()];
        residual_chart.draw_series(
            dataset
                .points
                .iter()
                .zip(residual)
                .map(|(point, &r)| Circle::new((point.x, r), 2, color.filled())),
        )?;
    }

    root.present()?;
    tracing::info!(path = %path.display(), "wrote fit plot");
    Ok(())
}

/// `XIS1 phase:0.1-0.2` when the file name carries both labels, else the
/// file prefix.
fn dataset_label(source: &Path) -> String {
    let prefix = file_prefix(source);
    match FileLabels::parse(&prefix) {
        FileLabels {
            sensor: Some(sensor),
            phase: Some(phase),
        } => format!("{sensor} {phase}"),
        FileLabels {
            sensor: None,
            phase: Some(phase),
        } => phase,
        _ => prefix,
    }
}

/// Positive x range covering every sample, widened by a tenth of a decade.
fn x_extent(run: &FittedRun) -> (f64, f64) {
    let (low, high) = run
        .datasets()
        .iter()
        .flat_map(|dataset| dataset.points.iter().map(|point| point.x))
        .filter(|x| x.is_finite() && *x > 0.0)
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(low, high), x| {
            (low.min(x), high.max(x))
        });
    if !low.is_finite() || !high.is_finite() {
        return (1.0e-5, 1.0e-1);
    }
    if low == high {
        return (low / 10.0, high * 10.0);
    }
    let margin = 10f64.powf(0.1);
    (low / margin, high * margin)
}

fn padded(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (low, high) = values
        .filter(|value| value.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(low, high), value| {
            (low.min(value), high.max(value))
        });
    if !low.is_finite() || !high.is_finite() {
        return (-1.0, 1.0);
    }
    let span = high - low;
    let pad = if span > 0.0 { span * 0.05 } else { low.abs().max(1.0) * 0.05 };
    (low - pad, high + pad)
}

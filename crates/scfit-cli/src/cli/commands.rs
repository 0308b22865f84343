use super::CliError;
use super::entry::{FileParameterSource, ParameterSource, PromptParameterSource};
use super::plot::{plot_path, render_fit_plot};
use anyhow::Context;
use scfit_core::discover::discover_inputs;
use scfit_core::gain::{DEFAULT_SEED, GainCorrection, gain_correct};
use scfit_core::report::render_fit_report;
use scfit_core::result::FitSummary;
use scfit_core::serialization::write_text_artifact;
use scfit_core::{FitOutcome, FitSettings, LevenbergMarquardt, LoadedRun, ScfCurve, export};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(clap::Args)]
pub(super) struct FitArgs {
    /// QDP datasets; more than one runs a joint fit
    #[arg(value_name = "QDP", required_unless_present = "input_dir")]
    inputs: Vec<PathBuf>,

    /// Directory to search with --glob instead of listing inputs
    #[arg(long, requires = "glob", conflicts_with = "inputs")]
    input_dir: Option<PathBuf>,

    /// File-name pattern matched inside --input-dir
    #[arg(long, requires = "input_dir")]
    glob: Option<String>,

    /// Parameter entries, one `value, vary, min, max[, expr]` per line;
    /// prompts on stdin when absent
    #[arg(long)]
    params: Option<PathBuf>,

    /// JSON settings for the model grid, minimizer and report
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Directory for the result log, model table and plot
    #[arg(long, default_value = ".")]
    outdir: PathBuf,

    /// Also write `<prefix>.svg`
    #[arg(long)]
    image: bool,

    /// Write a JSON run summary to this path
    #[arg(long)]
    summary: Option<PathBuf>,
}

#[derive(clap::Args)]
pub(super) struct GainArgs {
    /// Spectrum with `row channel counts` lines
    input: PathBuf,

    /// Destination for `channel counts` lines
    output: PathBuf,

    /// Energy the channel scale was computed with (keV)
    #[arg(long)]
    efunc: f64,

    /// Energy the calibration converged to (keV)
    #[arg(long)]
    etrue: f64,

    /// Seed for stochastic rounding
    #[arg(long, default_value_t = DEFAULT_SEED)]
    seed: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RunSummary {
    prefix: String,
    mode: String,
    inputs: Vec<PathBuf>,
    artifacts: Vec<PathBuf>,
    fit: FitSummary,
}

pub(super) fn run_fit_command(args: FitArgs) -> Result<i32, CliError> {
    let settings = match &args.settings {
        Some(path) => FitSettings::load(path)?,
        None => FitSettings::default(),
    };
    let inputs = resolve_inputs(&args)?;
    let loaded = LoadedRun::load(ScfCurve, &inputs)?;

    let slots = loaded.parameter_slots();
    let entries = match &args.params {
        Some(path) => FileParameterSource::new(path).entries(&slots)?,
        None => PromptParameterSource::stdio().entries(&slots)?,
    };

    let minimizer = LevenbergMarquardt::new(settings.minimizer);
    let outcome = loaded
        .parameterize_entries(&entries)?
        .fit(&minimizer, &settings.grid)?;

    let run = match outcome {
        FitOutcome::Converged(run) => run,
        FitOutcome::Failed(failed) => {
            println!("{}", failed.result.message);
            println!("No results written for '{}'.", failed.prefix);
            return Ok(0);
        }
    };

    let threshold = settings.report.correlation_threshold;
    println!("{}", render_fit_report(run.result(), threshold));

    let exported = export(&run, &args.outdir, threshold)?;
    let mut artifacts: Vec<PathBuf> = exported.paths().iter().map(|path| path.to_path_buf()).collect();
    if args.image {
        let path = plot_path(&args.outdir, run.prefix());
        render_fit_plot(&run, &path)?;
        artifacts.push(path);
    }
    if let Some(path) = &args.summary {
        let summary = RunSummary {
            prefix: run.prefix().to_string(),
            mode: run.mode().to_string(),
            inputs: run.sources(),
            artifacts: artifacts.clone(),
            fit: run.result().summary(),
        };
        write_summary(path, &summary)?;
    }

    for artifact in &artifacts {
        println!("Wrote {}", artifact.display());
    }
    Ok(0)
}

fn resolve_inputs(args: &FitArgs) -> Result<Vec<PathBuf>, CliError> {
    match (&args.input_dir, &args.glob) {
        (Some(dir), Some(pattern)) => Ok(discover_inputs(dir, pattern)?),
        _ if !args.inputs.is_empty() => Ok(args.inputs.clone()),
        _ => Err(CliError::Usage(
            "provide QDP inputs or --input-dir with --glob".to_string(),
        )),
    }
}

fn write_summary(path: &Path, summary: &RunSummary) -> Result<(), CliError> {
    let content = serde_json::to_string_pretty(summary).context("failed to serialize run summary")?;
    write_text_artifact(path, &content)?;
    Ok(())
}

pub(super) fn run_gain_command(args: GainArgs) -> Result<i32, CliError> {
    let correction = GainCorrection::new(args.efunc, args.etrue)?;
    let rows = gain_correct(&args.input, &args.output, correction, args.seed)?;
    println!("Wrote {} channels to {}", rows, args.output.display());
    Ok(0)
}

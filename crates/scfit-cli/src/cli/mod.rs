mod commands;
mod entry;
mod logging;
mod plot;

use clap::Parser;
use scfit_core::ScfitError;

const PROGRAM_NAME: &str = "scfit";

pub fn run_from_env() -> i32 {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match run(args) {
        Ok(code) => code,
        Err(error) => {
            let diagnostic = error.as_scfit_error();
            eprintln!("{}", diagnostic.diagnostic_line());
            eprintln!("{}", diagnostic.fatal_exit_line());
            diagnostic.exit_code()
        }
    }
}

pub fn run<I, S>(args: I) -> Result<i32, CliError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let full_args = std::iter::once(PROGRAM_NAME.to_string())
        .chain(args.into_iter().map(Into::into))
        .collect::<Vec<_>>();
    parse_and_dispatch(full_args)
}

fn parse_and_dispatch(args: Vec<String>) -> Result<i32, CliError> {
    match Cli::try_parse_from(&args) {
        Ok(cli) => {
            logging::init(cli.log_level.as_deref(), cli.debug)?;
            dispatch_parsed(cli.command)
        }
        Err(err) => match err.kind() {
            clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                print!("{}", err);
                Ok(0)
            }
            _ => Err(CliError::Usage(err.to_string())),
        },
    }
}

#[derive(Parser)]
#[command(name = "scfit", version, about = "Joint lineshape fitting for QDP calibration data")]
struct Cli {
    /// Log filter (e.g. `info`, `scfit_core=debug`); overrides RUST_LOG
    #[arg(long, global = true, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Shorthand for `--log-level debug`
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(clap::Subcommand)]
enum CliCommand {
    /// Fit one QDP dataset, or several jointly
    Fit(commands::FitArgs),
    /// Re-bin a channel spectrum recorded with the wrong gain
    GainCorrect(commands::GainArgs),
}

fn dispatch_parsed(command: CliCommand) -> Result<i32, CliError> {
    match command {
        CliCommand::Fit(args) => commands::run_fit_command(args),
        CliCommand::GainCorrect(args) => commands::run_gain_command(args),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error("{0}")]
    Fit(#[from] ScfitError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl CliError {
    pub fn as_scfit_error(&self) -> ScfitError {
        match self {
            Self::Usage(message) => {
                ScfitError::invalid_input("INPUT.CLI_USAGE", message.trim_end().to_string())
            }
            Self::Fit(error) => error.clone(),
            Self::Internal(error) => ScfitError::io_system("IO.CLI", format!("{error:#}")),
        }
    }

    pub fn exit_code(&self) -> i32 {
        self.as_scfit_error().exit_code()
    }
}

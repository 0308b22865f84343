//! `scfit` command layer: argument parsing, logging setup, parameter entry
//! and the diagnostic plot.

mod cli;

pub use cli::{CliError, run, run_from_env};

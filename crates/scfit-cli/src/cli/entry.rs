//! Parameter-entry providers: one `value, vary, min, max[, expr]` line per
//! slot, either prompted interactively or read from a file.

use scfit_core::domain::{ScfitError, ScfitResult};
use scfit_core::params::ParameterEntry;
use scfit_core::serialization::read_text_artifact;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

pub(super) trait ParameterSource {
    /// One entry per slot, in slot order.
    fn entries(&mut self, slots: &[String]) -> ScfitResult<Vec<ParameterEntry>>;
}

/// Asks for each slot in turn on `output` and reads the answers from `input`.
pub(super) struct PromptParameterSource<R, W> {
    input: R,
    output: W,
}

impl PromptParameterSource<io::StdinLock<'static>, io::Stderr> {
    pub(super) fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stderr())
    }
}

impl<R: BufRead, W: Write> PromptParameterSource<R, W> {
    pub(super) fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl<R: BufRead, W: Write> ParameterSource for PromptParameterSource<R, W> {
    fn entries(&mut self, slots: &[String]) -> ScfitResult<Vec<ParameterEntry>> {
        let mut entries = Vec::with_capacity(slots.len());
        for slot in slots {
            write!(self.output, "{slot} (value, vary, min, max[, expr]): ")
                .and_then(|()| self.output.flush())
                .map_err(prompt_error)?;

            let mut line = String::new();
            let read = self.input.read_line(&mut line).map_err(prompt_error)?;
            if read == 0 {
                return Err(ScfitError::insufficient_input(
                    "INPUT.PARAM_COUNT",
                    format!(
                        "input ended after {} of {} parameter entries",
                        entries.len(),
                        slots.len()
                    ),
                ));
            }
            entries.push(ParameterEntry::parse(&line)?);
        }
        Ok(entries)
    }
}

fn prompt_error(source: io::Error) -> ScfitError {
    ScfitError::io_system(
        "IO.PARAM_PROMPT",
        format!("parameter prompt failed: {source}"),
    )
}

/// Reads entries from a file, one per line; blank lines and `#` comments
/// are skipped. The count is checked when the parameter set is built.
pub(super) struct FileParameterSource {
    path: PathBuf,
}

impl FileParameterSource {
    pub(super) fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }
}

impl ParameterSource for FileParameterSource {
    fn entries(&mut self, _slots: &[String]) -> ScfitResult<Vec<ParameterEntry>> {
        let content = read_text_artifact(&self.path)?;
        content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(ParameterEntry::parse)
            .collect()
    }
}

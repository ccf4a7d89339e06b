use crate::errors::{PipelineError, Result};
use crate::utils::{dedup_preserving_order, open_file, parse_comma_separated_list};
use std::io::{BufRead, BufReader};
use std::path::Path;

/// How the raw group argument was interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionMode {
    /// A comma separated list given on the command line.
    Inline,
    /// A path to a text file with one sample name per line.
    File,
}

impl ResolutionMode {
    pub fn from_flag(use_sample_files: bool) -> Self {
        if use_sample_files {
            ResolutionMode::File
        } else {
            ResolutionMode::Inline
        }
    }
}

/// One comparison arm, before it is folded into a run specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleGroup {
    pub mode: ResolutionMode,
    pub samples: Vec<String>,
}

impl SampleGroup {
    pub fn into_samples(self) -> Vec<String> {
        self.samples
    }
}

/// Resolves a group argument into an ordered list of unique sample names.
///
/// Inline input is split on commas; file input is read line by line. In both
/// cases surrounding whitespace is stripped, blank entries are dropped and
/// repeated names are kept only at their first position.
pub fn resolve(raw_input: &str, use_sample_files: bool) -> Result<Vec<String>> {
    resolve_group(raw_input, use_sample_files).map(SampleGroup::into_samples)
}

pub fn resolve_group(raw_input: &str, use_sample_files: bool) -> Result<SampleGroup> {
    let mode = ResolutionMode::from_flag(use_sample_files);
    let raw = match mode {
        ResolutionMode::Inline => parse_comma_separated_list(raw_input),
        ResolutionMode::File => read_sample_file(Path::new(raw_input))?,
    };

    let listed = raw.len();
    let samples = dedup_preserving_order(raw);
    if samples.len() < listed {
        log::debug!(
            "dropped {} duplicate sample name(s) from '{}'",
            listed - samples.len(),
            raw_input
        );
    }

    if samples.is_empty() {
        return Err(PipelineError::EmptyGroup(raw_input.to_string()));
    }

    Ok(SampleGroup { mode, samples })
}

fn read_sample_file(path: &Path) -> Result<Vec<String>> {
    let file = open_file(path).map_err(|_| PipelineError::InputNotFound(path.to_path_buf()))?;
    let reader = BufReader::new(file);

    let mut samples = Vec::new();
    for line in reader.lines() {
        let line = line.map_err(|_| PipelineError::InputNotFound(path.to_path_buf()))?;
        let name = line.trim();
        if !name.is_empty() {
            samples.push(name.to_string());
        }
    }
    Ok(samples)
}

use crate::args::RunInputs;
use crate::errors::{PipelineError, Result};
use crate::samples::resolve;
use crate::utils::{absolute_path, create_dir};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::{self, Write as _};
use std::fs;
use std::io::{self, Write};
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};

/// Reference build used for annotation by the workflow.
#[derive(
    Debug,
    Copy,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    ValueEnum,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum GenomeBuild {
    Hg19,
    #[default]
    Hg38,
}

impl fmt::Display for GenomeBuild {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                GenomeBuild::Hg19 => "hg19",
                GenomeBuild::Hg38 => "hg38",
            }
        )
    }
}

/// Everything the workflow needs to know about one run.
///
/// A specification is built once (by [`synthesize`] or [`create_config`]),
/// written once and afterwards only read. Changing a run means writing a new
/// file, so the fields are only reachable through accessors. All paths are
/// absolute, so a config means the same run from any working directory.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunSpecification {
    genome_build: GenomeBuild,
    cores_per_job: NonZeroU32,
    fastq_dir: PathBuf,
    reference_fasta: PathBuf,
    output_dir: PathBuf,
    group1: Vec<String>,
    group2: Vec<String>,
}

impl RunSpecification {
    pub fn genome_build(&self) -> GenomeBuild {
        self.genome_build
    }

    pub fn cores_per_job(&self) -> NonZeroU32 {
        self.cores_per_job
    }

    pub fn fastq_dir(&self) -> &Path {
        &self.fastq_dir
    }

    pub fn reference_fasta(&self) -> &Path {
        &self.reference_fasta
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn group1(&self) -> &[String] {
        &self.group1
    }

    pub fn group2(&self) -> &[String] {
        &self.group2
    }

    /// Renders the config file handed to the workflow engine.
    ///
    /// Sample names are always written as double-quoted scalars. Snakemake
    /// reads the file with YAML 1.1 rules, under which plain `yes`, `off` or
    /// `1_000` would stop being strings.
    pub fn to_yaml(&self) -> Result<String> {
        let mut yaml = serde_yaml::to_string(&SettingsSection {
            genome_build: self.genome_build,
            cores_per_job: self.cores_per_job,
            fastq_dir: &self.fastq_dir,
            reference_fasta: &self.reference_fasta,
            output_dir: &self.output_dir,
        })?;
        for (key, group) in [("group1", &self.group1), ("group2", &self.group2)] {
            yaml.push_str(key);
            yaml.push_str(":\n");
            for sample in group {
                yaml.push_str("- ");
                yaml.push_str(&quoted_scalar(sample));
                yaml.push('\n');
            }
        }
        Ok(yaml)
    }

    /// Writes the specification to `target`, replacing any existing file.
    ///
    /// The document is written to a temporary file next to `target` and renamed
    /// into place, so readers never see a half-written config.
    pub fn write_to(&self, target: &Path) -> Result<()> {
        let yaml = self.to_yaml()?;
        let parent = match target.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        create_dir(parent).map_err(|e| PipelineError::io(parent, e))?;

        let mut tmp = tempfile::Builder::new()
            .prefix(".diffpipe-")
            .suffix(".yaml.tmp")
            .tempfile_in(parent)
            .map_err(|e| PipelineError::io(parent, e))?;
        tmp.write_all(yaml.as_bytes())
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| PipelineError::io(tmp.path().to_path_buf(), e))?;
        tmp.persist(target)
            .map_err(|e| PipelineError::io(target, e.error))?;
        Ok(())
    }
}

/// Scalar keys of the config file, in file order. The groups follow them.
#[derive(Serialize)]
struct SettingsSection<'a> {
    genome_build: GenomeBuild,
    cores_per_job: NonZeroU32,
    fastq_dir: &'a Path,
    reference_fasta: &'a Path,
    output_dir: &'a Path,
}

/// Quotes `s` as a YAML double-quoted scalar.
fn quoted_scalar(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            c if c.is_control() => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Resolves and validates the run inputs into a specification.
///
/// All checks run before the output directory is created, which is the only
/// side effect of this function. Paths are stored absolute.
pub fn synthesize(inputs: &RunInputs) -> Result<RunSpecification> {
    let group1 = resolve(&inputs.group1, inputs.use_sample_files)?;
    let group2 = resolve(&inputs.group2, inputs.use_sample_files)?;

    for path in [&inputs.fastq_dir, &inputs.reference_fasta] {
        if !path.exists() {
            return Err(PipelineError::InputNotFound(path.clone()));
        }
    }
    check_disjoint(&group1, &group2)?;
    check_output_outside_inputs(&inputs.output_dir, &inputs.fastq_dir)?;
    ensure_output_dir(&inputs.output_dir)?;

    Ok(RunSpecification {
        genome_build: inputs.genome_build,
        cores_per_job: inputs.cores_per_job,
        fastq_dir: absolute_path(&inputs.fastq_dir),
        reference_fasta: absolute_path(&inputs.reference_fasta),
        output_dir: absolute_path(&inputs.output_dir),
        group1,
        group2,
    })
}

/// Builds a specification from `inputs` and writes it to `target_yaml`.
///
/// Running this twice with the same inputs produces identical files.
pub fn create_config(inputs: &RunInputs, target_yaml: &Path) -> Result<RunSpecification> {
    let spec = synthesize(inputs)?;
    spec.write_to(target_yaml)?;
    log::info!(
        "wrote config for {} vs {} sample(s) to {}",
        spec.group1.len(),
        spec.group2.len(),
        target_yaml.display()
    );
    Ok(spec)
}

/// Reads a specification written by [`create_config`].
pub fn load_config(path: &Path) -> Result<RunSpecification> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(PipelineError::ConfigNotFound(path.to_path_buf()))
        }
        Err(e) => return Err(PipelineError::io(path, e)),
    };

    let parse_error = |reason: String| PipelineError::ConfigParseError {
        path: path.to_path_buf(),
        reason,
    };

    let spec: RunSpecification =
        serde_yaml::from_str(&text).map_err(|e| parse_error(e.to_string()))?;

    for (name, group) in [("group1", &spec.group1), ("group2", &spec.group2)] {
        if group.is_empty() {
            return Err(parse_error(format!("{} is empty", name)));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = group.iter().find(|s| !seen.insert(s.as_str())) {
            return Err(parse_error(format!("{} lists '{}' more than once", name, dup)));
        }
    }
    check_disjoint(&spec.group1, &spec.group2).map_err(|e| parse_error(e.to_string()))?;

    Ok(spec)
}

fn check_disjoint(group1: &[String], group2: &[String]) -> Result<()> {
    let second: HashSet<&str> = group2.iter().map(String::as_str).collect();
    let shared: Vec<String> = group1
        .iter()
        .filter(|s| second.contains(s.as_str()))
        .cloned()
        .collect();
    if shared.is_empty() {
        Ok(())
    } else {
        Err(PipelineError::OverlappingGroups(shared))
    }
}

/// Refuses an output directory that is, or lies inside, the FASTQ directory.
///
/// `output_dir` may not exist yet, so it is compared lexically as well as
/// canonically.
fn check_output_outside_inputs(output_dir: &Path, fastq_dir: &Path) -> Result<()> {
    let lexical = |p: &Path| std::path::absolute(p).unwrap_or_else(|_| p.to_path_buf());
    let fastq_forms = [absolute_path(fastq_dir), lexical(fastq_dir)];
    let output_forms = [absolute_path(output_dir), lexical(output_dir)];
    if output_forms
        .iter()
        .any(|out| fastq_forms.iter().any(|fq| out.starts_with(fq)))
    {
        return Err(PipelineError::OutputPathError {
            path: output_dir.to_path_buf(),
            reason: format!("lies inside the FASTQ directory {}", fastq_dir.display()),
        });
    }
    Ok(())
}

fn ensure_output_dir(path: &Path) -> Result<()> {
    if path.exists() && !path.is_dir() {
        return Err(PipelineError::OutputPathError {
            path: path.to_path_buf(),
            reason: "path exists and is not a directory".to_string(),
        });
    }
    create_dir(path).map_err(|e| PipelineError::OutputPathError {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}
